#![forbid(unsafe_code)]

//! Core: a minimal reactive view-tree host.
//!
//! Provides what the context libraries built on top need from a view runtime:
//!
//! - [`Element`] / [`Component`]: immutable view descriptions and reusable
//!   view functions.
//! - [`Context`]: subtree-scoped broadcast slots with a default value.
//! - [`Scope`]: hooks (`use_state`, `use_memo`, `use_callback`,
//!   `use_effect`, `use_context`) available inside component bodies.
//! - [`Runtime`]: render passes, update queue and the committed [`Frame`].
//!
//! # Example
//!
//! ```
//! use contextize_core::{Callback, Component, Element, Runtime};
//!
//! let toggle = Component::new("Toggle", |cx, _: &()| {
//!     let (on, set_on) = cx.use_state(|| false);
//!     let flip = Callback::new(move || set_on.update(|on| !on));
//!     Element::fragment([
//!         Element::host("p", [Element::text(if on { "on" } else { "off" })]),
//!         Element::button("flip", flip),
//!     ])
//! });
//!
//! let mut runtime = Runtime::mount(toggle.element(())).unwrap();
//! assert!(runtime.frame().has_line("off"));
//! runtime.click("flip").unwrap();
//! assert!(runtime.frame().has_line("on"));
//! ```

pub mod context;
pub mod element;
pub mod error;
pub mod frame;
pub mod reactive;
pub mod runtime;
pub mod scope;

pub use context::{Context, ContextId};
pub use element::{Callback, Component, ComponentId, Element};
pub use error::{HostError, Result};
pub use frame::{Frame, HostNode, Node};
pub use runtime::{RenderStats, Runtime, RuntimeConfig};
pub use scope::{Scope, Setter};
