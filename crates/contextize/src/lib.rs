#![forbid(unsafe_code)]

//! Context distribution for reactive view trees.
//!
//! - [`Channel`]: a subtree-scoped broadcast slot with a default.
//! - [`contextize`]: turn a producer hook into a provider/reader pair.
//! - [`tagged`]: distribute a discriminated value with per-tag narrowing
//!   readers, conditional guards and a multi-tag [`Switch`].
//! - [`DebugLayer`]: mirror values into a durable [`Store`] and replay them.
//!
//! # Example
//!
//! ```
//! use std::borrow::Cow;
//! use contextize::{TaggedValue, tagged};
//! use contextize_core::{Element, Runtime};
//!
//! #[derive(Clone, PartialEq)]
//! enum Mode { Light, Dark }
//!
//! impl TaggedValue for Mode {
//!     type Rest = ();
//!     fn tag(&self) -> Cow<'_, str> {
//!         Cow::Borrowed(match self { Mode::Light => "light", Mode::Dark => "dark" })
//!     }
//!     fn rest(&self) {}
//! }
//!
//! let mode = tagged(|_cx, dark: &bool| if *dark { Mode::Dark } else { Mode::Light });
//! let root = mode.provider(
//!     true,
//!     Element::fragment([
//!         mode.resolve_guard("Dark").wrap(Element::host("p", [Element::text("Dark Mode!")])),
//!         mode.resolve_guard("Light").wrap(Element::host("p", [Element::text("Light Mode!")])),
//!     ]),
//! );
//! let runtime = Runtime::mount(root).unwrap();
//! assert_eq!(runtime.frame().lines(), vec!["Dark Mode!"]);
//! ```

pub mod channel;
pub mod context;
pub mod debug;
pub mod error;
pub mod storage;
pub mod tagged;

pub use channel::Channel;
pub use context::{Contextized, Provider, ProviderProps, contextize};
pub use debug::{DebugCtx, DebugLayer, DebugProps, Snapshot, debugged, use_debugged};
pub use error::{Result, StorageError};
pub use storage::{FileStorage, KeyedStore, MemoryStorage, Storage, Store, StoreHandle, keyed_store};
pub use tagged::{
    Guard, Member, Record, Switch, SwitchProps, TagReader, Tagged, TaggedValue, normalize,
    public_name, reader_name, tagged,
};
