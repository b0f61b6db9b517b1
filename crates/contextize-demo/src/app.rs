#![forbid(unsafe_code)]

//! Light/dark mode demo app.
//!
//! ```text
//! [Say hello]
//! DebugProvider(store)
//! └── ModeProvider(initial)
//!     ├── Display          "light" | "dark"
//!     ├── SwitchButton     "Switch [light]"
//!     ├── Dark  guard      "Dark Mode!"
//!     ├── Light guard      "Light Mode!"
//!     └── ReloadButton     refresh the debug snapshot from the store
//! ```
//!
//! The controller mirrors its mode through the debug layer under
//! [`MODE_KEY`], so the store always holds the last rendered mode.

use std::borrow::Cow;
use std::fmt;

use contextize::{DebugLayer, DebugProps, StoreHandle, Tagged, TaggedValue, use_debugged};
use contextize_core::{Callback, Component, Element, Setter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;

/// Debug-layer key the controller mirrors its mode under.
pub const MODE_KEY: &str = "state";

/// Colour scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Light,
    Dark,
}

impl Mode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value published by the mode provider.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeState {
    pub mode: Mode,
    pub set_mode: Setter<Mode>,
}

impl TaggedValue for ModeState {
    type Rest = Setter<Mode>;

    fn tag(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.mode.as_str())
    }

    fn rest(&self) -> Self::Rest {
        self.set_mode.clone()
    }
}

/// The mode persisted under [`MODE_KEY`] in a debug snapshot, if any.
pub fn stored_mode(store: &StoreHandle) -> Result<Option<Mode>> {
    let Some(Value::Object(snapshot)) = store.get()? else {
        return Ok(None);
    };
    match snapshot.get(MODE_KEY) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
    }
}

/// Component handles of the demo tree.
#[derive(Clone, Debug)]
pub struct App {
    debug: DebugLayer,
    mode: Tagged<ModeState, Mode>,
    display: Component<()>,
    switch_button: Component<()>,
    reload_button: Component<()>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        let debug = DebugLayer::new();

        let layer = debug.clone();
        let mode = Tagged::named("ModeProvider", move |cx, initial: &Mode| {
            let initial = *initial;
            let (live, set_mode) = cx.use_state(move || initial);
            let mode = use_debugged(cx, &layer, live, MODE_KEY);
            // A recorded mode (restored or reloaded) becomes the live one, so
            // the next toggle starts from what is on screen.
            let sync = set_mode.clone();
            cx.use_effect(mode, move || sync.set(mode));
            debug!(mode = mode.as_str(), "demo.controller");
            ModeState { mode, set_mode }
        });

        let reader = mode.clone();
        let display = Component::new("Display", move |cx, _: &()| {
            let tag = reader.use_value(cx).map(|s| s.mode.as_str()).unwrap_or_default();
            Element::host("p", [Element::text(tag)])
        });

        let reader = mode.clone();
        let switch_button = Component::new("SwitchButton", move |cx, _: &()| {
            let state = reader.use_value(cx);
            let current = state.as_ref().map(|s| s.mode);
            let setter = state.map(|s| s.set_mode);
            let on_click = cx.use_callback((current, setter.clone()), move || {
                if let (Some(mode), Some(setter)) = (current, &setter) {
                    setter.set(mode.toggled());
                }
            });
            let label = current.map(Mode::as_str).unwrap_or_default();
            Element::button(format!("Switch [{label}]"), on_click)
        });

        let layer = debug.clone();
        let reload_button = Component::new("ReloadButton", move |cx, _: &()| {
            let ctx = layer.use_value(cx);
            let on_click = cx.use_callback(ctx.clone(), move || {
                if let Err(err) = ctx.refresh() {
                    warn!(error = %err, "demo.reload_failed");
                }
            });
            Element::button("Reload", on_click)
        });

        Self {
            debug,
            mode,
            display,
            switch_button,
            reload_button,
        }
    }

    /// The full demo tree over `store`, starting in `initial` mode.
    #[must_use]
    pub fn element(&self, store: StoreHandle, initial: Mode) -> Element {
        let hello = Callback::new(|| debug!("demo.hello"));
        Element::fragment([
            Element::button("Say hello", hello),
            self.debug.provider(
                DebugProps::new(store),
                self.mode.provider(
                    initial,
                    Element::fragment([
                        self.display.element(()),
                        self.switch_button.element(()),
                        self.mode
                            .resolve_guard("Dark")
                            .wrap(Element::host("p", [Element::text("Dark Mode!")])),
                        self.mode
                            .resolve_guard("Light")
                            .wrap(Element::host("p", [Element::text("Light Mode!")])),
                        self.reload_button.element(()),
                    ]),
                ),
            ),
        ])
    }

    #[must_use]
    pub fn debug_layer(&self) -> &DebugLayer {
        &self.debug
    }

    #[must_use]
    pub fn mode(&self) -> &Tagged<ModeState, Mode> {
        &self.mode
    }
}
