#![forbid(unsafe_code)]

//! Debug/persistence layer.
//!
//! A [`DebugLayer`] is a contextized producer whose value is a [`DebugCtx`]:
//! a string-keyed snapshot of mirrored values plus handles to write through
//! to a durable [`Store`](crate::storage::Store).
//!
//! # Design
//!
//! The in-memory snapshot is the read source during a pass; the store is only
//! read by [`DebugCtx::set`] (read-merge-write) and [`DebugCtx::refresh`].
//! A freshly mounted layer starts empty, so values persisted by an earlier
//! session only become visible after `refresh`.
//!
//! The layer is an explicitly constructed value. Each [`DebugLayer::new`]
//! mints its own channel, so tests never share a snapshot.
//!
//! # Failure Modes
//!
//! - Store errors propagate from `set` and `refresh` unhandled.
//! - [`use_debugged`] cannot propagate out of a post-render effect; it logs the
//!   error with `warn!` and keeps rendering the live value.
//! - Outside any provider the context is empty: `get` yields `Value::Null`,
//!   `set` and `refresh` do nothing.

use std::fmt;

use contextize_core::{Element, Scope, Setter};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::context::Contextized;
use crate::error::{Result, StorageError};
use crate::storage::StoreHandle;

/// Snapshot type held by the debug layer.
pub type Snapshot = Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
struct DebugInner {
    state: Snapshot,
    set_state: Setter<Snapshot>,
    store: StoreHandle,
}

/// Value published by a [`DebugLayer`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DebugCtx {
    inner: Option<DebugInner>,
}

impl DebugCtx {
    /// The context seen outside any provider.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this context is backed by a mounted provider.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.is_some()
    }

    /// The value recorded under `key`, else `fallback`.
    ///
    /// The empty context always yields `Value::Null`.
    #[must_use]
    pub fn get(&self, key: &str, fallback: Value) -> Value {
        match &self.inner {
            Some(inner) => inner.state.get(key).cloned().unwrap_or(fallback),
            None => Value::Null,
        }
    }

    /// Record `value` under `key`: merge it into the store's current snapshot,
    /// write the store, then merge it into the in-memory snapshot.
    ///
    /// The in-memory merge is a queued functional update, so several sets to
    /// different keys before the next pass all survive.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let Some(inner) = &self.inner else {
            return Ok(());
        };
        let mut current = stored_snapshot(&inner.store, key)?;
        current.insert(key.to_string(), value.clone());
        debug!(key, entries = current.len(), "debug.set");
        inner.store.set(&Value::Object(current))?;

        let key = key.to_string();
        inner.set_state.update(move |state| {
            let mut next = state.clone();
            next.insert(key, value);
            next
        });
        Ok(())
    }

    /// Replace the in-memory snapshot with the store's content. A store with
    /// nothing in it yields an empty snapshot.
    pub fn refresh(&self) -> Result<()> {
        let Some(inner) = &self.inner else {
            return Ok(());
        };
        let next = stored_snapshot(&inner.store, "")?;
        debug!(entries = next.len(), "debug.refresh");
        inner.set_state.set(next);
        Ok(())
    }

    /// The in-memory snapshot as of the current pass.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner
            .as_ref()
            .map(|inner| inner.state.clone())
            .unwrap_or_default()
    }

    /// The store this context writes to.
    #[must_use]
    pub fn store(&self) -> Option<&StoreHandle> {
        self.inner.as_ref().map(|inner| &inner.store)
    }
}

fn stored_snapshot(store: &StoreHandle, key: &str) -> Result<Snapshot> {
    match store.get()? {
        None => Ok(Snapshot::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(StorageError::NotAnObject {
            key: key.to_string(),
            found: kind_of(&other),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Props of the debug provider.
#[derive(Clone, Debug, PartialEq)]
pub struct DebugProps {
    /// Durable store mirrored values are written to.
    pub store: StoreHandle,
}

impl DebugProps {
    /// Props over `store`.
    #[must_use]
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }
}

fn use_debug_ctl(cx: &mut Scope<'_>, props: &DebugProps) -> DebugCtx {
    let (state, set_state) = cx.use_state(Snapshot::new);
    DebugCtx {
        inner: Some(DebugInner {
            state,
            set_state,
            store: props.store.clone(),
        }),
    }
}

/// A debug provider plus its reader.
#[derive(Clone)]
pub struct DebugLayer {
    ctx: Contextized<DebugCtx, DebugProps>,
}

impl fmt::Debug for DebugLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DebugLayer").field(&self.ctx).finish()
    }
}

impl Default for DebugLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugLayer {
    /// A fresh layer with its own channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ctx: Contextized::named("DebugProvider", use_debug_ctl, DebugCtx::empty()),
        }
    }

    /// Mount the debug provider over `children`.
    #[must_use]
    pub fn provider(&self, props: DebugProps, children: impl Into<Element>) -> Element {
        self.ctx.provider(props, children)
    }

    /// The nearest debug context, or the empty one.
    pub fn use_value(&self, cx: &mut Scope<'_>) -> DebugCtx {
        self.ctx.use_value(cx)
    }
}

/// Mirror `value` into `layer` under `key` and return the layer's view of it.
///
/// The write happens in a post-render effect whenever the encoded value, the
/// key or the store changes. The returned value is the one recorded in the
/// snapshot (which, after a `refresh`, may be a persisted value overriding the
/// live one), or `value` itself when nothing usable is recorded.
pub fn use_debugged<T>(cx: &mut Scope<'_>, layer: &DebugLayer, value: T, key: &str) -> T
where
    T: Serialize + DeserializeOwned + 'static,
{
    let ctx = layer.use_value(cx);
    let encoded = match serde_json::to_value(&value) {
        Ok(encoded) => Some(encoded),
        Err(err) => {
            warn!(key, error = %err, "debug.encode_failed");
            None
        }
    };

    let writer = ctx.clone();
    let effect_key = key.to_string();
    let effect_value = encoded.clone();
    cx.use_effect(
        (encoded.clone(), key.to_string(), ctx.store().cloned()),
        move || {
            let Some(value) = effect_value else {
                return;
            };
            if let Err(err) = writer.set(&effect_key, value) {
                warn!(key = %effect_key, error = %err, "debug.mirror_failed");
            }
        },
    );

    let Some(encoded) = encoded else {
        return value;
    };
    match ctx.get(key, encoded) {
        Value::Null => value,
        recorded => match serde_json::from_value(recorded) {
            Ok(recorded) => recorded,
            Err(err) => {
                warn!(key, error = %err, "debug.decode_failed");
                value
            }
        },
    }
}

/// Wrap `hook` so its result is mirrored through `layer` under `key`.
pub fn debugged<A, T>(
    layer: &DebugLayer,
    key: impl Into<String>,
    hook: impl Fn(&mut Scope<'_>, A) -> T + 'static,
) -> impl Fn(&mut Scope<'_>, A) -> T + 'static
where
    A: 'static,
    T: Serialize + DeserializeOwned + 'static,
{
    let layer = layer.clone();
    let key: String = key.into();
    move |cx: &mut Scope<'_>, args: A| {
        let value = hook(cx, args);
        use_debugged(cx, &layer, value, &key)
    }
}
