#![forbid(unsafe_code)]

//! Channel factory over the host's scoped contexts.

use contextize_core::{Context, Element, Scope};

/// A subtree-scoped broadcast slot holding a `T`.
///
/// [`publish`](Self::publish) mounts a value for a subtree;
/// [`read`](Self::read) returns the nearest enclosing published value, or the
/// default when nothing is mounted. Reading without a publisher is not an
/// error.
#[derive(Clone, Debug)]
pub struct Channel<T> {
    context: Context<T>,
}

impl<T: Clone + PartialEq + 'static> Channel<T> {
    /// Create a channel with a default value.
    #[must_use]
    pub fn new(default: T) -> Self {
        Self {
            context: Context::new(default),
        }
    }

    /// Mount `value` for `children` and their descendants.
    #[must_use]
    pub fn publish(&self, value: T, children: impl Into<Element>) -> Element {
        self.context.provide(value, children)
    }

    /// Nearest enclosing published value, or the default.
    pub fn read(&self, cx: &mut Scope<'_>) -> T {
        cx.use_context(&self.context)
    }

    /// Value read when nothing is published.
    #[must_use]
    pub fn default_value(&self) -> &T {
        self.context.default_value()
    }

    /// Underlying host context.
    #[must_use]
    pub fn context(&self) -> &Context<T> {
        &self.context
    }
}
