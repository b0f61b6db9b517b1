#![forbid(unsafe_code)]

//! Subtree-scoped broadcast slots.
//!
//! A [`Context<T>`] is a key plus a default value. [`Context::provide`]
//! publishes a value to every descendant of the returned element;
//! [`Scope::use_context`](crate::Scope::use_context) reads the nearest
//! enclosing publish or falls back to the default. Nested publishes shadow
//! outer ones, and sibling publishes of the same context are independent.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::element::{Element, Erased, ProvideElement};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique context identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A broadcast key with a default value.
///
/// Cloning yields a handle to the same context.
pub struct Context<T> {
    id: ContextId,
    default: Rc<T>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: Rc::clone(&self.default),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("default", &self.default)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Context<T> {
    /// Create a new context. Every call yields a distinct key.
    #[must_use]
    pub fn new(default: T) -> Self {
        Self {
            id: ContextId::next(),
            default: Rc::new(default),
        }
    }

    /// Publish `value` to `children` and their descendants.
    #[must_use]
    pub fn provide(&self, value: T, children: impl Into<Element>) -> Element {
        Element::Provide(ProvideElement {
            context: self.id,
            value: Erased::new(value),
            children: Box::new(children.into()),
        })
    }

    /// Value read when no provider encloses the reader.
    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Context key.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }
}
