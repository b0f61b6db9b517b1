#![forbid(unsafe_code)]

//! Per-invocation hook access.
//!
//! A [`Scope`] is handed to every component body. Hooks are identified by
//! call order, so a component must call the same hooks in the same order on
//! every invocation. If the order changes, the state from the first
//! mismatching hook onwards is discarded and re-initialized.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::context::Context;
use crate::element::Callback;
use crate::reactive::{Observable, Subscription};
use crate::runtime::{ContextRead, Published, Seg, Shared};

pub(crate) type PendingEffect = Box<dyn FnOnce()>;

/// Hook access for one component invocation.
pub struct Scope<'a> {
    pub(crate) path: &'a [Seg],
    pub(crate) hooks: &'a mut Vec<Box<dyn Any>>,
    pub(crate) cursor: usize,
    pub(crate) published: &'a [Published],
    pub(crate) reads: &'a mut Vec<ContextRead>,
    pub(crate) effects: &'a mut Vec<PendingEffect>,
    pub(crate) shared: &'a Rc<Shared>,
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("depth", &self.path.len())
            .field("hooks", &self.hooks.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Deferred writer for a [`Scope::use_state`] cell.
///
/// Writes are queued and applied by [`Runtime::settle`](crate::Runtime::settle)
/// in call order, one render pass per effective change. Writes issued after
/// the runtime is dropped are ignored.
pub struct Setter<T> {
    cell: Observable<T>,
    shared: Weak<Shared>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<T: Clone + PartialEq + 'static> PartialEq for Setter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cell.ptr_eq(&other.cell)
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + 'static> Setter<T> {
    /// Queue a replacement value.
    pub fn set(&self, value: T) {
        let cell = self.cell.clone();
        self.enqueue(move || cell.set(value));
    }

    /// Queue a functional update, evaluated against the value current at the
    /// time it is applied.
    pub fn update(&self, f: impl FnOnce(&T) -> T + 'static) {
        let cell = self.cell.clone();
        self.enqueue(move || {
            let next = cell.with(f);
            cell.set(next);
        });
    }

    fn enqueue(&self, update: impl FnOnce() + 'static) {
        if let Some(shared) = self.shared.upgrade() {
            shared.enqueue(Box::new(update));
        }
    }
}

struct StateHook<T> {
    cell: Observable<T>,
    setter: Setter<T>,
    _subscription: Subscription,
}

struct MemoHook<D, T> {
    memo: Option<(D, T)>,
}

struct EffectHook<D> {
    deps: Option<D>,
}

impl<'a> Scope<'a> {
    fn slot<H: Any>(&mut self, init: impl FnOnce(&Rc<Shared>, &[Seg]) -> H) -> &mut H {
        let index = self.cursor;
        self.cursor += 1;
        let reuse = self.hooks.get(index).is_some_and(|hook| hook.is::<H>());
        if !reuse {
            if index < self.hooks.len() {
                warn!(index, depth = self.path.len(), "hook order changed, resetting hook state");
                self.hooks.truncate(index);
            }
            let hook = init(self.shared, self.path);
            self.hooks.push(Box::new(hook));
        }
        self.hooks[index]
            .downcast_mut::<H>()
            .expect("hook slot type checked above")
    }

    /// Read the nearest enclosing value published for `context`, or its
    /// default when none is mounted.
    ///
    /// The read is recorded: the component is re-invoked in a later pass if
    /// the provider it resolved to changes value or disappears.
    pub fn use_context<T: Clone + PartialEq + 'static>(&mut self, context: &Context<T>) -> T {
        let id = context.id();
        let nearest = self.published.iter().rev().find(|p| p.context == id);
        match nearest {
            Some(published) => {
                self.reads.push(ContextRead {
                    context: id,
                    slot: Some(published.slot),
                    version: published.version,
                });
                published
                    .value
                    .downcast_ref::<T>()
                    .cloned()
                    .unwrap_or_else(|| context.default_value().clone())
            }
            None => {
                self.reads.push(ContextRead {
                    context: id,
                    slot: None,
                    version: 0,
                });
                context.default_value().clone()
            }
        }
    }

    /// A state cell local to this component instance.
    ///
    /// `init` runs on first mount only. Writing an equal value through the
    /// setter does not re-render.
    pub fn use_state<T: Clone + PartialEq + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> (T, Setter<T>) {
        let hook = self.slot(|shared, path| {
            let cell = Observable::new(init());
            let weak = Rc::downgrade(shared);
            let owner = path.to_vec();
            let subscription = cell.subscribe(move |_| {
                if let Some(shared) = weak.upgrade() {
                    shared.mark_dirty(owner.clone());
                }
            });
            StateHook {
                setter: Setter {
                    cell: cell.clone(),
                    shared: Rc::downgrade(shared),
                },
                cell,
                _subscription: subscription,
            }
        });
        (hook.cell.get(), hook.setter.clone())
    }

    /// Recompute `compute` only when `deps` differs from the previous call.
    pub fn use_memo<D: PartialEq + 'static, T: Clone + 'static>(
        &mut self,
        deps: D,
        compute: impl FnOnce(&D) -> T,
    ) -> T {
        let hook = self.slot(|_, _| MemoHook::<D, T> { memo: None });
        if let Some((prev, value)) = &hook.memo
            && *prev == deps
        {
            return value.clone();
        }
        let value = compute(&deps);
        hook.memo = Some((deps, value.clone()));
        value
    }

    /// A callback whose identity only changes when `deps` does.
    pub fn use_callback<D: PartialEq + 'static>(
        &mut self,
        deps: D,
        f: impl Fn() + 'static,
    ) -> Callback {
        self.use_memo(deps, move |_| Callback::new(f))
    }

    /// Run `effect` after the current pass commits, on first mount and
    /// whenever `deps` changes.
    ///
    /// Effects run in render order. State writes they queue are applied by
    /// the same [`Runtime::settle`](crate::Runtime::settle) call.
    pub fn use_effect<D: PartialEq + 'static>(&mut self, deps: D, effect: impl FnOnce() + 'static) {
        let hook = self.slot(|_, _| EffectHook::<D> { deps: None });
        if hook.deps.as_ref() == Some(&deps) {
            return;
        }
        hook.deps = Some(deps);
        self.effects.push(Box::new(effect));
    }

    /// Depth of this instance in the element tree.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}
