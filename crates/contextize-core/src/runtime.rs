#![forbid(unsafe_code)]

//! Render passes, instance bookkeeping and the update queue.
//!
//! # Model
//!
//! Every pass walks the whole element tree from the root. Component bodies
//! are re-invoked only when one of these holds:
//!
//! 1. the instance is new at its tree position,
//! 2. one of its state cells changed since the last pass,
//! 3. its props differ from the previous pass,
//! 4. a context it read resolves to a different provider or a newer version.
//!
//! Otherwise the previous output is reused and the walk continues into it, so
//! descendants still get the chance to re-render on their own account.
//!
//! # Invariants
//!
//! 1. Readers only ever observe values published earlier in the same pass by
//!    an enclosing provider.
//! 2. Instances and provider slots not visited by a pass are dropped at the end
//!    of that pass, together with their hook state.
//! 3. Queued state writes are applied one at a time, in order; each effective
//!    write is followed by exactly one pass.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use tracing::{debug, trace, warn};

use crate::context::ContextId;
use crate::element::{ComponentElement, ComponentId, Element, Erased, ProvideElement};
use crate::error::{HostError, Result};
use crate::frame::{Frame, HostNode, Node};
use crate::reactive::Observable;
use crate::scope::{PendingEffect, Scope};

// ─── Tree positions ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum SegKind {
    Node,
    Component(ComponentId),
    Provide(ContextId),
}

/// One step from a parent to a child position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Seg {
    index: usize,
    kind: SegKind,
}

impl Seg {
    fn new(index: usize, element: &Element) -> Self {
        let kind = match element {
            Element::Component(c) => SegKind::Component(c.component.id),
            Element::Provide(p) => SegKind::Provide(p.context),
            _ => SegKind::Node,
        };
        Self { index, kind }
    }
}

pub(crate) type Path = Vec<Seg>;

// ─── Shared queue ────────────────────────────────────────────────────────────

type Update = Box<dyn FnOnce()>;

/// State shared between the runtime and the setters it hands out.
#[derive(Default)]
pub(crate) struct Shared {
    dirty: RefCell<AHashSet<Path>>,
    updates: RefCell<VecDeque<Update>>,
}

impl Shared {
    pub(crate) fn mark_dirty(&self, path: Path) {
        self.dirty.borrow_mut().insert(path);
    }

    pub(crate) fn enqueue(&self, update: Update) {
        self.updates.borrow_mut().push_back(update);
    }

    fn next_update(&self) -> Option<Update> {
        self.updates.borrow_mut().pop_front()
    }

    fn has_dirty(&self) -> bool {
        !self.dirty.borrow().is_empty()
    }

    fn take_dirty(&self) -> AHashSet<Path> {
        std::mem::take(&mut *self.dirty.borrow_mut())
    }

    fn pending(&self) -> usize {
        self.updates.borrow().len()
    }
}

// ─── Context bookkeeping ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SlotId(u64);

/// A value visible to the subtree currently being walked.
pub(crate) struct Published {
    pub(crate) context: ContextId,
    pub(crate) slot: SlotId,
    pub(crate) version: u64,
    pub(crate) value: Erased,
}

/// What a component saw when it last read a context.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ContextRead {
    pub(crate) context: ContextId,
    pub(crate) slot: Option<SlotId>,
    pub(crate) version: u64,
}

impl ContextRead {
    fn is_stale(&self, published: &[Published]) -> bool {
        let nearest = published.iter().rev().find(|p| p.context == self.context);
        match (nearest, self.slot) {
            (Some(p), Some(slot)) => p.slot != slot || p.version != self.version,
            (None, None) => false,
            _ => true,
        }
    }
}

struct ProviderSlot {
    id: SlotId,
    cell: Observable<Erased>,
    seen: u64,
}

struct Instance {
    name: Rc<str>,
    props: Erased,
    output: Element,
    hooks: Vec<Box<dyn std::any::Any>>,
    reads: Vec<ContextRead>,
    seen: u64,
}

impl Instance {
    fn new(element: &ComponentElement) -> Self {
        Self {
            name: Rc::clone(&element.component.name),
            props: element.props.clone(),
            output: Element::Empty,
            hooks: Vec::new(),
            reads: Vec::new(),
            seen: 0,
        }
    }
}

// ─── Config & stats ──────────────────────────────────────────────────────────

/// Runtime tuning knobs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Upper bound on passes run by one [`Runtime::settle`] call.
    pub max_passes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { max_passes: 64 }
    }
}

impl RuntimeConfig {
    /// Set the pass budget.
    #[must_use]
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }
}

/// Component invocation counters.
#[derive(Clone, Debug, Default)]
pub struct RenderStats {
    by_component: AHashMap<Rc<str>, u64>,
    total: u64,
}

impl RenderStats {
    fn record(&mut self, name: &Rc<str>) {
        *self.by_component.entry(Rc::clone(name)).or_insert(0) += 1;
        self.total += 1;
    }

    /// How often components named `name` were invoked.
    #[must_use]
    pub fn invocations(&self, name: &str) -> u64 {
        self.by_component.get(name).copied().unwrap_or(0)
    }

    /// Total invocations across all components.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }
}

// ─── Runtime ─────────────────────────────────────────────────────────────────

struct PassState {
    pass: u64,
    dirty: AHashSet<Path>,
    published: Vec<Published>,
    effects: Vec<PendingEffect>,
}

/// Owns one element tree and drives its render passes.
pub struct Runtime {
    root: Element,
    config: RuntimeConfig,
    shared: Rc<Shared>,
    instances: AHashMap<Path, Instance>,
    slots: AHashMap<Path, ProviderSlot>,
    next_slot: u64,
    pass: u64,
    frame: Frame,
    stats: RenderStats,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("pass", &self.pass)
            .field("instances", &self.instances.len())
            .field("slots", &self.slots.len())
            .field("pending", &self.shared.pending())
            .finish()
    }
}

impl Runtime {
    /// Create a runtime without rendering.
    #[must_use]
    pub fn new(root: Element) -> Self {
        Self::with_config(root, RuntimeConfig::default())
    }

    /// Create a runtime with explicit config, without rendering.
    #[must_use]
    pub fn with_config(root: Element, config: RuntimeConfig) -> Self {
        Self {
            root,
            config,
            shared: Rc::new(Shared::default()),
            instances: AHashMap::new(),
            slots: AHashMap::new(),
            next_slot: 0,
            pass: 0,
            frame: Frame::default(),
            stats: RenderStats::default(),
        }
    }

    /// Create a runtime and render it until settled.
    pub fn mount(root: Element) -> Result<Self> {
        let mut runtime = Self::new(root);
        runtime.render()?;
        Ok(runtime)
    }

    /// Run one pass, then [`settle`](Self::settle).
    pub fn render(&mut self) -> Result<&Frame> {
        self.commit();
        self.settle()?;
        Ok(&self.frame)
    }

    /// Swap the root element and render.
    pub fn set_root(&mut self, root: Element) -> Result<&Frame> {
        self.root = root;
        self.render()
    }

    /// Apply queued state writes in order, running one pass per effective
    /// change. Returns the number of passes run.
    pub fn settle(&mut self) -> Result<usize> {
        let mut passes = 0;
        while let Some(update) = self.shared.next_update() {
            update();
            if !self.shared.has_dirty() {
                continue;
            }
            if passes >= self.config.max_passes {
                warn!(passes, pending = self.shared.pending(), "render did not settle");
                return Err(HostError::Unsettled { passes });
            }
            passes += 1;
            self.commit();
        }
        Ok(passes)
    }

    /// Click the first button whose text contains `label`, then settle.
    pub fn click(&mut self, label: &str) -> Result<usize> {
        let callback = self
            .frame
            .find_button(label)
            .ok_or_else(|| HostError::NoSuchTarget {
                label: label.to_string(),
            })?;
        callback.call();
        self.settle()
    }

    /// Output of the latest pass.
    #[must_use]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Invocation counters.
    #[must_use]
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Number of passes committed so far.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.pass
    }

    /// Number of mounted component instances.
    #[must_use]
    pub fn mounted(&self) -> usize {
        self.instances.len()
    }

    fn commit(&mut self) {
        self.pass += 1;
        let invoked_before = self.stats.total;
        let mut state = PassState {
            pass: self.pass,
            dirty: self.shared.take_dirty(),
            published: Vec::new(),
            effects: Vec::new(),
        };
        let root = self.root.clone();
        let mut path = Vec::new();
        let mut nodes = Vec::new();
        self.walk_child(0, &root, &mut path, &mut state, &mut nodes);
        self.sweep(state.pass);
        self.frame = Frame::new(nodes);
        debug!(
            pass = self.pass,
            invoked = self.stats.total - invoked_before,
            mounted = self.instances.len(),
            effects = state.effects.len(),
            "render pass committed"
        );
        for effect in state.effects {
            effect();
        }
    }

    fn sweep(&mut self, pass: u64) {
        self.instances.retain(|path, instance| {
            let keep = instance.seen == pass;
            if !keep {
                trace!(component = %instance.name, depth = path.len(), "component unmounted");
            }
            keep
        });
        self.slots.retain(|_, slot| slot.seen == pass);
    }

    fn walk_child(
        &mut self,
        index: usize,
        element: &Element,
        path: &mut Path,
        state: &mut PassState,
        out: &mut Vec<Node>,
    ) {
        path.push(Seg::new(index, element));
        self.walk(element, path, state, out);
        path.pop();
    }

    fn walk(&mut self, element: &Element, path: &mut Path, state: &mut PassState, out: &mut Vec<Node>) {
        match element {
            Element::Empty => {}
            Element::Text(text) => out.push(Node::Text(text.clone())),
            Element::Fragment(children) => {
                for (i, child) in children.iter().enumerate() {
                    self.walk_child(i, child, path, state, out);
                }
            }
            Element::Host(host) => {
                let mut children = Vec::with_capacity(host.children.len());
                for (i, child) in host.children.iter().enumerate() {
                    self.walk_child(i, child, path, state, &mut children);
                }
                out.push(Node::Host(HostNode {
                    name: host.name,
                    children,
                    on_click: host.on_click.clone(),
                }));
            }
            Element::Provide(provide) => self.walk_provide(provide, path, state, out),
            Element::Component(component) => self.walk_component(component, path, state, out),
        }
    }

    fn walk_provide(
        &mut self,
        provide: &ProvideElement,
        path: &mut Path,
        state: &mut PassState,
        out: &mut Vec<Node>,
    ) {
        if !self.slots.contains_key(path.as_slice()) {
            self.next_slot += 1;
            trace!(context = ?provide.context, depth = path.len(), "provider mounted");
            self.slots.insert(
                path.clone(),
                ProviderSlot {
                    id: SlotId(self.next_slot),
                    cell: Observable::new(provide.value.clone()),
                    seen: state.pass,
                },
            );
        }
        let Some(slot) = self.slots.get_mut(path.as_slice()) else {
            return;
        };
        slot.cell.set(provide.value.clone());
        slot.seen = state.pass;
        state.published.push(Published {
            context: provide.context,
            slot: slot.id,
            version: slot.cell.version(),
            value: slot.cell.get(),
        });
        self.walk_child(0, &provide.children, path, state, out);
        state.published.pop();
    }

    fn walk_component(
        &mut self,
        component: &ComponentElement,
        path: &mut Path,
        state: &mut PassState,
        out: &mut Vec<Node>,
    ) {
        let rerun = match self.instances.get(path.as_slice()) {
            None => true,
            Some(instance) => {
                state.dirty.contains(path.as_slice())
                    || instance.props != component.props
                    || instance.reads.iter().any(|r| r.is_stale(&state.published))
            }
        };
        let mut instance = match self.instances.remove(path.as_slice()) {
            Some(instance) => instance,
            None => {
                trace!(component = %component.component.name, depth = path.len(), "component mounted");
                Instance::new(component)
            }
        };
        if rerun {
            instance.props = component.props.clone();
            instance.reads.clear();
            let mut scope = Scope {
                path: path.as_slice(),
                hooks: &mut instance.hooks,
                cursor: 0,
                published: &state.published,
                reads: &mut instance.reads,
                effects: &mut state.effects,
                shared: &self.shared,
            };
            instance.output = (component.component.render)(&mut scope, component.props.as_any());
            self.stats.record(&component.component.name);
        }
        instance.seen = state.pass;
        let output = instance.output.clone();
        self.instances.insert(path.clone(), instance);
        self.walk_child(0, &output, path, state, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::element::{Callback, Component};
    use std::cell::Cell;

    #[test]
    fn renders_static_tree() {
        let root = Element::host("div", [Element::host("p", [Element::text("hello")]), "bare".into()]);
        let runtime = Runtime::mount(root).unwrap();
        assert_eq!(runtime.frame().lines(), vec!["hello", "bare"]);
        assert_eq!(runtime.passes(), 1);
    }

    #[test]
    fn state_write_rerenders_once() {
        let counter = Component::new("Counter", |cx, _: &()| {
            let (n, set_n) = cx.use_state(|| 0u32);
            let on_click = Callback::new(move || set_n.update(|n| n + 1));
            Element::fragment([
                Element::host("p", [Element::text(n.to_string())]),
                Element::button("inc", on_click),
            ])
        });
        let mut runtime = Runtime::mount(counter.element(())).unwrap();
        assert!(runtime.frame().has_line("0"));

        let passes = runtime.click("inc").unwrap();
        assert_eq!(passes, 1);
        assert!(runtime.frame().has_line("1"));
        assert_eq!(runtime.stats().invocations("Counter"), 2);
    }

    #[test]
    fn equal_state_write_skips_pass() {
        let setter = Rc::new(RefCell::new(None));
        let setter_out = Rc::clone(&setter);
        let comp = Component::new("Same", move |cx, _: &()| {
            let (v, set_v) = cx.use_state(|| "light".to_string());
            *setter_out.borrow_mut() = Some(set_v);
            Element::text(v)
        });
        let mut runtime = Runtime::mount(comp.element(())).unwrap();
        setter.borrow().as_ref().unwrap().set("light".to_string());
        assert_eq!(runtime.settle().unwrap(), 0);
        assert_eq!(runtime.passes(), 1);
    }

    #[test]
    fn queued_writes_apply_in_order_one_pass_each() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = Rc::clone(&seen);
        let setter = Rc::new(RefCell::new(None));
        let setter_out = Rc::clone(&setter);
        let comp = Component::new("Seq", move |cx, _: &()| {
            let (v, set_v) = cx.use_state(|| 0u8);
            seen_in.borrow_mut().push(v);
            *setter_out.borrow_mut() = Some(set_v);
            Element::Empty
        });
        let mut runtime = Runtime::mount(comp.element(())).unwrap();
        {
            let set = setter.borrow();
            let set = set.as_ref().unwrap();
            set.set(1);
            set.set(2);
            set.set(2);
            set.set(3);
        }
        assert_eq!(runtime.settle().unwrap(), 3);
        assert_eq!(*seen.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn context_default_without_provider() {
        let ctx = Context::new(7u8);
        let ctx_in = ctx.clone();
        let reader = Component::new("Reader", move |cx, _: &()| {
            Element::text(cx.use_context(&ctx_in).to_string())
        });
        let runtime = Runtime::mount(reader.element(())).unwrap();
        assert!(runtime.frame().has_line("7"));
    }

    #[test]
    fn nested_provider_shadows_outer() {
        let ctx = Context::new(0u8);
        let ctx_in = ctx.clone();
        let reader = Component::new("Reader", move |cx, _: &()| {
            Element::host("p", [Element::text(cx.use_context(&ctx_in).to_string())])
        });
        let root = ctx.provide(
            1,
            Element::fragment([
                reader.element(()),
                ctx.provide(2, reader.element(())),
                reader.element(()),
            ]),
        );
        let runtime = Runtime::mount(root).unwrap();
        assert_eq!(runtime.frame().lines(), vec!["1", "2", "1"]);
    }

    #[test]
    fn unchanged_props_and_context_skip_invocation() {
        let ctx = Context::new(0u32);
        let ctx_in = ctx.clone();
        let reader = Component::new("Reader", move |cx, _: &()| {
            Element::text(cx.use_context(&ctx_in).to_string())
        });
        let bystander = Component::new("Bystander", |_cx, _: &()| Element::text("static"));
        let reader_el = reader.element(());
        let bystander_el = bystander.element(());
        let ctx_outer = ctx.clone();
        let host = Component::new("Host", move |cx, _: &()| {
            let (n, set_n) = cx.use_state(|| 0u32);
            let bump = Callback::new(move || set_n.update(|n| n + 1));
            let shown = n / 2;
            ctx_outer.provide(
                shown,
                Element::fragment([
                    reader_el.clone(),
                    bystander_el.clone(),
                    Element::button("bump", bump),
                ]),
            )
        });
        let mut runtime = Runtime::mount(host.element(())).unwrap();
        runtime.click("bump").unwrap();
        // 1 / 2 == 0: published value unchanged.
        assert_eq!(runtime.stats().invocations("Host"), 2);
        assert_eq!(runtime.stats().invocations("Reader"), 1);
        runtime.click("bump").unwrap();
        assert_eq!(runtime.stats().invocations("Reader"), 2);
        assert_eq!(runtime.stats().invocations("Bystander"), 1);
        assert!(runtime.frame().has_line("1"));
    }

    #[test]
    fn removed_subtree_drops_state() {
        let comp = Component::new("Stateful", |cx, _: &()| {
            let (v, _) = cx.use_state(|| 5u8);
            Element::text(v.to_string())
        });
        let mut runtime = Runtime::mount(comp.element(())).unwrap();
        assert_eq!(runtime.mounted(), 1);
        runtime.set_root(Element::Empty).unwrap();
        assert_eq!(runtime.mounted(), 0);
        assert!(runtime.frame().is_empty());
    }

    #[test]
    fn memo_recomputes_on_dep_change_only() {
        let computed = Rc::new(Cell::new(0u32));
        let computed_in = Rc::clone(&computed);
        let comp = Component::new("Memo", move |cx, n: &u32| {
            let c = Rc::clone(&computed_in);
            let doubled = cx.use_memo(*n, move |n| {
                c.set(c.get() + 1);
                n * 2
            });
            Element::text(doubled.to_string())
        });
        let mut runtime = Runtime::mount(comp.element(1)).unwrap();
        runtime.set_root(comp.element(1)).unwrap();
        assert_eq!(computed.get(), 1);
        runtime.set_root(comp.element(4)).unwrap();
        assert_eq!(computed.get(), 2);
        assert!(runtime.frame().has_line("8"));
    }

    #[test]
    fn effects_run_after_commit_and_may_write_state() {
        let comp = Component::new("Effect", |cx, _: &()| {
            let (v, set_v) = cx.use_state(|| 0u8);
            cx.use_effect((), move || set_v.set(9));
            Element::text(v.to_string())
        });
        let mut runtime = Runtime::new(comp.element(()));
        runtime.render().unwrap();
        assert!(runtime.frame().has_line("9"));
        assert_eq!(runtime.passes(), 2);
    }

    #[test]
    fn runaway_effects_hit_pass_budget() {
        let comp = Component::new("Loop", |cx, _: &()| {
            let (v, set_v) = cx.use_state(|| 0u64);
            cx.use_effect(v, move || set_v.set(v + 1));
            Element::Empty
        });
        let mut runtime = Runtime::with_config(comp.element(()), RuntimeConfig::default().with_max_passes(5));
        let err = runtime.render().unwrap_err();
        assert!(matches!(err, HostError::Unsettled { passes: 5 }));
    }

    #[test]
    fn click_without_target_fails() {
        let mut runtime = Runtime::mount(Element::text("nothing")).unwrap();
        assert!(matches!(
            runtime.click("go"),
            Err(HostError::NoSuchTarget { .. })
        ));
    }
}
