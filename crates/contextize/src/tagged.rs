#![forbid(unsafe_code)]

//! Tagged distribution: one producer, many lazily created per-tag channels.
//!
//! [`tagged`] wraps a producer of a [`TaggedValue`] and owns:
//!
//! - one root channel carrying the full value,
//! - a registry of per-tag entries, created the first time a tag is named,
//!   each holding a channel for that tag's narrowed payload and, once asked
//!   for, a guard component.
//!
//! # Addressing
//!
//! Members are resolved by name through [`Tagged::lookup`]:
//!
//! | name                | member                                   |
//! |---------------------|------------------------------------------|
//! | `Provider`          | the provider                             |
//! | `use`               | reader of the full value                 |
//! | `Switch`            | multi-tag conditional render             |
//! | `use<Tag>`          | reader of `<tag>`'s narrowed payload     |
//! | anything else       | guard for the lower-cased name           |
//!
//! Labels are compared case-insensitively by lower-casing; the public name
//! of a label upper-cases its first character (`dark` → `Dark`, `useDark`).
//!
//! # Invariants
//!
//! 1. The registry only grows, and a label maps to the same channel and guard
//!    for the lifetime of the `Tagged` handle and its clones.
//! 2. A tag channel carries `Some(rest)` only inside that tag's guard while
//!    the guard's tag is active. Everywhere else it reads `None`.
//! 3. Switching the active tag unmounts the old guard's publish in the same
//!    pass that mounts the new one, so no stale narrowed payload is visible.
//! 4. Unknown labels are never an error: their guard renders nothing and their
//!    reader yields `None`.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use contextize_core::{Component, Element, Scope};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::channel::Channel;
use crate::context::Provider;

/// Field holding the discriminant of a [`Record`].
pub const TAG_FIELD: &str = "tag";

// ─── Tagged values ───────────────────────────────────────────────────────────

/// A discriminated value: a tag plus a payload whose shape depends on it.
pub trait TaggedValue: Clone + PartialEq + 'static {
    /// Payload without the discriminant.
    type Rest: Clone + PartialEq + 'static;

    /// Active tag.
    fn tag(&self) -> Cow<'_, str>;

    /// Everything except the tag.
    fn rest(&self) -> Self::Rest;
}

/// A dynamically shaped tagged value: a JSON object whose `"tag"` field holds
/// the discriminant.
///
/// The narrowed payload is the object without `"tag"`. Fields a variant does
/// not define are simply absent from it; a field present with `null` stays
/// present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// A record with only a tag.
    pub fn new(tag: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(TAG_FIELD.to_string(), Value::String(tag.into()));
        Self(fields)
    }

    /// Add or replace a payload field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Field lookup, including `"tag"`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Interpret a JSON value as a record. Non-objects yield `None`.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// All fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TaggedValue for Record {
    type Rest = Map<String, Value>;

    fn tag(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.0.get(TAG_FIELD).and_then(Value::as_str).unwrap_or(""))
    }

    fn rest(&self) -> Self::Rest {
        let mut rest = self.0.clone();
        rest.remove(TAG_FIELD);
        rest
    }
}

// ─── Naming ──────────────────────────────────────────────────────────────────

/// Canonical registry key for a tag name.
#[must_use]
pub fn normalize(tag: &str) -> String {
    tag.to_lowercase()
}

/// Public guard name of a label: first character upper-cased.
#[must_use]
pub fn public_name(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Public reader name of a label, e.g. `useDark`.
#[must_use]
pub fn reader_name(label: &str) -> String {
    format!("use{}", public_name(label))
}

// ─── Handles ─────────────────────────────────────────────────────────────────

/// Reader of one tag's narrowed payload.
pub struct TagReader<V: TaggedValue> {
    label: Rc<str>,
    channel: Channel<Option<V::Rest>>,
}

impl<V: TaggedValue> Clone for TagReader<V> {
    fn clone(&self) -> Self {
        Self {
            label: Rc::clone(&self.label),
            channel: self.channel.clone(),
        }
    }
}

impl<V: TaggedValue> fmt::Debug for TagReader<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagReader")
            .field("label", &self.label)
            .field("context", &self.channel.context().id())
            .finish()
    }
}

impl<V: TaggedValue> TagReader<V> {
    /// The narrowed payload, `Some` only while rendered inside this tag's
    /// active guard.
    pub fn read(&self, cx: &mut Scope<'_>) -> Option<V::Rest> {
        self.channel.read(cx)
    }

    /// Lower-cased label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Public name, e.g. `useDark`.
    #[must_use]
    pub fn name(&self) -> String {
        reader_name(&self.label)
    }

    /// Whether both readers are backed by the same channel.
    #[must_use]
    pub fn same_channel(&self, other: &Self) -> bool {
        self.channel.context().id() == other.channel.context().id()
    }
}

/// Conditional-render view bound to one tag.
pub struct Guard<V: TaggedValue> {
    label: Rc<str>,
    component: Component<Element>,
    _value: std::marker::PhantomData<fn() -> V>,
}

impl<V: TaggedValue> Clone for Guard<V> {
    fn clone(&self) -> Self {
        Self {
            label: Rc::clone(&self.label),
            component: self.component.clone(),
            _value: std::marker::PhantomData,
        }
    }
}

impl<V: TaggedValue> fmt::Debug for Guard<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("label", &self.label)
            .field("component", &self.component)
            .finish()
    }
}

impl<V: TaggedValue> Guard<V> {
    /// Render `children` only while the active tag equals this guard's label.
    #[must_use]
    pub fn wrap(&self, children: impl Into<Element>) -> Element {
        self.component.element(children.into())
    }

    /// Lower-cased label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Public name, e.g. `Dark`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.component.name()
    }

    /// Whether both handles are the same guard component.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.component.ptr_eq(&other.component)
    }
}

/// Props of the [`Tagged::switch`] view.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchProps {
    /// Lower-cased labels that enable the children.
    pub tags: Vec<String>,
    /// Conditionally rendered subtree.
    pub children: Element,
}

/// Multi-tag conditional render without narrowing.
#[derive(Clone, Debug)]
pub struct Switch {
    component: Component<SwitchProps>,
}

impl Switch {
    /// Render `children` iff the active tag is one of `tags`.
    #[must_use]
    pub fn mount<I, S>(&self, tags: I, children: impl Into<Element>) -> Element
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.component.element(SwitchProps {
            tags: tags.into_iter().map(|t| normalize(t.as_ref())).collect(),
            children: children.into(),
        })
    }
}

/// Result of [`Tagged::lookup`].
pub enum Member<V: TaggedValue, P> {
    /// `Provider`.
    Provider(Provider<P>),
    /// `use`: the root channel.
    Use(Channel<Option<V>>),
    /// `Switch`.
    Switch(Switch),
    /// `use<Tag>`.
    Reader(TagReader<V>),
    /// `<Tag>`.
    Guard(Guard<V>),
}

impl<V: TaggedValue, P> fmt::Debug for Member<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(p) => f.debug_tuple("Provider").field(p).finish(),
            Self::Use(_) => f.write_str("Use"),
            Self::Switch(s) => f.debug_tuple("Switch").field(s).finish(),
            Self::Reader(r) => f.debug_tuple("Reader").field(r).finish(),
            Self::Guard(g) => f.debug_tuple("Guard").field(g).finish(),
        }
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

struct TagEntry<V: TaggedValue> {
    label: Rc<str>,
    channel: Channel<Option<V::Rest>>,
    guard: Option<Guard<V>>,
}

struct Registry<V: TaggedValue> {
    entries: AHashMap<String, TagEntry<V>>,
    order: Vec<Rc<str>>,
}

impl<V: TaggedValue> Registry<V> {
    fn new() -> Self {
        Self {
            entries: AHashMap::new(),
            order: Vec::new(),
        }
    }

    fn entry(&mut self, label: String) -> &mut TagEntry<V> {
        let order = &mut self.order;
        self.entries.entry(label).or_insert_with_key(|label| {
            let label: Rc<str> = Rc::from(label.as_str());
            debug!(tag = %label, "tagged.register");
            order.push(Rc::clone(&label));
            TagEntry {
                label,
                channel: Channel::new(None),
                guard: None,
            }
        })
    }
}

fn build_guard<V: TaggedValue>(
    root: &Channel<Option<V>>,
    label: &Rc<str>,
    channel: &Channel<Option<V::Rest>>,
) -> Guard<V> {
    let root = root.clone();
    let channel = channel.clone();
    let bound = Rc::clone(label);
    let component = Component::new(public_name(label), move |cx, children: &Element| {
        let value = root.read(cx);
        let active = value.as_ref().is_some_and(|v| normalize(&v.tag()) == *bound);
        let logged = Rc::clone(&bound);
        cx.use_effect(active, move || debug!(tag = %logged, active, "tagged.guard"));
        match value {
            Some(value) if active => channel.publish(Some(value.rest()), children.clone()),
            _ => Element::Empty,
        }
    });
    Guard {
        label: Rc::clone(label),
        component,
        _value: std::marker::PhantomData,
    }
}

// ─── Tagged ──────────────────────────────────────────────────────────────────

/// Tagged distribution over one producer. See the [module docs](self).
///
/// Clones share the registry.
pub struct Tagged<V: TaggedValue, P = ()> {
    root: Channel<Option<V>>,
    provider: Provider<P>,
    switch: Switch,
    registry: Rc<RefCell<Registry<V>>>,
}

impl<V: TaggedValue, P> Clone for Tagged<V, P> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            provider: self.provider.clone(),
            switch: self.switch.clone(),
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<V: TaggedValue, P> fmt::Debug for Tagged<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("Tagged")
            .field("root", &self.root.context().id())
            .field("labels", &registry.order)
            .finish()
    }
}

/// Build a [`Tagged`] distribution from a producer, with the provider
/// component named `TaggedProvider`.
///
/// The producer runs inside the provider component, so it may use hooks.
/// Use [`Tagged::named`] when several distributions share one tree.
pub fn tagged<V, P>(producer: impl Fn(&mut Scope<'_>, &P) -> V + 'static) -> Tagged<V, P>
where
    V: TaggedValue,
    P: PartialEq + 'static,
{
    Tagged::named("TaggedProvider", producer)
}

impl<V, P> Tagged<V, P>
where
    V: TaggedValue,
    P: PartialEq + 'static,
{
    /// Like [`tagged`], with an explicit provider component name. The switch
    /// component is named `<name>.Switch`.
    pub fn named(name: &str, producer: impl Fn(&mut Scope<'_>, &P) -> V + 'static) -> Self {
        let root: Channel<Option<V>> = Channel::new(None);
        let provider = Provider::new(name, root.clone(), move |cx, props: &P| {
            Some(producer(cx, props))
        });
        let switch_root = root.clone();
        let switch = Switch {
            component: Component::new(format!("{name}.Switch"), move |cx, props: &SwitchProps| {
                let active = switch_root
                    .read(cx)
                    .is_some_and(|v| props.tags.contains(&normalize(&v.tag())));
                if active {
                    props.children.clone()
                } else {
                    Element::Empty
                }
            }),
        };
        Self {
            root,
            provider,
            switch,
            registry: Rc::new(RefCell::new(Registry::new())),
        }
    }

    /// Mount the provider: run the producer with `props` and publish the
    /// result to `children`.
    #[must_use]
    pub fn provider(&self, props: P, children: impl Into<Element>) -> Element {
        self.provider.mount(props, children)
    }

    /// The full current value, `None` outside any provider.
    pub fn use_value(&self, cx: &mut Scope<'_>) -> Option<V> {
        self.root.read(cx)
    }

    /// Render `children` iff the active tag is one of `tags`.
    #[must_use]
    pub fn switch<I, S>(&self, tags: I, children: impl Into<Element>) -> Element
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.switch.mount(tags, children)
    }

    /// Reader for `tag`'s narrowed payload, registering `tag` on first use.
    pub fn resolve_reader(&self, tag: &str) -> TagReader<V> {
        let mut registry = self.registry.borrow_mut();
        let entry = registry.entry(normalize(tag));
        TagReader {
            label: Rc::clone(&entry.label),
            channel: entry.channel.clone(),
        }
    }

    /// Guard for `tag`, registering `tag` and building its guard on first use.
    pub fn resolve_guard(&self, tag: &str) -> Guard<V> {
        let mut registry = self.registry.borrow_mut();
        let entry = registry.entry(normalize(tag));
        if let Some(guard) = &entry.guard {
            return guard.clone();
        }
        let guard = build_guard(&self.root, &entry.label, &entry.channel);
        debug!(tag = %entry.label, name = guard.name(), "tagged.guard_created");
        entry.guard = Some(guard.clone());
        guard
    }

    /// Resolve a member by its public name.
    pub fn lookup(&self, name: &str) -> Member<V, P> {
        match name {
            "Provider" => Member::Provider(self.provider.clone()),
            "use" => Member::Use(self.root.clone()),
            "Switch" => Member::Switch(self.switch.clone()),
            _ => match name.strip_prefix("use") {
                Some(tag) if !tag.is_empty() => Member::Reader(self.resolve_reader(tag)),
                _ => Member::Guard(self.resolve_guard(name)),
            },
        }
    }

    /// Registered labels in first-reference order.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.registry
            .borrow()
            .order
            .iter()
            .map(|l| l.to_string())
            .collect()
    }

    /// Channel carrying the full value.
    #[must_use]
    pub fn root(&self) -> &Channel<Option<V>> {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contextize_core::Runtime;
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq)]
    enum Mode {
        Light,
        Dark { contrast: u8 },
    }

    impl TaggedValue for Mode {
        type Rest = Option<u8>;

        fn tag(&self) -> Cow<'_, str> {
            match self {
                Self::Light => Cow::Borrowed("light"),
                Self::Dark { .. } => Cow::Borrowed("dark"),
            }
        }

        fn rest(&self) -> Self::Rest {
            match self {
                Self::Light => None,
                Self::Dark { contrast } => Some(*contrast),
            }
        }
    }

    fn fixed(mode: Mode) -> Tagged<Mode> {
        tagged(move |_cx, _: &()| mode.clone())
    }

    #[test]
    fn naming_scheme() {
        assert_eq!(normalize("Dark"), "dark");
        assert_eq!(public_name("dark"), "Dark");
        assert_eq!(public_name(""), "");
        assert_eq!(reader_name("dark"), "useDark");
    }

    #[test]
    fn lookup_dispatch() {
        let t = fixed(Mode::Light);
        assert!(matches!(t.lookup("Provider"), Member::Provider(_)));
        assert!(matches!(t.lookup("use"), Member::Use(_)));
        assert!(matches!(t.lookup("Switch"), Member::Switch(_)));
        match t.lookup("useDark") {
            Member::Reader(r) => assert_eq!(r.label(), "dark"),
            other => panic!("expected reader, got {other:?}"),
        }
        match t.lookup("Light") {
            Member::Guard(g) => {
                assert_eq!(g.label(), "light");
                assert_eq!(g.name(), "Light");
            }
            other => panic!("expected guard, got {other:?}"),
        }
        // Capital U does not select a reader.
        match t.lookup("User") {
            Member::Guard(g) => assert_eq!(g.label(), "user"),
            other => panic!("expected guard, got {other:?}"),
        }
        assert_eq!(t.labels(), vec!["dark", "light", "user"]);
    }

    #[test]
    fn registry_is_memoized_and_case_insensitive() {
        let t = fixed(Mode::Light);
        let a = t.resolve_guard("Dark");
        let b = t.resolve_guard("dark");
        assert!(a.ptr_eq(&b));
        let r1 = t.resolve_reader("DARK");
        let r2 = t.clone().resolve_reader("dark");
        assert!(r1.same_channel(&r2));
        assert_eq!(t.labels(), vec!["dark"]);
    }

    #[test]
    fn guard_renders_only_for_active_tag() {
        let t = fixed(Mode::Dark { contrast: 3 });
        let root = t.provider(
            (),
            Element::fragment([
                t.resolve_guard("dark").wrap(Element::host("p", [Element::text("Dark Mode!")])),
                t.resolve_guard("light").wrap(Element::host("p", [Element::text("Light Mode!")])),
            ]),
        );
        let runtime = Runtime::mount(root).unwrap();
        assert_eq!(runtime.frame().lines(), vec!["Dark Mode!"]);
    }

    #[test]
    fn narrowed_reader_inside_and_outside_guard() {
        let t = fixed(Mode::Dark { contrast: 7 });
        let reader = t.resolve_reader("dark");
        let show = Component::new("Show", move |cx, _: &()| {
            let text = match reader.read(cx) {
                Some(rest) => format!("{rest:?}"),
                None => "unset".to_string(),
            };
            Element::host("p", [Element::text(text)])
        });
        let root = t.provider(
            (),
            Element::fragment([t.resolve_guard("dark").wrap(show.element(())), show.element(())]),
        );
        let runtime = Runtime::mount(root).unwrap();
        assert_eq!(runtime.frame().lines(), vec!["Some(7)", "unset"]);
    }

    #[test]
    fn unmounted_root_reads_none() {
        let t = fixed(Mode::Light);
        let t_in = t.clone();
        let view = Component::new("View", move |cx, _: &()| {
            Element::text(format!("{:?}", t_in.use_value(cx)))
        });
        let runtime = Runtime::mount(view.element(())).unwrap();
        assert!(runtime.frame().has_line("None"));
    }

    #[test]
    fn switching_tags_swaps_guards_and_drops_stale_payload() {
        let t: Tagged<Mode, Option<u8>> = tagged(|_cx, contrast: &Option<u8>| match contrast {
            Some(contrast) => Mode::Dark { contrast: *contrast },
            None => Mode::Light,
        });
        let dark_reader = t.resolve_reader("dark");
        let view = Component::new("View", move |cx, _: &()| {
            Element::host("p", [Element::text(format!("dark {:?}", dark_reader.read(cx)))])
        });
        let still = Component::new("Still", |_cx, _: &()| Element::host("p", [Element::text("still")]));
        let tree = |contrast: Option<u8>| {
            t.provider(
                contrast,
                Element::fragment([
                    t.resolve_guard("Dark").wrap(view.element(())),
                    t.resolve_guard("Light").wrap(Element::host("p", [Element::text("light")])),
                    still.element(()),
                ]),
            )
        };

        let mut runtime = Runtime::mount(tree(Some(2))).unwrap();
        assert_eq!(runtime.frame().lines(), vec!["dark Some(Some(2))", "still"]);

        runtime.set_root(tree(Some(5))).unwrap();
        assert_eq!(runtime.frame().lines(), vec!["dark Some(Some(5))", "still"]);

        runtime.set_root(tree(None)).unwrap();
        assert_eq!(runtime.frame().lines(), vec!["light", "still"]);
        assert_eq!(runtime.stats().invocations("View"), 2);
        assert_eq!(runtime.stats().invocations("Still"), 1);
    }

    #[test]
    fn switch_renders_for_any_listed_tag() {
        let t: Tagged<Mode, bool> = tagged(|_cx, dark: &bool| {
            if *dark { Mode::Dark { contrast: 0 } } else { Mode::Light }
        });
        let tree = |dark: bool| {
            t.provider(
                dark,
                Element::fragment([
                    t.switch(["DARK", "dim"], Element::host("p", [Element::text("shaded")])),
                    t.switch(["light"], Element::host("p", [Element::text("bright")])),
                    t.switch(Vec::<&str>::new(), Element::host("p", [Element::text("never")])),
                ]),
            )
        };
        let mut runtime = Runtime::mount(tree(true)).unwrap();
        assert_eq!(runtime.frame().lines(), vec!["shaded"]);
        runtime.set_root(tree(false)).unwrap();
        assert_eq!(runtime.frame().lines(), vec!["bright"]);
        // Switch never registers tags.
        assert!(t.labels().is_empty());
    }

    #[test]
    fn unknown_tag_guard_renders_nothing() {
        let t = fixed(Mode::Light);
        let reader = t.resolve_reader("sepia");
        let view = Component::new("View", move |cx, _: &()| {
            Element::text(format!("{:?}", reader.read(cx)))
        });
        let root = t.provider(
            (),
            Element::fragment([t.resolve_guard("sepia").wrap(Element::text("hidden")), view.element(())]),
        );
        let runtime = Runtime::mount(root).unwrap();
        assert_eq!(runtime.frame().lines(), vec!["None"]);
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Clocked {
        mode: Mode,
        tick: u32,
    }

    impl TaggedValue for Clocked {
        type Rest = Option<u8>;

        fn tag(&self) -> Cow<'_, str> {
            self.mode.tag()
        }

        fn rest(&self) -> Self::Rest {
            self.mode.rest()
        }
    }

    #[test]
    fn guarded_consumer_skips_changes_outside_its_payload() {
        let t: Tagged<Clocked, Clocked> = tagged(|_cx, v: &Clocked| v.clone());
        let reader = t.resolve_reader("dark");
        let consumer = Component::new("Consumer", move |cx, _: &()| {
            Element::host("p", [Element::text(format!("{:?}", reader.read(cx)))])
        });
        let tree = |tick: u32, contrast: u8| {
            t.provider(
                Clocked {
                    mode: Mode::Dark { contrast },
                    tick,
                },
                t.resolve_guard("dark").wrap(consumer.element(())),
            )
        };

        let mut runtime = Runtime::mount(tree(0, 4)).unwrap();
        runtime.set_root(tree(1, 4)).unwrap();
        runtime.set_root(tree(2, 4)).unwrap();
        assert_eq!(runtime.stats().invocations("Dark"), 3);
        assert_eq!(runtime.stats().invocations("Consumer"), 1);

        runtime.set_root(tree(3, 9)).unwrap();
        assert_eq!(runtime.stats().invocations("Consumer"), 2);
        assert_eq!(runtime.frame().lines(), vec!["Some(Some(9))"]);
    }

    #[test]
    fn provider_names_keep_render_stats_apart() {
        let mode: Tagged<Mode> = Tagged::named("ModeProvider", |_cx, _: &()| Mode::Light);
        let other: Tagged<Mode, bool> = tagged(|_cx, dark: &bool| {
            if *dark { Mode::Dark { contrast: 0 } } else { Mode::Light }
        });
        let tree = |dark: bool| {
            other.provider(
                dark,
                mode.provider((), other.switch(["dark"], Element::text("on"))),
            )
        };
        let mut runtime = Runtime::mount(tree(false)).unwrap();
        runtime.set_root(tree(true)).unwrap();
        assert_eq!(runtime.stats().invocations("ModeProvider"), 1);
        assert_eq!(runtime.stats().invocations("TaggedProvider"), 2);
        assert_eq!(runtime.stats().invocations("TaggedProvider.Switch"), 2);
        assert!(runtime.frame().has_line("on"));
    }

    #[test]
    fn record_narrowing_drops_tag_only() {
        let record = Record::new("dark").with("contrast", 3).with("note", Value::Null);
        assert_eq!(record.tag(), "dark");
        let rest = record.rest();
        assert_eq!(Value::Object(rest), json!({"contrast": 3, "note": null}));
        assert!(Record::from_value(json!([1])).is_none());
        assert_eq!(Record::from_value(json!({})).unwrap().tag(), "");
    }
}
