#![forbid(unsafe_code)]

//! View descriptions.
//!
//! An [`Element`] is an immutable description of what a subtree should look
//! like. Components return elements; the [`Runtime`](crate::Runtime) walks
//! them, invokes component bodies when needed and lowers the result into a
//! [`Frame`](crate::Frame).
//!
//! Elements compare structurally. Component elements compare by component
//! identity plus props, which is what lets the runtime skip re-invoking a
//! component whose parent re-rendered with identical input.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::ContextId;
use crate::scope::Scope;

// ─── Type-erased values ──────────────────────────────────────────────────────

/// Object-safe equality over `Any`.
pub(crate) trait AnyValue: Any {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn AnyValue) -> bool;
}

impl<T: Any + PartialEq> AnyValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn AnyValue) -> bool {
        other.as_any().downcast_ref::<T>() == Some(self)
    }
}

/// A shared, type-erased value with structural equality.
#[derive(Clone)]
pub(crate) struct Erased(Rc<dyn AnyValue>);

impl Erased {
    pub(crate) fn new<T: Any + PartialEq>(value: T) -> Self {
        Self(Rc::new(value))
    }

    pub(crate) fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub(crate) fn as_any(&self) -> &dyn Any {
        self.0.as_any()
    }
}

impl PartialEq for Erased {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0.dyn_eq(&*other.0)
    }
}

// ─── Callback ────────────────────────────────────────────────────────────────

/// A shared event handler. Two callbacks are equal iff they are the same
/// allocation.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn()>);

impl Callback {
    /// Wrap a closure.
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the handler.
    pub fn call(&self) {
        (self.0)();
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

// ─── Component ───────────────────────────────────────────────────────────────

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique component identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

type RenderFn = dyn Fn(&mut Scope<'_>, &dyn Any) -> Element;

pub(crate) struct ComponentInner {
    pub(crate) id: ComponentId,
    pub(crate) name: Rc<str>,
    pub(crate) render: Box<RenderFn>,
}

/// A reusable view function taking props of type `P`.
///
/// Each call to [`Component::new`] mints a fresh identity; clones share it.
/// Instances of the same component at the same tree position keep their
/// hook state across passes.
pub struct Component<P> {
    inner: Rc<ComponentInner>,
    _props: PhantomData<fn(&P)>,
}

impl<P> Clone for Component<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            _props: PhantomData,
        }
    }
}

impl<P> fmt::Debug for Component<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

impl<P: PartialEq + 'static> Component<P> {
    /// Create a component from a render function.
    pub fn new(
        name: impl Into<Rc<str>>,
        render: impl Fn(&mut Scope<'_>, &P) -> Element + 'static,
    ) -> Self {
        let render: Box<RenderFn> = Box::new(move |cx, props| match props.downcast_ref::<P>() {
            Some(props) => render(cx, props),
            None => Element::Empty,
        });
        Self {
            inner: Rc::new(ComponentInner {
                id: ComponentId::next(),
                name: name.into(),
                render,
            }),
            _props: PhantomData,
        }
    }

    /// Describe one instance of this component.
    #[must_use]
    pub fn element(&self, props: P) -> Element {
        Element::Component(ComponentElement {
            component: Rc::clone(&self.inner),
            props: Erased::new(props),
        })
    }

    /// Component identity.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.inner.id
    }

    /// Display name, used for render statistics and logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether both handles are the same component.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

// ─── Element ─────────────────────────────────────────────────────────────────

/// A host node such as `p`, `div` or `button`.
#[derive(Clone, Debug, PartialEq)]
pub struct HostElement {
    pub(crate) name: &'static str,
    pub(crate) children: Vec<Element>,
    pub(crate) on_click: Option<Callback>,
}

/// One instance of a [`Component`].
#[derive(Clone)]
pub struct ComponentElement {
    pub(crate) component: Rc<ComponentInner>,
    pub(crate) props: Erased,
}

impl PartialEq for ComponentElement {
    fn eq(&self, other: &Self) -> bool {
        self.component.id == other.component.id && self.props == other.props
    }
}

impl fmt::Debug for ComponentElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentElement")
            .field("name", &self.component.name)
            .field("id", &self.component.id)
            .finish_non_exhaustive()
    }
}

/// A context publish point, see [`Context::provide`](crate::Context::provide).
#[derive(Clone)]
pub struct ProvideElement {
    pub(crate) context: ContextId,
    pub(crate) value: Erased,
    pub(crate) children: Box<Element>,
}

impl PartialEq for ProvideElement {
    fn eq(&self, other: &Self) -> bool {
        self.context == other.context
            && self.value == other.value
            && self.children == other.children
    }
}

impl fmt::Debug for ProvideElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideElement")
            .field("context", &self.context)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Description of a view subtree.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Element {
    /// Renders nothing.
    #[default]
    Empty,
    /// A text leaf.
    Text(String),
    /// A host node with children.
    Host(HostElement),
    /// Siblings without a wrapping node.
    Fragment(Vec<Element>),
    /// A component instance.
    Component(ComponentElement),
    /// A context publish point.
    Provide(ProvideElement),
}

impl Element {
    /// A text leaf.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A host node.
    pub fn host(name: &'static str, children: impl IntoIterator<Item = Element>) -> Self {
        Self::Host(HostElement {
            name,
            children: children.into_iter().collect(),
            on_click: None,
        })
    }

    /// A `button` host node carrying a click handler.
    pub fn button(label: impl Into<String>, on_click: Callback) -> Self {
        Self::Host(HostElement {
            name: "button",
            children: vec![Self::text(label)],
            on_click: Some(on_click),
        })
    }

    /// Siblings without a wrapper.
    pub fn fragment(children: impl IntoIterator<Item = Element>) -> Self {
        Self::Fragment(children.into_iter().collect())
    }

    /// Whether this element renders nothing by itself.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Fragment(children) => children.iter().all(Self::is_empty),
            _ => false,
        }
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<Element>> for Element {
    fn from(children: Vec<Element>) -> Self {
        Self::Fragment(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_elements_compare_by_identity_and_props() {
        let a = Component::new("A", |_cx, n: &u32| Element::text(n.to_string()));
        let b = Component::new("B", |_cx, n: &u32| Element::text(n.to_string()));

        assert_eq!(a.element(1), a.element(1));
        assert_ne!(a.element(1), a.element(2));
        assert_ne!(a.element(1), b.element(1));
        assert_eq!(a.element(1), a.clone().element(1));
    }

    #[test]
    fn callbacks_compare_by_allocation() {
        let cb = Callback::new(|| {});
        assert_eq!(cb, cb.clone());
        assert_ne!(cb, Callback::new(|| {}));
    }

    #[test]
    fn host_elements_compare_structurally() {
        let cb = Callback::new(|| {});
        assert_eq!(
            Element::button("go", cb.clone()),
            Element::button("go", cb.clone())
        );
        assert_ne!(Element::button("go", cb.clone()), Element::button("stop", cb));
        assert_eq!(
            Element::host("p", [Element::text("x")]),
            Element::host("p", vec![Element::from("x")])
        );
    }

    #[test]
    fn empty_detection() {
        assert!(Element::Empty.is_empty());
        assert!(Element::fragment([Element::Empty, Element::fragment([])]).is_empty());
        assert!(!Element::text("").is_empty());
    }

    #[test]
    fn erased_equality_is_typed() {
        assert!(Erased::new(1u8) == Erased::new(1u8));
        assert!(Erased::new(1u8) != Erased::new(1u16));
        assert_eq!(Erased::new("x".to_string()).downcast_ref::<String>().map(String::as_str), Some("x"));
    }
}
