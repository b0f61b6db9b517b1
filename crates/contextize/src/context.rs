#![forbid(unsafe_code)]

//! Single-channel context: a producer hook plus one channel.

use std::fmt;

use contextize_core::{Component, Element, Scope};

use crate::channel::Channel;

/// Props of a provider component: the producer's input plus the subtree.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderProps<P> {
    /// Input handed to the producer.
    pub props: P,
    /// Subtree that sees the produced value.
    pub children: Element,
}

/// A provider component: runs a producer and publishes its result.
pub struct Provider<P> {
    component: Component<ProviderProps<P>>,
}

impl<P> Clone for Provider<P> {
    fn clone(&self) -> Self {
        Self {
            component: self.component.clone(),
        }
    }
}

impl<P> fmt::Debug for Provider<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider").field(&self.component).finish()
    }
}

impl<P: PartialEq + 'static> Provider<P> {
    /// Build a provider that publishes `producer(props)` on `channel`.
    ///
    /// The producer runs whenever the provider component is invoked, so hooks
    /// called inside it belong to the provider instance.
    pub fn new<C: Clone + PartialEq + 'static>(
        name: &str,
        channel: Channel<C>,
        producer: impl Fn(&mut Scope<'_>, &P) -> C + 'static,
    ) -> Self {
        let component = Component::new(name, move |cx, p: &ProviderProps<P>| {
            let value = producer(cx, &p.props);
            channel.publish(value, p.children.clone())
        });
        Self { component }
    }

    /// Mount the provider over `children`.
    #[must_use]
    pub fn mount(&self, props: P, children: impl Into<Element>) -> Element {
        self.component.element(ProviderProps {
            props,
            children: children.into(),
        })
    }
}

/// A provider/reader pair over one channel.
pub struct Contextized<C, P = ()> {
    channel: Channel<C>,
    provider: Provider<P>,
}

impl<C: Clone, P> Clone for Contextized<C, P> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            provider: self.provider.clone(),
        }
    }
}

impl<C: Clone + PartialEq + 'static, P> fmt::Debug for Contextized<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contextized")
            .field("context", &self.channel.context().id())
            .field("provider", &self.provider)
            .finish()
    }
}

/// Build a [`Contextized`] from a producer and the value read outside any
/// provider. The provider component is named `ContextProvider`; use
/// [`Contextized::named`] to tell several apart.
pub fn contextize<C, P>(
    producer: impl Fn(&mut Scope<'_>, &P) -> C + 'static,
    default: C,
) -> Contextized<C, P>
where
    C: Clone + PartialEq + 'static,
    P: PartialEq + 'static,
{
    Contextized::named("ContextProvider", producer, default)
}

impl<C, P> Contextized<C, P>
where
    C: Clone + PartialEq + 'static,
    P: PartialEq + 'static,
{
    /// Like [`contextize`], with an explicit provider component name.
    pub fn named(
        name: &str,
        producer: impl Fn(&mut Scope<'_>, &P) -> C + 'static,
        default: C,
    ) -> Self {
        let channel = Channel::new(default);
        let provider = Provider::new(name, channel.clone(), producer);
        Self { channel, provider }
    }

    /// Mount a provider over `children`.
    #[must_use]
    pub fn provider(&self, props: P, children: impl Into<Element>) -> Element {
        self.provider.mount(props, children)
    }

    /// Nearest enclosing produced value, or the default.
    pub fn use_value(&self, cx: &mut Scope<'_>) -> C {
        self.channel.read(cx)
    }

    /// The channel values are published on.
    #[must_use]
    pub fn channel(&self) -> &Channel<C> {
        &self.channel
    }
}
