#![forbid(unsafe_code)]

//! Reactive cells backing hook state and context slots.
//!
//! [`Observable`] is a versioned `Rc<RefCell<..>>` cell. Writers call
//! `set`/`update`; listeners registered through `subscribe` hold a
//! [`Subscription`] and stop hearing about writes once it is dropped.
//!
//! The runtime keeps one cell per `use_state` hook, whose listener marks the
//! owning instance dirty, and one per mounted provider, whose version lets a
//! reader tell whether the value it saw last pass is still current.
//!
//! # Invariants
//!
//! 1. The version moves only when a write changes the value.
//! 2. Listeners fire in the order they subscribed.
//! 3. A dropped subscription is never called again.

pub mod observable;

pub use observable::{Observable, Subscription};
