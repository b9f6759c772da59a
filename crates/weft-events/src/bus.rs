#![forbid(unsafe_code)]

//! Named-channel event bus with wildcard dispatch.
//!
//! # Design
//!
//! [`EventBus<P>`] maps channel names to ordered subscriber lists.
//! Handlers are stored as `Weak` function pointers; the strong `Rc` lives
//! inside the [`Subscription`] guard handed back to the subscriber, so
//! dropping the guard deactivates the handler. Dead entries are pruned
//! lazily during dispatch.
//!
//! A publish on channel `name` invokes, in order, the subscribers of
//! `name` (registration order), then the subscribers of the reserved
//! wildcard channel [`EV_ALL`]. The two passes are not deduplicated;
//! publishing on `"all"` itself therefore fires its handlers twice.
//!
//! # Invariants
//!
//! 1. Subscribers on one channel are invoked in registration order.
//! 2. The subscriber list is snapshotted before any handler runs, and no
//!    `RefCell` borrow is held during handler calls: a handler may
//!    subscribe, unsubscribe, or publish on the same bus without
//!    affecting the in-flight dispatch.
//! 3. An absent channel and a channel whose subscribers have all been
//!    dropped are both "no subscribers": publishing to either is a no-op.
//! 4. `off`/`off_all` are idempotent and never fail, even before the
//!    first `on`.
//!
//! # Failure Modes
//!
//! - **Empty channel name**: `publish("")` returns
//!   [`EventError::InvalidName`]. This is the only validated failure; it
//!   propagates to the caller and is never swallowed here.
//! - **Leaked guards**: a [`Subscription`] stored forever keeps its
//!   handler alive forever. That is the intended way to hold a permanent
//!   subscription; there is no other registry to clean up.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Reserved wildcard channel: subscribers on `"all"` are invoked for
/// every publish, after the exact-name subscribers.
pub const EV_ALL: &str = "all";

/// A handler stored as a strong `Rc` inside its [`Subscription`] guard,
/// handed to the bus as `Weak`.
type CallbackRc<P> = Rc<dyn Fn(&P)>;
type CallbackWeak<P> = Weak<dyn Fn(&P)>;

/// Errors from event dispatch.
///
/// Absence (a channel nobody subscribed, an `off` on an unknown name) is
/// never an error; only malformed publish input is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// `publish` was called with an empty channel name.
    InvalidName,
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName => write!(f, "publish expects a non-empty channel name"),
        }
    }
}

impl std::error::Error for EventError {}

/// Per-instance named-channel dispatcher.
///
/// `P` is the payload type passed by reference to every handler. The bus
/// itself is cheap to construct and carries no threads or queues; all
/// dispatch happens synchronously inside [`EventBus::publish`]/
/// [`EventBus::emit`].
pub struct EventBus<P: 'static> {
    channels: RefCell<HashMap<String, Vec<CallbackWeak<P>>>>,
}

impl<P: 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: 'static> fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.channels.borrow();
        let subscribers: usize = channels.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("channels", &channels.len())
            .field("subscribers", &subscribers)
            .finish()
    }
}

impl<P: 'static> EventBus<P> {
    /// Create a bus with no channels.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: RefCell::new(HashMap::new()),
        }
    }

    /// Subscribe `callback` to the channel `name`.
    ///
    /// Registrations on one channel are additive and fire in FIFO order.
    /// Subscribing to [`EV_ALL`] observes every publish. Context travels
    /// by closure capture; there is no separate receiver argument.
    ///
    /// Returns a [`Subscription`] guard. The handler stays active only
    /// while the guard is alive; dropping it unsubscribes (the dead entry
    /// is pruned on the next dispatch touching that channel).
    ///
    /// Channel names are not validated here: per the error taxonomy, only
    /// `publish` rejects malformed names, so a subscription to `""` is
    /// simply unreachable.
    pub fn on(&self, name: impl Into<String>, callback: impl Fn(&P) + 'static) -> Subscription {
        let strong: CallbackRc<P> = Rc::new(callback);
        let weak = Rc::downgrade(&strong);
        self.channels
            .borrow_mut()
            .entry(name.into())
            .or_default()
            .push(weak);
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Drop every subscriber of the channel `name`.
    ///
    /// Idempotent: unsubscribing a channel that was never subscribed is a
    /// warning-level event, not an error.
    pub fn off(&self, name: &str) {
        if self.channels.borrow_mut().remove(name).is_none() {
            tracing::warn!(channel = name, "off called on a channel that was never subscribed");
        }
    }

    /// Drop every subscriber of every channel. Safe before the first `on`.
    pub fn off_all(&self) {
        self.channels.borrow_mut().clear();
    }

    /// Publish `payload` on the channel `name`.
    ///
    /// Invokes the exact-name subscribers in registration order, then the
    /// [`EV_ALL`] subscribers. Both sets fire for a single publish and are
    /// not deduplicated.
    ///
    /// # Errors
    ///
    /// [`EventError::InvalidName`] when `name` is empty. Nothing is
    /// dispatched in that case.
    pub fn publish(&self, name: &str, payload: &P) -> Result<(), EventError> {
        if name.is_empty() {
            return Err(EventError::InvalidName);
        }
        self.emit(name, payload);
        Ok(())
    }

    /// Publish without the channel-name check.
    ///
    /// For callers whose channel names are compile-time constants (the
    /// collection's lifecycle channels, for instance) the `publish` check
    /// can never fire; `emit` is the infallible entry point for them.
    /// Dispatch semantics are identical to [`EventBus::publish`].
    pub fn emit(&self, name: &str, payload: &P) {
        // Snapshot the live handlers first so handlers can freely mutate
        // the bus, and prune dead weak refs while the borrow is held.
        let callbacks: Vec<CallbackRc<P>> = {
            let mut channels = self.channels.borrow_mut();
            let mut live = Vec::new();
            if let Some(handlers) = channels.get_mut(name) {
                handlers.retain(|w| w.strong_count() > 0);
                live.extend(handlers.iter().filter_map(Weak::upgrade));
            }
            if let Some(handlers) = channels.get_mut(EV_ALL) {
                handlers.retain(|w| w.strong_count() > 0);
                live.extend(handlers.iter().filter_map(Weak::upgrade));
            }
            live
        };

        tracing::trace!(channel = name, handlers = callbacks.len(), "dispatch");

        for callback in &callbacks {
            callback(payload);
        }
    }

    /// Number of entries currently registered on `name`, including dead
    /// ones not yet pruned by a dispatch.
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.channels.borrow().get(name).map_or(0, Vec::len)
    }
}

/// RAII guard for a subscribed handler.
///
/// Dropping the `Subscription` causes the handler to become unreachable
/// (the strong `Rc` is dropped, so the `Weak` in the channel list fails
/// to upgrade on the next dispatch). It carries no type parameter so
/// guards for buses of different payload types can live side by side.
pub struct Subscription {
    /// Type-erased strong reference keeping the handler `Rc` alive.
    _guard: Box<dyn std::any::Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn handler_fires_per_publish() {
        let bus: EventBus<()> = EventBus::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);

        let _sub = bus.on("incr", move |_| count_clone.set(count_clone.get() + 1));

        bus.publish("incr", &()).unwrap();
        bus.publish("incr", &()).unwrap();
        bus.publish("incr", &()).unwrap();
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn only_matching_channel_fires() {
        let bus: EventBus<()> = EventBus::new();
        let a = Rc::new(Cell::new(0u32));
        let b = Rc::new(Cell::new(0u32));
        let a_clone = Rc::clone(&a);
        let b_clone = Rc::clone(&b);

        let _sub_a = bus.on("event_1", move |_| a_clone.set(a_clone.get() + 1));
        let _sub_b = bus.on("event_2", move |_| b_clone.set(b_clone.get() + 1));

        bus.publish("event_1", &()).unwrap();
        bus.publish("event_1", &()).unwrap();

        assert_eq!(a.get(), 2);
        assert_eq!(b.get(), 0);
    }

    #[test]
    fn dispatch_order_is_registration_order() {
        let bus: EventBus<()> = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log1 = Rc::clone(&log);
        let _s1 = bus.on("x", move |_| log1.borrow_mut().push('A'));

        let log2 = Rc::clone(&log);
        let _s2 = bus.on("x", move |_| log2.borrow_mut().push('B'));

        let log3 = Rc::clone(&log);
        let _s3 = bus.on("x", move |_| log3.borrow_mut().push('C'));

        bus.publish("x", &()).unwrap();
        assert_eq!(*log.borrow(), vec!['A', 'B', 'C']);
    }

    #[test]
    fn wildcard_observes_every_channel() {
        let bus: EventBus<()> = EventBus::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);

        let _sub = bus.on(EV_ALL, move |_| count_clone.set(count_clone.get() + 1));

        bus.publish("some_event_1", &()).unwrap();
        bus.publish("some_event_2", &()).unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn exact_subscribers_fire_before_wildcard() {
        let bus: EventBus<()> = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let wild = Rc::clone(&log);
        let _s_all = bus.on(EV_ALL, move |_| wild.borrow_mut().push("all"));

        let exact = Rc::clone(&log);
        let _s_x = bus.on("x", move |_| exact.borrow_mut().push("x"));

        bus.publish("x", &()).unwrap();
        assert_eq!(*log.borrow(), vec!["x", "all"]);
    }

    #[test]
    fn wildcard_and_exact_are_not_deduplicated() {
        let bus: EventBus<()> = EventBus::new();
        let count = Rc::new(Cell::new(0u32));

        let c1 = Rc::clone(&count);
        let _s1 = bus.on("x", move |_| c1.set(c1.get() + 1));
        let c2 = Rc::clone(&count);
        let _s2 = bus.on(EV_ALL, move |_| c2.set(c2.get() + 1));

        bus.publish("x", &()).unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn publishing_on_all_fires_its_handlers_twice() {
        // "all" is matched once as the exact channel and once as the
        // wildcard pass; the passes are not deduplicated.
        let bus: EventBus<()> = EventBus::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);

        let _sub = bus.on(EV_ALL, move |_| count_clone.set(count_clone.get() + 1));

        bus.publish(EV_ALL, &()).unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn empty_name_is_rejected() {
        let bus: EventBus<()> = EventBus::new();
        assert_eq!(bus.publish("", &()), Err(EventError::InvalidName));
    }

    #[test]
    fn publish_without_subscribers_is_ok() {
        let bus: EventBus<u32> = EventBus::new();
        assert_eq!(bus.publish("nobody-listens", &7), Ok(()));
    }

    #[test]
    fn payload_reaches_handlers() {
        let bus: EventBus<String> = EventBus::new();
        let seen = Rc::new(RefCell::new(String::new()));
        let seen_clone = Rc::clone(&seen);

        let _sub = bus.on("named", move |payload: &String| {
            seen_clone.borrow_mut().clone_from(payload);
        });

        bus.publish("named", &"hello".to_string()).unwrap();
        assert_eq!(*seen.borrow(), "hello");
    }

    #[test]
    fn off_removes_only_the_named_channel() {
        let bus: EventBus<()> = EventBus::new();
        let a = Rc::new(Cell::new(0u32));
        let b = Rc::new(Cell::new(0u32));
        let a_clone = Rc::clone(&a);
        let b_clone = Rc::clone(&b);

        let _sub_a = bus.on("event_1", move |_| a_clone.set(a_clone.get() + 1));
        let _sub_b = bus.on("event_2", move |_| b_clone.set(b_clone.get() + 1));

        bus.publish("event_1", &()).unwrap();
        bus.publish("event_2", &()).unwrap();
        bus.publish("event_2", &()).unwrap();
        assert_eq!((a.get(), b.get()), (1, 2));

        bus.off("event_2");

        bus.publish("event_1", &()).unwrap();
        bus.publish("event_1", &()).unwrap();
        bus.publish("event_2", &()).unwrap();
        assert_eq!((a.get(), b.get()), (3, 2));
    }

    #[test]
    fn off_all_removes_every_channel() {
        let bus: EventBus<()> = EventBus::new();
        let a = Rc::new(Cell::new(0u32));
        let b = Rc::new(Cell::new(0u32));
        let a_clone = Rc::clone(&a);
        let b_clone = Rc::clone(&b);

        let _sub_a = bus.on("event_1", move |_| a_clone.set(a_clone.get() + 1));
        let _sub_b = bus.on("event_2", move |_| b_clone.set(b_clone.get() + 1));

        bus.publish("event_1", &()).unwrap();
        bus.off_all();

        bus.publish("event_1", &()).unwrap();
        bus.publish("event_2", &()).unwrap();
        assert_eq!((a.get(), b.get()), (1, 0));
    }

    #[test]
    fn off_before_on_never_panics() {
        let bus: EventBus<()> = EventBus::new();
        bus.off_all();
        bus.off_all();
        bus.off("some_event");
        bus.off("some_event");
    }

    #[test]
    fn dropped_guard_deactivates_handler() {
        let bus: EventBus<()> = EventBus::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);

        let sub = bus.on("x", move |_| count_clone.set(count_clone.get() + 1));

        bus.publish("x", &()).unwrap();
        assert_eq!(count.get(), 1);

        drop(sub);

        bus.publish("x", &()).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn subscriber_count_prunes_on_dispatch() {
        let bus: EventBus<()> = EventBus::new();
        assert_eq!(bus.subscriber_count("x"), 0);

        let _s1 = bus.on("x", |_| {});
        let s2 = bus.on("x", |_| {});
        assert_eq!(bus.subscriber_count("x"), 2);

        drop(s2);
        // Dead entry lingers until the next dispatch on that channel.
        assert_eq!(bus.subscriber_count("x"), 2);

        bus.publish("x", &()).unwrap();
        assert_eq!(bus.subscriber_count("x"), 1);
    }

    #[test]
    fn subscribing_mid_dispatch_joins_the_next_round() {
        let bus: Rc<EventBus<()>> = Rc::new(EventBus::new());
        let count = Rc::new(Cell::new(0u32));
        let late_guard: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let bus_clone = Rc::clone(&bus);
        let count_clone = Rc::clone(&count);
        let guard_clone = Rc::clone(&late_guard);
        let _sub = bus.on("x", move |_| {
            if guard_clone.borrow().is_none() {
                let inner_count = Rc::clone(&count_clone);
                let sub = bus_clone.on("x", move |_| inner_count.set(inner_count.get() + 1));
                *guard_clone.borrow_mut() = Some(sub);
            }
        });

        // First publish registers the late handler but must not invoke it.
        bus.publish("x", &()).unwrap();
        assert_eq!(count.get(), 0);

        bus.publish("x", &()).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn unsubscribing_mid_dispatch_does_not_disturb_the_snapshot() {
        let bus: EventBus<()> = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let log1 = Rc::clone(&log);
        let victim_clone = Rc::clone(&victim);
        let _s1 = bus.on("x", move |_| {
            log1.borrow_mut().push('A');
            victim_clone.borrow_mut().take();
        });

        let log2 = Rc::clone(&log);
        *victim.borrow_mut() = Some(bus.on("x", move |_| log2.borrow_mut().push('B')));

        // The snapshot taken at publish time still holds a strong handle,
        // so B fires this round and disappears afterwards.
        bus.publish("x", &()).unwrap();
        assert_eq!(*log.borrow(), vec!['A', 'B']);

        bus.publish("x", &()).unwrap();
        assert_eq!(*log.borrow(), vec!['A', 'B', 'A']);
    }

    #[test]
    fn handler_may_publish_on_the_same_bus() {
        let bus: Rc<EventBus<()>> = Rc::new(EventBus::new());
        let count = Rc::new(Cell::new(0u32));

        let count_clone = Rc::clone(&count);
        let _inner = bus.on("inner", move |_| count_clone.set(count_clone.get() + 1));

        let bus_clone = Rc::clone(&bus);
        let _outer = bus.on("outer", move |_| bus_clone.emit("inner", &()));

        bus.publish("outer", &()).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn debug_format() {
        let bus: EventBus<()> = EventBus::new();
        let _sub = bus.on("x", |_| {});
        let dbg = format!("{bus:?}");
        assert!(dbg.contains("EventBus"));
        assert!(dbg.contains("channels"));
    }
}
