#![forbid(unsafe_code)]

//! Ordered, observable membership container with change proxying.
//!
//! # Design
//!
//! [`Collection<M>`] is a shared handle (`Rc` inner) owning an ordered
//! sequence of members plus an embedded [`EventBus`]. It is a wrapper, not
//! a sequence subtype: index access, length, and iteration go through its
//! own methods.
//!
//! When a member exposing the publisher capability ([`Member::events`])
//! joins, the collection subscribes to that member's `"change"` channel
//! with a proxy closure that re-publishes `"change"` on the collection
//! itself, tagged with the member. The proxy's [`Subscription`] guard is
//! held in a vec parallel to the member vec; dropping it on removal tears
//! the wiring down, so a removed member's changes never reach the
//! collection again.
//!
//! The proxy closure captures only a `Weak` reference to the collection
//! interior. A strong capture would cycle (collection → guard → closure →
//! collection) and leak the whole structure.
//!
//! # Invariants
//!
//! 1. `len()` always reflects actual membership; no gaps, and
//!    `proxies.len() == members.len()` at every observable point.
//! 2. Every present publisher-capable member has exactly one live proxy
//!    subscription.
//! 3. A member's proxy is dropped before its removal completes.
//! 4. Lookup and removal equality is attribute-based and pluggable; the
//!    default key is the `id` attribute under loose comparison, and a
//!    missing key matches nothing.
//!
//! # Failure Modes
//!
//! - **Absence is not an error**: unmatched `remove` returns `false`,
//!   unmatched `get` returns `None`; nothing throws.
//! - **Re-entrant mutation from a key function**: `remove` holds the
//!   member borrow while running the key function; a key function that
//!   calls back into the same collection panics on the `RefCell`. Key
//!   functions must be pure. Event *handlers* are unrestricted — dispatch
//!   happens after all borrows are released.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use weft_events::{EventBus, Subscription};

use crate::attrs::loose_eq;
use crate::member::Member;
use crate::{EV_ADD, EV_CHANGE, EV_REMOVE, EV_RESET};

/// Lifecycle notification payload.
///
/// Which variant arrives is already implied by the channel it arrives on;
/// the variant exists to carry the member (and to let wildcard
/// subscribers tell publishes apart).
#[derive(Debug, Clone)]
pub enum CollectionEvent<M> {
    /// A member was appended.
    Added(M),
    /// A member was spliced out. Carries the removal target as passed by
    /// the caller, not the stored member it matched.
    Removed(M),
    /// A member published `"change"`.
    Changed(M),
    /// The whole collection was reset.
    Reset,
}

impl<M> CollectionEvent<M> {
    /// The member this event is about, when there is one.
    #[must_use]
    pub fn member(&self) -> Option<&M> {
        match self {
            Self::Added(m) | Self::Removed(m) | Self::Changed(m) => Some(m),
            Self::Reset => None,
        }
    }
}

struct CollectionInner<M: Member> {
    members: RefCell<Vec<M>>,
    /// Parallel to `members`: entry `i` is the proxy guard for member `i`,
    /// `None` for inert members.
    proxies: RefCell<Vec<Option<Subscription>>>,
    bus: EventBus<CollectionEvent<M>>,
}

/// Ordered, observable container of members.
///
/// Cloning a `Collection` creates a new handle to the **same** state —
/// both handles see the same members and share subscribers.
pub struct Collection<M: Member> {
    inner: Rc<CollectionInner<M>>,
}

// Manual Clone: shares the same inner.
impl<M: Member> Clone for Collection<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M: Member> Default for Collection<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Member + fmt::Debug> fmt::Debug for Collection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("members", &*self.inner.members.borrow())
            .finish_non_exhaustive()
    }
}

impl<M: Member> Collection<M> {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(CollectionInner {
                members: RefCell::new(Vec::new()),
                proxies: RefCell::new(Vec::new()),
                bus: EventBus::new(),
            }),
        }
    }

    /// Create a collection seeded with `members`.
    ///
    /// Proxies are wired but no `add` events fire; nothing can have
    /// subscribed to a collection that does not exist yet.
    #[must_use]
    pub fn from_members(members: impl IntoIterator<Item = M>) -> Self {
        let collection = Self::new();
        for member in members {
            collection.append(member);
        }
        collection
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Append a member and publish `add` with it as payload.
    pub fn add(&self, member: M) {
        let announced = member.clone();
        self.append(member);
        self.inner.bus.emit(EV_ADD, &CollectionEvent::Added(announced));
    }

    /// Append each member in order, publishing one `add` per member —
    /// never a single batched event.
    pub fn add_many(&self, members: impl IntoIterator<Item = M>) {
        for member in members {
            self.add(member);
        }
    }

    /// Append a member without publishing `add`. Proxy wiring still
    /// happens; silence only suppresses the lifecycle event.
    pub fn add_silent(&self, member: M) {
        self.append(member);
    }

    /// [`Collection::add_silent`] for a sequence.
    pub fn add_many_silent(&self, members: impl IntoIterator<Item = M>) {
        for member in members {
            self.append(member);
        }
    }

    /// Remove the first member whose default key ([`Member::key`], the
    /// `id` attribute) loosely equals `target`'s, publishing `remove`
    /// with `target` as payload.
    ///
    /// Returns `false` — removing nothing — when no member matches, or
    /// when `target` has no key at all (id-less values never match the
    /// default key; pass [`Collection::remove_by`] an identity function
    /// for those).
    pub fn remove(&self, target: &M) -> bool {
        let Some(target_key) = target.key() else {
            tracing::trace!("remove skipped: target has no default key");
            return false;
        };
        self.remove_first_match(
            |member| member.key().is_some_and(|k| loose_eq(&k, &target_key)),
            target,
        )
    }

    /// Remove the first member whose `key` result equals `target`'s.
    pub fn remove_by<K, F>(&self, target: &M, key: F) -> bool
    where
        F: Fn(&M) -> K,
        K: PartialEq,
    {
        let wanted = key(target);
        self.remove_first_match(|member| key(member) == wanted, target)
    }

    /// [`Collection::remove`] for a sequence of targets. Returns how many
    /// members were actually removed.
    pub fn remove_many(&self, targets: &[M]) -> usize {
        targets.iter().filter(|target| self.remove(target)).count()
    }

    /// [`Collection::remove_by`] for a sequence of targets.
    pub fn remove_many_by<K, F>(&self, targets: &[M], key: F) -> usize
    where
        F: Fn(&M) -> K,
        K: PartialEq,
    {
        targets
            .iter()
            .filter(|target| self.remove_by(target, &key))
            .count()
    }

    /// Clear all membership (tearing down every proxy first) and publish
    /// exactly one `reset`.
    pub fn reset(&self) {
        self.clear_members();
        self.inner.bus.emit(EV_RESET, &CollectionEvent::Reset);
    }

    /// Clear all membership, repopulate from `members` publishing one
    /// `add` per member (repopulation is not silent), then publish
    /// exactly one `reset`.
    pub fn reset_with(&self, members: impl IntoIterator<Item = M>) {
        self.clear_members();
        for member in members {
            self.add(member);
        }
        self.inner.bus.emit(EV_RESET, &CollectionEvent::Reset);
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Find the first member matching an attribute pattern.
    ///
    /// `attrs` is a JSON object; `Null`-valued keys are ignored. A member
    /// matches when every remaining key compares loosely equal (so
    /// `{"id": 1}` matches an id of `"1"`) against [`Member::attr`] and
    /// at least one key actually matched. A pattern with no effective
    /// keys — all null, empty, or not an object — matches nothing.
    #[must_use]
    pub fn get(&self, attrs: &Value) -> Option<M> {
        let attrs = attrs.as_object()?;
        self.inner
            .members
            .borrow()
            .iter()
            .find(|member| {
                let mut matched = 0usize;
                for (name, wanted) in attrs {
                    if wanted.is_null() {
                        continue;
                    }
                    match member.attr(name) {
                        Some(have) if loose_eq(&have, wanted) => matched += 1,
                        _ => return false,
                    }
                }
                matched > 0
            })
            .cloned()
    }

    /// The lowest-indexed present member (see [`Member::is_present`]).
    #[must_use]
    pub fn first(&self) -> Option<M> {
        self.inner
            .members
            .borrow()
            .iter()
            .find(|m| m.is_present())
            .cloned()
    }

    /// The highest-indexed present member.
    #[must_use]
    pub fn last(&self) -> Option<M> {
        self.inner
            .members
            .borrow()
            .iter()
            .rev()
            .find(|m| m.is_present())
            .cloned()
    }

    /// The member at `index`, when in bounds.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<M> {
        self.inner.members.borrow().get(index).cloned()
    }

    /// Current membership count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.members.borrow().len()
    }

    /// Whether the collection holds no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.members.borrow().is_empty()
    }

    /// Snapshot of the current membership, in order.
    #[must_use]
    pub fn members(&self) -> Vec<M> {
        self.inner.members.borrow().clone()
    }

    /// Iterate over a snapshot of the membership. Mutations during
    /// iteration affect the collection, not the snapshot.
    pub fn iter(&self) -> std::vec::IntoIter<M> {
        self.members().into_iter()
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Subscribe to one of the lifecycle channels (`"add"`, `"remove"`,
    /// `"reset"`, `"change"`) or the wildcard `"all"`.
    pub fn on(
        &self,
        name: impl Into<String>,
        callback: impl Fn(&CollectionEvent<M>) + 'static,
    ) -> Subscription {
        self.inner.bus.on(name, callback)
    }

    /// Drop the subscribers of one channel. See `EventBus::off`.
    pub fn off(&self, name: &str) {
        self.inner.bus.off(name);
    }

    /// Drop all subscribers. See `EventBus::off_all`.
    pub fn off_all(&self) {
        self.inner.bus.off_all();
    }

    /// Number of entries registered on `name` (see
    /// `EventBus::subscriber_count`).
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.inner.bus.subscriber_count(name)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Append without events: push the member and its proxy entry.
    fn append(&self, member: M) {
        let proxy = self.wire_proxy(&member);
        self.inner.members.borrow_mut().push(member);
        self.inner.proxies.borrow_mut().push(proxy);
    }

    /// Subscribe to a capable member's `"change"` channel, re-publishing
    /// it as the collection's own `"change"` tagged with the member.
    fn wire_proxy(&self, member: &M) -> Option<Subscription> {
        let bus = member.events()?;
        let weak = Rc::downgrade(&self.inner);
        let observed = member.clone();
        Some(bus.on(EV_CHANGE, move |_changed| {
            if let Some(inner) = weak.upgrade() {
                inner
                    .bus
                    .emit(EV_CHANGE, &CollectionEvent::Changed(observed.clone()));
            }
        }))
    }

    /// Splice out the first member satisfying `matches`, dropping its
    /// proxy first, then publish `remove` with `target`.
    fn remove_first_match(&self, matches: impl Fn(&M) -> bool, target: &M) -> bool {
        let index = {
            let members = self.inner.members.borrow();
            members.iter().position(|member| matches(member))
        };
        let Some(index) = index else {
            return false;
        };

        // Tear the proxy down before the member leaves, so a change
        // fired from a `remove` handler cannot come back through it.
        let proxy = self.inner.proxies.borrow_mut().remove(index);
        drop(proxy);
        self.inner.members.borrow_mut().remove(index);

        self.inner
            .bus
            .emit(EV_REMOVE, &CollectionEvent::Removed(target.clone()));
        true
    }

    /// Drop every proxy, then every member. No events.
    fn clear_members(&self) {
        self.inner.proxies.borrow_mut().clear();
        self.inner.members.borrow_mut().clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
