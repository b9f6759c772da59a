#![forbid(unsafe_code)]

//! Attribute-bearing, change-capable domain object.
//!
//! # Design
//!
//! [`Model`] is a shared handle (`Rc` inner) to a loosely-typed attribute
//! map plus an embedded [`EventBus`]. Cloning a `Model` clones the handle:
//! both clones see the same attributes and share subscribers. That makes a
//! model payload cheap to pass through event dispatch, and makes handle
//! identity ([`Model::ptr_eq`]) meaningful.
//!
//! Mutating an attribute with [`Model::set`] publishes `"change"` on the
//! model's bus with the model itself as payload — unconditionally, even
//! when the new value equals the old one. Collections holding the model
//! proxy that channel; see `collection`.
//!
//! Models are general eventful objects: callers may subscribe and publish
//! arbitrary channel names on them, not just `"change"`.
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: calling `set` from inside one of this model's own
//!   `"change"` handlers dispatches immediately within the same stack; the
//!   attribute borrow is released before dispatch, so this recurses rather
//!   than panics. Unbounded recursion is the caller's bug.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use weft_events::{EventBus, EventError, Subscription};

use crate::EV_CHANGE;
use crate::member::Member;

struct ModelInner {
    attrs: RefCell<Map<String, Value>>,
    bus: EventBus<Model>,
}

/// Shared handle to an attribute map with change notification.
pub struct Model {
    inner: Rc<ModelInner>,
}

// Manual Clone: shares the same inner.
impl Clone for Model {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("attrs", &*self.inner.attrs.borrow())
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Create a model with no attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_map(Map::new())
    }

    /// Create a model seeded from a JSON object.
    ///
    /// A non-object `attrs` yields an empty model.
    #[must_use]
    pub fn with_attrs(attrs: Value) -> Self {
        Self::with_map(attrs.as_object().cloned().unwrap_or_default())
    }

    fn with_map(attrs: Map<String, Value>) -> Self {
        Self {
            inner: Rc::new(ModelInner {
                attrs: RefCell::new(attrs),
                bus: EventBus::new(),
            }),
        }
    }

    /// Read an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.attrs.borrow().get(name).cloned()
    }

    /// The `id` attribute, when present.
    #[must_use]
    pub fn id(&self) -> Option<Value> {
        self.get("id")
    }

    /// Write an attribute and publish `"change"` with this model as
    /// payload. Publishes even when the value did not actually change,
    /// matching setter semantics rather than value-diff semantics.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.inner.attrs.borrow_mut().insert(name.into(), value);
        self.inner.bus.emit(EV_CHANGE, self);
    }

    /// Write an attribute without publishing.
    pub fn set_silent(&self, name: impl Into<String>, value: Value) {
        self.inner.attrs.borrow_mut().insert(name.into(), value);
    }

    /// Subscribe to a channel on this model. See `EventBus::on`.
    pub fn on(&self, name: impl Into<String>, callback: impl Fn(&Model) + 'static) -> Subscription {
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

    /// Publish on an arbitrary channel with this model as payload.
    ///
    /// # Errors
    ///
    /// [`EventError::InvalidName`] when `name` is empty.
    pub fn publish(&self, name: &str) -> Result<(), EventError> {
        self.inner.bus.publish(name, self)
    }

    /// Number of entries registered on `name` (see
    /// `EventBus::subscriber_count`).
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.inner.bus.subscriber_count(name)
    }

    /// Handle identity: do the two handles share state?
    #[must_use]
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Member for Model {
    fn events(&self) -> Option<&EventBus<Self>> {
        Some(&self.inner.bus)
    }

    fn attr(&self, name: &str) -> Option<Value> {
        self.get(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
