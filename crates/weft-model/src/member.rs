#![forbid(unsafe_code)]

//! The capability surface collection members expose.
//!
//! A collection stores opaque values. What it can do with them depends on
//! which of these capabilities the member type opts into:
//!
//! - [`Member::events`] — publisher capability. A member returning `Some`
//!   gets a proxy subscription on its `"change"` channel while it is in a
//!   collection; `None` marks an inert value (plain strings, numbers).
//! - [`Member::attr`] — named attribute lookup, feeding
//!   `Collection::get` matching.
//! - [`Member::key`] — default removal key. Defaults to the `id`
//!   attribute; a `None` key matches nothing, so removing id-less values
//!   with the default key silently no-ops (pass an explicit key function
//!   instead).
//! - [`Member::is_present`] — the truthiness filter `first`/`last` apply
//!   when skipping placeholder members.
//!
//! Everything has a default, so inert value types implement the trait
//! with an empty body.

use serde_json::Value;

use weft_events::EventBus;

use crate::attrs::truthy;

/// Capability surface for values stored in a `Collection`.
pub trait Member: Clone + 'static {
    /// Publisher capability: the bus carrying this member's `"change"`
    /// channel, or `None` for inert values.
    fn events(&self) -> Option<&EventBus<Self>> {
        None
    }

    /// Named attribute lookup for collection matching.
    fn attr(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Default removal key. `None` never matches any member.
    fn key(&self) -> Option<Value> {
        self.attr("id")
    }

    /// Whether `first`/`last` should yield this member.
    fn is_present(&self) -> bool {
        true
    }
}

impl Member for String {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Member for i32 {
    fn is_present(&self) -> bool {
        *self != 0
    }
}

impl Member for i64 {
    fn is_present(&self) -> bool {
        *self != 0
    }
}

impl Member for Value {
    fn attr(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn is_present(&self) -> bool {
        truthy(self)
    }
}
