#![forbid(unsafe_code)]

//! Model layer: observable collections and attribute-bearing models.
//!
//! # Role in Weft
//! `weft-model` owns the client-side data layer. A [`Model`] is a shared
//! handle to a loosely-typed attribute bag that announces mutations on its
//! `"change"` channel; a [`Collection`] is an ordered, observable container
//! that announces membership changes (`"add"`, `"remove"`, `"reset"`) and
//! re-broadcasts its members' `"change"` events as its own.
//!
//! # Primary responsibilities
//! - **Member**: the capability surface a value needs to live in a
//!   collection (optional publisher capability, attribute lookup, default
//!   removal key, presence filter).
//! - **Model**: the concrete change-capable domain object.
//! - **Collection**: membership lifecycle plus change proxying with
//!   leak-free teardown on removal.
//!
//! # How it fits in the system
//! Views subscribe to a collection's lifecycle channels (or to the
//! wildcard `"all"`) and re-render on notification. Everything is
//! synchronous and single-threaded; see `weft-events` for the dispatch
//! contract.

pub mod attrs;
pub mod collection;
pub mod member;
pub mod model;

pub use collection::{Collection, CollectionEvent};
pub use member::Member;
pub use model::Model;
pub use weft_events::{EV_ALL, EventBus, EventError, Subscription};

/// Channel published once per member appended by `add`/`add_many` and by
/// the repopulation phase of `reset_with`.
pub const EV_ADD: &str = "add";
/// Channel published once per member spliced out by `remove`/`remove_by`.
pub const EV_REMOVE: &str = "remove";
/// Channel published exactly once at the end of `reset`/`reset_with`.
pub const EV_RESET: &str = "reset";
/// Channel published by a [`Model`] on mutation, and by a [`Collection`]
/// when any of its members publishes it.
pub const EV_CHANGE: &str = "change";
