#![forbid(unsafe_code)]

//! Events: named-channel publish/subscribe for single-threaded UI code.
//!
//! # Role in Weft
//! `weft-events` is the notification layer. Every object that wants to
//! announce state changes embeds an [`EventBus`] and delegates to it;
//! `weft-model` builds its observable collection on top of this crate.
//!
//! # Primary responsibilities
//! - **EventBus**: per-instance, case-sensitive named channels with FIFO
//!   dispatch and a reserved `"all"` wildcard channel.
//! - **Subscription**: RAII guard tying a handler's lifetime to a value
//!   the subscriber owns.
//! - **EventError**: the single boundary-validated failure (publishing on
//!   an empty channel name).
//!
//! # How it fits in the system
//! Dispatch is synchronous and runs to completion on the calling thread.
//! There is no queue, no scheduler, and no cross-thread delivery; the bus
//! is deliberately `!Send`/`!Sync` (`Rc`/`RefCell` interior).

pub mod bus;

pub use bus::{EV_ALL, EventBus, EventError, Subscription};
