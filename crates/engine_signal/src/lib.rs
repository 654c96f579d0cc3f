//! # engine_signal
//!
//! Synchronous, single-threaded publish-subscribe plumbing used for
//! notifications that do not belong to one entity.
//!
//! - [`Signal`]: ordered broadcast to subscribed handlers.
//! - [`Filter`]: forwards only values accepted by a predicate.
//! - [`TimeWindow`]: batches values into fixed-length windows of simulation time.
//!
//! Adapters implement [`Sink`], so a source signal can feed them through
//! [`Signal::connect`].

pub mod filter;
pub mod signal;
pub mod window;

pub use filter::Filter;
pub use signal::{Signal, Sink, SubscriptionId};
pub use window::TimeWindow;
