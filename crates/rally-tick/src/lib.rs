//! Timing primitives for the Rally engine.
//!
//! Every match tick, ball reset, grace period, ready timeout and kickoff
//! retry is a record in one [`TimerQueue`] keyed by the thing it belongs to.
//! Tearing a match down cancels its keys, so no stale callback can fire
//! against state that no longer exists.
//!
//! # Integration
//!
//! The queue is passive. The owner sleeps until
//! [`TimerQueue::next_deadline`] and then drains [`TimerQueue::pop_due`]:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = inbox.recv() => engine.handle(cmd),
//!         _ = sleep_until(engine.next_deadline()) => engine.advance(now()),
//!     }
//! }
//! ```

mod budget;
mod config;
mod queue;

pub use budget::{TickBudget, TickMetrics};
pub use config::TickConfig;
pub use queue::TimerQueue;
