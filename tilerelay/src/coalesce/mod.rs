//! Request coalescing for upstream tile fetches.
//!
//! When several requests miss the disk cache for the same tile at once, only
//! one upstream fetch runs; every other request attaches to it and receives
//! the same outcome.
//!
//! ```text
//! Request A ─┐
//!            │                                  Upstream
//! Request B ─┼──► CoalescingRegistry ──────────► fetch
//!            │          │                         │
//! Request C ─┘          │                         │
//!                       ▼                         ▼
//!                 [A, B, C all              [one request]
//!                  receive same                   │
//!                  outcome]◄──── BroadcastFuture ─┘
//! ```

mod broadcast;
mod registry;

pub use broadcast::{BroadcastFuture, SettleError, Subscription, WaitError};
pub use registry::{CoalescerStats, CoalescingRegistry, TileOutcome};
