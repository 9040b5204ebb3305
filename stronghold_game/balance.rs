//! Static game balance: building upgrade costs and troop statistics.
//! Pure data, no side effects.

mod buildings;
mod troops;

pub use buildings::*;
pub use troops::*;

/// Share of the commit-time cost returned when a queued task is cancelled.
pub const CANCEL_REFUND_PERCENT: u64 = 80;
