//! Current time, calendar arithmetic, the wrapping sequence-number
//! comparator, and the interest/demurrage formulas. Every
//! function here is pure: no I/O, no store, no clock state beyond what's
//! passed in, so the accrual math has exactly one implementation shared by
//! the protocol handlers, the periodic scanners, and read-only views.

pub mod accrual;
pub mod calendar;
pub mod retry;
pub mod routing;
pub mod seqnum;

pub use accrual::{accrue, project_available_amount};
pub use calendar::{today, year_fraction};
pub use routing::{inbound_routing_key, outbound_routing_key, shard_key};
pub use seqnum::{later, Version};
