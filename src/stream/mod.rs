//! Stream combinators for update subscriptions.

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
