//! Stream combinators for presentation-facing notifications

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
