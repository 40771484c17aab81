//! Date/timezone resolution shared by every adapter

mod clock;
mod resolver;

pub use clock::{Clock, FixedClock, SystemClock};
pub use resolver::{CalendarSettings, DateContext, DateWindow};
