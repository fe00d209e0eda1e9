//! Closed-loop control primitives.

mod pid;

pub use pid::{PidController, PidGains};
