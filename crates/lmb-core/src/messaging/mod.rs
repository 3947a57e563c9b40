//! Operator-facing messaging (replies and progress updates).

pub mod port;
pub mod progress;
