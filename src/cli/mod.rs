//! Command line entry: parse flags and environment, then hand an
//! [`actions::Action`] to the binary.

pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod telemetry;

mod start;

pub use start::start;
