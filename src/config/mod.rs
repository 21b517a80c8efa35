//! Configuration types and tunables.

pub mod constants;
mod types;

pub use constants::*;
pub use types::{LogFormat, LogLevel};
