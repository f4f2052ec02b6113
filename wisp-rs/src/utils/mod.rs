//! Shared utilities for the wisp-rs CLI

pub mod format;
pub mod progress;

pub use format::*;
pub use progress::*;
