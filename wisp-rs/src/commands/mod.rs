//! Command implementations

pub mod simulate;
