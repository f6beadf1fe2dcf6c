//! Subcommand implementations

pub mod analysis;
pub mod cases;
pub mod learning;
