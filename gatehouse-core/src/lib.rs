//! Gatehouse Core - shared foundation for the Gatehouse toolkit
//!
//! This crate carries the concerns every Gatehouse crate relies on:
//! structured errors with context, string-valued configuration properties,
//! and the logging bootstrap.

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use tracing;
