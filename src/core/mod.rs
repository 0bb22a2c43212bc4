//! Core domain models
//!
//! Declared topology, its validation, and the expansion into an ordered
//! execution plan.

pub mod config;
pub mod error;
pub mod plan;
pub mod step;
pub mod topology;

pub use config::*;
pub use error::ConfigError;
pub use plan::*;
pub use step::*;
pub use topology::TopologyExpander;
