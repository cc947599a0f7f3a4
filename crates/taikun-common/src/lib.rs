//! Common types for the Taikun orchestrator: errors, resource kinds,
//! wait defaults, configuration, and tracing setup

#![deny(missing_docs)]

pub mod config;
pub mod defaults;
pub mod error;
pub mod kind;
pub mod telemetry;

pub use defaults::{DefaultsTable, WaitDefaults, WaitIntent, WaitSettings};
pub use error::Error;
pub use kind::ResourceKind;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
