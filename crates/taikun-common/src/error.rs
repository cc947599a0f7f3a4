//! Error types for the Taikun orchestrator
//!
//! Errors are structured with fields to aid debugging in production.
//! Expected terminal states of a wait (ready, deleted, failed, timed out)
//! are not errors; they are reported as outcomes by the reconcile crate.
//! What travels through `Err` is the set of problems that make the remote
//! state unknowable: transport failures, pagination protocol violations,
//! and invalid input.

use thiserror::Error;

/// HTTP status code the control plane uses for absent resources
pub const STATUS_NOT_FOUND: u16 = 404;

/// Main error type for Taikun operations
#[derive(Debug, Error)]
pub enum Error {
    /// The control plane could not be reached, or answered with a
    /// non-success status that does not mean "absent"
    #[error("transport error [{context}]{}: {message}", fmt_status(.status))]
    Transport {
        /// Operation that issued the request (e.g., "project probe")
        context: String,
        /// HTTP status code, if a response was received
        status: Option<u16>,
        /// Backend-provided detail or the network error text
        message: String,
    },

    /// A paged endpoint broke the cursor contract
    #[error("protocol violation [{context}]: {message}")]
    Protocol {
        /// Endpoint or resource being paged
        context: String,
        /// Description of the violation
        message: String,
    },

    /// Caller supplied options that cannot be honored
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The offending option (e.g., "timeout")
        field: Option<String>,
    },

    /// A response body could not be decoded
    #[error("serialization error [{kind}]: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The payload being decoded (e.g., "project list")
        kind: String,
    },

    /// Configuration file or environment problem
    #[error("configuration error: {message}")]
    Config {
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred
        context: String,
    },
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl Error {
    /// Create a transport error for a request that never produced a response
    pub fn transport(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Transport {
            context: context.into(),
            status: None,
            message: msg.into(),
        }
    }

    /// Create a transport error for a non-success HTTP response
    pub fn transport_status(
        context: impl Into<String>,
        status: u16,
        msg: impl Into<String>,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a pagination protocol violation
    pub fn protocol(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Protocol {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error naming the offending field
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error naming the payload being decoded
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: kind.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// HTTP status carried by a transport error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// True when the backend answered 404
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(STATUS_NOT_FOUND)
    }

    /// Get the context if this error has one
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Transport { context, .. } => Some(context),
            Error::Protocol { context, .. } => Some(context),
            Error::Internal { context, .. } => Some(context),
            _ => None,
        }
    }
}
