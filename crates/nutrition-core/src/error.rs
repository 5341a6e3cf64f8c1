//! # Error Types
//!
//! Domain-specific error types for nutrition-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  nutrition-core errors (this file)                                     │
//! │  ├── ValidationError  - Manual form validation failures                │
//! │  └── ServiceError     - Outcome of a failed lookup/create call         │
//! │      ├── Server       - GraphQL `errors` list, shown verbatim          │
//! │      └── Transport    - Network, decoding, timeout                     │
//! │                                                                         │
//! │  nutrition-scan errors (separate crate)                                │
//! │  └── ScanError        - Config, channel and runtime failures           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Detection failures never appear here: the pipeline swallows them and
//! emits an empty detection instead. "Not found" is not an error either,
//! it is a normal terminal state of the session.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::types::ServerError;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when the manual product form doesn't meet requirements.
/// They are returned to the caller and never change session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., letters in a nutrient amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Service Error
// =============================================================================

/// Failure of an external product service call.
///
/// The two variants are distinct, user-visible terminal states and neither
/// is retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ServiceError {
    /// The server answered with a GraphQL `errors` list.
    #[error("Server returned {} error(s)", .0.len())]
    Server(Vec<ServerError>),

    /// Anything that is not a server answer: network, decoding, timeout.
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl ServiceError {
    /// Creates a transport failure from any displayable cause.
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        ServiceError::Transport(cause.to_string())
    }

    /// Returns true if this is a server-level (GraphQL) failure.
    pub fn is_server(&self) -> bool {
        matches!(self, ServiceError::Server(_))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "barcode".to_string(),
        };
        assert_eq!(err.to_string(), "barcode is required");

        let err = ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        };
        assert_eq!(err.to_string(), "name must be at most 200 characters");
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::Server(vec![
            ServerError::new("barcode already exists"),
            ServerError::new("permission denied"),
        ]);
        assert_eq!(err.to_string(), "Server returned 2 error(s)");
        assert!(err.is_server());

        let err = ServiceError::transport("connection refused");
        assert_eq!(err.to_string(), "Transport failure: connection refused");
        assert!(!err.is_server());
    }
}
