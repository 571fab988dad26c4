//! # Error Types
//!
//! Domain-specific error types for metro-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  metro-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  metro-engine errors (separate crate)                                  │
//! │  ├── StoreError       - Persistence collaborator failures              │
//! │  └── EngineError      - Orchestration failures (wraps both)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → Caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (station code, amounts, limits)
//! 3. Errors are enum variants, never String
//! 4. Every variant is recoverable by the caller, not fatal

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages by the
/// menu/API layer; the caller retries with different inputs.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No usable route between the requested stations.
    ///
    /// ## When This Occurs
    /// - A station code is not registered in the graph
    /// - Origin and destination are the same station
    /// - The stations are in disconnected components
    ///
    /// The origin field is deliberately not named `source`: thiserror
    /// reserves that name for the error-chain accessor.
    #[error("No valid route from '{origin}' to '{destination}': {reason}")]
    InvalidRoute {
        origin: String,
        destination: String,
        reason: String,
    },

    /// The settlement cannot be completed under the current payment policy.
    ///
    /// ## When This Occurs
    /// - Card-preferred payment with a zero-balance card (card is unusable)
    /// - Split payment where the wallet cannot cover the remainder plus the
    ///   predicted auto-recharge top-up
    /// - Wallet-only payment with an insufficient wallet
    #[error("Insufficient funds: need {required}, short by {shortfall}")]
    InsufficientFunds {
        required: Money,
        shortfall: Money,
    },

    /// An identical active booking already exists.
    ///
    /// Same rider, origin, destination and travel date, not cancelled.
    #[error("Duplicate booking for {origin} -> {destination} on {travel_date}")]
    DuplicateBooking {
        origin: String,
        destination: String,
        travel_date: String,
    },

    /// Passenger count or active-ticket limit exceeded.
    #[error("{what} limit exceeded: {requested} requested, maximum {max}")]
    CapacityExceeded {
        what: String,
        requested: usize,
        max: usize,
    },

    /// The ticket was already cancelled; cancellation is one-way.
    #[error("Ticket #{ticket_id} is already cancelled")]
    AlreadyCancelled { ticket_id: i64 },

    /// The username is locked out after repeated failed login attempts.
    #[error("Account '{username}' is locked, retry after the lockout window")]
    AccountLocked { username: String },

    /// A monthly pass for this route is already active.
    #[error("Monthly pass already active for {origin} -> {destination}")]
    DuplicatePass {
        origin: String,
        destination: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. bad station code shape).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientFunds {
            required: Money::from_paise(2250),
            shortfall: Money::from_paise(750),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: need Rs 22.50, short by Rs 7.50"
        );

        let err = CoreError::CapacityExceeded {
            what: "passengers".to_string(),
            requested: 20,
            max: 15,
        };
        assert_eq!(
            err.to_string(),
            "passengers limit exceeded: 20 requested, maximum 15"
        );
    }

    #[test]
    fn test_route_errors_carry_station_codes_not_an_error_chain() {
        use std::error::Error;

        let err = CoreError::InvalidRoute {
            origin: "a".to_string(),
            destination: "z".to_string(),
            reason: "unknown station code".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No valid route from 'a' to 'z': unknown station code"
        );
        // the origin station is message payload, not a wrapped cause
        assert!(err.source().is_none());

        let err = CoreError::DuplicateBooking {
            origin: "a".to_string(),
            destination: "b".to_string(),
            travel_date: "2025-06-10".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Duplicate booking for a -> b on 2025-06-10"
        );
        assert!(err.source().is_none());

        let err = CoreError::DuplicatePass {
            origin: "a".to_string(),
            destination: "b".to_string(),
        };
        assert_eq!(err.to_string(), "Monthly pass already active for a -> b");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "station code".to_string(),
        };
        assert_eq!(err.to_string(), "station code is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
