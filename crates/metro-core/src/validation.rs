//! # Validation Module
//!
//! Input validation utilities for the Metro Fare Engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (menu / API layer)                                    │
//! │  ├── Basic format checks, immediate user feedback                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE — business rule validation                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine invariants (balances >= 0, capacity limits)           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::MAX_PASSENGERS_PER_BOOKING;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a station code.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 10 characters
/// - Lowercase alphanumeric only
///
/// ## Example
/// ```rust
/// use metro_core::validation::validate_station_code;
///
/// assert!(validate_station_code("a").is_ok());
/// assert!(validate_station_code("").is_err());
/// assert!(validate_station_code("A ").is_err());
/// ```
pub fn validate_station_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "station code".to_string(),
        });
    }

    if code.len() > 10 {
        return Err(ValidationError::InvalidFormat {
            field: "station code".to_string(),
            reason: "must be at most 10 characters".to_string(),
        });
    }

    if !code.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "station code".to_string(),
            reason: "must contain only lowercase letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a username.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - Must be at most 30 characters
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.len() > 30 {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must be at most 30 characters".to_string(),
        });
    }

    Ok(())
}

/// Validates a password's shape (storage and transport are out of scope).
///
/// ## Rules
/// - 3 to 10 characters
/// - No spaces
pub fn validate_password_shape(password: &str) -> ValidationResult<()> {
    if password.len() < 3 || password.len() > 10 {
        return Err(ValidationError::OutOfRange {
            field: "password length".to_string(),
            min: 3,
            max: 10,
        });
    }

    if password.contains(' ') {
        return Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a passenger count for a single booking.
///
/// ## Rules
/// - Must be positive (>= 1)
/// - Must not exceed MAX_PASSENGERS_PER_BOOKING (15)
pub fn validate_passenger_count(passengers: u32) -> ValidationResult<()> {
    if passengers == 0 {
        return Err(ValidationError::MustBePositive {
            field: "passengers".to_string(),
        });
    }

    if passengers > MAX_PASSENGERS_PER_BOOKING {
        return Err(ValidationError::OutOfRange {
            field: "passengers".to_string(),
            min: 1,
            max: i64::from(MAX_PASSENGERS_PER_BOOKING),
        });
    }

    Ok(())
}

/// Validates a recharge or top-up amount in paise.
///
/// ## Rules
/// - Must be positive (> 0); zero and negative recharges are rejected
pub fn validate_recharge_amount(paise: i64) -> ValidationResult<()> {
    if paise <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "recharge amount".to_string(),
        });
    }

    Ok(())
}

/// Validates an auto-recharge threshold in paise.
///
/// ## Rules
/// - Must be non-negative (zero disables the threshold meaningfully)
pub fn validate_threshold(paise: i64) -> ValidationResult<()> {
    if paise < 0 {
        return Err(ValidationError::OutOfRange {
            field: "minimum threshold".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
