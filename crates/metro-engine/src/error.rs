//! # Engine Error Types
//!
//! Error types for the orchestration layer.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError (business rule violation in metro-core)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError::Core ← surfaced unchanged to the caller                  │
//! │                                                                         │
//! │  StoreError (persistence collaborator failure)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError::Persistence ← treated as settlement failure:             │
//! │     any in-memory balance change already applied is rolled back        │
//! │     before this error is returned                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::store::StoreError;
use metro_core::CoreError;

/// Orchestration-layer errors.
///
/// All variants are recoverable by the caller: the menu/API layer reports
/// them and lets the end user retry with different inputs.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule violation from metro-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The persistence collaborator reported a failure. Any in-memory
    /// balance change applied before the failure has been rolled back.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// No ticket with this id exists for the rider.
    #[error("Ticket #{ticket_id} not found")]
    TicketNotFound { ticket_id: i64 },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_passes_through() {
        let core = CoreError::AlreadyCancelled { ticket_id: 7 };
        let err: EngineError = core.into();
        assert_eq!(err.to_string(), "Ticket #7 is already cancelled");
    }

    #[test]
    fn test_persistence_error_is_prefixed() {
        let err: EngineError = StoreError::Unavailable("disk offline".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Persistence failure: store unavailable: disk offline"
        );
    }
}
