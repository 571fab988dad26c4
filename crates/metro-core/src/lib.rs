//! # metro-core: Pure Business Logic for the Metro Fare Engine
//!
//! This crate is the **heart** of the fare engine. It contains all business
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Metro Fare Engine Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Caller (menu / API layer, out of scope)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  metro-engine (orchestration)                   │   │
//! │  │    AccountLedger, TicketLifecycle, LoginThrottle, AppContext   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ metro-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   graph   │  │   fare    │  │   │
//! │  │   │  Station  │  │   Money   │  │  distance │  │  quote()  │  │   │
//! │  │   │  Ticket   │  │  rounding │  │   (BFS)   │  │ modifiers │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Station, Ticket, FareQuote, CardState, etc.)
//! - [`money`] - Money type with integer paise arithmetic
//! - [`graph`] - Station graph and route distance queries
//! - [`fare`] - Fare calculation pipeline with pricing modifiers
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: Balances are held in paise (i64) to avoid float drift
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use metro_core::fare::FareCalculator;
//! use metro_core::graph::StationGraph;
//! use chrono::{TimeZone, Utc};
//!
//! let graph = StationGraph::demo_network();
//! let calc = FareCalculator::new();
//!
//! // Off-peak (14:00), 1 passenger, a -> b is a 5 km edge:
//! // 5 km × 1 × Rs 5 × 0.90 = Rs 22.50
//! let when = Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap();
//! let quote = calc.quote(&graph, &[], "a", "b", 1, when).unwrap();
//! assert_eq!(quote.total.paise(), 2250);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fare;
pub mod graph;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use metro_core::Money` instead of
// `use metro_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use fare::{FareCalculator, FareQuote};
pub use graph::{RouteDistance, StationGraph};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Base fare in rupees per kilometre per passenger.
pub const BASE_FARE_PER_KM: f64 = 5.0;

/// Maximum passengers allowed in a single booking.
///
/// ## Business Reason
/// Keeps group bookings within what a single carriage section can absorb
/// and prevents fat-finger passenger counts.
pub const MAX_PASSENGERS_PER_BOOKING: u32 = 15;

/// Maximum concurrently active (non-cancelled) tickets per rider.
pub const MAX_ACTIVE_TICKETS: usize = 15;

/// A monthly pass is priced as this many single off-peak trips.
pub const PASS_TRIP_EQUIVALENT: f64 = 20.0;

/// Loyalty credit issued to the wallet on every Nth confirmed ticket.
pub const LOYALTY_TICKET_INTERVAL: usize = 10;

/// Loyalty credit amount: Rs 50.
pub const LOYALTY_BONUS_PAISE: i64 = 5_000;

/// Default auto-recharge threshold for a new transit card: Rs 50.
pub const DEFAULT_MIN_THRESHOLD_PAISE: i64 = 5_000;
