//! # Domain Types
//!
//! Core domain types used throughout the Metro Fare Engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Station      │   │     Ticket      │   │   Settlement    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code (key)     │   │  id (store)     │   │  id (UUID)      │       │
//! │  │  name           │   │  owner          │   │  source         │       │
//! │  │  amenities      │   │  route, fare    │   │  card portion   │       │
//! │  └─────────────────┘   │  cancelled      │   │  wallet portion │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   CardState     │   │  PaymentSource  │   │      Role       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  balance        │   │  Wallet         │   │  Rider          │       │
//! │  │  auto_recharge  │   │  Card           │   │  Admin          │       │
//! │  │  min_threshold  │   │  Split          │   │  SupportStaff   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - Cards and settlements carry UUID v4 ids (generated locally, no
//!   coordination needed)
//! - Tickets carry the id the persistence collaborator generated for them
//!   (`persist_ticket -> i64`), mirroring an autoincrement key

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::DEFAULT_MIN_THRESHOLD_PAISE;

// =============================================================================
// Station
// =============================================================================

/// A metro station with its amenity flags.
///
/// Adjacency and distances live in [`crate::graph::StationGraph`], not here;
/// a Station is the read-mostly descriptive record keyed by `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// Unique short code, e.g. "a". Lowercase alphanumeric.
    pub code: String,

    /// Display name shown to riders, e.g. "Central Market".
    pub name: String,

    /// Whether the station has restroom facilities.
    pub has_restrooms: bool,

    /// Whether the station has parking facilities.
    pub has_parking: bool,

    /// Whether the station offers WiFi connectivity.
    pub has_wifi: bool,
}

impl Station {
    /// Creates a station record.
    pub fn new(code: &str, name: &str, restrooms: bool, parking: bool, wifi: bool) -> Self {
        Station {
            code: code.to_string(),
            name: name.to_string(),
            has_restrooms: restrooms,
            has_parking: parking,
            has_wifi: wifi,
        }
    }
}

// =============================================================================
// Card State
// =============================================================================

/// Stored-value transit card state.
///
/// ## Invariants
/// - `balance >= 0` at all times
/// - `min_threshold >= 0`
///
/// Mutation flows exclusively through the account ledger; no other component
/// touches these fields directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardState {
    /// Card identifier (UUID v4 string).
    pub id: String,

    /// Current stored value.
    pub balance: Money,

    /// Whether a card deduction that drops the balance under
    /// `min_threshold` triggers a wallet-to-card top-up.
    pub auto_recharge_enabled: bool,

    /// Balance level below which auto-recharge fires.
    pub min_threshold: Money,
}

impl CardState {
    /// Creates a card with the default Rs 50 threshold and auto-recharge off.
    pub fn new(id: impl Into<String>, balance: Money) -> Self {
        CardState {
            id: id.into(),
            balance,
            auto_recharge_enabled: false,
            min_threshold: Money::from_paise(DEFAULT_MIN_THRESHOLD_PAISE),
        }
    }

    /// True when a deduction has left the balance under the threshold and
    /// auto-recharge is switched on.
    #[inline]
    pub fn wants_auto_recharge(&self) -> bool {
        self.auto_recharge_enabled && self.balance < self.min_threshold
    }

    /// The single-shot auto-recharge transfer amount:
    /// `max(min_threshold × 2, shortfall)`.
    pub fn auto_recharge_amount(&self, shortfall: Money) -> Money {
        (self.min_threshold * 2).max(shortfall)
    }
}

// =============================================================================
// Payment Source
// =============================================================================

/// Which balance(s) a settlement drew from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSource {
    /// Full amount from the wallet.
    Wallet,
    /// Full amount from the card.
    Card,
    /// Card drained first, remainder from the wallet.
    Split,
}

// =============================================================================
// Settlement
// =============================================================================

/// Record of one atomic payment transaction against a rider's balance pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Settlement identifier (UUID v4 string).
    pub id: String,

    /// Rider whose balances were charged.
    pub rider: String,

    /// Which balance(s) the amount was drawn from.
    pub source: PaymentSource,

    /// Portion deducted from the card.
    pub card_portion: Money,

    /// Portion deducted from the wallet (excluding any auto-recharge
    /// transfer, which only moves money between the two balances).
    pub wallet_portion: Money,

    /// Wallet-to-card auto-recharge transfer applied within this
    /// settlement, or zero.
    pub auto_recharge_transfer: Money,

    /// When the settlement was executed.
    pub settled_at: DateTime<Utc>,
}

impl Settlement {
    /// Total charged out of the rider's balance pair.
    #[inline]
    pub fn amount(&self) -> Money {
        self.card_portion + self.wallet_portion
    }
}

// =============================================================================
// Ticket
// =============================================================================

/// Refund rate when cancelling at least 24 hours before travel.
pub const EARLY_CANCEL_REFUND_RATE: f64 = 0.8;

/// Refund rate when cancelling inside the 24-hour window.
pub const LATE_CANCEL_REFUND_RATE: f64 = 0.5;

/// A confirmed booking.
///
/// ## Lifecycle
/// ```text
/// PENDING ──settlement ok──► CONFIRMED ──cancel──► CANCELLED (one-way)
///    │
///    └──settlement fails──► REJECTED (no record persisted)
/// ```
/// A `Ticket` value only exists for the CONFIRMED and CANCELLED states;
/// pending/rejected bookings never materialize as tickets. The `cancelled`
/// flag is monotonic: false → true, never reversed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Identifier generated by the persistence collaborator.
    pub id: i64,

    /// Username of the rider who booked the ticket.
    pub owner: String,

    /// Source station code.
    pub source: String,

    /// Destination station code.
    pub destination: String,

    /// Number of passengers covered by this ticket.
    pub passengers: u32,

    /// Total fare charged at booking time (frozen).
    pub fare: Money,

    /// Scheduled travel time.
    pub travel_date: DateTime<Utc>,

    /// Whether the ticket has been cancelled.
    pub cancelled: bool,

    /// When the ticket was booked.
    pub booked_at: DateTime<Utc>,
}

impl Ticket {
    /// Cancels the ticket and returns the refund amount.
    ///
    /// Refund rate is 80% if cancelled at least 24 hours before travel,
    /// else 50%. A second cancellation is a no-op returning zero: the
    /// `cancelled` flag flips exactly once.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Money {
        if self.cancelled {
            return Money::zero();
        }
        self.cancelled = true;

        let rate = if self.travel_date - now >= Duration::hours(24) {
            EARLY_CANCEL_REFUND_RATE
        } else {
            LATE_CANCEL_REFUND_RATE
        };
        self.fare.apply_rate(rate)
    }

    /// True when the ticket still counts against the rider's active limit.
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.cancelled
    }
}

// =============================================================================
// Role
// =============================================================================

/// Role of an authenticated principal.
///
/// The three roles share only identity/credential fields and diverge
/// completely in behavior, so they are a tagged variant rather than an
/// inheritance hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular rider who books tickets and holds a balance pair.
    Rider,
    /// Administrator who manages stations and edges.
    Admin,
    /// Support staff handling rider complaints.
    SupportStaff,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ticket(fare_paise: i64, travel: DateTime<Utc>) -> Ticket {
        Ticket {
            id: 1,
            owner: "asha".to_string(),
            source: "a".to_string(),
            destination: "b".to_string(),
            passengers: 1,
            fare: Money::from_paise(fare_paise),
            travel_date: travel,
            cancelled: false,
            booked_at: travel - Duration::days(3),
        }
    }

    #[test]
    fn test_cancel_early_refunds_80_percent() {
        let travel = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let now = travel - Duration::hours(25);
        let mut t = ticket(2250, travel);

        assert_eq!(t.cancel(now).paise(), 1800);
        assert!(t.cancelled);
    }

    #[test]
    fn test_cancel_late_refunds_50_percent() {
        let travel = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let now = travel - Duration::hours(23);
        let mut t = ticket(2250, travel);

        assert_eq!(t.cancel(now).paise(), 1125);
    }

    #[test]
    fn test_cancel_exactly_24h_is_early() {
        let travel = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let now = travel - Duration::hours(24);
        let mut t = ticket(1000, travel);

        assert_eq!(t.cancel(now).paise(), 800);
    }

    #[test]
    fn test_second_cancel_is_zero_noop() {
        let travel = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let now = travel - Duration::hours(48);
        let mut t = ticket(2250, travel);

        assert!(t.cancel(now).is_positive());
        assert_eq!(t.cancel(now), Money::zero());
        assert!(t.cancelled);
    }

    #[test]
    fn test_card_auto_recharge_amount() {
        let mut card = CardState::new("card-1", Money::from_paise(1000));
        card.auto_recharge_enabled = true;

        // max(threshold * 2, shortfall): threshold Rs 50 → Rs 100 floor
        assert_eq!(card.auto_recharge_amount(Money::zero()).paise(), 10_000);
        assert_eq!(
            card.auto_recharge_amount(Money::from_paise(15_000)).paise(),
            15_000
        );
    }

    #[test]
    fn test_card_wants_auto_recharge() {
        let mut card = CardState::new("card-1", Money::from_paise(1000));
        assert!(!card.wants_auto_recharge()); // disabled

        card.auto_recharge_enabled = true;
        assert!(card.wants_auto_recharge()); // Rs 10 < Rs 50 threshold

        card.balance = Money::from_paise(10_000);
        assert!(!card.wants_auto_recharge()); // above threshold
    }

    #[test]
    fn test_settlement_amount() {
        let s = Settlement {
            id: "s-1".to_string(),
            rider: "asha".to_string(),
            source: PaymentSource::Split,
            card_portion: Money::from_paise(800),
            wallet_portion: Money::from_paise(1450),
            auto_recharge_transfer: Money::zero(),
            settled_at: Utc::now(),
        };
        assert_eq!(s.amount().paise(), 2250);
    }
}
