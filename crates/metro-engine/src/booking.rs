//! # Ticket Lifecycle
//!
//! Orchestrates booking, cancellation and monthly pass purchase on top of
//! the fare pipeline, the account ledger and the persistence collaborator.
//!
//! ## Booking Sequence
//! ```text
//! validate passengers ──► active-ticket limit ──► route check
//!        │
//!        ▼
//! duplicate-booking check ──► quote (passes applied) ──► settle payment
//!        │                                                     │
//!        │                                          settlement fails: no
//!        │                                          ticket record exists
//!        ▼
//! persist ticket ──► register in memory ──► every 10th ticket: loyalty
//!        │
//!        └── persist fails: settlement is reversed, booking rejected
//! ```
//!
//! A booking is all-or-nothing: either the ticket exists AND the payment
//! stuck, or neither did.
//!
//! ## Cancellation
//! Refund is 80% of the frozen fare when cancelling at least 24 hours
//! before travel, 50% inside that window. Refunds always land in the
//! wallet regardless of how the fare was paid, and never trigger
//! auto-recharge. Cancellation is one-way; a second attempt is rejected
//! with `AlreadyCancelled`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::ledger::AccountLedger;
use crate::store::MetroStore;
use metro_core::fare::MonthlyPass;
use metro_core::{
    CoreError, FareCalculator, FareQuote, Money, RouteDistance, Settlement, StationGraph, Ticket,
    ValidationError, LOYALTY_TICKET_INTERVAL, MAX_ACTIVE_TICKETS, MAX_PASSENGERS_PER_BOOKING,
};

// =============================================================================
// Booking Confirmation
// =============================================================================

/// Everything a successful booking produced.
#[derive(Debug, Clone)]
pub struct BookingConfirmation {
    pub ticket: Ticket,
    pub settlement: Settlement,
    /// Loyalty bonus credited by this booking, if it was an Nth ticket.
    pub loyalty_awarded: Option<Money>,
}

// =============================================================================
// Ticket Lifecycle
// =============================================================================

/// Booking and cancellation orchestrator.
///
/// Holds one lock per rider's ticket list, so bookings by different riders
/// never contend while two bookings by the same rider serialize (which is
/// what makes the active-ticket limit and the duplicate check race-free).
pub struct TicketLifecycle {
    store: Arc<dyn MetroStore>,
    ledger: Arc<AccountLedger>,
    calculator: FareCalculator,
    tickets: Mutex<HashMap<String, Arc<Mutex<Vec<Ticket>>>>>,
}

impl TicketLifecycle {
    pub fn new(
        store: Arc<dyn MetroStore>,
        ledger: Arc<AccountLedger>,
        calculator: FareCalculator,
    ) -> Self {
        TicketLifecycle {
            store,
            ledger,
            calculator,
            tickets: Mutex::new(HashMap::new()),
        }
    }

    async fn ticket_handle(&self, username: &str) -> Arc<Mutex<Vec<Ticket>>> {
        let mut registry = self.tickets.lock().await;
        Arc::clone(
            registry
                .entry(username.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Vec::new()))),
        )
    }

    /// Books a ticket: validates, quotes, settles, persists.
    ///
    /// `now` is the booking timestamp; the fare is quoted against
    /// `travel_date` (peak/off-peak and special dates key off the travel
    /// time, not the purchase time).
    #[allow(clippy::too_many_arguments)]
    pub async fn book(
        &self,
        graph: &StationGraph,
        rider: &str,
        source: &str,
        destination: &str,
        passengers: u32,
        travel_date: DateTime<Utc>,
        prefer_card: bool,
        now: DateTime<Utc>,
    ) -> EngineResult<BookingConfirmation> {
        // Too-large groups surface as a capacity condition, zero stays a
        // plain validation failure.
        metro_core::validation::validate_passenger_count(passengers).map_err(|err| match err {
            ValidationError::OutOfRange { .. } => CoreError::CapacityExceeded {
                what: "passengers".to_string(),
                requested: passengers as usize,
                max: MAX_PASSENGERS_PER_BOOKING as usize,
            },
            other => CoreError::from(other),
        })?;

        // Route sanity before anything is counted or charged.
        match graph.distance(source, destination) {
            RouteDistance::Km(km) if km > 0 => {}
            RouteDistance::Km(_) => {
                return Err(CoreError::InvalidRoute {
                    origin: source.to_string(),
                    destination: destination.to_string(),
                    reason: "source and destination are the same station".to_string(),
                }
                .into());
            }
            RouteDistance::UnknownStation => {
                return Err(CoreError::InvalidRoute {
                    origin: source.to_string(),
                    destination: destination.to_string(),
                    reason: "unknown station code".to_string(),
                }
                .into());
            }
            RouteDistance::NoRoute => {
                return Err(CoreError::InvalidRoute {
                    origin: source.to_string(),
                    destination: destination.to_string(),
                    reason: "stations are not connected".to_string(),
                }
                .into());
            }
        }

        let handle = self.ticket_handle(rider).await;
        let mut tickets = handle.lock().await;

        let active = tickets.iter().filter(|t| t.is_active()).count();
        if active >= MAX_ACTIVE_TICKETS {
            return Err(CoreError::CapacityExceeded {
                what: "active tickets".to_string(),
                requested: active + 1,
                max: MAX_ACTIVE_TICKETS,
            }
            .into());
        }

        let travel_day = travel_date.date_naive();
        if tickets.iter().any(|t| {
            t.is_active()
                && t.source == source
                && t.destination == destination
                && t.travel_date.date_naive() == travel_day
        }) {
            return Err(CoreError::DuplicateBooking {
                origin: source.to_string(),
                destination: destination.to_string(),
                travel_date: travel_day.to_string(),
            }
            .into());
        }

        let passes = self.store.load_active_monthly_passes(rider)?;
        let quote = self
            .calculator
            .quote(graph, &passes, source, destination, passengers, travel_date)
            .map_err(EngineError::from)?;

        let settlement = self.ledger.settle(rider, quote.total, prefer_card).await?;

        let mut ticket = Ticket {
            id: 0,
            owner: rider.to_string(),
            source: source.to_string(),
            destination: destination.to_string(),
            passengers,
            fare: quote.total,
            travel_date,
            cancelled: false,
            booked_at: now,
        };

        ticket.id = match self.store.persist_ticket(&ticket) {
            Ok(id) => id,
            Err(err) => {
                // The fare was already taken; give it back before failing.
                if let Err(undo_err) = self.ledger.undo_settlement(&settlement).await {
                    warn!(rider = %rider, error = %undo_err, "Settlement reversal failed after ticket persist failure");
                }
                return Err(err.into());
            }
        };

        tickets.push(ticket.clone());
        let total_booked = tickets.len();
        drop(tickets);

        info!(
            rider = %rider,
            ticket = ticket.id,
            route = %format!("{source}->{destination}"),
            fare = %quote.total,
            pass = quote.pass_applied,
            "Ticket booked"
        );

        // Every Nth lifetime booking earns a wallet credit; cancelled
        // tickets still count toward the tally.
        let loyalty_awarded = if total_booked % LOYALTY_TICKET_INTERVAL == 0 {
            match self.ledger.credit_loyalty(rider).await {
                Ok(_) => Some(Money::from_paise(metro_core::LOYALTY_BONUS_PAISE)),
                Err(err) => {
                    // The booking itself is confirmed; a failed bonus write
                    // must not unwind it.
                    warn!(rider = %rider, error = %err, "Loyalty credit failed");
                    None
                }
            }
        } else {
            None
        };

        Ok(BookingConfirmation {
            ticket,
            settlement,
            loyalty_awarded,
        })
    }

    /// Cancels a ticket and refunds the rate-appropriate share to the wallet.
    pub async fn cancel(
        &self,
        rider: &str,
        ticket_id: i64,
        now: DateTime<Utc>,
    ) -> EngineResult<Money> {
        let handle = self.ticket_handle(rider).await;
        let mut tickets = handle.lock().await;

        let ticket = tickets
            .iter_mut()
            .find(|t| t.id == ticket_id)
            .ok_or(EngineError::TicketNotFound { ticket_id })?;

        if ticket.cancelled {
            return Err(CoreError::AlreadyCancelled { ticket_id }.into());
        }

        // Compute the refund on a probe copy; the real flag only flips once
        // both writes (wallet credit, cancellation mark) have stuck.
        let mut probe = ticket.clone();
        let refund = probe.cancel(now);

        self.ledger.credit_wallet(rider, refund).await?;
        if let Err(err) = self.store.persist_ticket_cancellation(ticket_id) {
            if let Err(undo_err) = self
                .ledger
                .credit_wallet(rider, Money::zero() - refund)
                .await
            {
                warn!(rider = %rider, error = %undo_err, "Refund reversal failed after cancellation persist failure");
            }
            return Err(err.into());
        }

        ticket.cancelled = true;
        info!(rider = %rider, ticket = ticket_id, refund = %refund, "Ticket cancelled");
        Ok(refund)
    }

    /// Buys a monthly pass for a route, priced at 20 single trips.
    ///
    /// The pass price always settles from the wallet.
    pub async fn buy_monthly_pass(
        &self,
        graph: &StationGraph,
        rider: &str,
        source: &str,
        destination: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<(MonthlyPass, Money)> {
        let existing = self.store.load_active_monthly_passes(rider)?;
        if existing.iter().any(|p| p.covers(source, destination)) {
            return Err(CoreError::DuplicatePass {
                origin: source.to_string(),
                destination: destination.to_string(),
            }
            .into());
        }

        let price = self
            .calculator
            .pass_price(graph, source, destination, now)
            .map_err(EngineError::from)?;

        let settlement = self.ledger.settle(rider, price, false).await?;

        let pass = MonthlyPass::new(source, destination);
        if let Err(err) = self.store.persist_monthly_pass(rider, &pass, price, now) {
            if let Err(undo_err) = self.ledger.undo_settlement(&settlement).await {
                warn!(rider = %rider, error = %undo_err, "Settlement reversal failed after pass persist failure");
            }
            return Err(err.into());
        }

        info!(rider = %rider, route = %format!("{source}->{destination}"), price = %price, "Monthly pass purchased");
        Ok((pass, price))
    }

    /// Quotes a fare without booking, applying the rider's passes.
    pub async fn preview_fare(
        &self,
        graph: &StationGraph,
        rider: &str,
        source: &str,
        destination: &str,
        passengers: u32,
        travel_at: DateTime<Utc>,
    ) -> EngineResult<FareQuote> {
        let passes = self.store.load_active_monthly_passes(rider)?;
        self.calculator
            .quote(graph, &passes, source, destination, passengers, travel_at)
            .map_err(EngineError::from)
    }

    /// Snapshot of a rider's tickets, newest last.
    pub async fn tickets(&self, rider: &str) -> Vec<Ticket> {
        let handle = self.ticket_handle(rider).await;
        let tickets = handle.lock().await;
        tickets.clone()
    }

    /// Number of not-yet-cancelled tickets for a rider.
    pub async fn active_ticket_count(&self, rider: &str) -> usize {
        let handle = self.ticket_handle(rider).await;
        let tickets = handle.lock().await;
        tickets.iter().filter(|t| t.is_active()).count()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use metro_core::{CardState, PaymentSource};

    const WALLET: i64 = 200_000; // Rs 2000

    fn setup() -> (Arc<MemoryStore>, TicketLifecycle, StationGraph) {
        let store = Arc::new(MemoryStore::with_demo_network());
        store.seed_rider(
            "asha",
            Money::from_paise(WALLET),
            CardState::new("card-asha", Money::from_paise(50_000)),
        );
        let ledger = Arc::new(AccountLedger::new(
            Arc::clone(&store) as Arc<dyn MetroStore>
        ));
        let lifecycle = TicketLifecycle::new(
            Arc::clone(&store) as Arc<dyn MetroStore>,
            ledger,
            FareCalculator::new(),
        );
        (store, lifecycle, StationGraph::demo_network())
    }

    fn off_peak() -> DateTime<Utc> {
        // 2025-06-10 14:00 UTC: off-peak, no special date
        Utc.with_ymd_and_hms(2025, 6, 10, 14, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_booking_charges_fare_and_persists_ticket() {
        let (store, lifecycle, graph) = setup();
        let travel = off_peak();
        let now = travel - Duration::days(3);

        let confirmation = lifecycle
            .book(&graph, "asha", "a", "b", 1, travel, false, now)
            .await
            .unwrap();

        // 5 km × 1 × Rs 5 × 0.90 = Rs 22.50
        assert_eq!(confirmation.ticket.fare.paise(), 2_250);
        assert_eq!(confirmation.settlement.source, PaymentSource::Wallet);
        assert!(confirmation.loyalty_awarded.is_none());

        let stored = store.ticket(confirmation.ticket.id).unwrap();
        assert_eq!(stored.source, "a");
        assert!(!stored.cancelled);
        assert_eq!(
            store.balances("asha").unwrap().wallet.paise(),
            WALLET - 2_250
        );
    }

    #[tokio::test]
    async fn test_booking_rejects_bad_passenger_counts() {
        let (_, lifecycle, graph) = setup();
        let travel = off_peak();

        let err = lifecycle
            .book(&graph, "asha", "a", "b", 0, travel, false, travel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::Validation(_))
        ));

        let err = lifecycle
            .book(&graph, "asha", "a", "b", 16, travel, false, travel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::CapacityExceeded { .. })
        ));
    }

    #[tokio::test]
    async fn test_booking_rejects_invalid_routes() {
        let (_, lifecycle, graph) = setup();
        let travel = off_peak();

        for (src, dst) in [("a", "a"), ("a", "zz"), ("zz", "a")] {
            let err = lifecycle
                .book(&graph, "asha", src, dst, 1, travel, false, travel)
                .await
                .unwrap_err();
            assert!(
                matches!(err, EngineError::Core(CoreError::InvalidRoute { .. })),
                "{src}->{dst} should be invalid"
            );
        }
    }

    #[tokio::test]
    async fn test_duplicate_active_booking_rejected() {
        let (_, lifecycle, graph) = setup();
        let travel = off_peak();
        let now = travel - Duration::days(3);

        lifecycle
            .book(&graph, "asha", "a", "b", 1, travel, false, now)
            .await
            .unwrap();

        // Same route, same day, different time of day: still a duplicate
        let later_same_day = travel + Duration::hours(2);
        let err = lifecycle
            .book(&graph, "asha", "a", "b", 1, later_same_day, false, now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::DuplicateBooking { .. })
        ));

        // Different day on the same route is fine
        lifecycle
            .book(&graph, "asha", "a", "b", 1, travel + Duration::days(1), false, now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_ticket_frees_duplicate_slot() {
        let (_, lifecycle, graph) = setup();
        let travel = off_peak();
        let now = travel - Duration::days(3);

        let c = lifecycle
            .book(&graph, "asha", "a", "b", 1, travel, false, now)
            .await
            .unwrap();
        lifecycle.cancel("asha", c.ticket.id, now).await.unwrap();

        // Rebooking the identical trip succeeds after cancellation
        lifecycle
            .book(&graph, "asha", "a", "b", 1, travel, false, now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_active_ticket_limit() {
        let (store, lifecycle, graph) = setup();
        // plenty of wallet for 15 cheap trips
        store.seed_rider(
            "ravi",
            Money::from_paise(1_000_000),
            CardState::new("card-ravi", Money::zero()),
        );
        let travel = off_peak();
        let now = travel - Duration::days(30);

        for day in 0..15 {
            lifecycle
                .book(
                    &graph,
                    "ravi",
                    "a",
                    "b",
                    1,
                    travel + Duration::days(day),
                    false,
                    now,
                )
                .await
                .unwrap();
        }
        assert_eq!(lifecycle.active_ticket_count("ravi").await, 15);

        let err = lifecycle
            .book(&graph, "ravi", "a", "b", 1, travel + Duration::days(20), false, now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::CapacityExceeded { .. })
        ));

        // Cancelling one frees a slot
        let first = lifecycle.tickets("ravi").await[0].clone();
        lifecycle.cancel("ravi", first.id, now).await.unwrap();
        lifecycle
            .book(&graph, "ravi", "a", "b", 1, travel + Duration::days(20), false, now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_settlement_leaves_no_ticket() {
        let (store, lifecycle, graph) = setup();
        store.seed_rider(
            "broke",
            Money::from_paise(100),
            CardState::new("card-broke", Money::zero()),
        );
        let travel = off_peak();

        let err = lifecycle
            .book(&graph, "broke", "a", "b", 1, travel, false, travel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InsufficientFunds { .. })
        ));
        assert!(lifecycle.tickets("broke").await.is_empty());
        assert_eq!(store.balances("broke").unwrap().wallet.paise(), 100);
    }

    #[tokio::test]
    async fn test_early_cancellation_refunds_80_percent_to_wallet() {
        let (store, lifecycle, graph) = setup();
        let travel = off_peak();
        let now = travel - Duration::days(3);

        // Pay by card so the refund landing in the WALLET is observable
        let c = lifecycle
            .book(&graph, "asha", "a", "b", 1, travel, true, now)
            .await
            .unwrap();
        assert_eq!(c.settlement.source, PaymentSource::Card);

        let refund = lifecycle.cancel("asha", c.ticket.id, now).await.unwrap();
        assert_eq!(refund.paise(), 1_800); // 80% of 2250

        let balances = store.balances("asha").unwrap();
        assert_eq!(balances.wallet.paise(), WALLET + 1_800);
        assert_eq!(balances.card.balance.paise(), 50_000 - 2_250);
    }

    #[tokio::test]
    async fn test_late_cancellation_refunds_50_percent() {
        let (_, lifecycle, graph) = setup();
        let travel = off_peak();
        let booked_at = travel - Duration::days(3);

        let c = lifecycle
            .book(&graph, "asha", "a", "b", 1, travel, false, booked_at)
            .await
            .unwrap();

        let refund = lifecycle
            .cancel("asha", c.ticket.id, travel - Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(refund.paise(), 1_125); // 50% of 2250
    }

    #[tokio::test]
    async fn test_second_cancellation_rejected() {
        let (_, lifecycle, graph) = setup();
        let travel = off_peak();
        let now = travel - Duration::days(3);

        let c = lifecycle
            .book(&graph, "asha", "a", "b", 1, travel, false, now)
            .await
            .unwrap();
        lifecycle.cancel("asha", c.ticket.id, now).await.unwrap();

        let err = lifecycle.cancel("asha", c.ticket.id, now).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::AlreadyCancelled { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_unknown_ticket() {
        let (_, lifecycle, _) = setup();
        let err = lifecycle.cancel("asha", 999, off_peak()).await.unwrap_err();
        assert!(matches!(err, EngineError::TicketNotFound { ticket_id: 999 }));
    }

    #[tokio::test]
    async fn test_tenth_booking_earns_loyalty_bonus() {
        let (store, lifecycle, graph) = setup();
        store.seed_rider(
            "ravi",
            Money::from_paise(1_000_000),
            CardState::new("card-ravi", Money::zero()),
        );
        let travel = off_peak();
        let now = travel - Duration::days(60);

        let mut wallet_spent = 0;
        for day in 0..9 {
            let c = lifecycle
                .book(&graph, "ravi", "a", "b", 1, travel + Duration::days(day), false, now)
                .await
                .unwrap();
            assert!(c.loyalty_awarded.is_none());
            wallet_spent += c.ticket.fare.paise();
        }

        // Cancel one: the tally counts lifetime bookings, not active ones
        let third = lifecycle.tickets("ravi").await[2].clone();
        let refund = lifecycle.cancel("ravi", third.id, now).await.unwrap();

        let c = lifecycle
            .book(&graph, "ravi", "a", "b", 1, travel + Duration::days(30), false, now)
            .await
            .unwrap();
        wallet_spent += c.ticket.fare.paise();
        assert_eq!(c.loyalty_awarded, Some(Money::from_paise(5_000)));

        assert_eq!(
            store.balances("ravi").unwrap().wallet.paise(),
            1_000_000 - wallet_spent + refund.paise() + 5_000
        );
    }

    #[tokio::test]
    async fn test_pass_purchase_and_zero_fare_booking() {
        let (store, lifecycle, graph) = setup();
        let travel = off_peak();
        let now = travel - Duration::days(3);

        let (pass, price) = lifecycle
            .buy_monthly_pass(&graph, "asha", "a", "b", now)
            .await
            .unwrap();
        // 20 × Rs 22.50 (single off-peak a→b at `now`, also 14:00)
        assert_eq!(price.paise(), 45_000);
        assert!(pass.covers("b", "a"));

        // The purchase was persisted; the quote now finds the pass
        let c = lifecycle
            .book(&graph, "asha", "b", "a", 1, travel, true, now)
            .await
            .unwrap();
        assert!(c.ticket.fare.is_zero());
        // zero-fare settlement touched neither balance
        assert_eq!(
            store.balances("asha").unwrap().wallet.paise(),
            WALLET - 45_000
        );
        assert_eq!(store.balances("asha").unwrap().card.balance.paise(), 50_000);
    }

    #[tokio::test]
    async fn test_duplicate_pass_rejected_in_either_direction() {
        let (store, lifecycle, graph) = setup();
        let now = off_peak();
        store.seed_pass("asha", MonthlyPass::new("a", "b"));

        let err = lifecycle
            .buy_monthly_pass(&graph, "asha", "b", "a", now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::DuplicatePass { .. })
        ));
    }
}
