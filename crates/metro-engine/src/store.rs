//! # Persistence Collaborator
//!
//! The engine is storage-agnostic: durable writes are delegated to an
//! out-of-scope persistence layer reached through the narrow [`MetroStore`]
//! trait defined here.
//!
//! ## Collaborator Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    MetroStore Operations                                │
//! │                                                                         │
//! │  load_rider_balances(username)      → (wallet, card state)             │
//! │  persist_wallet_balance(username)   → ok / fail                        │
//! │  persist_card_state(card)           → ok / fail                        │
//! │  persist_ticket(ticket)             → generated id / fail              │
//! │  persist_ticket_cancellation(id)    → ok / fail                        │
//! │  persist_monthly_pass(username, ..) → ok / fail                        │
//! │  load_station_edges()               → [(a, b, km)]                     │
//! │  load_active_monthly_passes(user)   → [pass routes]                    │
//! │                                                                         │
//! │  Calls are synchronous and fail-reportable. A failure after an         │
//! │  in-memory balance mutation makes the engine roll that mutation back   │
//! │  before returning EngineError::Persistence.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`MemoryStore`] is the in-process reference implementation used by tests
//! and the demo context. A production deployment swaps in a database-backed
//! implementation behind the same trait.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use metro_core::fare::MonthlyPass;
use metro_core::{CardState, Money, Ticket};

// =============================================================================
// Store Error
// =============================================================================

/// Persistence collaborator failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The entity does not exist in the store.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The store rejected the write (constraint violation, bad payload).
    #[error("store rejected write: {0}")]
    Rejected(String),

    /// The store cannot be reached or is failing.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Data Transfer Types
// =============================================================================

/// A rider's balance pair as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderBalances {
    pub wallet: Money,
    pub card: CardState,
}

/// One undirected station edge as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationEdge {
    pub a: String,
    pub b: String,
    pub distance_km: u32,
}

// =============================================================================
// MetroStore Trait
// =============================================================================

/// Narrow interface to the persistence/reporting layer.
///
/// Implementations must be safe to call from multiple sessions; each call
/// blocks only the calling session.
pub trait MetroStore: Send + Sync {
    /// Loads a rider's wallet balance and card state.
    fn load_rider_balances(&self, username: &str) -> StoreResult<RiderBalances>;

    /// Persists a rider's new wallet balance.
    fn persist_wallet_balance(&self, username: &str, new_balance: Money) -> StoreResult<()>;

    /// Persists a card's balance and auto-recharge configuration.
    fn persist_card_state(&self, card: &CardState) -> StoreResult<()>;

    /// Persists a confirmed ticket; the store generates and returns its id.
    /// The `id` field of the passed ticket is ignored.
    fn persist_ticket(&self, ticket: &Ticket) -> StoreResult<i64>;

    /// Marks a ticket cancelled in the store.
    fn persist_ticket_cancellation(&self, ticket_id: i64) -> StoreResult<()>;

    /// Records a purchased monthly pass.
    fn persist_monthly_pass(
        &self,
        username: &str,
        pass: &MonthlyPass,
        price: Money,
        purchased_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Loads all station edges for graph bootstrap.
    fn load_station_edges(&self) -> StoreResult<Vec<StationEdge>>;

    /// Loads a rider's active monthly pass routes.
    fn load_active_monthly_passes(&self, username: &str) -> StoreResult<Vec<MonthlyPass>>;
}

// =============================================================================
// In-Memory Reference Store
// =============================================================================

#[derive(Debug, Default)]
struct MemoryStoreInner {
    riders: HashMap<String, RiderBalances>,
    passes: HashMap<String, Vec<MonthlyPass>>,
    tickets: HashMap<i64, Ticket>,
    edges: Vec<StationEdge>,
    next_ticket_id: i64,
}

/// In-memory [`MetroStore`] implementation.
///
/// Backs the integration tests and the demo context. A `std::sync::Mutex`
/// is enough here: every operation is a short map access with no await
/// points.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Creates a store pre-seeded with the fixed five-station network.
    pub fn with_demo_network() -> Self {
        let store = MemoryStore::new();
        {
            let mut inner = store.inner.lock().expect("store mutex poisoned");
            for (a, b, km) in [("a", "b", 5), ("b", "c", 3), ("c", "d", 7), ("d", "e", 4), ("a", "e", 12)]
            {
                inner.edges.push(StationEdge {
                    a: a.to_string(),
                    b: b.to_string(),
                    distance_km: km,
                });
            }
        }
        store
    }

    /// Seeds a rider with a wallet balance and card state.
    pub fn seed_rider(&self, username: &str, wallet: Money, card: CardState) {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner
            .riders
            .insert(username.to_string(), RiderBalances { wallet, card });
    }

    /// Seeds an active monthly pass for a rider.
    pub fn seed_pass(&self, username: &str, pass: MonthlyPass) {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.passes.entry(username.to_string()).or_default().push(pass);
    }

    /// Returns a stored ticket by id, for test assertions.
    pub fn ticket(&self, ticket_id: i64) -> Option<Ticket> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner.tickets.get(&ticket_id).cloned()
    }

    /// Returns a rider's stored balances, for test assertions.
    pub fn balances(&self, username: &str) -> Option<RiderBalances> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner.riders.get(username).cloned()
    }
}

impl MetroStore for MemoryStore {
    fn load_rider_balances(&self, username: &str) -> StoreResult<RiderBalances> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner
            .riders
            .get(username)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Rider", username))
    }

    fn persist_wallet_balance(&self, username: &str, new_balance: Money) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let rider = inner
            .riders
            .get_mut(username)
            .ok_or_else(|| StoreError::not_found("Rider", username))?;
        rider.wallet = new_balance;
        Ok(())
    }

    fn persist_card_state(&self, card: &CardState) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let rider = inner
            .riders
            .values_mut()
            .find(|r| r.card.id == card.id)
            .ok_or_else(|| StoreError::not_found("Card", &card.id))?;
        rider.card = card.clone();
        Ok(())
    }

    fn persist_ticket(&self, ticket: &Ticket) -> StoreResult<i64> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.next_ticket_id += 1;
        let id = inner.next_ticket_id;
        let mut stored = ticket.clone();
        stored.id = id;
        inner.tickets.insert(id, stored);
        Ok(id)
    }

    fn persist_ticket_cancellation(&self, ticket_id: i64) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let ticket = inner
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| StoreError::not_found("Ticket", ticket_id.to_string()))?;
        ticket.cancelled = true;
        Ok(())
    }

    fn persist_monthly_pass(
        &self,
        username: &str,
        pass: &MonthlyPass,
        _price: Money,
        _purchased_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner
            .passes
            .entry(username.to_string())
            .or_default()
            .push(pass.clone());
        Ok(())
    }

    fn load_station_edges(&self) -> StoreResult<Vec<StationEdge>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.edges.clone())
    }

    fn load_active_monthly_passes(&self, username: &str) -> StoreResult<Vec<MonthlyPass>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.passes.get(username).cloned().unwrap_or_default())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn card(balance: i64) -> CardState {
        CardState::new("card-1", Money::from_paise(balance))
    }

    #[test]
    fn test_load_unknown_rider_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.load_rider_balances("ghost"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_seed_and_load_rider() {
        let store = MemoryStore::new();
        store.seed_rider("asha", Money::from_paise(10_000), card(5_000));

        let balances = store.load_rider_balances("asha").unwrap();
        assert_eq!(balances.wallet.paise(), 10_000);
        assert_eq!(balances.card.balance.paise(), 5_000);
    }

    #[test]
    fn test_persist_ticket_generates_sequential_ids() {
        let store = MemoryStore::new();
        let ticket = Ticket {
            id: 0,
            owner: "asha".to_string(),
            source: "a".to_string(),
            destination: "b".to_string(),
            passengers: 1,
            fare: Money::from_paise(2250),
            travel_date: Utc::now(),
            cancelled: false,
            booked_at: Utc::now(),
        };

        assert_eq!(store.persist_ticket(&ticket).unwrap(), 1);
        assert_eq!(store.persist_ticket(&ticket).unwrap(), 2);
        assert_eq!(store.ticket(1).unwrap().id, 1);
    }

    #[test]
    fn test_cancellation_requires_existing_ticket() {
        let store = MemoryStore::new();
        assert!(store.persist_ticket_cancellation(99).is_err());
    }

    #[test]
    fn test_demo_network_edges() {
        let store = MemoryStore::with_demo_network();
        let edges = store.load_station_edges().unwrap();
        assert_eq!(edges.len(), 5);
        assert!(edges.iter().any(|e| e.a == "a" && e.b == "e" && e.distance_km == 12));
    }

    #[test]
    fn test_passes_default_empty() {
        let store = MemoryStore::new();
        assert!(store.load_active_monthly_passes("asha").unwrap().is_empty());

        store.seed_pass("asha", MonthlyPass::new("a", "b"));
        assert_eq!(store.load_active_monthly_passes("asha").unwrap().len(), 1);
    }
}
