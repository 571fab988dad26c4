//! # Application Context
//!
//! Wires the engine components together and owns the published station
//! graph snapshot.
//!
//! ## Snapshot Publication
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   readers (quote, book)          admin (add_station, add_edge)          │
//! │        │                                 │                              │
//! │        ▼                                 ▼                              │
//! │   clone Arc<StationGraph>         clone graph, mutate the copy,        │
//! │   under a short read lock,        swap the Arc under the write lock    │
//! │   then work lock-free                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Readers never observe a half-edited network: an admin edit builds the
//! replacement graph fully before publishing it. The `std::sync::RwLock` is
//! never held across an await point (the Arc is cloned out first).

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::booking::{BookingConfirmation, TicketLifecycle};
use crate::error::EngineResult;
use crate::ledger::AccountLedger;
use crate::store::MetroStore;
use crate::throttle::{LoginOutcome, LoginThrottle};
use metro_core::fare::MonthlyPass;
use metro_core::validation::{validate_station_code, validate_username};
use metro_core::{CoreError, FareCalculator, FareQuote, Money, Station, StationGraph, Ticket};

/// Shared engine state: graph snapshot, ledger, lifecycle, throttle.
pub struct AppContext {
    graph: RwLock<Arc<StationGraph>>,
    pub ledger: Arc<AccountLedger>,
    pub lifecycle: TicketLifecycle,
    pub throttle: LoginThrottle,
    store: Arc<dyn MetroStore>,
}

impl AppContext {
    /// Builds the context, loading the station network from the store.
    ///
    /// Every edge endpoint is registered as a station; stores that carry
    /// richer station records can overwrite them later via
    /// [`AppContext::add_station`].
    pub fn bootstrap(store: Arc<dyn MetroStore>) -> EngineResult<Self> {
        let mut graph = StationGraph::new();
        let edges = store.load_station_edges()?;
        for edge in &edges {
            for code in [&edge.a, &edge.b] {
                if !graph.contains(code) {
                    graph.add_station(Station::new(code, code, false, false, false));
                }
            }
            graph.add_or_update_edge(&edge.a, &edge.b, edge.distance_km);
        }
        info!(stations = graph.len(), edges = edges.len(), "Station network loaded");

        let ledger = Arc::new(AccountLedger::new(Arc::clone(&store)));
        let lifecycle = TicketLifecycle::new(
            Arc::clone(&store),
            Arc::clone(&ledger),
            FareCalculator::new(),
        );

        Ok(AppContext {
            graph: RwLock::new(Arc::new(graph)),
            ledger,
            lifecycle,
            throttle: LoginThrottle::new(),
            store,
        })
    }

    /// The persistence collaborator this context was built on.
    pub fn store(&self) -> &Arc<dyn MetroStore> {
        &self.store
    }

    /// Current published graph snapshot.
    pub fn graph(&self) -> Arc<StationGraph> {
        Arc::clone(&self.graph.read().expect("graph lock poisoned"))
    }

    /// Replaces the published graph with an edited copy containing the
    /// station.
    pub fn add_station(&self, station: Station) -> EngineResult<()> {
        validate_station_code(&station.code).map_err(CoreError::from)?;

        let mut slot = self.graph.write().expect("graph lock poisoned");
        let mut next = (**slot).clone();
        info!(code = %station.code, "Station registered");
        next.add_station(station);
        *slot = Arc::new(next);
        Ok(())
    }

    /// Replaces the published graph with an edited copy containing the
    /// edge. Unknown endpoints are registered as bare stations first.
    pub fn add_edge(&self, a: &str, b: &str, km: u32) -> EngineResult<()> {
        validate_station_code(a).map_err(CoreError::from)?;
        validate_station_code(b).map_err(CoreError::from)?;

        let mut slot = self.graph.write().expect("graph lock poisoned");
        let mut next = (**slot).clone();
        for code in [a, b] {
            if !next.contains(code) {
                next.add_station(Station::new(code, code, false, false, false));
            }
        }
        next.add_or_update_edge(a, b, km);
        info!(a = %a, b = %b, km, "Edge published");
        *slot = Arc::new(next);
        Ok(())
    }

    /// Records a sign-in attempt against the lockout throttle.
    ///
    /// A locked-out username surfaces as [`CoreError::AccountLocked`];
    /// the `Success` / `InvalidCredentials` outcomes pass through so the
    /// caller can report remaining strikes.
    pub async fn login(&self, username: &str, credentials_ok: bool) -> EngineResult<LoginOutcome> {
        validate_username(username).map_err(CoreError::from)?;

        match self.throttle.attempt(username, credentials_ok).await {
            LoginOutcome::Locked => Err(CoreError::AccountLocked {
                username: username.to_string(),
            }
            .into()),
            outcome => Ok(outcome),
        }
    }

    /// Quotes a fare against the current network without booking.
    pub async fn quote(
        &self,
        rider: &str,
        source: &str,
        destination: &str,
        passengers: u32,
        travel_at: DateTime<Utc>,
    ) -> EngineResult<FareQuote> {
        let graph = self.graph();
        self.lifecycle
            .preview_fare(&graph, rider, source, destination, passengers, travel_at)
            .await
    }

    /// Books a ticket against the current network snapshot.
    #[allow(clippy::too_many_arguments)]
    pub async fn book(
        &self,
        rider: &str,
        source: &str,
        destination: &str,
        passengers: u32,
        travel_date: DateTime<Utc>,
        prefer_card: bool,
        now: DateTime<Utc>,
    ) -> EngineResult<BookingConfirmation> {
        let graph = self.graph();
        self.lifecycle
            .book(
                &graph,
                rider,
                source,
                destination,
                passengers,
                travel_date,
                prefer_card,
                now,
            )
            .await
    }

    /// Cancels one of the rider's tickets; returns the wallet refund.
    pub async fn cancel(
        &self,
        rider: &str,
        ticket_id: i64,
        now: DateTime<Utc>,
    ) -> EngineResult<Money> {
        self.lifecycle.cancel(rider, ticket_id, now).await
    }

    /// Buys a monthly pass priced off the current network.
    pub async fn buy_monthly_pass(
        &self,
        rider: &str,
        source: &str,
        destination: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<(MonthlyPass, Money)> {
        let graph = self.graph();
        self.lifecycle
            .buy_monthly_pass(&graph, rider, source, destination, now)
            .await
    }

    /// Snapshot of a rider's tickets.
    pub async fn tickets(&self, rider: &str) -> Vec<Ticket> {
        self.lifecycle.tickets(rider).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
