//! # metro-engine: Orchestration Layer for the Metro Fare Engine
//!
//! Everything stateful lives here: balance settlement, ticket lifecycle,
//! login throttling, and the published station-graph snapshot. The pure
//! rules (fare pipeline, route distance, money arithmetic) come from
//! `metro-core`; this crate decides WHEN they run and makes their effects
//! stick through the persistence collaborator.
//!
//! ## Component Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            AppContext                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌────────────────┐  ┌──────────────┐                │
//! │  │ AccountLedger│  │ TicketLifecycle│  │ LoginThrottle│                │
//! │  │  settle()    │◄─┤  book()        │  │  attempt()   │                │
//! │  │  refunds     │  │  cancel()      │  │  15s lockout │                │
//! │  │  auto-top-up │  │  passes        │  │              │                │
//! │  └──────┬───────┘  └───────┬────────┘  └──────────────┘                │
//! │         │                  │                                            │
//! │         ▼                  ▼                                            │
//! │  ┌─────────────────────────────────────┐   ┌─────────────────────────┐ │
//! │  │     MetroStore (trait)              │   │ RwLock<Arc<StationGraph>>│ │
//! │  │  balances, tickets, passes, edges   │   │   snapshot publication  │ │
//! │  └─────────────────────────────────────┘   └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Model
//! - One `tokio::sync::Mutex` per rider account and per rider ticket list:
//!   same-rider operations serialize, cross-rider operations run freely
//! - The station graph is published as an immutable `Arc` snapshot;
//!   admin edits clone, mutate and swap, so readers never block on writers
//! - No lock is ever held across a store call AND an await point at once;
//!   store calls are synchronous and complete inside the critical section

pub mod booking;
pub mod context;
pub mod error;
pub mod ledger;
pub mod store;
pub mod throttle;

pub use booking::{BookingConfirmation, TicketLifecycle};
pub use context::AppContext;
pub use error::{EngineError, EngineResult};
pub use ledger::AccountLedger;
pub use store::{MemoryStore, MetroStore, RiderBalances, StationEdge, StoreError, StoreResult};
pub use throttle::{LoginOutcome, LoginThrottle, LOCKOUT_DURATION, MAX_LOGIN_ATTEMPTS};
