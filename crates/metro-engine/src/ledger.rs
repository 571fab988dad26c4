//! # Account Ledger
//!
//! Atomic mutation of a rider's two balances (wallet, card) with the
//! auto-recharge policy.
//!
//! ## Settlement Policy (prefer_card = true)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  card >= amount      → deduct fully from card                           │
//! │                        (then single-shot auto-recharge if the card      │
//! │                         fell under its threshold and the wallet can    │
//! │                         afford the top-up)                              │
//! │                                                                         │
//! │  card == 0           → NO split attempt: the card is considered        │
//! │                        unusable at zero. Settlement fails even when    │
//! │                        the wallet alone could cover the fare. This is  │
//! │                        deliberate policy, not a bug.                   │
//! │                                                                         │
//! │  0 < card < amount   → split: drain the card, take the remainder from  │
//! │                        the wallet — but only after reserving wallet    │
//! │                        headroom for the predicted auto-recharge        │
//! │                        top-up that fires right after the card is      │
//! │                        drained. If the wallet cannot cover             │
//! │                        (remainder + predicted top-up), the whole       │
//! │                        settlement fails with NO partial deduction.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! With `prefer_card = false` the full amount comes from the wallet only.
//!
//! ## Atomicity
//! The full required total is computed BEFORE any balance is touched; the
//! card deduction, wallet deduction and optional auto-recharge transfer
//! then apply as one logical transaction under the rider's account lock.
//! A persistence failure rolls the in-memory mutation back before the
//! error is returned.
//!
//! ## Concurrency
//! One `tokio::sync::Mutex` per rider account: two devices settling against
//! the same rider serialize, unrelated riders never contend. Settlement is
//! a short non-interruptible critical section with no await points while
//! the account lock is held.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::store::MetroStore;
use metro_core::{CardState, CoreError, Money, PaymentSource, Settlement, LOYALTY_BONUS_PAISE};

// =============================================================================
// Rider Account
// =============================================================================

/// In-memory view of one rider's balance pair.
///
/// ## Invariants
/// - `wallet >= 0` and `card.balance >= 0` at all times
/// - Mutated only under the account lock held by [`AccountLedger`]
#[derive(Debug, Clone)]
pub struct RiderAccount {
    pub username: String,
    pub wallet: Money,
    pub card: CardState,
}

/// The deduction plan for one settlement, computed before any mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SettlePlan {
    card_portion: Money,
    wallet_portion: Money,
    auto_recharge_transfer: Money,
}

impl SettlePlan {
    fn source(&self) -> PaymentSource {
        match (self.card_portion.is_positive(), self.wallet_portion.is_positive()) {
            (true, true) => PaymentSource::Split,
            (true, false) => PaymentSource::Card,
            _ => PaymentSource::Wallet,
        }
    }
}

// =============================================================================
// Account Ledger
// =============================================================================

/// Owner of all balance mutations.
///
/// No other component touches a rider's wallet or card directly; booking,
/// cancellation refunds and loyalty credits all flow through here.
pub struct AccountLedger {
    store: Arc<dyn MetroStore>,
    /// Registry of per-rider account locks, keyed by username.
    accounts: Mutex<HashMap<String, Arc<Mutex<RiderAccount>>>>,
}

impl AccountLedger {
    /// Creates a ledger backed by the given persistence collaborator.
    pub fn new(store: Arc<dyn MetroStore>) -> Self {
        AccountLedger {
            store,
            accounts: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the rider's account lock, loading balances from the store on
    /// first access.
    async fn account_handle(&self, username: &str) -> EngineResult<Arc<Mutex<RiderAccount>>> {
        let mut registry = self.accounts.lock().await;
        if let Some(handle) = registry.get(username) {
            return Ok(Arc::clone(handle));
        }

        let balances = self.store.load_rider_balances(username)?;
        debug!(rider = %username, wallet = %balances.wallet, card = %balances.card.balance, "Loaded rider balances");
        let handle = Arc::new(Mutex::new(RiderAccount {
            username: username.to_string(),
            wallet: balances.wallet,
            card: balances.card,
        }));
        registry.insert(username.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Current (wallet, card) balances for a rider.
    pub async fn balances(&self, username: &str) -> EngineResult<(Money, Money)> {
        let handle = self.account_handle(username).await?;
        let acct = handle.lock().await;
        Ok((acct.wallet, acct.card.balance))
    }

    /// Settles `amount` against the rider's balance pair.
    ///
    /// See the module doc for the full policy. A zero amount (pass-covered
    /// trip) settles trivially with no balance mutation.
    pub async fn settle(
        &self,
        username: &str,
        amount: Money,
        prefer_card: bool,
    ) -> EngineResult<Settlement> {
        if amount.is_zero() {
            debug!(rider = %username, "Zero-fare settlement, no balances touched");
            return Ok(Settlement {
                id: Uuid::new_v4().to_string(),
                rider: username.to_string(),
                source: PaymentSource::Wallet,
                card_portion: Money::zero(),
                wallet_portion: Money::zero(),
                auto_recharge_transfer: Money::zero(),
                settled_at: Utc::now(),
            });
        }

        let handle = self.account_handle(username).await?;
        let mut acct = handle.lock().await;

        // Compute the full plan before mutating anything.
        let plan = Self::compute_plan(&acct, amount, prefer_card)?;

        let wallet_before = acct.wallet;
        let card_before = acct.card.balance;

        acct.card.balance -= plan.card_portion;
        acct.wallet -= plan.wallet_portion;
        if plan.auto_recharge_transfer.is_positive() {
            acct.wallet -= plan.auto_recharge_transfer;
            acct.card.balance += plan.auto_recharge_transfer;
            info!(
                rider = %username,
                transfer = %plan.auto_recharge_transfer,
                card = %acct.card.balance,
                "Auto-recharged card from wallet"
            );
        }

        // Money is moved, never created: the pair lost exactly `amount`.
        debug_assert_eq!(
            wallet_before + card_before,
            acct.wallet + acct.card.balance + amount
        );

        if let Err(err) = self.store.persist_wallet_balance(username, acct.wallet) {
            acct.wallet = wallet_before;
            acct.card.balance = card_before;
            warn!(rider = %username, error = %err, "Settlement persistence failed, rolled back");
            return Err(err.into());
        }
        if let Err(err) = self.store.persist_card_state(&acct.card) {
            acct.wallet = wallet_before;
            acct.card.balance = card_before;
            // The wallet write already stuck; compensate it so the durable
            // view matches the rolled-back balances.
            if let Err(comp_err) = self.store.persist_wallet_balance(username, wallet_before) {
                warn!(rider = %username, error = %comp_err, "Compensating wallet write failed, durable state inconsistent");
            }
            warn!(rider = %username, error = %err, "Settlement persistence failed, rolled back");
            return Err(err.into());
        }

        let settlement = Settlement {
            id: Uuid::new_v4().to_string(),
            rider: username.to_string(),
            source: plan.source(),
            card_portion: plan.card_portion,
            wallet_portion: plan.wallet_portion,
            auto_recharge_transfer: plan.auto_recharge_transfer,
            settled_at: Utc::now(),
        };
        info!(
            rider = %username,
            amount = %amount,
            source = ?settlement.source,
            wallet = %acct.wallet,
            card = %acct.card.balance,
            "Settlement complete"
        );
        Ok(settlement)
    }

    /// Computes the deduction plan without touching any balance.
    fn compute_plan(
        acct: &RiderAccount,
        amount: Money,
        prefer_card: bool,
    ) -> Result<SettlePlan, CoreError> {
        if !prefer_card {
            if acct.wallet < amount {
                return Err(CoreError::InsufficientFunds {
                    required: amount,
                    shortfall: amount - acct.wallet,
                });
            }
            return Ok(SettlePlan {
                card_portion: Money::zero(),
                wallet_portion: amount,
                auto_recharge_transfer: Money::zero(),
            });
        }

        let card = &acct.card;

        if card.balance >= amount {
            // Full card payment; top up afterwards if the deduction left the
            // card under its threshold and the wallet can afford the fixed
            // transfer. An unaffordable top-up is skipped, not an error.
            let post = card.balance - amount;
            let transfer = if card.auto_recharge_enabled && post < card.min_threshold {
                let t = card.auto_recharge_amount(Money::zero());
                if acct.wallet >= t {
                    t
                } else {
                    Money::zero()
                }
            } else {
                Money::zero()
            };
            return Ok(SettlePlan {
                card_portion: amount,
                wallet_portion: Money::zero(),
                auto_recharge_transfer: transfer,
            });
        }

        if card.balance.is_zero() {
            // A zero-balance card is unusable under card-preferred payment:
            // no split is attempted even when the wallet could cover the
            // full amount on its own.
            warn!(rider = %acct.username, "Card at zero balance, split not attempted");
            return Err(CoreError::InsufficientFunds {
                required: amount,
                shortfall: amount,
            });
        }

        // Split settlement. The drained card lands at zero, so the top-up
        // fires whenever auto-recharge is on with a positive threshold;
        // reserve wallet headroom for it up front.
        let wallet_needed = amount - card.balance;
        let predicted = if card.auto_recharge_enabled && card.min_threshold.is_positive() {
            card.auto_recharge_amount(Money::zero())
        } else {
            Money::zero()
        };
        let required_from_wallet = wallet_needed + predicted;

        if acct.wallet < required_from_wallet {
            return Err(CoreError::InsufficientFunds {
                required: amount,
                shortfall: required_from_wallet - acct.wallet,
            });
        }

        Ok(SettlePlan {
            card_portion: card.balance,
            wallet_portion: wallet_needed,
            auto_recharge_transfer: predicted,
        })
    }

    /// Reverses a settlement exactly (used when a later persistence step of
    /// the booking fails and the payment must be undone).
    pub async fn undo_settlement(&self, settlement: &Settlement) -> EngineResult<()> {
        let handle = self.account_handle(&settlement.rider).await?;
        let mut acct = handle.lock().await;

        acct.wallet += settlement.wallet_portion + settlement.auto_recharge_transfer;
        acct.card.balance = acct.card.balance + settlement.card_portion
            - settlement.auto_recharge_transfer;

        self.store
            .persist_wallet_balance(&settlement.rider, acct.wallet)?;
        self.store.persist_card_state(&acct.card)?;
        info!(rider = %settlement.rider, amount = %settlement.amount(), "Settlement reversed");
        Ok(())
    }

    /// Credits the wallet (refunds, loyalty rewards).
    ///
    /// A wallet credit never evaluates auto-recharge: only card deductions
    /// do. Rolls back in-memory state if the store rejects the write.
    pub async fn credit_wallet(&self, username: &str, amount: Money) -> EngineResult<Money> {
        let handle = self.account_handle(username).await?;
        let mut acct = handle.lock().await;

        let before = acct.wallet;
        acct.wallet += amount;
        if let Err(err) = self.store.persist_wallet_balance(username, acct.wallet) {
            acct.wallet = before;
            return Err(err.into());
        }
        debug!(rider = %username, credit = %amount, wallet = %acct.wallet, "Wallet credited");
        Ok(acct.wallet)
    }

    /// Issues the fixed loyalty bonus to the wallet.
    pub async fn credit_loyalty(&self, username: &str) -> EngineResult<Money> {
        let bonus = Money::from_paise(LOYALTY_BONUS_PAISE);
        info!(rider = %username, bonus = %bonus, "Loyalty reward credited");
        self.credit_wallet(username, bonus).await
    }

    /// Manual card recharge. A credit, not a deduction, so auto-recharge is
    /// never evaluated here.
    pub async fn recharge_card(&self, username: &str, amount: Money) -> EngineResult<Money> {
        metro_core::validation::validate_recharge_amount(amount.paise())
            .map_err(CoreError::from)?;

        let handle = self.account_handle(username).await?;
        let mut acct = handle.lock().await;

        let before = acct.card.balance;
        acct.card.balance += amount;
        if let Err(err) = self.store.persist_card_state(&acct.card) {
            acct.card.balance = before;
            return Err(err.into());
        }
        info!(rider = %username, amount = %amount, card = %acct.card.balance, "Card recharged");
        Ok(acct.card.balance)
    }

    /// Manual wallet top-up.
    pub async fn top_up_wallet(&self, username: &str, amount: Money) -> EngineResult<Money> {
        metro_core::validation::validate_recharge_amount(amount.paise())
            .map_err(CoreError::from)?;
        self.credit_wallet(username, amount).await
    }

    /// Updates the card's auto-recharge configuration.
    pub async fn set_auto_recharge(
        &self,
        username: &str,
        enabled: bool,
        min_threshold: Option<Money>,
    ) -> EngineResult<()> {
        if let Some(threshold) = min_threshold {
            metro_core::validation::validate_threshold(threshold.paise())
                .map_err(CoreError::from)?;
        }

        let handle = self.account_handle(username).await?;
        let mut acct = handle.lock().await;

        let before = acct.card.clone();
        acct.card.auto_recharge_enabled = enabled;
        if let Some(threshold) = min_threshold {
            acct.card.min_threshold = threshold;
        }
        if let Err(err) = self.store.persist_card_state(&acct.card) {
            acct.card = before;
            return Err(err.into());
        }
        debug!(rider = %username, enabled, "Auto-recharge configuration updated");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
