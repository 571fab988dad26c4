//! # Login Throttle
//!
//! Three-strike lockout for the sign-in path.
//!
//! ## Behaviour
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  wrong password #1  → InvalidCredentials (attempt 1 of 3)               │
//! │  wrong password #2  → InvalidCredentials (attempt 2 of 3)               │
//! │  wrong password #3  → account LOCKED for 15 seconds                     │
//! │                                                                         │
//! │  while locked       → Locked, even when the credentials are correct     │
//! │  correct password   → Success, counter resets to zero                   │
//! │  lock expiry        → counter AND lock clear together, atomically       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The unlock is a deferred one-shot task, not a timestamp compared on the
//! next attempt: after 15 seconds the account is clean again even if nobody
//! ever tries to sign in. The deadline is fixed at the moment of locking,
//! before the task is spawned, so the window never stretches with scheduler
//! latency. Re-locking an already scheduled account aborts the earlier task
//! so only the most recent schedule wins.
//!
//! ## Concurrency
//! One lock per username: the shared registry is held only long enough to
//! fetch the per-user handle, so attempts against different usernames never
//! serialize on each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Failed attempts tolerated before the lockout engages.
pub const MAX_LOGIN_ATTEMPTS: u32 = 3;

/// How long a locked account stays locked.
pub const LOCKOUT_DURATION: Duration = Duration::from_secs(15);

/// Outcome of one sign-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials accepted; the failure counter was reset.
    Success,
    /// Credentials rejected; `attempt` of `limit` strikes used.
    InvalidCredentials { attempt: u32, limit: u32 },
    /// The account is locked out; credentials were not evaluated.
    Locked,
}

#[derive(Default)]
struct UserThrottleState {
    /// Consecutive failed attempts since the last success or unlock.
    failures: u32,
    locked: bool,
    /// Pending deferred unlock, aborted if the lock is re-armed.
    unlock_task: Option<JoinHandle<()>>,
}

// =============================================================================
// Login Throttle
// =============================================================================

/// Per-username failure counting with timed lockout.
///
/// Cheap to clone; all clones share one state registry.
#[derive(Clone, Default)]
pub struct LoginThrottle {
    registry: Arc<Mutex<HashMap<String, Arc<Mutex<UserThrottleState>>>>>,
}

impl LoginThrottle {
    pub fn new() -> Self {
        LoginThrottle::default()
    }

    /// Returns the username's state lock, creating it on first sight.
    async fn state_handle(&self, username: &str) -> Arc<Mutex<UserThrottleState>> {
        let mut registry = self.registry.lock().await;
        Arc::clone(
            registry
                .entry(username.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(UserThrottleState::default()))),
        )
    }

    /// Records one sign-in attempt.
    ///
    /// The caller verifies the credentials and passes the result in; the
    /// throttle only decides whether that result may take effect. A locked
    /// account rejects the attempt without looking at `credentials_ok`.
    pub async fn attempt(&self, username: &str, credentials_ok: bool) -> LoginOutcome {
        let handle = self.state_handle(username).await;
        let mut state = handle.lock().await;

        if state.locked {
            debug!(user = %username, "Sign-in attempt while locked out");
            return LoginOutcome::Locked;
        }

        if credentials_ok {
            state.failures = 0;
            return LoginOutcome::Success;
        }

        state.failures += 1;
        if state.failures < MAX_LOGIN_ATTEMPTS {
            return LoginOutcome::InvalidCredentials {
                attempt: state.failures,
                limit: MAX_LOGIN_ATTEMPTS,
            };
        }

        // Third strike: lock now, unlock later via a one-shot task. The
        // deadline is fixed here, under the state lock, so the window runs
        // from the moment of locking regardless of when the task first
        // polls. If a stale unlock task is still pending, abort it so this
        // lock runs its full duration.
        state.locked = true;
        if let Some(stale) = state.unlock_task.take() {
            stale.abort();
        }
        warn!(user = %username, seconds = LOCKOUT_DURATION.as_secs(), "Account locked after repeated failures");

        let deadline = Instant::now() + LOCKOUT_DURATION;
        let unlock_handle = Arc::clone(&handle);
        let user = username.to_string();
        state.unlock_task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let mut state = unlock_handle.lock().await;
            state.locked = false;
            state.failures = 0;
            state.unlock_task = None;
            debug!(user = %user, "Lockout expired, account unlocked");
        }));

        LoginOutcome::Locked
    }

    /// Whether the account is currently locked out.
    pub async fn is_locked(&self, username: &str) -> bool {
        let handle = self.state_handle(username).await;
        let state = handle.lock().await;
        state.locked
    }

    /// Current consecutive-failure count (0 for unknown accounts).
    pub async fn failures(&self, username: &str) -> u32 {
        let handle = self.state_handle(username).await;
        let state = handle.lock().await;
        state.failures
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
