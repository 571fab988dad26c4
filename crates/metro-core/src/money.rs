//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In a ledger that moves money between two balances, drift like this    │
//! │  eventually creates or destroys paise.                                  │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    Balances, settlements and refunds are all held in i64 paise.         │
//! │    The fare pipeline runs its modifier chain in f64 and converts to     │
//! │    Money exactly once, at the final quote.                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use metro_core::money::Money;
//!
//! // Create from paise (preferred for balances)
//! let fare = Money::from_paise(2250); // Rs 22.50
//!
//! // Fare pipeline output: round to 2 decimals exactly once
//! let quoted = Money::from_rupees(22.5);
//! assert_eq!(fare, quoted);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in paise (the smallest currency unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate shortfall math may go negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support for handing values to the store
///
/// ## Where Money is Used
/// ```text
/// FareQuote.total ──► AccountLedger.settle(amount) ──► Settlement portions
///                                    │
///                                    └──► wallet / card balances
/// ```
/// Every monetary value in the system flows through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ## Example
    /// ```rust
    /// use metro_core::money::Money;
    ///
    /// let fare = Money::from_paise(2250); // Rs 22.50
    /// assert_eq!(fare.paise(), 2250);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from an f64 rupee amount, rounding half-up to
    /// the nearest paisa.
    ///
    /// This is the ONLY place the fare pipeline's f64 arithmetic touches
    /// integer money: intermediate modifier math stays unrounded, and the
    /// final quote is rounded to 2 decimal places here.
    ///
    /// ## Example
    /// ```rust
    /// use metro_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees(22.5).paise(), 2250);
    /// assert_eq!(Money::from_rupees(270.0).paise(), 27000);
    /// assert_eq!(Money::from_rupees(0.005).paise(), 1);
    /// ```
    #[inline]
    pub fn from_rupees(rupees: f64) -> Self {
        Money((rupees * 100.0).round() as i64)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    ///
    /// ## Example
    /// ```rust
    /// use metro_core::money::Money;
    ///
    /// let fare = Money::from_paise(2250);
    /// assert_eq!(fare.rupees(), 22);
    /// ```
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the value as f64 rupees, for feeding a balance back into the
    /// fare pipeline's shortfall math. Display/storage never uses this.
    #[inline]
    pub fn as_rupees_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Saturating subtraction that never goes below zero.
    ///
    /// Balance invariants require wallet and card to stay >= 0; callers
    /// validate affordability first, so this is a belt on top of that check.
    #[inline]
    pub const fn saturating_sub(&self, other: Self) -> Self {
        let v = self.0 - other.0;
        Money(if v < 0 { 0 } else { v })
    }

    /// Applies a refund rate (e.g. 0.8 or 0.5) and rounds to the paisa.
    ///
    /// ## Example
    /// ```rust
    /// use metro_core::money::Money;
    ///
    /// let fare = Money::from_paise(2250);
    /// assert_eq!(fare.apply_rate(0.8).paise(), 1800);
    /// assert_eq!(fare.apply_rate(0.5).paise(), 1125);
    /// ```
    #[inline]
    pub fn apply_rate(&self, rate: f64) -> Self {
        Money::from_rupees(self.as_rupees_f64() * rate)
    }

    /// Returns the larger of two Money values.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for debugging and log output. Presentation formatting is the
/// caller's concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Rs {}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (e.g. threshold × 2 for auto-recharge).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, n: i64) -> Self {
        Money(self.0 * n)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
