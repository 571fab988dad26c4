//! # Fare Calculation Module
//!
//! Pure fare pipeline composing base fare, time-of-day, calendar-event, and
//! group-size modifiers, plus the monthly-pass override.
//!
//! ## Modifier Chain (order matters)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fare Pipeline                                    │
//! │                                                                         │
//! │  1. Monthly pass covers route?  ──yes──► Rs 0 quote, stop here          │
//! │              │ no                                                       │
//! │              ▼                                                          │
//! │  2. dist = graph.distance(src, dst)   (must be chargeable)             │
//! │              ▼                                                          │
//! │  3. base = dist × passengers × Rs 5                                    │
//! │              ▼                                                          │
//! │  4. Peak hour [8,10] ∪ [17,19] → ×1.20   else → ×0.90                  │
//! │              ▼                                                          │
//! │  5. Special calendar date → × table multiplier (if present)            │
//! │              ▼                                                          │
//! │  6. Group: 5-9 passengers ×0.95, ≥10 ×0.90                             │
//! │              ▼                                                          │
//! │  Round to 2 decimals ONCE, at the final quote                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each modifier multiplies the running f64 total; intermediate values stay
//! unrounded so the chain composes exactly. The monthly-pass bulk price
//! reuses the same pipeline (`pass_price` = single off-peak-or-whatever
//! quote × 20), so any change to the modifier chain automatically affects
//! pass pricing.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::graph::{RouteDistance, StationGraph};
use crate::money::Money;
use crate::{BASE_FARE_PER_KM, PASS_TRIP_EQUIVALENT};

// =============================================================================
// Monthly Pass
// =============================================================================

/// A prepaid route override that zeroes fare for matching trips.
///
/// Coverage is direction-insensitive: a pass bought for a→b also covers b→a.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPass {
    pub source: String,
    pub destination: String,
}

impl MonthlyPass {
    pub fn new(source: &str, destination: &str) -> Self {
        MonthlyPass {
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }

    /// True when this pass covers the trip in either direction.
    pub fn covers(&self, source: &str, destination: &str) -> bool {
        (self.source == source && self.destination == destination)
            || (self.source == destination && self.destination == source)
    }
}

// =============================================================================
// Time Band
// =============================================================================

/// Which time-of-day multiplier applied to a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBand {
    /// Hour-of-day in [8,10] or [17,19]: ×1.20.
    Peak,
    /// Every other hour: ×0.90.
    OffPeak,
}

impl TimeBand {
    /// Classifies an hour of day (0-23).
    pub fn for_hour(hour: u32) -> Self {
        if (8..=10).contains(&hour) || (17..=19).contains(&hour) {
            TimeBand::Peak
        } else {
            TimeBand::OffPeak
        }
    }

    /// The fare multiplier for this band.
    pub fn multiplier(&self) -> f64 {
        match self {
            TimeBand::Peak => 1.20,
            TimeBand::OffPeak => 0.90,
        }
    }
}

// =============================================================================
// Fare Quote
// =============================================================================

/// The result of one fare calculation.
///
/// Immutable once computed; recomputation is deterministic given the same
/// inputs and the same modifier tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareQuote {
    /// Source station code.
    pub source: String,

    /// Destination station code.
    pub destination: String,

    /// Passenger count (>= 1).
    pub passengers: u32,

    /// Travel timestamp the quote was computed for.
    pub travel_at: DateTime<Utc>,

    /// Route distance used, in km (0 for pass-covered trips, which skip the
    /// distance lookup entirely).
    pub distance_km: u32,

    /// Final price, rounded to 2 decimals.
    pub total: Money,

    /// The pass override fired; no other modifier applied.
    pub pass_applied: bool,

    /// Time-of-day band that applied (None for pass-covered trips).
    pub time_band: Option<TimeBand>,

    /// Special-date multiplier that applied, if any.
    pub special_date_multiplier: Option<f64>,

    /// Group discount multiplier that applied, if any.
    pub group_multiplier: Option<f64>,
}

// =============================================================================
// Fare Calculator
// =============================================================================

/// Pure fare calculator holding the static modifier tables.
///
/// ## Ownership
/// Construct once, share by reference. The special-date table is injectable
/// for tests; the production table matches the operator's published
/// calendar.
#[derive(Debug, Clone)]
pub struct FareCalculator {
    /// Exact calendar date → fare multiplier.
    special_dates: BTreeMap<NaiveDate, f64>,
}

impl FareCalculator {
    /// Creates a calculator with the production special-date table.
    pub fn new() -> Self {
        let mut special_dates = BTreeMap::new();
        // New Year's Eve surcharge
        special_dates.insert(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(), 1.25);
        // Independence Day discount
        special_dates.insert(NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(), 0.85);
        FareCalculator { special_dates }
    }

    /// Creates a calculator with a caller-supplied special-date table.
    pub fn with_special_dates(special_dates: BTreeMap<NaiveDate, f64>) -> Self {
        FareCalculator { special_dates }
    }

    /// Computes a fare quote for a trip.
    ///
    /// ## Arguments
    /// * `graph` - station graph for the distance lookup
    /// * `passes` - the rider's active monthly passes
    /// * `passengers` - must be >= 1
    /// * `travel_at` - scheduled travel time (drives peak and special-date
    ///   modifiers)
    ///
    /// ## Errors
    /// * `Validation` when `passengers` is zero
    /// * `InvalidRoute` for unknown codes, same-station trips, and
    ///   disconnected pairs
    pub fn quote(
        &self,
        graph: &StationGraph,
        passes: &[MonthlyPass],
        source: &str,
        destination: &str,
        passengers: u32,
        travel_at: DateTime<Utc>,
    ) -> CoreResult<FareQuote> {
        if passengers == 0 {
            return Err(ValidationError::MustBePositive {
                field: "passengers".to_string(),
            }
            .into());
        }

        // 1. Monthly pass override: zero fare, no further modifiers.
        if passes.iter().any(|p| p.covers(source, destination)) {
            return Ok(FareQuote {
                source: source.to_string(),
                destination: destination.to_string(),
                passengers,
                travel_at,
                distance_km: 0,
                total: Money::zero(),
                pass_applied: true,
                time_band: None,
                special_date_multiplier: None,
                group_multiplier: None,
            });
        }

        // 2. Route distance; anything non-chargeable fails the quote.
        let dist = graph.distance(source, destination);
        let km = dist.chargeable_km().ok_or_else(|| CoreError::InvalidRoute {
            origin: source.to_string(),
            destination: destination.to_string(),
            reason: match dist {
                RouteDistance::UnknownStation => "unknown station code".to_string(),
                RouteDistance::NoRoute => "stations are not connected".to_string(),
                RouteDistance::Km(_) => "source and destination are the same".to_string(),
            },
        })?;

        // 3. Base fare, then the multiplier chain in unrounded f64.
        let mut fare = f64::from(km) * f64::from(passengers) * BASE_FARE_PER_KM;

        // 4. Peak / off-peak band.
        let band = TimeBand::for_hour(travel_at.hour());
        fare *= band.multiplier();

        // 5. Special calendar date, exact match.
        let special = self.special_dates.get(&travel_at.date_naive()).copied();
        if let Some(mult) = special {
            fare *= mult;
        }

        // 6. Group discount bands.
        let group = match passengers {
            5..=9 => Some(0.95),
            p if p >= 10 => Some(0.90),
            _ => None,
        };
        if let Some(mult) = group {
            fare *= mult;
        }

        Ok(FareQuote {
            source: source.to_string(),
            destination: destination.to_string(),
            passengers,
            travel_at,
            distance_km: km,
            total: Money::from_rupees(fare),
            pass_applied: false,
            time_band: Some(band),
            special_date_multiplier: special,
            group_multiplier: group,
        })
    }

    /// Computes the bulk price of a monthly pass for a route: the
    /// single-passenger quote at `now` through the same pipeline, times 20
    /// (a 20-trip-equivalent price).
    pub fn pass_price(
        &self,
        graph: &StationGraph,
        source: &str,
        destination: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Money> {
        let single = self.quote(graph, &[], source, destination, 1, now)?;
        Ok(Money::from_rupees(
            single.total.as_rupees_f64() * PASS_TRIP_EQUIVALENT,
        ))
    }
}

impl Default for FareCalculator {
    fn default() -> Self {
        FareCalculator::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn calc() -> FareCalculator {
        FareCalculator::new()
    }

    fn graph() -> StationGraph {
        StationGraph::demo_network()
    }

    /// A plain weekday with no special-date entry.
    fn off_peak() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 14, 0, 0).unwrap()
    }

    fn peak() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_off_peak_single_passenger_example() {
        // 5 km × 1 × Rs 5 × 0.90 = Rs 22.50
        let q = calc().quote(&graph(), &[], "a", "b", 1, off_peak()).unwrap();
        assert_eq!(q.total.paise(), 2250);
        assert_eq!(q.distance_km, 5);
        assert_eq!(q.time_band, Some(TimeBand::OffPeak));
        assert_eq!(q.special_date_multiplier, None);
        assert_eq!(q.group_multiplier, None);
    }

    #[test]
    fn test_peak_group_of_ten_example() {
        // 5 km × 10 × Rs 5 × 1.20 × 0.90 = Rs 270.00
        let q = calc().quote(&graph(), &[], "a", "b", 10, peak()).unwrap();
        assert_eq!(q.total.paise(), 27_000);
        assert_eq!(q.time_band, Some(TimeBand::Peak));
        assert_eq!(q.group_multiplier, Some(0.90));
    }

    #[test]
    fn test_peak_band_boundaries() {
        assert_eq!(TimeBand::for_hour(7), TimeBand::OffPeak);
        assert_eq!(TimeBand::for_hour(8), TimeBand::Peak);
        assert_eq!(TimeBand::for_hour(10), TimeBand::Peak);
        assert_eq!(TimeBand::for_hour(11), TimeBand::OffPeak);
        assert_eq!(TimeBand::for_hour(16), TimeBand::OffPeak);
        assert_eq!(TimeBand::for_hour(17), TimeBand::Peak);
        assert_eq!(TimeBand::for_hour(19), TimeBand::Peak);
        assert_eq!(TimeBand::for_hour(20), TimeBand::OffPeak);
        // off-peak discount applies at any non-peak hour, not just nights
        assert_eq!(TimeBand::for_hour(2), TimeBand::OffPeak);
    }

    #[test]
    fn test_special_date_surcharge_compounds() {
        // New Year's Eve, off-peak: 5 × 1 × 5 × 0.90 × 1.25 = Rs 28.125 → 28.13
        let when = Utc.with_ymd_and_hms(2025, 12, 31, 14, 0, 0).unwrap();
        let q = calc().quote(&graph(), &[], "a", "b", 1, when).unwrap();
        assert_eq!(q.special_date_multiplier, Some(1.25));
        assert_eq!(q.total.paise(), 2813);
    }

    #[test]
    fn test_special_date_discount() {
        // Independence Day, off-peak: 5 × 1 × 5 × 0.90 × 0.85 = Rs 19.125 → 19.13
        let when = Utc.with_ymd_and_hms(2025, 8, 15, 14, 0, 0).unwrap();
        let q = calc().quote(&graph(), &[], "a", "b", 1, when).unwrap();
        assert_eq!(q.special_date_multiplier, Some(0.85));
        assert_eq!(q.total.paise(), 1913);
    }

    #[test]
    fn test_group_bands() {
        let c = calc();
        let g = graph();
        let q4 = c.quote(&g, &[], "a", "b", 4, off_peak()).unwrap();
        let q5 = c.quote(&g, &[], "a", "b", 5, off_peak()).unwrap();
        let q9 = c.quote(&g, &[], "a", "b", 9, off_peak()).unwrap();
        let q10 = c.quote(&g, &[], "a", "b", 10, off_peak()).unwrap();

        assert_eq!(q4.group_multiplier, None);
        assert_eq!(q5.group_multiplier, Some(0.95));
        assert_eq!(q9.group_multiplier, Some(0.95));
        assert_eq!(q10.group_multiplier, Some(0.90));
    }

    /// Total fare is monotonically non-decreasing in passengers, including
    /// across the group-discount thresholds (test total, not per-head fare).
    #[test]
    fn test_total_fare_monotone_in_passengers() {
        let c = calc();
        let g = graph();
        let mut prev = Money::zero();
        for p in 1..=12 {
            let q = c.quote(&g, &[], "a", "b", p, off_peak()).unwrap();
            assert!(
                q.total >= prev,
                "fare dropped from {} to {} at {} passengers",
                prev,
                q.total,
                p
            );
            prev = q.total;
        }
    }

    #[test]
    fn test_monthly_pass_zeroes_fare_both_directions() {
        let c = calc();
        let g = graph();
        let passes = vec![MonthlyPass::new("a", "b")];

        let q = c.quote(&g, &passes, "a", "b", 3, peak()).unwrap();
        assert!(q.pass_applied);
        assert_eq!(q.total, Money::zero());
        assert_eq!(q.time_band, None);

        let back = c.quote(&g, &passes, "b", "a", 1, peak()).unwrap();
        assert!(back.pass_applied);
        assert_eq!(back.total, Money::zero());
    }

    #[test]
    fn test_pass_does_not_cover_other_routes() {
        let c = calc();
        let g = graph();
        let passes = vec![MonthlyPass::new("a", "b")];
        let q = c.quote(&g, &passes, "b", "c", 1, off_peak()).unwrap();
        assert!(!q.pass_applied);
        assert!(q.total.is_positive());
    }

    #[test]
    fn test_invalid_routes() {
        let c = calc();
        let g = graph();
        assert!(matches!(
            c.quote(&g, &[], "a", "z", 1, off_peak()),
            Err(CoreError::InvalidRoute { .. })
        ));
        assert!(matches!(
            c.quote(&g, &[], "a", "a", 1, off_peak()),
            Err(CoreError::InvalidRoute { .. })
        ));
    }

    #[test]
    fn test_zero_passengers_rejected() {
        assert!(matches!(
            calc().quote(&graph(), &[], "a", "b", 0, off_peak()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_pass_price_is_twenty_trips() {
        // a -> b off-peak single: Rs 22.50; pass: Rs 450.00
        let price = calc().pass_price(&graph(), "a", "b", off_peak()).unwrap();
        assert_eq!(price.paise(), 45_000);
    }

    #[test]
    fn test_pass_price_tracks_modifier_chain() {
        // Priced at a peak moment the pass costs more: 5×1×5×1.20 = Rs 30 → Rs 600
        let price = calc().pass_price(&graph(), "a", "b", peak()).unwrap();
        assert_eq!(price.paise(), 60_000);
    }

    #[test]
    fn test_quote_is_deterministic() {
        let c = calc();
        let g = graph();
        let a = c.quote(&g, &[], "c", "e", 7, peak()).unwrap();
        let b = c.quote(&g, &[], "c", "e", 7, peak()).unwrap();
        assert_eq!(a, b);
    }
}
