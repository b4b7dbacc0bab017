//! The billing engine.
//!
//! Cost is metered from elapsed time and the flow rate snapshotted on the
//! open interval:
//!
//! ```text
//! volume = round2(elapsed_seconds * flow_volume)
//! cost   = round2(volume * price_per_liter)
//! total  = round2(sum of every interval's total_spent)
//! ```
//!
//! The three roundings are applied separately, in that order. Finalizing and
//! projecting share the arithmetic; projecting just leaves the interval open
//! and its result must never be persisted.

use chrono::{DateTime, Utc};

use crate::ledgers::UsageLedger;

/// Pricing configuration injected into the billing engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pricing {
    /// Monetary units charged per liter dispensed.
    pub price_per_liter: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            price_per_liter: 12.25,
        }
    }
}

impl Pricing {
    pub fn new(price_per_liter: f64) -> Self {
        Self { price_per_liter }
    }
}

/// Rounds to 2 decimal places, half away from zero.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Closes the open interval at `closed_at` and recomputes the ledger total.
///
/// Precondition: the ledger holds exactly one open interval (the transition
/// rules guarantee it). With no open interval this is a no-op; with more
/// than one the first in insertion order is used.
pub fn finalize_interval(ledger: &mut UsageLedger, pricing: Pricing, closed_at: DateTime<Utc>) {
    charge_open_interval(ledger, pricing, closed_at, true);
}

/// Computes "cost so far" for the open interval against a reference instant.
///
/// Identical arithmetic to [`finalize_interval`] but the interval stays
/// open. The caller must not persist the mutated ledger; it exists to answer
/// a live spending query. Same precondition as [`finalize_interval`].
pub fn project_open_interval(ledger: &mut UsageLedger, pricing: Pricing, at: DateTime<Utc>) {
    charge_open_interval(ledger, pricing, at, false);
}

fn charge_open_interval(
    ledger: &mut UsageLedger,
    pricing: Pricing,
    at: DateTime<Utc>,
    close: bool,
) {
    let Some(interval) = ledger.open_interval_mut() else {
        return;
    };

    let elapsed_seconds = (at - interval.opened_at).num_milliseconds() as f64 / 1000.0;
    let volume = round2(elapsed_seconds * interval.flow_volume);
    let cost = round2(volume * pricing.price_per_liter);

    if close {
        interval.closed_at = Some(at);
    }
    interval.total_spent = cost;

    ledger.total_amount = round2(
        ledger
            .intervals
            .iter()
            .map(|interval| interval.total_spent)
            .sum(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn ledger_with_open_interval(flow_volume: f64) -> UsageLedger {
        let mut ledger = UsageLedger::new(Uuid::new_v4());
        ledger.append_open_interval(flow_volume, at(0));
        ledger
    }

    #[test]
    fn round2_is_half_away_from_zero() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(7.844), 7.84);
        assert_eq!(round2(7.845), 7.85);
    }

    #[test]
    fn finalize_ten_seconds_at_reference_rate() {
        // 10 s * 0.064 l/s = 0.64 l; 0.64 * 12.25 = 7.84
        let mut ledger = ledger_with_open_interval(0.064);

        finalize_interval(&mut ledger, Pricing::default(), at(10));

        let interval = &ledger.intervals[0];
        assert_eq!(interval.total_spent, 7.84);
        assert_eq!(interval.closed_at, Some(at(10)));
        assert_eq!(ledger.total_amount, 7.84);
    }

    #[test]
    fn projection_leaves_interval_open() {
        let mut ledger = ledger_with_open_interval(0.064);

        project_open_interval(&mut ledger, Pricing::default(), at(10));

        let interval = &ledger.intervals[0];
        assert_eq!(interval.total_spent, 7.84);
        assert!(interval.is_open());
        assert_eq!(ledger.total_amount, 7.84);
    }

    #[test]
    fn projection_is_monotone_in_time() {
        let mut ledger = ledger_with_open_interval(0.064);
        project_open_interval(&mut ledger, Pricing::default(), at(10));
        let first = ledger.total_amount;

        project_open_interval(&mut ledger, Pricing::default(), at(11));
        assert!(ledger.total_amount > first);
    }

    #[test]
    fn total_sums_closed_and_open_intervals() {
        let mut ledger = ledger_with_open_interval(0.064);
        finalize_interval(&mut ledger, Pricing::default(), at(10));

        ledger.append_open_interval(0.064, at(20));
        project_open_interval(&mut ledger, Pricing::default(), at(30));

        assert_eq!(ledger.intervals.len(), 2);
        assert_eq!(ledger.total_amount, 15.68);
    }

    #[test]
    fn pricing_is_injectable() {
        let mut ledger = ledger_with_open_interval(0.1);
        // 10 s * 0.1 l/s = 1 l at 2.00/l.
        finalize_interval(&mut ledger, Pricing::new(2.0), at(10));
        assert_eq!(ledger.total_amount, 2.0);
    }

    #[test]
    fn no_open_interval_is_a_no_op() {
        let mut ledger = UsageLedger::new(Uuid::new_v4());
        finalize_interval(&mut ledger, Pricing::default(), at(10));
        assert_eq!(ledger.total_amount, 0.0);
        assert!(ledger.intervals.is_empty());
    }
}
