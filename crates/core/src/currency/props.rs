//! Property-based tests for currency conversion.
//!
//! - Round-trip stability at the reference rates
//! - Bounded drift for arbitrary plausible rates
//! - Output scale of every conversion

use proptest::prelude::*;
use rust_decimal::Decimal;
use saldo_shared::types::{Currency, Money};

use super::convert::{BALANCE_EPSILON, from_hkd, to_hkd};
use super::rates::{RateSnapshot, RateTable};

/// Strategy to generate positive decimal amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate plausible FX rates (0.5000 to 2.0000).
fn plausible_rate() -> impl Strategy<Value = Decimal> {
    (5_000i64..20_000i64).prop_map(|v| Decimal::new(v, 4))
}

/// Strategy to generate a supported currency.
fn currency() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::Hkd),
        Just(Currency::Mop),
        Just(Currency::Cny),
    ]
}

fn snapshot(hkd_to_mop: Decimal, hkd_to_cny: Decimal) -> std::sync::Arc<RateSnapshot> {
    RateTable::new(hkd_to_mop, hkd_to_cny)
        .expect("strategy yields positive rates")
        .get()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Conversion output always carries at most 2 decimal places.
    #[test]
    fn prop_to_hkd_rounds_to_two_decimals(
        amount in positive_amount(),
        hkd_to_mop in plausible_rate(),
        hkd_to_cny in plausible_rate(),
        c in currency(),
    ) {
        let rates = snapshot(hkd_to_mop, hkd_to_cny);
        let hkd = to_hkd(Money::new(amount, c), &rates);
        prop_assert!(hkd.scale() <= 2, "scale was {}", hkd.scale());
    }

    /// At the reference rates, a currency -> HKD -> currency round trip
    /// never moves an amount by more than one cent.
    #[test]
    fn prop_round_trip_at_reference_rates(
        amount in positive_amount(),
        c in currency(),
    ) {
        let rates = snapshot(Decimal::new(103, 2), Decimal::new(91, 2));
        let back = from_hkd(to_hkd(Money::new(amount, c), &rates), c, &rates);
        prop_assert!(
            (back.amount - amount).abs() <= BALANCE_EPSILON,
            "{amount} {c} came back as {}",
            back.amount
        );
    }

    /// For any plausible rate pair, round-trip drift stays within one cent
    /// per boundary crossing (two crossings -> at most 0.02).
    #[test]
    fn prop_round_trip_drift_bounded(
        amount in positive_amount(),
        hkd_to_mop in plausible_rate(),
        hkd_to_cny in plausible_rate(),
        c in currency(),
    ) {
        let rates = snapshot(hkd_to_mop, hkd_to_cny);
        let back = from_hkd(to_hkd(Money::new(amount, c), &rates), c, &rates);
        prop_assert!(
            (back.amount - amount).abs() <= BALANCE_EPSILON * Decimal::TWO,
            "{amount} {c} came back as {}",
            back.amount
        );
    }

    /// Re-expressing a frozen HKD value never changes the HKD value itself:
    /// converting the re-expressed amount back lands on the same frozen value.
    #[test]
    fn prop_reexpression_is_stable_for_hkd(
        amount in positive_amount(),
    ) {
        let rates = snapshot(Decimal::new(103, 2), Decimal::new(91, 2));
        let frozen = to_hkd(Money::hkd(amount), &rates);
        let as_hkd_again = from_hkd(frozen, Currency::Hkd, &rates);
        prop_assert_eq!(as_hkd_again.amount, frozen);
    }
}
