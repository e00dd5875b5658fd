//! Pure conversion between supported currencies and the HKD base.
//!
//! Every amount that crosses a currency boundary is rounded to 2 decimal
//! places using round-half-up. Repeated conversions are a known source of
//! drift, so callers must always convert from a frozen HKD value rather than
//! from a previously displayed, already-rounded figure.

use rust_decimal::{Decimal, RoundingStrategy};
use saldo_shared::types::{Currency, Money};

use super::rates::RateSnapshot;

/// One cent in HKD: the tolerance for balance comparisons.
pub const BALANCE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Rounds a monetary value to 2 decimal places, half-up.
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts an amount in any supported currency to HKD.
#[must_use]
pub fn to_hkd(amount: Money, rates: &RateSnapshot) -> Decimal {
    round_money(amount.amount / rates.rate_for(amount.currency))
}

/// Expresses an HKD amount in the requested currency.
#[must_use]
pub fn from_hkd(amount_in_hkd: Decimal, currency: Currency, rates: &RateSnapshot) -> Money {
    Money::new(
        round_money(amount_in_hkd * rates.rate_for(currency)),
        currency,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::rates::RateTable;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn snapshot() -> std::sync::Arc<RateSnapshot> {
        RateTable::new(dec!(1.03), dec!(0.93)).unwrap().get()
    }

    #[test]
    fn test_epsilon_is_one_cent() {
        assert_eq!(BALANCE_EPSILON, dec!(0.01));
    }

    #[test]
    fn test_hkd_is_identity() {
        let rates = snapshot();
        assert_eq!(to_hkd(Money::hkd(dec!(123.45)), &rates), dec!(123.45));
        assert_eq!(
            from_hkd(dec!(123.45), Currency::Hkd, &rates),
            Money::hkd(dec!(123.45))
        );
    }

    #[test]
    fn test_mop_to_hkd_divides_by_rate() {
        // 500 MOP at 1 HKD = 1.03 MOP: 500 / 1.03 = 485.436... -> 485.44
        let rates = snapshot();
        let hkd = to_hkd(Money::new(dec!(500), Currency::Mop), &rates);
        assert_eq!(hkd, dec!(485.44));
    }

    #[test]
    fn test_cny_to_hkd_divides_by_rate() {
        // 250 CNY at 1 HKD = 0.93 CNY: 250 / 0.93 = 268.817... -> 268.82
        let rates = snapshot();
        let hkd = to_hkd(Money::new(dec!(250), Currency::Cny), &rates);
        assert_eq!(hkd, dec!(268.82));
    }

    #[test]
    fn test_from_hkd_multiplies_by_rate() {
        let rates = snapshot();
        assert_eq!(
            from_hkd(dec!(200), Currency::Cny, &rates),
            Money::new(dec!(186.00), Currency::Cny)
        );
        assert_eq!(
            from_hkd(dec!(100), Currency::Mop, &rates),
            Money::new(dec!(103.00), Currency::Mop)
        );
    }

    // Banker's rounding would take 0.025 -> 0.02; half-up must give 0.03.
    #[rstest]
    #[case(dec!(0.025), dec!(0.03))]
    #[case(dec!(0.035), dec!(0.04))]
    #[case(dec!(-0.025), dec!(-0.03))]
    #[case(dec!(1.004), dec!(1.00))]
    #[case(dec!(1.005), dec!(1.01))]
    fn test_rounding_is_half_up_not_bankers(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(round_money(input), expected);
    }

    #[test]
    fn test_negative_amounts_convert_sign_preserving() {
        let rates = snapshot();
        assert_eq!(to_hkd(Money::new(dec!(-500), Currency::Mop), &rates), dec!(-485.44));
    }

    #[test]
    fn test_round_trip_at_reference_rates() {
        let rates = snapshot();
        for amount in [dec!(0.01), dec!(1), dec!(485.44), dec!(999.99), dec!(12345.67)] {
            for currency in Currency::ALL {
                let there = to_hkd(Money::new(amount, currency), &rates);
                let back = from_hkd(there, currency, &rates);
                assert!(
                    (back.amount - amount).abs() <= BALANCE_EPSILON,
                    "{amount} {currency} round-tripped to {}",
                    back.amount
                );
            }
        }
    }
}
