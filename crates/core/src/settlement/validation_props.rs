//! Property-based tests for settlement validation.
//!
//! - No sequence of accepted settlements can overdraw a balance
//! - The overdraw correction hint is itself always acceptable
//! - The partial flag agrees with the post-commit balance

use proptest::prelude::*;
use rust_decimal::Decimal;
use saldo_shared::types::{Currency, Money};

use crate::currency::{BALANCE_EPSILON, RateTable, to_hkd};

use super::error::SettlementError;
use super::validation::check_apply;

/// Strategy to generate positive HKD amounts (0.01 to 100,000.00).
fn positive_hkd() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a supported currency.
fn currency() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::Hkd),
        Just(Currency::Mop),
        Just(Currency::Cny),
    ]
}

fn rates() -> std::sync::Arc<crate::currency::RateSnapshot> {
    RateTable::new(Decimal::new(103, 2), Decimal::new(93, 2))
        .expect("static rates are positive")
        .get()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// An accepted settlement never leaves the balance negative, and the
    /// settled value is conserved within one cent.
    #[test]
    fn prop_accepted_settlement_conserves_balance(
        amount in positive_hkd(),
        remaining in positive_hkd(),
        c in currency(),
    ) {
        let rates = rates();
        if let Ok(outcome) = check_apply(amount, remaining, c, &rates) {
            prop_assert!(outcome.new_remaining_in_hkd >= Decimal::ZERO);
            prop_assert!(outcome.new_remaining_in_hkd <= remaining);
            let drift = (remaining - outcome.new_remaining_in_hkd - amount).abs();
            prop_assert!(drift <= BALANCE_EPSILON, "conservation drift {drift}");
        }
    }

    /// The partial flag agrees with the post-commit balance: partial
    /// settlements leave something outstanding, full payments leave zero.
    #[test]
    fn prop_partial_flag_matches_balance(
        amount in positive_hkd(),
        remaining in positive_hkd(),
        c in currency(),
    ) {
        let rates = rates();
        if let Ok(outcome) = check_apply(amount, remaining, c, &rates) {
            if outcome.is_partial {
                prop_assert!(outcome.new_remaining_in_hkd >= BALANCE_EPSILON);
            } else {
                prop_assert_eq!(outcome.new_remaining_in_hkd, Decimal::ZERO);
            }
        }
    }

    /// A rejected overdraw always reports a correction that would be
    /// accepted, and one that converts to no more than the balance plus the
    /// epsilon.
    #[test]
    fn prop_overdraw_hint_is_acceptable(
        excess in positive_hkd(),
        remaining in positive_hkd(),
        c in currency(),
    ) {
        let rates = rates();
        let amount = remaining + BALANCE_EPSILON + excess;
        let err = check_apply(amount, remaining, c, &rates).unwrap_err();
        match err {
            SettlementError::ExceedsRemainingBalance {
                max_allowed_amount,
                max_allowed_currency,
                remaining_amount_in_hkd,
            } => {
                prop_assert_eq!(max_allowed_currency, c);
                prop_assert_eq!(remaining_amount_in_hkd, remaining);

                let hint_in_hkd = to_hkd(Money::new(max_allowed_amount, c), &rates);
                prop_assert!(hint_in_hkd <= remaining + BALANCE_EPSILON);
                prop_assert!(check_apply(hint_in_hkd, remaining, c, &rates).is_ok());
            }
            other => prop_assert!(false, "expected ExceedsRemainingBalance, got {other:?}"),
        }
    }

    /// Folding any sequence of settlement attempts over a balance keeps the
    /// invariant: the balance never goes negative and the accepted total
    /// never exceeds the opening balance by more than one cent.
    #[test]
    fn prop_settlement_sequence_never_overdraws(
        opening in positive_hkd(),
        amounts in prop::collection::vec(positive_hkd(), 1..20),
        c in currency(),
    ) {
        let rates = rates();
        let mut remaining = opening;
        let mut accepted_total = Decimal::ZERO;
        for amount in amounts {
            if let Ok(outcome) = check_apply(amount, remaining, c, &rates) {
                remaining = outcome.new_remaining_in_hkd;
                accepted_total += amount;
            }
            prop_assert!(remaining >= Decimal::ZERO);
        }
        prop_assert!(accepted_total <= opening + BALANCE_EPSILON);
    }
}
