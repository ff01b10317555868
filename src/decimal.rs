//! Exact fixed-point arithmetic for money math (component A).
//!
//! `Decimal` is `rust_decimal::Decimal` directly — it already gives us
//! exact add/sub/mul, total ordering, sign and a string round-trip.
//! The one operation spec.md calls out as needing explicit behavior is
//! division: it must round half-away-from-zero to a configured scale,
//! and fail cleanly on division by zero rather than panic.

use rust_decimal::RoundingStrategy;

use crate::error::CoreError;

pub use rust_decimal::Decimal;

/// Divide `a` by `b`, rounding the result half-away-from-zero to
/// `scale` decimal places.
///
/// `Decimal`'s own `/` operator panics on a zero divisor; this returns
/// `CoreError::Numeric` instead, since division by zero is routine
/// input (e.g. a price series with a zero close) rather than a logic
/// bug.
pub fn div_scaled(a: Decimal, b: Decimal, scale: u32) -> Result<Decimal, CoreError> {
    if b.is_zero() {
        return Err(CoreError::Numeric("division by zero".into()));
    }
    let raw = a
        .checked_div(b)
        .ok_or_else(|| CoreError::Numeric(format!("overflow dividing {a} by {b}")))?;
    Ok(raw.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn div_scaled_rounds_half_away_from_zero() {
        let act = div_scaled(dec!(1), dec!(3), 2).unwrap();
        assert_eq!(act, dec!(0.33));

        let act = div_scaled(dec!(-5), dec!(2), 0).unwrap();
        assert_eq!(act, dec!(-3));
    }

    #[test]
    fn div_scaled_rejects_zero_divisor() {
        let err = div_scaled(dec!(1), dec!(0), 2).unwrap_err();
        assert_eq!(err, CoreError::Numeric("division by zero".into()));
    }

    #[test]
    fn zero_has_canonical_representation() {
        assert_eq!(Decimal::ZERO.to_string(), "0");
        assert!(Decimal::ZERO.is_zero());
    }
}
