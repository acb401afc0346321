//! Fixed-point money helpers and input validation.
//!
//! All monetary arithmetic in the system runs on [`rust_decimal::Decimal`];
//! binary floating point never touches a money field. Rounding to two
//! decimal places happens only at the boundaries where a percentage rate is
//! multiplied in (invoice tax), everywhere else sums stay exact.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Number of decimal places carried by every stored money amount.
pub const DECIMAL_PLACES: u32 = 2;

/// Upper bound for a single money amount (price, fee, payment, expense).
///
/// Guards against fat-finger input; the original system accepted anything
/// the database column fit.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);

/// Upper bound for an order item quantity.
pub const MAX_QUANTITY: u32 = 1_000_000;

/// Errors raised while validating monetary input.
#[derive(Debug, Error, PartialEq)]
pub enum MoneyError {
	#[error("{field} must not be negative (got {value})")]
	Negative { field: &'static str, value: Decimal },
	#[error("{field} must be greater than zero (got {value})")]
	NotPositive { field: &'static str, value: Decimal },
	#[error("{field} exceeds the maximum supported amount ({value})")]
	TooLarge { field: &'static str, value: Decimal },
	#[error("quantity must be between 1 and {max} (got {got})")]
	Quantity { got: u32, max: u32 },
}

/// Rounds an amount to two decimal places, away from zero at the midpoint.
///
/// Applied where a percentage rate produces sub-cent precision; plain sums
/// of two-place amounts are already exact and are not rounded.
pub fn round_money(amount: Decimal) -> Decimal {
	amount.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Validates an amount that may be zero but never negative (fees, discount,
/// tax, unit prices, material costs).
pub fn validate_non_negative(field: &'static str, value: Decimal) -> Result<(), MoneyError> {
	if value.is_sign_negative() {
		return Err(MoneyError::Negative { field, value });
	}
	if value > MAX_AMOUNT {
		return Err(MoneyError::TooLarge { field, value });
	}
	Ok(())
}

/// Validates an amount that must be strictly positive (payments, expenses).
pub fn validate_positive(field: &'static str, value: Decimal) -> Result<(), MoneyError> {
	if value <= Decimal::ZERO {
		return Err(MoneyError::NotPositive { field, value });
	}
	if value > MAX_AMOUNT {
		return Err(MoneyError::TooLarge { field, value });
	}
	Ok(())
}

/// Validates an order item quantity.
pub fn validate_quantity(quantity: u32) -> Result<(), MoneyError> {
	if quantity == 0 || quantity > MAX_QUANTITY {
		return Err(MoneyError::Quantity {
			got: quantity,
			max: MAX_QUANTITY,
		});
	}
	Ok(())
}

/// Computes a percentage of a base amount, rounded to two places.
///
/// Used for invoice tax: `tax_amount = percentage(base, tax_rate)`.
pub fn percentage(base: Decimal, rate: Decimal) -> Decimal {
	round_money(base * rate / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn dec(s: &str) -> Decimal {
		s.parse().unwrap()
	}

	#[test]
	fn decimal_addition_is_exact() {
		// The classic 0.1 + 0.2 case that drifts under f64.
		let sum = dec("0.1") + dec("0.2");
		assert_eq!(sum, dec("0.3"));
	}

	#[test]
	fn penny_accumulation_is_exact() {
		let mut total = Decimal::ZERO;
		for _ in 0..1000 {
			total += dec("0.01");
		}
		assert_eq!(total, dec("10.00"));
	}

	#[test]
	fn rounds_midpoint_away_from_zero() {
		assert_eq!(round_money(dec("1.005")), dec("1.01"));
		assert_eq!(round_money(dec("1.004")), dec("1.00"));
		assert_eq!(round_money(dec("-1.005")), dec("-1.01"));
	}

	#[test]
	fn percentage_rounds_at_the_boundary() {
		// 33.33 * 7.5% = 2.49975 -> 2.50
		assert_eq!(percentage(dec("33.33"), dec("7.5")), dec("2.50"));
		assert_eq!(percentage(dec("100"), dec("10")), dec("10.00"));
	}

	#[test]
	fn rejects_negative_fee() {
		let err = validate_non_negative("discount", dec("-1")).unwrap_err();
		assert!(matches!(err, MoneyError::Negative { field: "discount", .. }));
	}

	#[test]
	fn rejects_zero_payment() {
		assert!(validate_positive("amount", Decimal::ZERO).is_err());
		assert!(validate_positive("amount", dec("0.01")).is_ok());
	}

	#[test]
	fn rejects_absurd_amounts() {
		let err = validate_positive("amount", MAX_AMOUNT + Decimal::ONE).unwrap_err();
		assert!(matches!(err, MoneyError::TooLarge { .. }));
	}

	#[test]
	fn rejects_zero_quantity() {
		assert!(validate_quantity(0).is_err());
		assert!(validate_quantity(1).is_ok());
		assert!(validate_quantity(MAX_QUANTITY + 1).is_err());
	}
}
