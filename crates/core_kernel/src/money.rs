//! Money types with precise decimal arithmetic
//!
//! This module provides a type-safe representation of monetary values
//! using rust_decimal, so subscription prices and payments never pass
//! through floating point. Amounts are kept at the currency's minor-unit
//! precision (two decimals for every currency except CLP).

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    PEN,
    MXN,
    COP,
    CLP,
    ARS,
    BOB,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::CLP => 0,
            _ => 2,
        }
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::PEN => "S/",
            Currency::MXN => "MX$",
            Currency::COP => "COL$",
            Currency::CLP => "CLP$",
            Currency::ARS => "AR$",
            Currency::BOB => "Bs",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::PEN => "PEN",
            Currency::MXN => "MXN",
            Currency::COP => "COP",
            Currency::CLP => "CLP",
            Currency::ARS => "ARS",
            Currency::BOB => "BOB",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "PEN" => Ok(Currency::PEN),
            "MXN" => Ok(Currency::MXN),
            "COP" => Ok(Currency::COP),
            "CLP" => Ok(Currency::CLP),
            "ARS" => Ok(Currency::ARS),
            "BOB" => Ok(Currency::BOB),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount with associated currency
///
/// The amount is always rounded to the currency's minor units on
/// construction, so two `Money` values that print the same compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value, rounding half away from zero to the
    /// currency's decimal places
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp_with_strategy(
                currency.decimal_places(),
                RoundingStrategy::MidpointAwayFromZero,
            ),
            currency,
        }
    }

    /// Creates a Money value, rejecting amounts with more precision than
    /// the currency allows instead of rounding them
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidAmount` if `amount` carries sub-minor-unit digits
    pub fn exact(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        if amount.normalize().scale() > currency.decimal_places() {
            return Err(MoneyError::InvalidAmount(format!(
                "{} has more than {} decimal places for {}",
                amount,
                currency.decimal_places(),
                currency
            )));
        }
        Ok(Self::new(amount, currency))
    }

    /// Creates Money from an integer amount in minor units (e.g., cents)
    pub fn from_minor(minor_units: i64, currency: Currency) -> Self {
        let divisor = Decimal::new(10_i64.pow(currency.decimal_places()), 0);
        Self::new(Decimal::new(minor_units, 0) / divisor, currency)
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is positive
    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Checked addition that returns an error on currency mismatch
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let sum = self.amount.checked_add(other.amount).ok_or(MoneyError::Overflow)?;
        Ok(Self::new(sum, self.currency))
    }

    /// Checked subtraction that returns an error on currency mismatch
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let diff = self.amount.checked_sub(other.amount).ok_or(MoneyError::Overflow)?;
        Ok(Self::new(diff, self.currency))
    }

    /// Multiplies a unit price by a whole number of periods
    pub fn times(&self, periods: u32) -> Result<Money, MoneyError> {
        let total = self
            .amount
            .checked_mul(Decimal::from(periods))
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(total, self.currency))
    }

    /// Sums an iterator of Money values in the given currency
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::CurrencyMismatch` if any item is in another currency
    pub fn try_sum<'a, I>(currency: Currency, items: I) -> Result<Money, MoneyError>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        items
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{} {:.dp$}",
            self.currency.symbol(),
            self.amount,
            dp = dp as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let m = Money::new(dec!(100.50), Currency::PEN);
        assert_eq!(m.amount(), dec!(100.50));
        assert_eq!(m.currency(), Currency::PEN);
    }

    #[test]
    fn test_money_rounds_half_away_from_zero() {
        assert_eq!(Money::new(dec!(10.005), Currency::USD).amount(), dec!(10.01));
        assert_eq!(Money::new(dec!(10.4), Currency::CLP).amount(), dec!(10));
    }

    #[test]
    fn test_exact_rejects_sub_cent_amounts() {
        assert!(Money::exact(dec!(10.001), Currency::USD).is_err());
        assert!(Money::exact(dec!(10.10), Currency::USD).is_ok());
        assert!(Money::exact(dec!(10.5), Currency::CLP).is_err());
    }

    #[test]
    fn test_currency_mismatch() {
        let usd = Money::new(dec!(100.00), Currency::USD);
        let pen = Money::new(dec!(100.00), Currency::PEN);

        let result = usd.checked_add(&pen);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_times_multiplies_monthly_price() {
        let price = Money::new(dec!(49.90), Currency::PEN);
        assert_eq!(price.times(3).unwrap().amount(), dec!(149.70));
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!("pen".parse::<Currency>().unwrap(), Currency::PEN);
        assert!(matches!("XYZ".parse::<Currency>(), Err(MoneyError::UnknownCurrency(_))));
    }
}
