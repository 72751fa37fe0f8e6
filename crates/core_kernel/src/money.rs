//! Money types with exact integer arithmetic
//!
//! Amounts are stored as a signed count of the currency's minor unit
//! (cents, or whole francs for currencies without a minor unit). All
//! arithmetic is checked: mixing currencies or overflowing `i64` is an
//! error, never a silent wrap or a panic.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    XOF,
    XAF,
    EUR,
    USD,
    GBP,
    KES,
    NGN,
    MAD,
    JPY,
}

impl Currency {
    /// Returns the number of decimal places of the minor unit
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::XOF | Currency::XAF | Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::XOF | Currency::XAF => "FCFA",
            Currency::EUR => "€",
            Currency::USD => "$",
            Currency::GBP => "£",
            Currency::KES => "KSh",
            Currency::NGN => "₦",
            Currency::MAD => "MAD",
            Currency::JPY => "¥",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::XOF => "XOF",
            Currency::XAF => "XAF",
            Currency::EUR => "EUR",
            Currency::USD => "USD",
            Currency::GBP => "GBP",
            Currency::KES => "KES",
            Currency::NGN => "NGN",
            Currency::MAD => "MAD",
            Currency::JPY => "JPY",
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
            "XOF" => Ok(Currency::XOF),
            "XAF" => Ok(Currency::XAF),
            "EUR" => Ok(Currency::EUR),
            "USD" => Ok(Currency::USD),
            "GBP" => Ok(Currency::GBP),
            "KES" => Ok(Currency::KES),
            "NGN" => Ok(Currency::NGN),
            "MAD" => Ok(Currency::MAD),
            "JPY" => Ok(Currency::JPY),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(Currency, Currency),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount with associated currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    minor: i64,
    currency: Currency,
}

impl Money {
    /// Creates Money from an amount in minor units (e.g., cents)
    pub fn from_minor(minor: i64, currency: Currency) -> Self {
        Self { minor, currency }
    }

    /// Creates Money from a major-unit decimal (e.g., `100.50` dollars)
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` when the value carries more decimal places
    /// than the currency's minor unit, and `Overflow` when it does not fit.
    pub fn from_major(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        let dp = currency.decimal_places();
        let scaled = amount
            .checked_mul(Decimal::from(10_i64.pow(dp)))
            .ok_or(MoneyError::Overflow)?;

        if scaled.fract() != Decimal::ZERO {
            return Err(MoneyError::InvalidAmount(format!(
                "{} has more than {} decimal places for {}",
                amount, dp, currency
            )));
        }

        let minor = scaled.to_i64().ok_or(MoneyError::Overflow)?;
        Ok(Self { minor, currency })
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self { minor: 0, currency }
    }

    /// Returns the amount in minor units
    pub fn minor(&self) -> i64 {
        self.minor
    }

    /// Returns the amount in major units, exact
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.minor, self.currency.decimal_places())
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }

    pub fn is_positive(&self) -> bool {
        self.minor > 0
    }

    pub fn is_negative(&self) -> bool {
        self.minor < 0
    }

    /// Fails with `CurrencyMismatch` unless both amounts share a currency
    pub fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(self.currency, other.currency));
        }
        Ok(())
    }

    /// Checked addition that returns an error on currency mismatch or overflow
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let minor = self.minor.checked_add(other.minor).ok_or(MoneyError::Overflow)?;
        Ok(Self::from_minor(minor, self.currency))
    }

    /// Checked subtraction that returns an error on currency mismatch or overflow
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let minor = self.minor.checked_sub(other.minor).ok_or(MoneyError::Overflow)?;
        Ok(Self::from_minor(minor, self.currency))
    }

    /// Multiplies by an integer quantity
    pub fn checked_mul(&self, quantity: u32) -> Result<Money, MoneyError> {
        let minor = self
            .minor
            .checked_mul(i64::from(quantity))
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::from_minor(minor, self.currency))
    }

    /// Returns the amount with the opposite sign
    pub fn checked_neg(&self) -> Result<Money, MoneyError> {
        let minor = self.minor.checked_neg().ok_or(MoneyError::Overflow)?;
        Ok(Self::from_minor(minor, self.currency))
    }

    /// Sums amounts, starting from zero in `currency`
    ///
    /// An empty iterator yields zero; any currency mismatch or overflow
    /// aborts the sum.
    pub fn checked_sum<'a, I>(amounts: I, currency: Currency) -> Result<Money, MoneyError>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.currency.code(), self.amount())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_from_minor() {
        let m = Money::from_minor(10050, Currency::USD);
        assert_eq!(m.amount(), dec!(100.50));
        assert_eq!(m.minor(), 10050);
    }

    #[test]
    fn test_zero_decimal_currency() {
        let m = Money::from_minor(100_000, Currency::XOF);
        assert_eq!(m.amount(), dec!(100000));
        assert_eq!(m.to_string(), "XOF 100000");
    }

    #[test]
    fn test_from_major_rejects_sub_minor_precision() {
        let result = Money::from_major(dec!(10.005), Currency::USD);
        assert!(matches!(result, Err(MoneyError::InvalidAmount(_))));

        let result = Money::from_major(dec!(10.5), Currency::XOF);
        assert!(matches!(result, Err(MoneyError::InvalidAmount(_))));
    }

    #[test]
    fn test_from_major_exact() {
        let m = Money::from_major(dec!(12.30), Currency::EUR).unwrap();
        assert_eq!(m.minor(), 1230);
    }

    #[test]
    fn test_currency_mismatch() {
        let usd = Money::from_minor(100, Currency::USD);
        let eur = Money::from_minor(100, Currency::EUR);

        let result = usd.checked_add(&eur);
        assert_eq!(result, Err(MoneyError::CurrencyMismatch(Currency::USD, Currency::EUR)));
    }

    #[test]
    fn test_overflow_is_reported() {
        let max = Money::from_minor(i64::MAX, Currency::XOF);
        let one = Money::from_minor(1, Currency::XOF);
        assert_eq!(max.checked_add(&one), Err(MoneyError::Overflow));
        assert_eq!(Money::from_minor(i64::MIN, Currency::XOF).checked_neg(), Err(MoneyError::Overflow));
    }
}
