//! Request and response bodies
//!
//! Amounts cross the wire as major-unit decimals next to an ISO currency
//! code; `MoneyDto` converts both ways.

pub mod invoice;
pub mod fund;

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount as it appears in JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyDto {
    pub amount: Decimal,
    pub currency: String,
}

impl MoneyDto {
    /// Parses into `Money`, rejecting unknown currencies and sub-minor precision
    pub fn to_money(&self) -> Result<Money, MoneyError> {
        let currency: Currency = self.currency.parse()?;
        Money::from_major(self.amount, currency)
    }
}

impl From<Money> for MoneyDto {
    fn from(money: Money) -> Self {
        Self {
            amount: money.amount(),
            currency: money.currency().code().to_string(),
        }
    }
}

/// Pagination parameters shared by list endpoints
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 500;

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_dto_parses_major_units() {
        let dto = MoneyDto { amount: dec!(12.50), currency: "eur".to_string() };
        assert_eq!(dto.to_money().unwrap(), Money::from_minor(1250, Currency::EUR));
    }

    #[test]
    fn test_money_dto_rejects_fractional_xof() {
        let dto = MoneyDto { amount: dec!(100.5), currency: "XOF".to_string() };
        assert!(matches!(dto.to_money(), Err(MoneyError::InvalidAmount(_))));
    }

    #[test]
    fn test_money_dto_rejects_unknown_currency() {
        let dto = MoneyDto { amount: dec!(1), currency: "ZZZ".to_string() };
        assert!(matches!(dto.to_money(), Err(MoneyError::UnknownCurrency(_))));
    }

    #[test]
    fn test_page_clamps() {
        let page = Page { limit: Some(10_000), offset: Some(-3) };
        assert_eq!(page.limit(), Page::MAX_LIMIT);
        assert_eq!(page.offset(), 0);
        let page = Page { limit: None, offset: None };
        assert_eq!(page.limit(), Page::DEFAULT_LIMIT);
    }
}
