//! Discount records and the discount calculator

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Discount {
    #[serde(default)]
    pub code: Option<String>,
    pub discount_type: DiscountType,
    #[schema(value_type = String)]
    pub value: Decimal,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub minimum_amount: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub maximum_discount: Option<Decimal>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub usage_count: u32,
    pub is_active: bool,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl Discount {
    pub fn is_currently_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.start_date.map_or(true, |start| now >= start)
            && self.end_date.map_or(true, |end| now <= end)
            && self.usage_limit.map_or(true, |limit| self.usage_count < limit)
    }

    /// Amount taken off `amount`, never more than `amount` itself.
    ///
    /// Fails when the percentage cannot be represented.
    pub fn calculate_discount(&self, amount: Decimal, now: DateTime<Utc>) -> AppResult<Decimal> {
        if !self.is_currently_valid(now) {
            return Ok(Decimal::ZERO);
        }
        if let Some(minimum) = self.minimum_amount {
            if amount < minimum {
                return Ok(Decimal::ZERO);
            }
        }

        let mut discount = match self.discount_type {
            DiscountType::Percentage => amount
                .checked_mul(self.value)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "{}% of {} is out of range",
                        self.value, amount
                    ))
                })?,
            DiscountType::FixedAmount => self.value,
        };
        if let Some(cap) = self.maximum_discount {
            discount = discount.min(cap);
        }

        Ok(discount
            .min(amount)
            .max(Decimal::ZERO)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
    }
}
