//! Discount quotes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::discount::Discount,
};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DiscountQuote {
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub applied: bool,
}

#[derive(Clone, Default)]
pub struct DiscountsService;

impl DiscountsService {
    pub fn new() -> Self {
        Self
    }

    /// Price after applying `discount` to `amount` at `now`
    pub fn quote(&self, discount: &Discount, amount: Decimal, now: DateTime<Utc>) -> AppResult<DiscountQuote> {
        if amount < Decimal::ZERO {
            return Err(AppError::Validation("Amount cannot be negative".to_string()));
        }
        let value = discount.calculate_discount(amount, now)?;
        Ok(DiscountQuote {
            amount,
            discount: value,
            total: amount - value,
            applied: value > Decimal::ZERO,
        })
    }
}
