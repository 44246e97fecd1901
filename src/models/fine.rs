//! Overdue fine calculation and the fine record

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

use super::status::normalize_status;

/// Rate and cap applied to overdue loans. Unit is one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinePolicy {
    pub daily_rate: Decimal,
    #[serde(default)]
    pub maximum_fine: Option<Decimal>,
}

/// Result of applying a [`FinePolicy`] to a due date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FineAssessment {
    pub overdue_days: i64,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub is_overdue: bool,
}

/// Whole calendar days between `due` and `at`, zero when not late
pub fn overdue_days(due: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    (at.date_naive() - due.date_naive()).num_days().max(0)
}

/// Calendar days left before `due`; negative once the loan is late
pub fn days_remaining(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (due.date_naive() - now.date_naive()).num_days()
}

impl FinePolicy {
    pub fn new(daily_rate: Decimal, maximum_fine: Option<Decimal>) -> Self {
        Self {
            daily_rate,
            maximum_fine,
        }
    }

    /// Fine owed for a loan due at `due` and returned (or checked) at `at`
    pub fn assess(&self, due: DateTime<Utc>, at: DateTime<Utc>) -> FineAssessment {
        let days = overdue_days(due, at);
        let raw = Decimal::from(days) * self.daily_rate;
        let amount = match self.maximum_fine {
            Some(cap) if raw > cap => cap,
            _ => raw,
        };
        FineAssessment {
            overdue_days: days,
            amount,
            is_overdue: days > 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Fine record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum FineStatus {
    Unpaid,
    Paid,
    Waived,
}

impl FineStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, FineStatus::Unpaid)
    }

    /// Paid and waived are terminal and exclusive of one another
    pub fn transition(self, to: FineStatus) -> AppResult<FineStatus> {
        match (self, to) {
            (FineStatus::Unpaid, FineStatus::Paid) | (FineStatus::Unpaid, FineStatus::Waived) => Ok(to),
            _ => Err(AppError::StateConflict(format!(
                "fine is already {:?}, cannot mark it {:?}",
                self, to
            ))),
        }
    }
}

impl TryFrom<String> for FineStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match normalize_status(&s).as_str() {
            "unpaid" | "pending" => Ok(FineStatus::Unpaid),
            "paid" => Ok(FineStatus::Paid),
            "waived" => Ok(FineStatus::Waived),
            _ => Err(format!("Unknown fine status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
        }
    }
}

impl TryFrom<String> for PaymentMethod {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match normalize_status(&s).as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit_card" => Ok(PaymentMethod::Card),
            _ => Err(format!("Unknown payment method: {}", s)),
        }
    }
}

/// Monetary penalty tied to a borrow or return request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BorrowFine {
    pub id: i64,
    /// Borrow request the fine was raised on
    #[serde(default, alias = "borrow_request", alias = "borrowing")]
    pub borrow_request_id: Option<i64>,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[serde(default)]
    pub reason: String,
    pub status: FineStatus,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub paid_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paid_by_name: Option<String>,
}

impl BorrowFine {
    /// A payment method can only be chosen while the fine is open
    pub fn ensure_payable(&self) -> AppResult<()> {
        if self.status.is_settled() {
            return Err(AppError::StateConflict(format!(
                "fine {} is already {:?}",
                self.id, self.status
            )));
        }
        if self.amount <= Decimal::ZERO {
            return Err(AppError::Validation(format!("fine {} has nothing to pay", self.id)));
        }
        Ok(())
    }

    /// Card confirmation requires an open fine with card selected
    pub fn ensure_card_confirmable(&self) -> AppResult<()> {
        self.ensure_payable()?;
        match self.payment_method {
            Some(PaymentMethod::Card) => Ok(()),
            _ => Err(AppError::StateConflict(format!(
                "fine {} is not set to card payment",
                self.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn policy(cap: Option<Decimal>) -> FinePolicy {
        FinePolicy::new(Decimal::new(20, 1), cap)
    }

    #[test]
    fn test_five_days_late() {
        let fine = policy(None).assess(due(), due() + Duration::days(5));
        assert_eq!(fine.overdue_days, 5);
        assert_eq!(fine.amount, Decimal::new(100, 1));
        assert!(fine.is_overdue);
    }

    #[test]
    fn test_cap_applies() {
        let fine = policy(Some(Decimal::new(70, 1))).assess(due(), due() + Duration::days(5));
        assert_eq!(fine.amount, Decimal::new(70, 1));
    }

    #[test]
    fn test_on_time_or_early() {
        for at in [due(), due() - Duration::days(3), due() + Duration::hours(6)] {
            let fine = policy(None).assess(due(), at);
            assert_eq!(fine.amount, Decimal::ZERO);
            assert!(!fine.is_overdue);
        }
    }

    #[test]
    fn test_days_remaining_goes_negative() {
        assert_eq!(days_remaining(due(), due() - Duration::days(2)), 2);
        assert_eq!(days_remaining(due(), due() + Duration::days(3)), -3);
    }

    #[test]
    fn test_paid_and_waived_are_exclusive() {
        assert_eq!(FineStatus::Unpaid.transition(FineStatus::Paid).unwrap(), FineStatus::Paid);
        assert!(FineStatus::Paid.transition(FineStatus::Waived).is_err());
        assert!(FineStatus::Waived.transition(FineStatus::Paid).is_err());
    }

    #[test]
    fn test_deserialize_fine_from_upstream() {
        let fine: BorrowFine = serde_json::from_value(serde_json::json!({
            "id": 3,
            "borrow_request": 42,
            "amount": "12.50",
            "reason": "Overdue by 5 days",
            "status": "UNPAID",
            "payment_method": null
        }))
        .unwrap();
        assert_eq!(fine.amount, Decimal::new(1250, 2));
        assert_eq!(fine.borrow_request_id, Some(42));
        assert_eq!(fine.status, FineStatus::Unpaid);
        assert!(fine.ensure_payable().is_ok());
        assert!(matches!(fine.ensure_card_confirmable(), Err(AppError::StateConflict(_))));
    }
}
