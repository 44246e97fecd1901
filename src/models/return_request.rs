//! Return leg of an active borrow

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppResult;

use super::status::ReturnStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReturnRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub borrow_request_id: i64,
    #[serde(deserialize_with = "deserialize_return_status")]
    pub status: ReturnStatus,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub fine_amount: Option<Decimal>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn deserialize_return_status<'de, D>(deserializer: D) -> Result<ReturnStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

impl ReturnRequest {
    /// Freshly opened return for `borrow_request_id`
    pub fn open(borrow_request_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            borrow_request_id,
            status: ReturnStatus::PendingPickup,
            fine_amount: None,
            created_at: Some(now),
        }
    }

    pub fn advance(&mut self, to: ReturnStatus) -> AppResult<()> {
        self.status = self.status.transition(to)?;
        Ok(())
    }

    /// Close the return, recording the fine fixed at completion
    pub fn complete(&mut self, fine: Decimal) -> AppResult<()> {
        let outcome = if fine > Decimal::ZERO {
            ReturnStatus::LateReturn
        } else {
            ReturnStatus::ReturnedSuccessfully
        };
        self.advance(outcome)?;
        self.fine_amount = Some(fine);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_walk() {
        let mut ret = ReturnRequest::open(10, Utc::now());
        assert!(ret.complete(Decimal::ZERO).is_err());
        ret.advance(ReturnStatus::InReturn).unwrap();
        ret.advance(ReturnStatus::ReturningToLibrary).unwrap();
        ret.complete(Decimal::new(4, 0)).unwrap();
        assert_eq!(ret.status, ReturnStatus::LateReturn);
        assert_eq!(ret.fine_amount, Some(Decimal::new(4, 0)));
    }

    #[test]
    fn test_deserialize_lenient_status() {
        let ret: ReturnRequest = serde_json::from_value(serde_json::json!({
            "id": 4,
            "borrow_request_id": 9,
            "status": "Pending Pickup"
        }))
        .unwrap();
        assert_eq!(ret.status, ReturnStatus::PendingPickup);
    }
}
