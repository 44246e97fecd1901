//! Borrowings endpoints of the upstream backend

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use crate::{
    error::AppResult,
    models::borrow::{BorrowQuery, BorrowRecord},
};

use super::client::{ListEnvelope, UpstreamClient};

/// One upstream mutation of a borrowing, with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionCall {
    Approve { delivery_manager_id: i64 },
    Reject { reason: String },
    Cancel,
    MarkDelivered,
    CreateReturnRequest,
    ApproveReturnOnly,
    AssignReturnDeliveryManager { delivery_manager_id: i64 },
    StartReturnDelivery,
    CompleteReturn {
        final_return_date: DateTime<Utc>,
        fine_amount: Decimal,
    },
}

impl TransitionCall {
    pub fn endpoint(&self) -> &'static str {
        match self {
            TransitionCall::Approve { .. } => "approve",
            TransitionCall::Reject { .. } => "reject",
            TransitionCall::Cancel => "cancel",
            TransitionCall::MarkDelivered => "mark-delivered",
            TransitionCall::CreateReturnRequest => "create-return-request",
            TransitionCall::ApproveReturnOnly => "approve-return-only",
            TransitionCall::AssignReturnDeliveryManager { .. } => "assign-return-delivery-manager",
            TransitionCall::StartReturnDelivery => "start-return-delivery",
            TransitionCall::CompleteReturn { .. } => "complete-return",
        }
    }

    pub fn body(&self) -> serde_json::Value {
        match self {
            TransitionCall::Approve { delivery_manager_id }
            | TransitionCall::AssignReturnDeliveryManager { delivery_manager_id } => {
                json!({ "delivery_manager_id": delivery_manager_id })
            }
            TransitionCall::Reject { reason } => json!({ "reason": reason }),
            TransitionCall::CompleteReturn {
                final_return_date,
                fine_amount,
            } => json!({
                "final_return_date": final_return_date,
                "fine_amount": fine_amount.to_string(),
            }),
            _ => json!({}),
        }
    }
}

#[derive(Clone)]
pub struct BorrowingsRepository {
    client: UpstreamClient,
}

impl BorrowingsRepository {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    /// Get a single borrowing
    pub async fn get_by_id(&self, token: &str, id: i64) -> AppResult<BorrowRecord> {
        self.client
            .get(token, &format!("borrow/borrowings/{}/", id), &[])
            .await
    }

    /// Filtered list of borrowings
    pub async fn list(&self, token: &str, query: &BorrowQuery) -> AppResult<Vec<BorrowRecord>> {
        let envelope: ListEnvelope<BorrowRecord> = self
            .client
            .get(token, "borrow/borrowings/", &query.to_pairs())
            .await?;
        Ok(envelope.into_vec())
    }

    /// Ask the upstream to perform a lifecycle transition
    pub async fn transition(&self, token: &str, id: i64, call: &TransitionCall) -> AppResult<()> {
        let path = format!("borrow/borrowings/{}/{}/", id, call.endpoint());
        self.client.post_unit(token, &path, &call.body()).await
    }
}
