//! Fine payment endpoints

use serde_json::json;

use crate::{
    error::AppResult,
    models::fine::{BorrowFine, PaymentMethod},
};

use super::client::UpstreamClient;

#[derive(Clone)]
pub struct FinesRepository {
    client: UpstreamClient,
}

impl FinesRepository {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    pub async fn get_by_id(&self, token: &str, fine_id: i64) -> AppResult<BorrowFine> {
        self.client
            .get(token, &format!("borrow/fines/{}/", fine_id), &[])
            .await
    }

    pub async fn select_payment_method(
        &self,
        token: &str,
        fine_id: i64,
        method: PaymentMethod,
    ) -> AppResult<()> {
        self.client
            .post_unit(
                token,
                &format!("borrow/fines/{}/select-payment-method/", fine_id),
                &json!({ "payment_method": method.as_str() }),
            )
            .await
    }

    pub async fn confirm_card_payment(
        &self,
        token: &str,
        fine_id: i64,
        transaction_reference: &str,
    ) -> AppResult<()> {
        self.client
            .post_unit(
                token,
                &format!("borrow/fines/{}/confirm-card-payment/", fine_id),
                &json!({ "transaction_reference": transaction_reference }),
            )
            .await
    }
}
