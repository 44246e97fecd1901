//! Delivery staff and live location endpoints

use crate::{
    error::AppResult,
    models::delivery::{DeliveryManager, LocationEnvelope},
};

use super::client::{ListEnvelope, UpstreamClient};

#[derive(Clone)]
pub struct DeliveryRepository {
    client: UpstreamClient,
}

impl DeliveryRepository {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    /// Delivery managers with their current availability
    pub async fn list_managers(&self, token: &str) -> AppResult<Vec<DeliveryManager>> {
        let envelope: ListEnvelope<DeliveryManager> =
            self.client.get(token, "delivery/managers/", &[]).await?;
        Ok(envelope.into_vec())
    }

    /// Last known courier position for a borrowing
    pub async fn location(&self, token: &str, borrow_id: i64) -> AppResult<LocationEnvelope> {
        self.client
            .get(
                token,
                &format!("borrow/borrowings/{}/delivery-location/", borrow_id),
                &[],
            )
            .await
    }
}
