//! Repository layer over the upstream REST backend.
//!
//! The upstream owns every record; this layer only moves JSON in and out.

pub mod borrowings;
pub mod client;
pub mod delivery;
pub mod extensions;
pub mod fines;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    config::UpstreamConfig,
    error::AppResult,
    models::{
        borrow::{BorrowQuery, BorrowRecord},
        delivery::{DeliveryManager, LocationEnvelope},
        extension::BorrowExtension,
        fine::{BorrowFine, PaymentMethod},
    },
};

pub use borrowings::TransitionCall;

/// Every upstream operation the services rely on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BorrowBackend: Send + Sync {
    async fn get_borrowing(&self, token: &str, id: i64) -> AppResult<BorrowRecord>;

    async fn list_borrowings(&self, token: &str, query: &BorrowQuery) -> AppResult<Vec<BorrowRecord>>;

    async fn transition(&self, token: &str, id: i64, call: &TransitionCall) -> AppResult<()>;

    async fn delivery_location(&self, token: &str, id: i64) -> AppResult<LocationEnvelope>;

    async fn list_delivery_managers(&self, token: &str) -> AppResult<Vec<DeliveryManager>>;

    async fn get_fine(&self, token: &str, fine_id: i64) -> AppResult<BorrowFine>;

    async fn select_payment_method(
        &self,
        token: &str,
        fine_id: i64,
        method: PaymentMethod,
    ) -> AppResult<()>;

    async fn confirm_card_payment(
        &self,
        token: &str,
        fine_id: i64,
        transaction_reference: &str,
    ) -> AppResult<()>;

    async fn get_extension(&self, token: &str, extension_id: i64) -> AppResult<BorrowExtension>;

    async fn create_extension(
        &self,
        token: &str,
        borrow_id: i64,
        new_due_date: DateTime<Utc>,
    ) -> AppResult<BorrowExtension>;

    async fn decide_extension(&self, token: &str, extension_id: i64, approve: bool) -> AppResult<()>;
}

/// Main repository struct holding the upstream client
#[derive(Clone)]
pub struct Repository {
    pub borrowings: borrowings::BorrowingsRepository,
    pub delivery: delivery::DeliveryRepository,
    pub fines: fines::FinesRepository,
    pub extensions: extensions::ExtensionsRepository,
}

impl Repository {
    /// Create a new repository talking to the configured upstream
    pub fn new(config: &UpstreamConfig) -> AppResult<Self> {
        let client = client::UpstreamClient::new(config)?;
        Ok(Self {
            borrowings: borrowings::BorrowingsRepository::new(client.clone()),
            delivery: delivery::DeliveryRepository::new(client.clone()),
            fines: fines::FinesRepository::new(client.clone()),
            extensions: extensions::ExtensionsRepository::new(client),
        })
    }
}

#[async_trait]
impl BorrowBackend for Repository {
    async fn get_borrowing(&self, token: &str, id: i64) -> AppResult<BorrowRecord> {
        self.borrowings.get_by_id(token, id).await
    }

    async fn list_borrowings(&self, token: &str, query: &BorrowQuery) -> AppResult<Vec<BorrowRecord>> {
        self.borrowings.list(token, query).await
    }

    async fn transition(&self, token: &str, id: i64, call: &TransitionCall) -> AppResult<()> {
        self.borrowings.transition(token, id, call).await
    }

    async fn delivery_location(&self, token: &str, id: i64) -> AppResult<LocationEnvelope> {
        self.delivery.location(token, id).await
    }

    async fn list_delivery_managers(&self, token: &str) -> AppResult<Vec<DeliveryManager>> {
        self.delivery.list_managers(token).await
    }

    async fn get_fine(&self, token: &str, fine_id: i64) -> AppResult<BorrowFine> {
        self.fines.get_by_id(token, fine_id).await
    }

    async fn select_payment_method(
        &self,
        token: &str,
        fine_id: i64,
        method: PaymentMethod,
    ) -> AppResult<()> {
        self.fines.select_payment_method(token, fine_id, method).await
    }

    async fn confirm_card_payment(
        &self,
        token: &str,
        fine_id: i64,
        transaction_reference: &str,
    ) -> AppResult<()> {
        self.fines
            .confirm_card_payment(token, fine_id, transaction_reference)
            .await
    }

    async fn get_extension(&self, token: &str, extension_id: i64) -> AppResult<BorrowExtension> {
        self.extensions.get_by_id(token, extension_id).await
    }

    async fn create_extension(
        &self,
        token: &str,
        borrow_id: i64,
        new_due_date: DateTime<Utc>,
    ) -> AppResult<BorrowExtension> {
        self.extensions.create(token, borrow_id, new_due_date).await
    }

    async fn decide_extension(&self, token: &str, extension_id: i64, approve: bool) -> AppResult<()> {
        self.extensions.decide(token, extension_id, approve).await
    }
}
