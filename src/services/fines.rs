//! Fine payment service

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        fine::{BorrowFine, PaymentMethod},
        user::{Role, Session},
    },
    repository::BorrowBackend,
};

#[derive(Clone)]
pub struct FinesService {
    backend: Arc<dyn BorrowBackend>,
}

impl FinesService {
    pub fn new(backend: Arc<dyn BorrowBackend>) -> Self {
        Self { backend }
    }

    /// Read a fine; customers must own the borrow request it was raised on
    async fn owned_fine(&self, session: &Session, token: &str, fine_id: i64) -> AppResult<BorrowFine> {
        let fine = self.backend.get_fine(token, fine_id).await?;

        if session.role == Role::Customer {
            let borrow_id = fine.borrow_request_id.ok_or_else(|| {
                AppError::Authorization(format!(
                    "Fine {} is not linked to one of your borrow requests",
                    fine_id
                ))
            })?;
            let parent = self.backend.get_borrowing(token, borrow_id).await?;
            if parent.customer_id != session.user_id {
                return Err(AppError::Authorization(
                    "This fine belongs to another customer".to_string(),
                ));
            }
        }
        Ok(fine)
    }

    pub async fn get(&self, session: &Session, fine_id: i64) -> AppResult<BorrowFine> {
        let token = session.token()?;
        self.owned_fine(session, token, fine_id).await
    }

    /// Choose cash or card for an open fine
    pub async fn select_payment_method(
        &self,
        session: &Session,
        fine_id: i64,
        method: PaymentMethod,
    ) -> AppResult<BorrowFine> {
        session.require_any(&[Role::Customer, Role::Admin])?;
        let token = session.token()?;

        let fine = self.owned_fine(session, token, fine_id).await?;
        fine.ensure_payable()?;

        self.backend.select_payment_method(token, fine_id, method).await?;
        tracing::info!("Fine {} will be paid by {}", fine_id, method.as_str());

        self.backend.get_fine(token, fine_id).await
    }

    /// Record the gateway confirmation of a card payment
    pub async fn confirm_card_payment(
        &self,
        session: &Session,
        fine_id: i64,
        transaction_reference: &str,
    ) -> AppResult<BorrowFine> {
        session.require_any(&[Role::Customer, Role::Admin])?;
        let reference = transaction_reference.trim();
        if reference.is_empty() {
            return Err(AppError::Validation(
                "A payment transaction reference is required".to_string(),
            ));
        }
        let token = session.token()?;

        let fine = self.owned_fine(session, token, fine_id).await?;
        fine.ensure_card_confirmable()?;

        self.backend.confirm_card_payment(token, fine_id, reference).await?;
        tracing::info!("Card payment confirmed for fine {}", fine_id);

        self.backend.get_fine(token, fine_id).await
    }
}
