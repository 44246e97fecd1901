//! Due date extension service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::BorrowRequest,
        extension::{validate_new_due_date, BorrowExtension, ExtensionStatus},
        status::BorrowStatus,
        user::{Role, Session},
    },
    repository::BorrowBackend,
};

/// Decided extension together with the refreshed parent request
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExtensionDecision {
    pub extension: BorrowExtension,
    pub borrowing: BorrowRequest,
}

#[derive(Clone)]
pub struct ExtensionsService {
    backend: Arc<dyn BorrowBackend>,
    default_period_days: i64,
}

impl ExtensionsService {
    pub fn new(backend: Arc<dyn BorrowBackend>, default_period_days: i64) -> Self {
        Self {
            backend,
            default_period_days,
        }
    }

    async fn borrowing(&self, token: &str, id: i64) -> AppResult<BorrowRequest> {
        let record = self.backend.get_borrowing(token, id).await?;
        BorrowRequest::from_record(record, self.default_period_days)
    }

    /// Ask for a later due date on an active loan
    pub async fn request(
        &self,
        session: &Session,
        borrow_id: i64,
        new_due_date: DateTime<Utc>,
    ) -> AppResult<BorrowExtension> {
        session.require_any(&[Role::Customer, Role::Admin])?;
        let token = session.token()?;

        let borrowing = self.borrowing(token, borrow_id).await?;
        if session.role == Role::Customer && borrowing.customer_id != session.user_id {
            return Err(AppError::Authorization(
                "This borrow request belongs to another customer".to_string(),
            ));
        }
        if borrowing.lifecycle()? != BorrowStatus::Active {
            return Err(AppError::StateConflict(format!(
                "only active loans can be extended, borrow {} is '{}'",
                borrow_id, borrowing.status
            )));
        }
        if borrowing
            .extensions
            .iter()
            .any(|e| e.status == ExtensionStatus::Pending)
        {
            return Err(AppError::StateConflict(format!(
                "borrow {} already has a pending extension",
                borrow_id
            )));
        }
        validate_new_due_date(borrowing.due_date, new_due_date)?;

        let extension = self
            .backend
            .create_extension(token, borrow_id, new_due_date)
            .await?;
        tracing::info!("Extension {} requested for borrow {}", extension.id, borrow_id);
        Ok(extension)
    }

    /// Approve or reject a pending extension
    pub async fn decide(
        &self,
        session: &Session,
        extension_id: i64,
        approve: bool,
    ) -> AppResult<ExtensionDecision> {
        session.require_admin()?;
        let token = session.token()?;

        let mut draft = self.backend.get_extension(token, extension_id).await?;
        let expected_due = draft.decide(approve)?;

        self.backend.decide_extension(token, extension_id, approve).await?;
        tracing::info!(
            "Extension {} {}",
            extension_id,
            if approve { "approved" } else { "rejected" }
        );

        let extension = self.backend.get_extension(token, extension_id).await?;
        let borrowing = self.borrowing(token, extension.borrow_request_id).await?;
        if let Some(due) = expected_due {
            if borrowing.due_date != due {
                tracing::warn!(
                    "Borrow {} is due {} after extension {} was approved for {}",
                    borrowing.id,
                    borrowing.due_date,
                    extension_id,
                    due
                );
            }
        }
        Ok(ExtensionDecision {
            extension,
            borrowing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::borrow::BorrowRecord, repository::MockBorrowBackend};
    use chrono::Duration;

    fn active() -> BorrowRecord {
        serde_json::from_value(serde_json::json!({
            "id": 42,
            "customer_id": 7,
            "book_id": 99,
            "request_date": "2024-03-01T09:00:00Z",
            "due_date": "2024-03-15T09:00:00Z",
            "status": "active"
        }))
        .unwrap()
    }

    fn extension(status: ExtensionStatus) -> BorrowExtension {
        let original = "2024-03-15T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        BorrowExtension {
            id: 11,
            borrow_request_id: 42,
            original_due_date: original,
            new_due_date: original + Duration::days(7),
            status,
        }
    }

    #[tokio::test]
    async fn test_request_must_push_due_date_later() {
        let mut backend = MockBorrowBackend::new();
        backend.expect_get_borrowing().returning(|_, _| Ok(active()));
        backend.expect_create_extension().times(0);

        let service = ExtensionsService::new(Arc::new(backend), 14);
        let session = Session::new("token", 7, Role::Customer);
        let earlier = "2024-03-10T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let err = service.request(&session, 42, earlier).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_request_on_active_loan() {
        let mut backend = MockBorrowBackend::new();
        backend.expect_get_borrowing().returning(|_, _| Ok(active()));
        backend
            .expect_create_extension()
            .times(1)
            .returning(|_, _, _| Ok(extension(ExtensionStatus::Pending)));

        let service = ExtensionsService::new(Arc::new(backend), 14);
        let session = Session::new("token", 7, Role::Customer);
        let later = "2024-03-22T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let ext = service.request(&session, 42, later).await.unwrap();
        assert_eq!(ext.status, ExtensionStatus::Pending);
    }

    #[tokio::test]
    async fn test_request_on_returned_loan_is_conflict() {
        let mut backend = MockBorrowBackend::new();
        backend.expect_get_borrowing().returning(|_, _| {
            let mut r = active();
            r.status = "returned".to_string();
            Ok(r)
        });
        backend.expect_create_extension().times(0);

        let service = ExtensionsService::new(Arc::new(backend), 14);
        let session = Session::new("token", 7, Role::Customer);
        let later = "2024-03-22T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let err = service.request(&session, 42, later).await.unwrap_err();
        assert!(matches!(err, AppError::StateConflict(_)));
    }

    #[tokio::test]
    async fn test_second_pending_extension_is_conflict() {
        let mut backend = MockBorrowBackend::new();
        backend.expect_get_borrowing().returning(|_, _| {
            let mut r = active();
            r.extensions = vec![extension(ExtensionStatus::Pending)];
            Ok(r)
        });
        backend.expect_create_extension().times(0);

        let service = ExtensionsService::new(Arc::new(backend), 14);
        let session = Session::new("token", 7, Role::Customer);
        let later = "2024-03-29T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let err = service.request(&session, 42, later).await.unwrap_err();
        assert!(matches!(err, AppError::StateConflict(_)));
    }

    #[tokio::test]
    async fn test_rejected_extension_keeps_parent_due_date() {
        let mut backend = MockBorrowBackend::new();
        backend
            .expect_get_extension()
            .times(1)
            .returning(|_, _| Ok(extension(ExtensionStatus::Pending)));
        backend
            .expect_decide_extension()
            .withf(|_, id, approve| *id == 11 && !*approve)
            .times(1)
            .returning(|_, _, _| Ok(()));
        backend
            .expect_get_extension()
            .times(1)
            .returning(|_, _| Ok(extension(ExtensionStatus::Rejected)));
        backend.expect_get_borrowing().times(1).returning(|_, _| Ok(active()));

        let service = ExtensionsService::new(Arc::new(backend), 14);
        let decision = service
            .decide(&Session::new("token", 1, Role::Admin), 11, false)
            .await
            .unwrap();
        assert_eq!(decision.extension.status, ExtensionStatus::Rejected);
        assert_eq!(decision.borrowing.due_date, decision.extension.original_due_date);
    }

    #[tokio::test]
    async fn test_decided_extension_cannot_be_decided_again() {
        let mut backend = MockBorrowBackend::new();
        backend
            .expect_get_extension()
            .returning(|_, _| Ok(extension(ExtensionStatus::Rejected)));
        backend.expect_decide_extension().times(0);

        let service = ExtensionsService::new(Arc::new(backend), 14);
        let err = service
            .decide(&Session::new("token", 1, Role::Admin), 11, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StateConflict(_)));
    }

    #[tokio::test]
    async fn test_approve_returns_refreshed_parent() {
        let mut backend = MockBorrowBackend::new();
        backend
            .expect_get_extension()
            .times(1)
            .returning(|_, _| Ok(extension(ExtensionStatus::Pending)));
        backend
            .expect_decide_extension()
            .withf(|_, id, approve| *id == 11 && *approve)
            .times(1)
            .returning(|_, _, _| Ok(()));
        backend
            .expect_get_extension()
            .times(1)
            .returning(|_, _| Ok(extension(ExtensionStatus::Approved)));
        backend.expect_get_borrowing().times(1).returning(|_, _| {
            let mut r = active();
            r.due_date = Some("2024-03-22T09:00:00Z".parse().unwrap());
            Ok(r)
        });

        let service = ExtensionsService::new(Arc::new(backend), 14);
        let decision = service
            .decide(&Session::new("token", 1, Role::Admin), 11, true)
            .await
            .unwrap();
        assert_eq!(decision.extension.status, ExtensionStatus::Approved);
        assert_eq!(decision.borrowing.due_date, decision.extension.new_due_date);
    }
}
