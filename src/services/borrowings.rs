//! Borrow request workflow service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult, Notice},
    models::{
        borrow::{BorrowAction, BorrowCommand, BorrowQuery, BorrowRequest},
        delivery::{DeliveryLocation, DeliveryManager, DeliveryPerson},
        fine::{FineAssessment, FinePolicy},
        status::BorrowStatus,
        user::{Role, Session},
    },
    repository::{BorrowBackend, TransitionCall},
};

/// What the caller may do with a request right now
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowActions {
    pub id: i64,
    pub status: String,
    pub actions: Vec<BorrowAction>,
    pub can_track_delivery: bool,
    pub show_return_actions: bool,
    pub show_assigned_delivery_manager: bool,
    pub is_overdue: bool,
    pub days_remaining: Option<i64>,
}

/// Outcome of a live location lookup
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LocationView {
    pub available: bool,
    pub location: Option<DeliveryLocation>,
    pub notice: Option<Notice>,
}

impl LocationView {
    fn unavailable(notice: Notice) -> Self {
        Self {
            available: false,
            location: None,
            notice: Some(notice),
        }
    }
}

#[derive(Clone)]
pub struct BorrowingsService {
    backend: Arc<dyn BorrowBackend>,
    policy: FinePolicy,
    default_period_days: i64,
}

impl BorrowingsService {
    pub fn new(backend: Arc<dyn BorrowBackend>, policy: FinePolicy, default_period_days: i64) -> Self {
        Self {
            backend,
            policy,
            default_period_days,
        }
    }

    pub fn policy(&self) -> &FinePolicy {
        &self.policy
    }

    /// Get a borrow request; customers only see their own
    pub async fn get(&self, session: &Session, id: i64) -> AppResult<BorrowRequest> {
        let token = session.token()?;
        let record = self.backend.get_borrowing(token, id).await?;
        let request = BorrowRequest::from_record(record, self.default_period_days)?;

        if session.role == Role::Customer && request.customer_id != session.user_id {
            return Err(AppError::Authorization(
                "This borrow request belongs to another customer".to_string(),
            ));
        }
        Ok(request)
    }

    /// Filtered list of borrow requests
    pub async fn list(&self, session: &Session, query: &BorrowQuery) -> AppResult<Vec<BorrowRequest>> {
        let token = session.token()?;
        let records = self.backend.list_borrowings(token, query).await?;

        let requests = records
            .into_iter()
            .map(|r| BorrowRequest::from_record(r, self.default_period_days))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(requests
            .into_iter()
            .filter(|r| session.role != Role::Customer || r.customer_id == session.user_id)
            .collect())
    }

    /// Guard predicates and permitted actions for the caller
    pub async fn actions(&self, session: &Session, id: i64) -> AppResult<BorrowActions> {
        let request = self.get(session, id).await?;
        let now = Utc::now();

        Ok(BorrowActions {
            id: request.id,
            actions: request.allowed_actions(session.role),
            can_track_delivery: request.is_delivery_active(),
            show_return_actions: request.should_show_return_actions(),
            show_assigned_delivery_manager: request.should_show_assigned_delivery_manager(),
            is_overdue: request.is_overdue(now),
            days_remaining: request.days_remaining(now),
            status: request.status,
        })
    }

    /// Live fine figure; fixed once the return is complete
    pub async fn fine_preview(&self, session: &Session, id: i64) -> AppResult<FineAssessment> {
        let request = self.get(session, id).await?;
        Ok(request.fine_preview(Utc::now(), &self.policy))
    }

    pub async fn approve(&self, session: &Session, id: i64, delivery_manager_id: i64) -> AppResult<BorrowRequest> {
        let delivery_manager = self.available_manager(session, delivery_manager_id).await?;
        self.execute(session, id, BorrowCommand::Approve { delivery_manager }).await
    }

    pub async fn reject(&self, session: &Session, id: i64, reason: &str) -> AppResult<BorrowRequest> {
        let command = BorrowCommand::Reject {
            reason: reason.to_string(),
        };
        self.execute(session, id, command).await
    }

    pub async fn cancel(&self, session: &Session, id: i64) -> AppResult<BorrowRequest> {
        self.execute(session, id, BorrowCommand::Cancel).await
    }

    pub async fn mark_delivered(&self, session: &Session, id: i64) -> AppResult<BorrowRequest> {
        self.execute(session, id, BorrowCommand::MarkDelivered).await
    }

    pub async fn request_return(&self, session: &Session, id: i64) -> AppResult<BorrowRequest> {
        self.execute(session, id, BorrowCommand::RequestReturn).await
    }

    pub async fn approve_return(&self, session: &Session, id: i64) -> AppResult<BorrowRequest> {
        self.execute(session, id, BorrowCommand::ApproveReturn).await
    }

    pub async fn assign_return(&self, session: &Session, id: i64, delivery_manager_id: i64) -> AppResult<BorrowRequest> {
        let delivery_manager = self.available_manager(session, delivery_manager_id).await?;
        self.execute(session, id, BorrowCommand::AssignReturn { delivery_manager }).await
    }

    pub async fn start_return_delivery(&self, session: &Session, id: i64) -> AppResult<BorrowRequest> {
        self.execute(session, id, BorrowCommand::StartReturnDelivery).await
    }

    pub async fn complete_return(&self, session: &Session, id: i64) -> AppResult<BorrowRequest> {
        self.execute(session, id, BorrowCommand::CompleteReturn).await
    }

    /// Run one lifecycle transition.
    ///
    /// The command is first applied to a copy of the current record so that
    /// conflicts, wrong roles and bad input never reach the upstream. After
    /// the upstream accepts the call the record is fetched again and that
    /// copy is returned.
    pub async fn execute(&self, session: &Session, id: i64, command: BorrowCommand) -> AppResult<BorrowRequest> {
        let token = session.token()?;
        command.validate()?;

        let current = self.get(session, id).await?;
        let action = command.action();
        let now = Utc::now();

        let mut draft = current.clone();
        if let Err(e) = draft.apply(session.role, command.clone(), now, &self.policy) {
            tracing::warn!(
                "Refusing to {} borrow {} ('{}') as {}: {}",
                action,
                id,
                current.status,
                session.role,
                e
            );
            return Err(e);
        }

        let call = upstream_call(&command, &draft, now);
        if let Err(e) = self.backend.transition(token, id, &call).await {
            if matches!(e, AppError::StateConflict(_)) {
                tracing::warn!("Upstream refused to {} borrow {}: {}", action, id, e);
            }
            return Err(e);
        }

        tracing::info!(
            "Borrow {} moved from '{}' by {} ({})",
            id,
            current.status,
            session.role,
            action
        );

        self.get(session, id).await
    }

    /// Courier position, only while the book is out for delivery
    pub async fn delivery_location(&self, session: &Session, id: i64) -> AppResult<LocationView> {
        let request = self.get(session, id).await?;

        if !request.is_delivery_active() {
            return Ok(LocationView::unavailable(Notice::info(format!(
                "Live location is only available while the book is {}",
                BorrowStatus::OutForDelivery.as_str().replace('_', " ")
            ))));
        }

        let token = session.token()?;
        let envelope = self.backend.delivery_location(token, id).await?;
        let message = envelope.message.clone();

        match envelope.into_location() {
            Some(location) => Ok(LocationView {
                available: true,
                location: Some(location),
                notice: None,
            }),
            None => {
                tracing::warn!("No courier location for borrow {}", id);
                Ok(LocationView::unavailable(Notice::warning(
                    message.unwrap_or_else(|| "Courier location is not available yet".to_string()),
                )))
            }
        }
    }

    /// Delivery managers an admin can pick from
    pub async fn delivery_managers(&self, session: &Session) -> AppResult<Vec<DeliveryManager>> {
        session.require_admin()?;
        let token = session.token()?;
        self.backend.list_delivery_managers(token).await
    }

    /// Look up a delivery manager and make sure they can take the job
    async fn available_manager(&self, session: &Session, manager_id: i64) -> AppResult<DeliveryPerson> {
        if manager_id <= 0 {
            return Err(AppError::Validation("Select a delivery manager".to_string()));
        }
        let token = session.token()?;
        let managers = self.backend.list_delivery_managers(token).await?;

        let manager = managers
            .into_iter()
            .find(|m| m.id == manager_id)
            .ok_or_else(|| AppError::Validation(format!("Unknown delivery manager {}", manager_id)))?;

        if !manager.is_available() {
            return Err(AppError::Validation(format!(
                "Delivery manager {} is {:?} and cannot be assigned",
                manager.name, manager.availability
            )));
        }

        Ok(DeliveryPerson {
            id: manager.id,
            name: Some(manager.name),
            phone: None,
        })
    }
}

/// Upstream call matching a command already applied to `draft`
fn upstream_call(command: &BorrowCommand, draft: &BorrowRequest, now: DateTime<Utc>) -> TransitionCall {
    match command {
        BorrowCommand::Approve { delivery_manager } => TransitionCall::Approve {
            delivery_manager_id: delivery_manager.id,
        },
        BorrowCommand::Reject { reason } => TransitionCall::Reject {
            reason: reason.trim().to_string(),
        },
        BorrowCommand::Cancel => TransitionCall::Cancel,
        BorrowCommand::MarkDelivered => TransitionCall::MarkDelivered,
        BorrowCommand::RequestReturn => TransitionCall::CreateReturnRequest,
        BorrowCommand::ApproveReturn => TransitionCall::ApproveReturnOnly,
        BorrowCommand::AssignReturn { delivery_manager } => {
            TransitionCall::AssignReturnDeliveryManager {
                delivery_manager_id: delivery_manager.id,
            }
        }
        BorrowCommand::StartReturnDelivery => TransitionCall::StartReturnDelivery,
        BorrowCommand::CompleteReturn => TransitionCall::CompleteReturn {
            final_return_date: draft.final_return_date.unwrap_or(now),
            fine_amount: draft.fine_amount,
        },
    }
}
