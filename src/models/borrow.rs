//! Borrow request aggregate, its commands and guard predicates

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

use super::{
    delivery::DeliveryPerson,
    extension::BorrowExtension,
    fine::{self, BorrowFine, FineAssessment, FinePolicy},
    return_request::ReturnRequest,
    status::{normalize_status, BorrowStatus, ReturnStatus},
    user::Role,
};

/// One borrow transaction as held by this service.
///
/// `status` keeps the string exactly as the upstream sent it; the typed
/// state is obtained through [`BorrowRequest::lifecycle`].
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BorrowRequest {
    pub id: i64,
    pub customer_id: i64,
    pub book_id: i64,
    pub delivery_person: Option<DeliveryPerson>,
    pub request_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub due_date: DateTime<Utc>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
    pub final_return_date: Option<DateTime<Utc>>,
    pub status: String,
    pub borrow_period_days: i64,
    #[schema(value_type = String)]
    pub fine_amount: Decimal,
    pub rejection_reason: Option<String>,
    pub customer_name: Option<String>,
    pub book_title: Option<String>,
    pub return_request: Option<ReturnRequest>,
    pub fine: Option<BorrowFine>,
    pub extensions: Vec<BorrowExtension>,
}

/// Borrow record as serialized by the upstream
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct BorrowRecord {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: i64,
    #[serde(alias = "customer")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub customer_id: i64,
    #[serde(alias = "book")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub book_id: i64,
    #[serde(default, alias = "delivery_manager")]
    pub delivery_person: Option<DeliveryPerson>,
    pub request_date: DateTime<Utc>,
    #[serde(default)]
    pub approval_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub return_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub final_return_date: Option<DateTime<Utc>>,
    pub status: String,
    #[serde(default)]
    pub borrow_period_days: Option<i64>,
    #[serde(default)]
    pub fine_amount: Option<Decimal>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub book_title: Option<String>,
    #[serde(default)]
    pub return_request: Option<ReturnRequest>,
    #[serde(default)]
    pub fine: Option<BorrowFine>,
    #[serde(default)]
    pub extensions: Vec<BorrowExtension>,
}

/// List filter forwarded to the upstream
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowQuery {
    /// Status filter, normalized before it is sent
    pub status: Option<String>,
    /// Free text search on customer and book
    pub search: Option<String>,
}

impl BorrowQuery {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            status: None,
            search: Some(text.into()),
        }
    }

    /// Query pairs with empty values dropped and the status normalized
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status.as_deref().map(normalize_status) {
            if !status.is_empty() {
                pairs.push(("status", status));
            }
        }
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                pairs.push(("search", search.to_string()));
            }
        }
        pairs
    }
}

/// Action a caller can trigger on a borrow request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BorrowAction {
    Approve,
    Reject,
    Cancel,
    MarkDelivered,
    RequestReturn,
    ApproveReturn,
    AssignReturn,
    StartReturnDelivery,
    CompleteReturn,
}

impl BorrowAction {
    pub fn target(&self) -> BorrowStatus {
        match self {
            BorrowAction::Approve => BorrowStatus::Approved,
            BorrowAction::Reject => BorrowStatus::Rejected,
            BorrowAction::Cancel => BorrowStatus::Cancelled,
            BorrowAction::MarkDelivered => BorrowStatus::Active,
            BorrowAction::RequestReturn => BorrowStatus::ReturnRequested,
            BorrowAction::ApproveReturn => BorrowStatus::ReturnApproved,
            BorrowAction::AssignReturn => BorrowStatus::ReturnAssigned,
            BorrowAction::StartReturnDelivery => BorrowStatus::OutForDelivery,
            BorrowAction::CompleteReturn => BorrowStatus::Returned,
        }
    }

    fn for_target(status: BorrowStatus) -> Option<BorrowAction> {
        let action = match status {
            BorrowStatus::Approved => BorrowAction::Approve,
            BorrowStatus::Rejected => BorrowAction::Reject,
            BorrowStatus::Cancelled => BorrowAction::Cancel,
            BorrowStatus::Active => BorrowAction::MarkDelivered,
            BorrowStatus::ReturnRequested => BorrowAction::RequestReturn,
            BorrowStatus::ReturnApproved => BorrowAction::ApproveReturn,
            BorrowStatus::ReturnAssigned => BorrowAction::AssignReturn,
            BorrowStatus::OutForDelivery => BorrowAction::StartReturnDelivery,
            BorrowStatus::Returned => BorrowAction::CompleteReturn,
            BorrowStatus::Pending => return None,
        };
        Some(action)
    }
}

impl std::fmt::Display for BorrowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BorrowAction::Approve => "approve",
            BorrowAction::Reject => "reject",
            BorrowAction::Cancel => "cancel",
            BorrowAction::MarkDelivered => "mark delivered",
            BorrowAction::RequestReturn => "request return",
            BorrowAction::ApproveReturn => "approve return",
            BorrowAction::AssignReturn => "assign return",
            BorrowAction::StartReturnDelivery => "start return delivery",
            BorrowAction::CompleteReturn => "complete return",
        };
        write!(f, "{}", label)
    }
}

/// A transition together with the input it requires
#[derive(Debug, Clone, PartialEq)]
pub enum BorrowCommand {
    Approve { delivery_manager: DeliveryPerson },
    Reject { reason: String },
    Cancel,
    MarkDelivered,
    RequestReturn,
    ApproveReturn,
    AssignReturn { delivery_manager: DeliveryPerson },
    StartReturnDelivery,
    CompleteReturn,
}

impl BorrowCommand {
    pub fn action(&self) -> BorrowAction {
        match self {
            BorrowCommand::Approve { .. } => BorrowAction::Approve,
            BorrowCommand::Reject { .. } => BorrowAction::Reject,
            BorrowCommand::Cancel => BorrowAction::Cancel,
            BorrowCommand::MarkDelivered => BorrowAction::MarkDelivered,
            BorrowCommand::RequestReturn => BorrowAction::RequestReturn,
            BorrowCommand::ApproveReturn => BorrowAction::ApproveReturn,
            BorrowCommand::AssignReturn { .. } => BorrowAction::AssignReturn,
            BorrowCommand::StartReturnDelivery => BorrowAction::StartReturnDelivery,
            BorrowCommand::CompleteReturn => BorrowAction::CompleteReturn,
        }
    }

    /// Input checks that never need the network
    pub fn validate(&self) -> AppResult<()> {
        match self {
            BorrowCommand::Reject { reason } if reason.trim().is_empty() => Err(
                AppError::Validation("A rejection reason is required".to_string()),
            ),
            BorrowCommand::Approve { delivery_manager }
            | BorrowCommand::AssignReturn { delivery_manager }
                if delivery_manager.id <= 0 =>
            {
                Err(AppError::Validation("Select a delivery manager".to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl BorrowRequest {
    /// Build the aggregate from an upstream record.
    ///
    /// A missing due date is derived from the request date and the borrow
    /// period; approval date and delivery person are dropped when the state
    /// has not reached the point where they can exist. A period that pushes
    /// the due date out of range is a parse error.
    pub fn from_record(record: BorrowRecord, default_period_days: i64) -> AppResult<Self> {
        let borrow_period_days = record
            .borrow_period_days
            .filter(|days| *days > 0)
            .unwrap_or(default_period_days);
        let due_date = match record.due_date {
            Some(due) => due,
            None => Duration::try_days(borrow_period_days)
                .and_then(|period| record.request_date.checked_add_signed(period))
                .ok_or_else(|| {
                    AppError::Parse(format!(
                        "borrow {} has an out of range period of {} days",
                        record.id, borrow_period_days
                    ))
                })?,
        };

        let mut request = Self {
            id: record.id,
            customer_id: record.customer_id,
            book_id: record.book_id,
            delivery_person: record.delivery_person,
            request_date: record.request_date,
            approval_date: record.approval_date,
            due_date,
            delivery_date: record.delivery_date,
            return_date: record.return_date,
            final_return_date: record.final_return_date,
            status: record.status,
            borrow_period_days,
            fine_amount: record.fine_amount.unwrap_or(Decimal::ZERO).max(Decimal::ZERO),
            rejection_reason: record.rejection_reason,
            customer_name: record.customer_name,
            book_title: record.book_title,
            return_request: record.return_request,
            fine: record.fine,
            extensions: record.extensions,
        };

        if let Ok(status) = request.lifecycle() {
            if !status.is_past_pending() {
                if request.approval_date.take().is_some() {
                    tracing::warn!(
                        "Borrow {} is '{}' but carries an approval date, ignoring it",
                        request.id,
                        request.status
                    );
                }
                request.delivery_person = None;
            }
            if status != BorrowStatus::Rejected {
                request.rejection_reason = None;
            }
        }

        Ok(request)
    }

    /// Typed lifecycle state
    pub fn lifecycle(&self) -> AppResult<BorrowStatus> {
        self.status.parse().map_err(AppError::Parse)
    }

    pub fn normalized_status(&self) -> String {
        normalize_status(&self.status)
    }

    // Guard predicates

    /// Only an untouched `pending` request can be decided by an admin
    pub fn can_approve_or_reject(&self) -> bool {
        self.status == BorrowStatus::Pending.as_str()
    }

    /// Live tracking is offered only while the book is on the road
    pub fn is_delivery_active(&self) -> bool {
        self.normalized_status() == BorrowStatus::OutForDelivery.as_str()
            && self.delivery_person.is_some()
    }

    pub fn should_show_return_actions(&self) -> bool {
        matches!(
            self.normalized_status().as_str(),
            "return_requested" | "return_approved"
        )
    }

    pub fn should_show_assigned_delivery_manager(&self) -> bool {
        self.normalized_status() == BorrowStatus::ReturnAssigned.as_str()
            && self.delivery_person.is_some()
    }

    /// The customer holds the book
    pub fn is_on_loan(&self) -> bool {
        matches!(
            self.lifecycle(),
            Ok(BorrowStatus::Active
                | BorrowStatus::ReturnRequested
                | BorrowStatus::ReturnApproved
                | BorrowStatus::ReturnAssigned
                | BorrowStatus::OutForDelivery)
        )
    }

    pub fn is_terminal(&self) -> bool {
        self.lifecycle().map(|s| s.is_terminal()).unwrap_or(false)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_on_loan() && fine::overdue_days(self.due_date, now) > 0
    }

    /// Days left on the loan, `None` when the book is not with the customer
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.is_on_loan()
            .then(|| fine::days_remaining(self.due_date, now))
    }

    /// Fine as it stands; live until the final return date is fixed
    pub fn fine_preview(&self, now: DateTime<Utc>, policy: &FinePolicy) -> FineAssessment {
        let at = self.final_return_date.unwrap_or(now);
        policy.assess(self.due_date, at)
    }

    /// Actions `role` may trigger from the current state
    pub fn allowed_actions(&self, role: Role) -> Vec<BorrowAction> {
        match self.lifecycle() {
            Ok(status) => status
                .next_for(role)
                .into_iter()
                .filter_map(BorrowAction::for_target)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Apply a command locally, enforcing the transition table.
    ///
    /// Used as a dry run before the upstream is called; the upstream stays
    /// authoritative and the record is re-fetched afterwards.
    pub fn apply(
        &mut self,
        role: Role,
        command: BorrowCommand,
        now: DateTime<Utc>,
        policy: &FinePolicy,
    ) -> AppResult<BorrowStatus> {
        let from = self.lifecycle()?;
        let to = from.transition(command.action().target(), role)?;
        command.validate()?;

        match command {
            BorrowCommand::Approve { delivery_manager } => {
                self.approval_date = Some(now);
                self.delivery_person = Some(delivery_manager);
            }
            BorrowCommand::Reject { reason } => {
                self.rejection_reason = Some(reason.trim().to_string());
            }
            BorrowCommand::Cancel | BorrowCommand::ApproveReturn => {}
            BorrowCommand::MarkDelivered => {
                self.delivery_date = Some(now);
            }
            BorrowCommand::RequestReturn => {
                if self.return_request.is_none() {
                    self.return_request = Some(ReturnRequest::open(self.id, now));
                }
            }
            BorrowCommand::AssignReturn { delivery_manager } => {
                self.delivery_person = Some(delivery_manager);
            }
            BorrowCommand::StartReturnDelivery => {
                if let Some(ret) = self.return_request.as_mut() {
                    if ret.status == ReturnStatus::PendingPickup {
                        ret.advance(ReturnStatus::InReturn)?;
                    }
                }
            }
            BorrowCommand::CompleteReturn => {
                let assessment = policy.assess(self.due_date, now);
                self.final_return_date = Some(now);
                self.return_date = Some(now);
                self.fine_amount = assessment.amount;
                if let Some(ret) = self.return_request.as_mut() {
                    if ret.status == ReturnStatus::PendingPickup {
                        ret.advance(ReturnStatus::InReturn)?;
                    }
                    if ret.status == ReturnStatus::InReturn {
                        ret.advance(ReturnStatus::ReturningToLibrary)?;
                    }
                    if ret.status == ReturnStatus::ReturningToLibrary {
                        ret.complete(assessment.amount)?;
                    }
                }
            }
        }

        self.status = to.as_str().to_string();
        Ok(to)
    }
}
