//! Due date extension requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

use super::status::normalize_status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ExtensionStatus {
    Pending,
    Approved,
    Rejected,
}

impl TryFrom<String> for ExtensionStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match normalize_status(&s).as_str() {
            "pending" => Ok(ExtensionStatus::Pending),
            "approved" => Ok(ExtensionStatus::Approved),
            "rejected" => Ok(ExtensionStatus::Rejected),
            _ => Err(format!("Unknown extension status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BorrowExtension {
    pub id: i64,
    pub borrow_request_id: i64,
    pub original_due_date: DateTime<Utc>,
    pub new_due_date: DateTime<Utc>,
    pub status: ExtensionStatus,
}

/// The requested date must push the due date later
pub fn validate_new_due_date(original: DateTime<Utc>, new_due: DateTime<Utc>) -> AppResult<()> {
    if new_due <= original {
        return Err(AppError::Validation(format!(
            "new due date {} must be after the current due date {}",
            new_due.format("%Y-%m-%d"),
            original.format("%Y-%m-%d")
        )));
    }
    Ok(())
}

impl BorrowExtension {
    pub fn ensure_pending(&self) -> AppResult<()> {
        if self.status != ExtensionStatus::Pending {
            return Err(AppError::StateConflict(format!(
                "extension {} has already been {:?}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// Decide the extension; the returned date is the parent's new due date
    /// when approved, `None` when rejected
    pub fn decide(&mut self, approve: bool) -> AppResult<Option<DateTime<Utc>>> {
        self.ensure_pending()?;
        if approve {
            validate_new_due_date(self.original_due_date, self.new_due_date)?;
            self.status = ExtensionStatus::Approved;
            Ok(Some(self.new_due_date))
        } else {
            self.status = ExtensionStatus::Rejected;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn extension(days: i64) -> BorrowExtension {
        let original = Utc::now();
        BorrowExtension {
            id: 1,
            borrow_request_id: 2,
            original_due_date: original,
            new_due_date: original + Duration::days(days),
            status: ExtensionStatus::Pending,
        }
    }

    #[test]
    fn test_new_due_date_must_be_later() {
        let now = Utc::now();
        assert!(validate_new_due_date(now, now).is_err());
        assert!(validate_new_due_date(now, now - Duration::days(1)).is_err());
        assert!(validate_new_due_date(now, now + Duration::days(1)).is_ok());
    }

    #[test]
    fn test_decide_once() {
        let mut ext = extension(7);
        let new_due = ext.decide(true).unwrap();
        assert_eq!(new_due, Some(ext.new_due_date));
        assert!(matches!(ext.decide(false), Err(AppError::StateConflict(_))));
    }

    #[test]
    fn test_reject_leaves_no_date() {
        let mut ext = extension(7);
        assert_eq!(ext.decide(false).unwrap(), None);
        assert_eq!(ext.status, ExtensionStatus::Rejected);
    }
}
