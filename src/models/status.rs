//! Borrow and return status vocabularies and the transition table

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

use super::user::Role;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Canonical form of a status string coming from any upstream.
///
/// lowercase, trim, spaces and hyphens become `_`, anything outside
/// `[A-Za-z0-9_]` is dropped.
pub fn normalize_status(raw: &str) -> String {
    let unified: String = raw
        .to_lowercase()
        .trim()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();
    NON_WORD.replace_all(&unified, "").into_owned()
}

// ---------------------------------------------------------------------------
// BorrowStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a borrow request.
///
/// `overdue` is not a state: it is derived from the due date of an active
/// loan (see [`super::fine`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BorrowStatus {
    Pending,
    Approved,
    Active,
    ReturnRequested,
    ReturnApproved,
    ReturnAssigned,
    OutForDelivery,
    Returned,
    Rejected,
    Cancelled,
}

impl BorrowStatus {
    pub const ALL: [BorrowStatus; 10] = [
        BorrowStatus::Pending,
        BorrowStatus::Approved,
        BorrowStatus::Active,
        BorrowStatus::ReturnRequested,
        BorrowStatus::ReturnApproved,
        BorrowStatus::ReturnAssigned,
        BorrowStatus::OutForDelivery,
        BorrowStatus::Returned,
        BorrowStatus::Rejected,
        BorrowStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Pending => "pending",
            BorrowStatus::Approved => "approved",
            BorrowStatus::Active => "active",
            BorrowStatus::ReturnRequested => "return_requested",
            BorrowStatus::ReturnApproved => "return_approved",
            BorrowStatus::ReturnAssigned => "return_assigned",
            BorrowStatus::OutForDelivery => "out_for_delivery",
            BorrowStatus::Returned => "returned",
            BorrowStatus::Rejected => "rejected",
            BorrowStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BorrowStatus::Returned | BorrowStatus::Rejected | BorrowStatus::Cancelled
        )
    }

    /// Position along the main path, `None` for the side branches
    fn rank(&self) -> Option<u8> {
        match self {
            BorrowStatus::Pending => Some(0),
            BorrowStatus::Approved => Some(1),
            BorrowStatus::Active => Some(2),
            BorrowStatus::ReturnRequested => Some(3),
            BorrowStatus::ReturnApproved => Some(4),
            BorrowStatus::ReturnAssigned => Some(5),
            BorrowStatus::OutForDelivery => Some(6),
            BorrowStatus::Returned => Some(7),
            BorrowStatus::Rejected | BorrowStatus::Cancelled => None,
        }
    }

    /// True once the request has progressed past `pending` on the main path
    pub fn is_past_pending(&self) -> bool {
        self.rank().map(|r| r > 0).unwrap_or(false)
    }

    /// Roles allowed to move a request from `self` to `to`.
    ///
    /// `None` means the pair is not in the table at all.
    pub fn permitted_roles(&self, to: BorrowStatus) -> Option<&'static [Role]> {
        use BorrowStatus::*;
        let roles: &'static [Role] = match (self, to) {
            (Pending, Approved) => &[Role::Admin],
            (Pending, Rejected) => &[Role::Admin],
            (Pending, Cancelled) => &[Role::Customer, Role::Admin],
            (Approved, Active) => &[Role::DeliveryManager, Role::Admin],
            (Active, ReturnRequested) => &[Role::Customer, Role::Admin],
            (ReturnRequested, ReturnApproved) => &[Role::Admin],
            (ReturnApproved, ReturnAssigned) => &[Role::Admin],
            (ReturnAssigned, OutForDelivery) => &[Role::DeliveryManager],
            (OutForDelivery, Returned) => &[Role::DeliveryManager, Role::Admin],
            _ => return None,
        };
        Some(roles)
    }

    /// Check a transition against the table.
    ///
    /// Pairs missing from the table are state conflicts; pairs in the table
    /// attempted by the wrong role are authorization failures.
    pub fn transition(self, to: BorrowStatus, role: Role) -> AppResult<BorrowStatus> {
        let roles = self
            .permitted_roles(to)
            .ok_or_else(|| AppError::conflict(self, to))?;
        if !roles.contains(&role) {
            return Err(AppError::Authorization(format!(
                "Role '{}' cannot move a request from '{}' to '{}'",
                role, self, to
            )));
        }
        Ok(to)
    }

    /// Every status reachable from `self` by `role` in one step
    pub fn next_for(&self, role: Role) -> Vec<BorrowStatus> {
        Self::ALL
            .iter()
            .copied()
            .filter(|to| {
                self.permitted_roles(*to)
                    .map(|roles| roles.contains(&role))
                    .unwrap_or(false)
            })
            .collect()
    }
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_status(s).as_str() {
            "pending" => Ok(BorrowStatus::Pending),
            "approved" => Ok(BorrowStatus::Approved),
            // overdue is derived, the stored state is still an active loan
            "active" | "delivered" | "overdue" => Ok(BorrowStatus::Active),
            "return_requested" => Ok(BorrowStatus::ReturnRequested),
            "return_approved" => Ok(BorrowStatus::ReturnApproved),
            "return_assigned" => Ok(BorrowStatus::ReturnAssigned),
            "out_for_delivery" => Ok(BorrowStatus::OutForDelivery),
            "returned" => Ok(BorrowStatus::Returned),
            "rejected" => Ok(BorrowStatus::Rejected),
            "cancelled" | "canceled" => Ok(BorrowStatus::Cancelled),
            _ => Err(format!("Unknown borrow status: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// ReturnStatus
// ---------------------------------------------------------------------------

/// Status of the return leg of a borrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    PendingPickup,
    InReturn,
    ReturningToLibrary,
    ReturnedSuccessfully,
    LateReturn,
    Cancelled,
}

impl ReturnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::PendingPickup => "pending_pickup",
            ReturnStatus::InReturn => "in_return",
            ReturnStatus::ReturningToLibrary => "returning_to_library",
            ReturnStatus::ReturnedSuccessfully => "returned_successfully",
            ReturnStatus::LateReturn => "late_return",
            ReturnStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReturnStatus::ReturnedSuccessfully | ReturnStatus::LateReturn | ReturnStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, to: ReturnStatus) -> bool {
        use ReturnStatus::*;
        match (self, to) {
            (PendingPickup, InReturn) => true,
            (InReturn, ReturningToLibrary) => true,
            (ReturningToLibrary, ReturnedSuccessfully) => true,
            (ReturningToLibrary, LateReturn) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn transition(self, to: ReturnStatus) -> AppResult<ReturnStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(AppError::conflict(self, to))
        }
    }
}

impl std::fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReturnStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_status(s).as_str() {
            "pending_pickup" => Ok(ReturnStatus::PendingPickup),
            "in_return" => Ok(ReturnStatus::InReturn),
            "returning_to_library" => Ok(ReturnStatus::ReturningToLibrary),
            "returned_successfully" => Ok(ReturnStatus::ReturnedSuccessfully),
            "late_return" => Ok(ReturnStatus::LateReturn),
            "cancelled" | "canceled" => Ok(ReturnStatus::Cancelled),
            _ => Err(format!("Unknown return status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("Out-For_Delivery!"), "out_for_delivery");
        assert_eq!(normalize_status("  RETURN requested "), "return_requested");
        assert_eq!(normalize_status("pending"), "pending");
        assert_eq!(normalize_status("return-approved (admin)"), "return_approved_admin");
        assert_eq!(normalize_status(""), "");
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("Overdue".parse::<BorrowStatus>(), Ok(BorrowStatus::Active));
        assert_eq!("delivered".parse::<BorrowStatus>(), Ok(BorrowStatus::Active));
        assert_eq!("Out For Delivery".parse::<BorrowStatus>(), Ok(BorrowStatus::OutForDelivery));
        assert!("lost".parse::<BorrowStatus>().is_err());
    }

    #[test]
    fn test_main_path_is_walkable() {
        let steps = [
            (BorrowStatus::Approved, Role::Admin),
            (BorrowStatus::Active, Role::DeliveryManager),
            (BorrowStatus::ReturnRequested, Role::Customer),
            (BorrowStatus::ReturnApproved, Role::Admin),
            (BorrowStatus::ReturnAssigned, Role::Admin),
            (BorrowStatus::OutForDelivery, Role::DeliveryManager),
            (BorrowStatus::Returned, Role::DeliveryManager),
        ];
        let mut current = BorrowStatus::Pending;
        for (to, role) in steps {
            current = current.transition(to, role).unwrap();
        }
        assert_eq!(current, BorrowStatus::Returned);
        assert!(current.is_terminal());
    }

    #[test]
    fn test_skipping_return_steps_is_conflict() {
        let err = BorrowStatus::Approved
            .transition(BorrowStatus::ReturnAssigned, Role::Admin)
            .unwrap_err();
        assert!(matches!(err, AppError::StateConflict(_)));
    }

    #[test]
    fn test_wrong_role_is_authorization_error() {
        let err = BorrowStatus::Pending
            .transition(BorrowStatus::Approved, Role::Customer)
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let err = BorrowStatus::ReturnAssigned
            .transition(BorrowStatus::OutForDelivery, Role::Admin)
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for from in [BorrowStatus::Returned, BorrowStatus::Rejected, BorrowStatus::Cancelled] {
            for role in [Role::Customer, Role::Admin, Role::DeliveryManager] {
                assert!(from.next_for(role).is_empty());
            }
        }
    }

    #[test]
    fn test_next_for_admin_on_pending() {
        let next = BorrowStatus::Pending.next_for(Role::Admin);
        assert_eq!(
            next,
            vec![BorrowStatus::Approved, BorrowStatus::Rejected, BorrowStatus::Cancelled]
        );
    }

    #[test]
    fn test_return_status_transitions() {
        assert!(ReturnStatus::PendingPickup.can_transition_to(ReturnStatus::InReturn));
        assert!(ReturnStatus::ReturningToLibrary.can_transition_to(ReturnStatus::LateReturn));
        assert!(ReturnStatus::InReturn.can_transition_to(ReturnStatus::Cancelled));
        assert!(!ReturnStatus::LateReturn.can_transition_to(ReturnStatus::Cancelled));
        assert!(ReturnStatus::PendingPickup
            .transition(ReturnStatus::ReturnedSuccessfully)
            .is_err());
        assert_eq!(
            "Returning-To-Library".parse::<ReturnStatus>(),
            Ok(ReturnStatus::ReturningToLibrary)
        );
    }
}
