//! Domain models for the borrow service

pub mod borrow;
pub mod delivery;
pub mod discount;
pub mod extension;
pub mod fine;
pub mod return_request;
pub mod status;
pub mod user;

// Re-export commonly used types
pub use borrow::{BorrowAction, BorrowCommand, BorrowQuery, BorrowRecord, BorrowRequest};
pub use delivery::{Availability, DeliveryLocation, DeliveryManager, DeliveryPerson};
pub use discount::{Discount, DiscountType};
pub use extension::{BorrowExtension, ExtensionStatus};
pub use fine::{BorrowFine, FineAssessment, FinePolicy, FineStatus, PaymentMethod};
pub use return_request::ReturnRequest;
pub use status::{normalize_status, BorrowStatus, ReturnStatus};
pub use user::{Role, Session, UserClaims};
