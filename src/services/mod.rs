//! Business logic services

pub mod borrowings;
pub mod discounts;
pub mod extensions;
pub mod fines;
pub mod search;

use std::{sync::Arc, time::Duration};

use crate::{config::AppConfig, models::user::Session, repository::BorrowBackend};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub borrowings: borrowings::BorrowingsService,
    pub fines: fines::FinesService,
    pub extensions: extensions::ExtensionsService,
    pub discounts: discounts::DiscountsService,
    search_window: Duration,
}

impl Services {
    /// Create all services over the given backend
    pub fn new(backend: Arc<dyn BorrowBackend>, config: &AppConfig) -> Self {
        let period = config.borrowing.default_period_days;
        Self {
            borrowings: borrowings::BorrowingsService::new(backend.clone(), config.fines.policy(), period),
            fines: fines::FinesService::new(backend.clone()),
            extensions: extensions::ExtensionsService::new(backend, period),
            discounts: discounts::DiscountsService::new(),
            search_window: Duration::from_millis(config.search.debounce_ms),
        }
    }

    /// A fresh debounced search bound to one session
    pub fn search(&self, session: Session) -> search::BorrowSearch {
        search::BorrowSearch::new(self.borrowings.clone(), session, self.search_window)
    }
}
