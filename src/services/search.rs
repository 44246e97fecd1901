//! Debounced borrow request search.
//!
//! Each keystroke restarts a quiet window; only the last query in a burst
//! reaches the upstream. Results are applied only while the owning view is
//! alive and the query is still the latest one issued.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};
use utoipa::ToSchema;

use crate::{
    error::Notice,
    models::{
        borrow::{BorrowQuery, BorrowRequest},
        user::Session,
    },
};

use super::borrowings::BorrowingsService;

/// Runs only the last job handed to it within the window.
///
/// Cancelling stops a job that is still waiting. A job that has started
/// runs to completion, so its effects must be guarded with a [`ViewScope`].
pub struct Debouncer {
    window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `job` after the window, cancelling whatever was waiting
    pub fn call<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let window = self.window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            tokio::spawn(job);
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Liveness of a view plus a generation counter for its requests
#[derive(Debug, Clone)]
pub struct ViewScope {
    alive: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start a new request; older tickets become stale
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.is_alive() && self.generation.load(Ordering::SeqCst) == ticket
    }

    pub fn dispose(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SearchState {
    pub query: String,
    pub loading: bool,
    pub results: Vec<BorrowRequest>,
    pub notice: Option<Notice>,
}

/// Search-as-you-type over the caller's borrow requests
pub struct BorrowSearch {
    borrowings: BorrowingsService,
    session: Session,
    debouncer: Debouncer,
    scope: ViewScope,
    state: Arc<watch::Sender<SearchState>>,
}

impl BorrowSearch {
    pub fn new(borrowings: BorrowingsService, session: Session, window: Duration) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            borrowings,
            session,
            debouncer: Debouncer::new(window),
            scope: ViewScope::new(),
            state: Arc::new(state),
        }
    }

    /// Feed the latest text of the search box
    pub fn input(&self, text: impl Into<String>) {
        if !self.scope.is_alive() {
            return;
        }
        let text = text.into();
        let ticket = self.scope.begin();

        self.state.send_modify(|s| {
            s.query = text.clone();
            s.loading = true;
        });

        let borrowings = self.borrowings.clone();
        let session = self.session.clone();
        let scope = self.scope.clone();
        let state = self.state.clone();

        self.debouncer.call(async move {
            if !scope.is_current(ticket) {
                return;
            }
            let query = BorrowQuery::search(text.trim());
            let outcome = borrowings.list(&session, &query).await;

            if !scope.is_current(ticket) {
                tracing::debug!("Dropping stale search results for '{}'", text);
                return;
            }
            state.send_modify(|s| {
                s.loading = false;
                match outcome {
                    Ok(results) => {
                        s.results = results;
                        s.notice = None;
                    }
                    Err(e) => {
                        tracing::warn!("Search for '{}' failed: {}", text, e);
                        s.notice = Some(e.notice());
                    }
                }
            });
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Stop the search; nothing is applied after this returns
    pub fn dispose(&self) {
        self.scope.dispose();
        self.debouncer.cancel();
    }
}

impl Drop for BorrowSearch {
    fn drop(&mut self) {
        self.scope.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppResult,
        models::{
            borrow::BorrowRecord,
            delivery::{DeliveryManager, LocationEnvelope},
            extension::BorrowExtension,
            fine::{BorrowFine, FinePolicy, PaymentMethod},
            user::Role,
        },
        repository::{BorrowBackend, MockBorrowBackend, TransitionCall},
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use std::sync::atomic::AtomicUsize;

    fn record(id: i64) -> BorrowRecord {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "customer_id": 7,
            "book_id": 99,
            "request_date": "2024-03-01T09:00:00Z",
            "status": "active"
        }))
        .unwrap()
    }

    fn search_over(backend: Arc<dyn BorrowBackend>) -> BorrowSearch {
        let borrowings = BorrowingsService::new(backend, FinePolicy::new(Decimal::ONE, None), 14);
        BorrowSearch::new(
            borrowings,
            Session::new("token", 7, Role::Customer),
            Duration::from_millis(500),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_input_makes_one_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut backend = MockBorrowBackend::new();
        backend
            .expect_list_borrowings()
            .returning(move |_, query| {
                counter.fetch_add(1, Ordering::SeqCst);
                assert_eq!(query.search.as_deref(), Some("harry"));
                Ok(vec![record(1)])
            });

        let search = search_over(Arc::new(backend));
        search.input("h");
        tokio::time::sleep(Duration::from_millis(40)).await;
        search.input("har");
        tokio::time::sleep(Duration::from_millis(40)).await;
        search.input("harry");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let state = search.state();
        assert_eq!(state.query, "harry");
        assert!(!state.loading);
        assert_eq!(state.results.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_before_window_skips_call() {
        let mut backend = MockBorrowBackend::new();
        backend.expect_list_borrowings().times(0);

        let search = search_over(Arc::new(backend));
        search.input("potter");
        search.dispose();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(search.state().results.is_empty());
        search.input("again");
        assert_eq!(search.state().query, "potter");
    }

    /// Answers list queries slowly; nothing else is used by the search
    struct SlowBackend {
        delay: Duration,
    }

    #[async_trait]
    impl BorrowBackend for SlowBackend {
        async fn get_borrowing(&self, _: &str, _: i64) -> AppResult<BorrowRecord> {
            unreachable!()
        }

        async fn list_borrowings(&self, _: &str, _: &BorrowQuery) -> AppResult<Vec<BorrowRecord>> {
            tokio::time::sleep(self.delay).await;
            Ok(vec![record(1), record(2)])
        }

        async fn transition(&self, _: &str, _: i64, _: &TransitionCall) -> AppResult<()> {
            unreachable!()
        }

        async fn delivery_location(&self, _: &str, _: i64) -> AppResult<LocationEnvelope> {
            unreachable!()
        }

        async fn list_delivery_managers(&self, _: &str) -> AppResult<Vec<DeliveryManager>> {
            unreachable!()
        }

        async fn get_fine(&self, _: &str, _: i64) -> AppResult<BorrowFine> {
            unreachable!()
        }

        async fn select_payment_method(&self, _: &str, _: i64, _: PaymentMethod) -> AppResult<()> {
            unreachable!()
        }

        async fn confirm_card_payment(&self, _: &str, _: i64, _: &str) -> AppResult<()> {
            unreachable!()
        }

        async fn get_extension(&self, _: &str, _: i64) -> AppResult<BorrowExtension> {
            unreachable!()
        }

        async fn create_extension(&self, _: &str, _: i64, _: DateTime<Utc>) -> AppResult<BorrowExtension> {
            unreachable!()
        }

        async fn decide_extension(&self, _: &str, _: i64, _: bool) -> AppResult<()> {
            unreachable!()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_after_dispose_is_dropped() {
        let search = search_over(Arc::new(SlowBackend {
            delay: Duration::from_secs(3),
        }));
        let mut updates = search.subscribe();

        search.input("dune");
        tokio::time::sleep(Duration::from_millis(600)).await;
        search.dispose();
        updates.borrow_and_update();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!updates.has_changed().unwrap());
        assert!(search.state().results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_response_is_dropped() {
        let search = search_over(Arc::new(SlowBackend {
            delay: Duration::from_secs(3),
        }));

        search.input("dune");
        tokio::time::sleep(Duration::from_millis(600)).await;
        search.input("dune messiah");
        tokio::time::sleep(Duration::from_millis(3000)).await;
        // first request has answered by now but is stale
        assert!(search.state().results.is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let state = search.state();
        assert_eq!(state.query, "dune messiah");
        assert_eq!(state.results.len(), 2);
    }

    #[test]
    fn test_scope_tickets() {
        let scope = ViewScope::new();
        let first = scope.begin();
        let second = scope.begin();
        assert!(!scope.is_current(first));
        assert!(scope.is_current(second));
        scope.dispose();
        assert!(!scope.is_current(second));
    }
}
