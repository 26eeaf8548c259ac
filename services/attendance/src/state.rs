//! Application state shared across request handlers.

use std::sync::Arc;

use crate::db::{AttendanceStore, UserDirectory};
use crate::reports::ReportService;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn AttendanceStore>,
    users: Arc<dyn UserDirectory>,
    reports: ReportService,
}

impl AppState {
    pub fn new(store: Arc<dyn AttendanceStore>, users: Arc<dyn UserDirectory>) -> Self {
        let reports = ReportService::new(Arc::clone(&store));
        Self {
            inner: Arc::new(AppStateInner {
                store,
                users,
                reports,
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn AttendanceStore> {
        &self.inner.store
    }

    pub fn users(&self) -> &Arc<dyn UserDirectory> {
        &self.inner.users
    }

    pub fn reports(&self) -> &ReportService {
        &self.inner.reports
    }
}
