//! Application state shared across handlers

use std::sync::Arc;

use crate::db::Db;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Db,
}

impl AppState {
    pub fn new(db: Db) -> Self {
        Self {
            inner: Arc::new(AppStateInner { db }),
        }
    }

    pub fn db(&self) -> &Db {
        &self.inner.db
    }
}
