use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::services::notifications::Notifier;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub notifier: Box<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Locks the shared connection. Never hold the guard across an `.await`.
    /// A poisoned lock is recovered: open transactions roll back on drop, so
    /// the connection is consistent after a panicking holder.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("database mutex was poisoned by a panicking request, recovering");
            poisoned.into_inner()
        })
    }
}
