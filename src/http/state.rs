use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::media::MediaStore;

/// Shared handler state. The single connection behind a mutex gives the
/// one-request-at-a-time database semantics the catalog assumes.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    pub media: MediaStore,
}

impl AppState {
    pub fn new(conn: Connection, media: MediaStore) -> AppState {
        AppState {
            db: Arc::new(Mutex::new(conn)),
            media,
        }
    }

    pub fn db(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
