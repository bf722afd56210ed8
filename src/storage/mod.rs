//! Restart-safe state storage
//!
//! One small sled record: the date the daily summary was last sent, so a
//! process restart neither re-sends nor skips the digest. Plain key-value
//! write, no transactional requirements.

use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

const LAST_SENT_KEY: &[u8] = b"daily_summary/last_sent_date";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Durable guard for the daily summary schedule.
#[derive(Clone)]
pub struct SummaryStore {
    db: Arc<sled::Db>,
}

impl SummaryStore {
    /// Open or create the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// The date a summary was last sent for, if any. An unparseable stored
    /// value is treated as absent (and will be overwritten on next send).
    pub fn last_sent_date(&self) -> Option<NaiveDate> {
        let bytes = match self.db.get(LAST_SENT_KEY) {
            Ok(Some(v)) => v,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read last-sent date");
                return None;
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        match NaiveDate::parse_from_str(&text, DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(e) => {
                warn!(value = %text, error = %e, "Corrupt last-sent date, ignoring");
                None
            }
        }
    }

    /// Record that the summary for `date` went out. Flushes immediately —
    /// this single write is the whole point of the store.
    pub fn mark_sent(&self, date: NaiveDate) -> Result<(), StorageError> {
        self.db.insert(
            LAST_SENT_KEY,
            date.format(DATE_FORMAT).to_string().as_bytes(),
        )?;
        self.db.flush()?;
        Ok(())
    }
}
