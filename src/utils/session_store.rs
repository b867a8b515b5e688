use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, ExpiredDeletion, SessionStore};
use tracing::{debug, warn};

/// In-process session records that are dropped once their expiry date passes.
///
/// The cookie only carries the signed session id; records live here until they expire or the
/// flow completes and flushes them.
#[derive(Clone, Debug, Default)]
pub struct ExpiringMemoryStore {
    records: Arc<Mutex<HashMap<Id, Record>>>,
}

fn is_active(record: &Record, now: OffsetDateTime) -> bool {
    record.expiry_date > now
}

impl ExpiringMemoryStore {
    pub fn session_count(&self) -> usize {
        self.records.lock().len()
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> HashMap<Id, Record> {
        self.records.lock().clone()
    }

    /// Removes expired records and returns how many were dropped.
    pub fn prune_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| is_active(record, now));
        before - records.len()
    }

    pub fn spawn_pruning(&self, period: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(err) = store.delete_expired().await {
                    warn!("Failed to prune expired sessions: {}", err);
                }
            }
        })
    }
}

#[async_trait]
impl SessionStore for ExpiringMemoryStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut records = self.records.lock();
        while records.contains_key(&record.id) {
            record.id = Id::default();
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.lock().insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .records
            .lock()
            .get(session_id)
            .filter(|record| is_active(record, now))
            .cloned())
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.records.lock().remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for ExpiringMemoryStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let removed = self.prune_expired();
        if removed > 0 {
            debug!(
                "Pruned {} expired session(s); {} active",
                removed,
                self.session_count()
            );
        }
        Ok(())
    }
}
