//! Record sink backed by the store

use async_trait::async_trait;
use focus_api::SessionRecord;
use focus_store::{AuditEvent, AuditEventType, Store};
use std::sync::Arc;
use tracing::warn;

use crate::{RecordSink, SinkError};

/// Writes records to a [`Store`] on the blocking pool
pub struct StoreSink {
    store: Arc<dyn Store>,
}

impl StoreSink {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RecordSink for StoreSink {
    async fn persist(&self, record: &SessionRecord) -> Result<(), SinkError> {
        let store = self.store.clone();
        let record = record.clone();

        tokio::task::spawn_blocking(move || {
            let result = store.append_record(&record);
            if let Err(e) = &result {
                let audit = AuditEvent::new(AuditEventType::RecordSaveFailed {
                    record_id: record.id.clone(),
                    message: e.to_string(),
                });
                if let Err(audit_err) = store.append_audit(audit) {
                    warn!(error = %audit_err, "Failed to audit record save failure");
                }
            }
            result
        })
        .await
        .map_err(|e| SinkError::new(format!("record writer panicked: {}", e)))?
        .map_err(|e| SinkError::new(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_api::Phase;
    use focus_store::SqliteStore;
    use focus_util::RecordId;

    fn record(id: &str) -> SessionRecord {
        let now = focus_util::now();
        SessionRecord {
            id: RecordId::new(id),
            phase: Phase::Work,
            start_time: now - chrono::Duration::minutes(25),
            end_time: now,
            duration_minutes: 25,
            cycle_index: 0,
            task_id: None,
            skill_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_persists_to_store() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open(dir.path().join("local.db")).unwrap());
        let sink = StoreSink::new(store.clone());

        let rec = record("r-1");
        sink.persist(&rec).await.unwrap();

        let day = rec.start_time.date_naive();
        let stored = store.list_records(day, rec.end_time.date_naive()).unwrap();
        assert_eq!(stored, vec![rec]);
    }

    #[tokio::test]
    async fn test_duplicate_is_reported_and_audited() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let sink = StoreSink::new(store.clone());

        let rec = record("r-1");
        sink.persist(&rec).await.unwrap();
        assert!(sink.persist(&rec).await.is_err());

        let audits = store.get_recent_audits(1).unwrap();
        assert!(matches!(
            audits[0].event,
            AuditEventType::RecordSaveFailed { .. }
        ));
    }
}
