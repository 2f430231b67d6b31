//! In-memory audit trail.
//!
//! Collects audit entries in process memory. Useful for development and for
//! asserting on the trail in tests; production deployments would append to
//! the storefront's activity table instead.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::{AuditEntry, AuditLevel, AuditLog};

/// In-memory implementation of the `AuditLog` port.
#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    /// Creates a new empty audit log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded entries.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Returns entries recorded against one entity.
    pub fn entries_for(&self, entity_id: &str) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect()
    }

    /// Whether any entry carries the given title.
    pub fn has_title(&self, title: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|e| e.title == title)
    }

    /// Number of error-level entries.
    pub fn error_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == AuditLevel::Error)
            .count()
    }

    /// Returns the total number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns true if no entries exist.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError> {
        tracing::debug!(
            module = entry.module.as_str(),
            entity_id = %entry.entity_id,
            title = %entry.title,
            "Audit entry recorded"
        );

        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::OrderId;

    #[tokio::test]
    async fn append_collects_entries_in_order() {
        let log = InMemoryAuditLog::new();
        let order_id = OrderId::new();

        log.append(AuditEntry::order_info(order_id, "Payment Confirmation", "first"))
            .await
            .unwrap();
        log.append(AuditEntry::order_error(order_id, "Refund failed", "second"))
            .await
            .unwrap();

        let entries = log.entries_for(&order_id.to_string());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert!(log.has_title("Refund failed"));
        assert_eq!(log.error_count(), 1);
    }
}
