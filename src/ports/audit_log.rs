//! Audit log port.
//!
//! Append-only activity trail shown to merchants next to each order and
//! subscription. Reconciliation writes an entry for every state transition
//! it performs and an error-level entry for follow-ups it swallows (for
//! example a failed authorization refund).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, OrderId, SubscriptionId, Timestamp};

/// Which entity an entry is recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditModule {
    Order,
    Subscription,
}

impl AuditModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditModule::Order => "order",
            AuditModule::Subscription => "subscription",
        }
    }
}

/// Entry severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    Info,
    Error,
}

/// A single audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub module: AuditModule,

    /// Id of the order or subscription the entry belongs to.
    pub entity_id: String,

    pub level: AuditLevel,

    /// Short headline, e.g. "Payment confirmed".
    pub title: String,

    /// Free-form detail.
    pub message: String,

    pub recorded_at: Timestamp,
}

impl AuditEntry {
    pub fn order_info(
        order_id: OrderId,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            module: AuditModule::Order,
            entity_id: order_id.to_string(),
            level: AuditLevel::Info,
            title: title.into(),
            message: message.into(),
            recorded_at: Timestamp::now(),
        }
    }

    pub fn order_error(
        order_id: OrderId,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level: AuditLevel::Error,
            ..Self::order_info(order_id, title, message)
        }
    }

    pub fn subscription_info(
        subscription_id: SubscriptionId,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            module: AuditModule::Subscription,
            entity_id: subscription_id.to_string(),
            level: AuditLevel::Info,
            title: title.into(),
            message: message.into(),
            recorded_at: Timestamp::now(),
        }
    }

    pub fn subscription_error(
        subscription_id: SubscriptionId,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level: AuditLevel::Error,
            ..Self::subscription_info(subscription_id, title, message)
        }
    }
}

/// Port for the append-only audit trail.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append one entry.
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn audit_log_is_object_safe() {
        fn _accepts_dyn(_log: &dyn AuditLog) {}
    }

    #[test]
    fn constructors_set_module_level_and_entity() {
        let order_id = OrderId::new();
        let entry = AuditEntry::order_info(order_id, "Payment confirmed", "via webhook");
        assert_eq!(entry.module, AuditModule::Order);
        assert_eq!(entry.level, AuditLevel::Info);
        assert_eq!(entry.entity_id, order_id.to_string());

        let sub_id = SubscriptionId::new();
        let entry = AuditEntry::subscription_error(sub_id, "Cancellation failed", "gateway down");
        assert_eq!(entry.module, AuditModule::Subscription);
        assert_eq!(entry.level, AuditLevel::Error);
        assert_eq!(entry.entity_id, sub_id.to_string());
    }
}
