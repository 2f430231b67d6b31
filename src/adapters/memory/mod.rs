//! In-memory adapters for the persistence and notification ports.
//!
//! One store serves all four repository ports so cross-entity operations
//! stay atomic under a single lock. The audit log and notifier collect what
//! production implementations would write out or broadcast.

mod audit;
mod notifier;
mod store;

pub use audit::InMemoryAuditLog;
pub use notifier::InMemoryNotifier;
pub use store::InMemoryStore;
