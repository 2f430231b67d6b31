//! Plan cache port.
//!
//! Maps a plan-terms fingerprint to the gateway plan code created for those
//! terms, so repeated signups with identical terms reuse one remote plan.
//! Entries are never invalidated here; callers re-validate the cached code
//! against the gateway and overwrite on miss.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Port for the fingerprint → plan code cache.
#[async_trait]
pub trait PlanCache: Send + Sync {
    /// Cached plan code for a fingerprint, if any.
    async fn get(&self, fingerprint: &str) -> Result<Option<String>, DomainError>;

    /// Store (or overwrite) the plan code for a fingerprint.
    async fn put(&self, fingerprint: &str, plan_code: &str) -> Result<(), DomainError>;
}
