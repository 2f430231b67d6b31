//! Subscriptions domain module.
//!
//! Local subscription state mirrored from the gateway, plus the plan
//! fingerprint that deduplicates remote plans.
//!
//! # Module Structure
//!
//! - `plan` - Billing intervals, plan terms, fingerprint
//! - `subscription` - Subscription aggregate and status mapping

mod plan;
mod subscription;

pub use plan::{BillingInterval, PlanTerms};
pub use subscription::{
    Subscription, SubscriptionStatus, SubscriptionUpdate, ACTIVE_PAYMENT_METHOD_META_KEY,
    EMAIL_TOKEN_META_KEY,
};
