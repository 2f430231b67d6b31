//! Billing intervals and the remote plan fingerprint.
//!
//! Plans live only on the gateway; locally we keep a deterministic
//! fingerprint of the commercial terms so the same terms always resolve to
//! the same remote plan instead of minting duplicates.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::foundation::{ProductId, VariationId};
use crate::domain::orders::OrderMode;

/// How often a subscription bills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Daily => "daily",
            BillingInterval::Weekly => "weekly",
            BillingInterval::Monthly => "monthly",
            BillingInterval::Quarterly => "quarterly",
            BillingInterval::HalfYearly => "half_yearly",
            BillingInterval::Yearly => "yearly",
        }
    }

    /// Parses a loosely-typed interval label, defaulting unknowns to monthly.
    pub fn parse(label: &str) -> Self {
        match label {
            "daily" => BillingInterval::Daily,
            "weekly" => BillingInterval::Weekly,
            "quarterly" => BillingInterval::Quarterly,
            "half_yearly" => BillingInterval::HalfYearly,
            "yearly" => BillingInterval::Yearly,
            _ => BillingInterval::Monthly,
        }
    }

    /// The gateway's name for this interval.
    ///
    /// Paystack has no `half_yearly`/`yearly`; those map to `biannually` and
    /// `annually`.
    pub fn gateway_interval(&self) -> &'static str {
        match self {
            BillingInterval::Daily => "daily",
            BillingInterval::Weekly => "weekly",
            BillingInterval::Monthly => "monthly",
            BillingInterval::Quarterly => "quarterly",
            BillingInterval::HalfYearly => "biannually",
            BillingInterval::Yearly => "annually",
        }
    }
}

/// Commercial terms that identify a remote plan.
///
/// Two subscriptions with equal terms share one gateway plan; any difference
/// in any field yields a distinct fingerprint and therefore a distinct plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTerms {
    pub mode: OrderMode,
    pub product_id: Option<ProductId>,
    pub variation_id: Option<VariationId>,
    /// Plan display name sent to the gateway.
    pub item_name: String,
    /// Recurring amount in minor units.
    pub recurring_total: i64,
    pub currency: String,
    pub billing_interval: BillingInterval,
    /// Number of billings before the subscription completes; 0 = uncapped.
    pub bill_times: u32,
    pub trial_days: u32,
}

impl PlanTerms {
    /// Deterministic cache key for these terms.
    pub fn fingerprint(&self) -> String {
        let product = self
            .product_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        let variation = self
            .variation_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        let material = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.mode.as_str(),
            product,
            variation,
            self.recurring_total,
            self.currency,
            self.billing_interval.as_str(),
            self.bill_times,
            self.trial_days,
        );
        let digest = Sha256::digest(material.as_bytes());
        let hash: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        format!("paystack_plan_{hash}")
    }
}
