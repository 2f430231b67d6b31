//! Checkout initiation: turning a local order into a hosted payment page.
//!
//! The gateway hosts the actual payment UI; this service's job is to seed the
//! remote transaction with everything later stages need to find their way
//! back. The metadata echoed on webhooks and the merchant reference embedded
//! in redirects are both written here, which makes this the single source of
//! the identifiers the resolver and confirmation flows depend on.

use std::sync::Arc;

use serde_json::json;
use tracing::error;

use crate::domain::foundation::{
    ensure_supported_currency, minimum_authorization_amount, DomainError, ErrorCode, Timestamp,
    TransactionId,
};
use crate::domain::orders::{Order, OrderTransaction};
use crate::domain::subscriptions::{PlanTerms, Subscription};
use crate::ports::{
    CheckoutSession, InitializeTransactionRequest, PaystackGateway, SubscriptionRepository,
};

use super::subscriptions::SubscriptionService;

/// What the storefront redirects the customer with.
#[derive(Debug, Clone)]
pub struct PaymentSession {
    pub session: CheckoutSession,
    pub intent: PaymentIntent,
    /// Echo of the local charge row the session was opened for.
    pub transaction_id: TransactionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentIntent {
    Onetime,
    Subscription,
}

impl PaymentIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentIntent::Onetime => "onetime",
            PaymentIntent::Subscription => "subscription",
        }
    }
}

pub struct CheckoutService {
    gateway: Arc<dyn PaystackGateway>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    subscription_service: Arc<SubscriptionService>,
}

impl CheckoutService {
    pub fn new(
        gateway: Arc<dyn PaystackGateway>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        subscription_service: Arc<SubscriptionService>,
    ) -> Self {
        Self {
            gateway,
            subscriptions,
            subscription_service,
        }
    }

    /// Opens a hosted payment session for a one-off charge.
    pub async fn begin_payment(
        &self,
        order: &Order,
        transaction: &OrderTransaction,
        callback_url: &str,
    ) -> Result<PaymentSession, DomainError> {
        ensure_supported_currency(&order.currency)?;

        let request = InitializeTransactionRequest {
            email: order.customer_email.clone(),
            amount: transaction.total,
            currency: order.currency.clone(),
            reference: transaction.reference_at(Timestamp::now()),
            callback_url: callback_url.to_string(),
            metadata: checkout_metadata(order, transaction),
        };

        let session = self.initialize(order, request).await?;
        Ok(PaymentSession {
            session,
            intent: PaymentIntent::Onetime,
            transaction_id: transaction.id,
        })
    }

    /// Opens a hosted payment session that doubles as subscription setup.
    ///
    /// The gateway plan is resolved (or created) up front and stored on the
    /// subscription; the session metadata carries the plan code so the
    /// `charge.success` flow knows to create the remote subscription. An
    /// order with nothing due today still charges the gateway minimum to
    /// capture a reusable card, flagged so settlement refunds it right after.
    pub async fn begin_subscription_payment(
        &self,
        order: &Order,
        transaction: &OrderTransaction,
        subscription: &mut Subscription,
        callback_url: &str,
    ) -> Result<PaymentSession, DomainError> {
        ensure_supported_currency(&order.currency)?;

        let terms = PlanTerms {
            mode: order.mode,
            product_id: order.product_id,
            variation_id: order.variation_id,
            item_name: subscription.item_name.clone(),
            recurring_total: subscription.recurring_total,
            currency: order.currency.clone(),
            billing_interval: subscription.billing_interval,
            bill_times: subscription.bill_times,
            trial_days: subscription.trial_days,
        };
        let plan_code = self.subscription_service.get_or_create_plan(&terms).await?;
        subscription.vendor_plan_id = Some(plan_code.clone());
        self.subscriptions.update(subscription).await?;

        let mut amount = transaction.total;
        let mut authorization_only = "no";
        if amount <= 0 {
            amount = minimum_authorization_amount(&order.currency);
            authorization_only = "yes";
        }

        let mut metadata = checkout_metadata(order, transaction);
        metadata["paystack_plan"] = json!(plan_code);
        metadata["subscription_hash"] = json!(subscription.id.to_string());
        metadata["amount_is_for_authorization_only"] = json!(authorization_only);

        let request = InitializeTransactionRequest {
            email: order.customer_email.clone(),
            amount,
            currency: order.currency.clone(),
            reference: transaction.reference_at(Timestamp::now()),
            callback_url: callback_url.to_string(),
            metadata,
        };

        let session = self.initialize(order, request).await?;
        Ok(PaymentSession {
            session,
            intent: PaymentIntent::Subscription,
            transaction_id: transaction.id,
        })
    }

    async fn initialize(
        &self,
        order: &Order,
        request: InitializeTransactionRequest,
    ) -> Result<CheckoutSession, DomainError> {
        self.gateway
            .initialize_transaction(request)
            .await
            .map_err(|err| {
                error!(order_id = %order.id, error = %err, "Transaction initialization failed");
                DomainError::new(ErrorCode::InitializationFailed, err.message)
            })
    }
}

/// Metadata echoed back verbatim on every webhook for this charge.
fn checkout_metadata(order: &Order, transaction: &OrderTransaction) -> serde_json::Value {
    json!({
        "order_id": order.id.to_string(),
        "order_hash": order.id.to_string(),
        "transaction_hash": transaction.id.to_string(),
        "customer_name": order.customer_name,
    })
}
