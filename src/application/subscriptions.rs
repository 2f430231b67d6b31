//! Subscription lifecycle against the Paystack billing engine.
//!
//! Local subscriptions are created by checkout in a pending shape; the
//! remote counterpart only comes into existence once the first charge
//! succeeds. From then on this service keeps the two sides aligned: it
//! records renewals, replays missed charges from the remote transaction
//! history, and disables remote billing on cancellation.
//!
//! Terminal local statuses (canceled, expired, completed) are never
//! overwritten by remote data. A subscription the merchant has killed stays
//! dead no matter what a late webhook or resync reports.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, warn};

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, Timestamp};
use crate::domain::orders::{
    BillingSnapshot, Order, OrderTransaction, TransactionStatus, PAYMENT_METHOD,
};
use crate::domain::subscriptions::{PlanTerms, Subscription, SubscriptionStatus, SubscriptionUpdate};
use crate::ports::{
    AuditEntry, AuditLog, ChargePayload, CreatePlanRequest, CreateSubscriptionRequest,
    EventNotifier, OrderRepository, PaystackGateway, PlanCache, SubscriptionPayload,
    SubscriptionRepository, TransactionListQuery, TransactionRepository,
};

use super::settlement::settlement_from_charge;

/// Upper bound on transaction-history pages fetched during a resync. The
/// cursor comes from the remote response, so without a bound a malformed
/// `meta.next` that never advances would loop forever.
pub const MAX_RESYNC_PAGES: usize = 20;

pub struct SubscriptionService {
    gateway: Arc<dyn PaystackGateway>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    transactions: Arc<dyn TransactionRepository>,
    orders: Arc<dyn OrderRepository>,
    plans: Arc<dyn PlanCache>,
    audit: Arc<dyn AuditLog>,
    notifier: Arc<dyn EventNotifier>,
}

impl SubscriptionService {
    pub fn new(
        gateway: Arc<dyn PaystackGateway>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        transactions: Arc<dyn TransactionRepository>,
        orders: Arc<dyn OrderRepository>,
        plans: Arc<dyn PlanCache>,
        audit: Arc<dyn AuditLog>,
        notifier: Arc<dyn EventNotifier>,
    ) -> Self {
        Self {
            gateway,
            subscriptions,
            transactions,
            orders,
            plans,
            audit,
            notifier,
        }
    }

    /// Returns the gateway plan code for `terms`, creating the plan when no
    /// usable one exists.
    ///
    /// The cache maps a terms fingerprint to a previously created plan code.
    /// A cache hit is still verified against the gateway; plans deleted from
    /// the Paystack dashboard would otherwise poison every future checkout of
    /// that product.
    pub async fn get_or_create_plan(&self, terms: &PlanTerms) -> Result<String, DomainError> {
        let fingerprint = terms.fingerprint();

        if let Some(cached) = self.plans.get(&fingerprint).await? {
            match self.gateway.fetch_plan(&cached).await {
                Ok(plan) => return Ok(plan.plan_code),
                Err(err) => {
                    warn!(
                        plan_code = %cached,
                        error = %err,
                        "Cached plan no longer usable, creating a replacement"
                    );
                }
            }
        }

        let request = CreatePlanRequest {
            name: terms.item_name.clone(),
            description: fingerprint.clone(),
            amount: terms.recurring_total,
            interval: terms.billing_interval.gateway_interval().to_string(),
            send_invoices: true,
            send_sms: false,
            invoice_limit: (terms.bill_times > 0).then_some(terms.bill_times),
        };

        let plan = self
            .gateway
            .create_plan(request)
            .await
            .map_err(DomainError::from)?;
        self.plans.put(&fingerprint, &plan.plan_code).await?;
        Ok(plan.plan_code)
    }

    /// Creates the remote subscription when none exists and the local one is
    /// not already dead. No-op otherwise.
    pub async fn ensure_remote_subscription(
        &self,
        order: &Order,
        subscription: &mut Subscription,
        customer_code: &str,
        authorization_code: Option<&str>,
    ) -> Result<Option<SubscriptionUpdate>, DomainError> {
        if subscription.vendor_subscription_id.is_some() || subscription.status.is_terminal() {
            return Ok(None);
        }
        self.create_remote_subscription(order, subscription, customer_code, authorization_code)
            .await
    }

    /// Creates the subscription on Paystack and folds the response into the
    /// local record.
    ///
    /// A gateway failure is recorded on the order's audit trail and reported
    /// as `None` rather than an error: the charge that triggered this has
    /// already settled, and failing the whole confirmation over a billing
    /// setup problem would make the customer pay twice. The local
    /// subscription is left untouched so the next confirmation retries.
    pub async fn create_remote_subscription(
        &self,
        order: &Order,
        subscription: &mut Subscription,
        customer_code: &str,
        authorization_code: Option<&str>,
    ) -> Result<Option<SubscriptionUpdate>, DomainError> {
        let Some(plan_code) = subscription.vendor_plan_id.clone() else {
            warn!(
                subscription_id = %subscription.id,
                "Subscription has no plan code, skipping remote creation"
            );
            return Ok(None);
        };

        let previous_status = subscription.status;
        let start_date = (subscription.trial_days > 0).then(|| {
            Timestamp::now()
                .add_days(subscription.trial_days as i64)
                .as_gateway_string()
        });

        let request = CreateSubscriptionRequest {
            customer: customer_code.to_string(),
            plan: plan_code,
            authorization: authorization_code.map(str::to_string),
            start_date,
        };

        let payload = match self.gateway.create_subscription(request).await {
            Ok(payload) => payload,
            Err(err) => {
                error!(
                    subscription_id = %subscription.id,
                    error = %err,
                    "Remote subscription creation failed"
                );
                self.audit
                    .append(AuditEntry::order_error(
                        order.id,
                        "Subscription Creation Failed",
                        err.message,
                    ))
                    .await?;
                return Ok(None);
            }
        };

        let update = SubscriptionUpdate {
            status: SubscriptionStatus::from_vendor(&payload.status),
            vendor_subscription_id: Some(payload.subscription_code.clone()),
            // The code we subscribed with, not the response echo; the gateway
            // omits the customer object on some plan configurations.
            vendor_customer_id: Some(customer_code.to_string()),
            vendor_plan_id: None,
            next_billing_date: payload
                .next_payment_date
                .as_deref()
                .and_then(Timestamp::parse_gateway),
            canceled_at: None,
        };

        subscription.apply_update(&update);
        refresh_payment_method(subscription, &payload.authorization);
        if let Some(token) = &payload.email_token {
            subscription.set_email_token(token);
        }
        self.subscriptions.update(subscription).await?;

        self.audit
            .append(AuditEntry::order_info(
                order.id,
                "Subscription Created",
                format!(
                    "Subscription created on Paystack. Code: {}",
                    payload.subscription_code
                ),
            ))
            .await?;

        self.notify_if_activated(previous_status, subscription).await;
        Ok(Some(update))
    }

    /// Folds a gateway-initiated subscription payload into the local record.
    ///
    /// This is the webhook-side counterpart of [`create_remote_subscription`]:
    /// the gateway already owns the subscription, so there is nothing to
    /// create, only state to absorb.
    ///
    /// [`create_remote_subscription`]: Self::create_remote_subscription
    pub async fn adopt_remote_subscription(
        &self,
        order: &Order,
        subscription: &mut Subscription,
        payload: &SubscriptionPayload,
    ) -> Result<(), DomainError> {
        let previous_status = subscription.status;

        subscription.apply_update(&payload.update_payload());
        refresh_payment_method(subscription, &payload.authorization);
        if let Some(token) = &payload.email_token {
            subscription.set_email_token(token);
        }
        self.subscriptions.update(subscription).await?;

        self.audit
            .append(AuditEntry::order_info(
                order.id,
                "Subscription Created",
                format!(
                    "Subscription created on Paystack. Code: {}",
                    payload.subscription_code
                ),
            ))
            .await?;

        self.notify_if_activated(previous_status, subscription).await;
        Ok(())
    }

    /// Records a renewal charge against the subscription: folds in the remote
    /// state, refreshes the stored card, and recomputes the parent order's
    /// status from its transactions.
    pub async fn record_renewal(
        &self,
        order: &Order,
        subscription: &mut Subscription,
        charge: &ChargePayload,
        update: Option<&SubscriptionUpdate>,
    ) -> Result<(), DomainError> {
        if let Some(update) = update {
            subscription.apply_update(update);
        }
        refresh_payment_method(subscription, &charge.authorization);
        self.subscriptions.update(subscription).await?;
        self.refresh_order_status(&order.id).await?;

        self.audit
            .append(AuditEntry::order_info(
                order.id,
                "Subscription Renewal",
                format!(
                    "Renewal payment recorded. Charge: {}",
                    charge.vendor_charge_id()
                ),
            ))
            .await?;
        Ok(())
    }

    /// Rebuilds local state from the remote subscription and its charge
    /// history.
    ///
    /// Every successful remote charge must end up as exactly one succeeded
    /// local row: existing rows are settled in place, pending placeholder
    /// rows are claimed, and charges with no local trace (webhooks lost while
    /// the site was down) get a new row backdated to the remote payment time.
    pub async fn resync(
        &self,
        order: &Order,
        subscription: &mut Subscription,
    ) -> Result<(), DomainError> {
        if subscription.current_payment_method != PAYMENT_METHOD {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "Invalid payment method",
            ));
        }
        let Some(vendor_subscription_id) = subscription.vendor_subscription_id.clone() else {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "Invalid subscription",
            ));
        };

        let remote = self
            .gateway
            .fetch_subscription(&vendor_subscription_id)
            .await
            .map_err(DomainError::from)?;
        let remote_update = remote.update_payload();

        let charges = match remote.customer_code() {
            Some(customer) => {
                self.fetch_subscription_charges(customer, remote.authorization_code())
                    .await?
            }
            None => Vec::new(),
        };

        let mut new_payment = false;
        for charge in &charges {
            if !charge.is_success() {
                continue;
            }
            let vendor_charge_id = charge.vendor_charge_id();

            if let Some(existing) = self
                .transactions
                .find_by_vendor_charge_id(&vendor_charge_id, PAYMENT_METHOD)
                .await?
            {
                if !existing.is_succeeded() {
                    self.transactions
                        .settle(&existing.id, settlement_from_charge(charge))
                        .await?;
                    self.refresh_order_status(&existing.order_id).await?;
                }
                continue;
            }

            if let Some(claimed) = self
                .transactions
                .claim_oldest_placeholder(&subscription.id, settlement_from_charge(charge))
                .await?
            {
                self.refresh_order_status(&claimed.order_id).await?;
                continue;
            }

            let row = renewal_row(subscription, charge);
            self.transactions.create(&row).await?;
            self.record_renewal(order, subscription, charge, Some(&remote_update))
                .await?;
            new_payment = true;
        }

        if new_payment {
            if let Some(fresh) = self.subscriptions.find_by_id(&subscription.id).await? {
                *subscription = fresh;
            }
        } else if !subscription.status.is_terminal() {
            subscription.apply_update(&remote_update);
            self.subscriptions.update(subscription).await?;
        }

        Ok(())
    }

    /// Disables remote billing and marks the local subscription canceled.
    pub async fn cancel(
        &self,
        vendor_subscription_id: &str,
    ) -> Result<Subscription, DomainError> {
        let mut subscription = self
            .subscriptions
            .find_by_vendor_subscription_id(vendor_subscription_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    "Invalid vendor subscription ID.",
                )
            })?;

        let email_token = subscription
            .email_token()
            .map(str::to_string)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::MissingEmailToken,
                    "Missing email token for subscription cancellation.",
                )
            })?;

        if let Err(err) = self
            .gateway
            .disable_subscription(vendor_subscription_id, &email_token)
            .await
        {
            error!(
                subscription_id = %subscription.id,
                error = %err,
                "Remote subscription disable failed"
            );
            self.audit
                .append(AuditEntry::subscription_error(
                    subscription.id,
                    "Subscription Cancellation Failed",
                    err.message.clone(),
                ))
                .await?;
            return Err(DomainError::new(ErrorCode::CancellationFailed, err.message));
        }

        subscription.cancel(Timestamp::now());
        self.subscriptions.update(&subscription).await?;

        let message = format!(
            "Subscription cancelled on Paystack. Code: {}",
            vendor_subscription_id
        );
        self.audit
            .append(AuditEntry::order_info(
                subscription.order_id,
                "Subscription Cancelled",
                message.clone(),
            ))
            .await?;
        self.audit
            .append(AuditEntry::subscription_info(
                subscription.id,
                "Subscription Cancelled",
                message,
            ))
            .await?;

        Ok(subscription)
    }

    /// Fires the activation notification when the status actually changed
    /// into a running state. Failures are logged, never propagated; the
    /// subscription state is already persisted by the time this runs.
    async fn notify_if_activated(
        &self,
        previous: SubscriptionStatus,
        subscription: &Subscription,
    ) {
        if previous != subscription.status && subscription.status.is_running() {
            if let Err(err) = self.notifier.subscription_activated(subscription).await {
                warn!(
                    subscription_id = %subscription.id,
                    error = %err,
                    "Activation notification failed"
                );
            }
        }
    }

    /// Walks the customer's remote transaction history, keeping charges made
    /// with the subscription's stored card. Returned oldest-first.
    ///
    /// A listing failure mid-walk keeps the pages already collected; partial
    /// resync is still progress and the next resync picks up the rest.
    async fn fetch_subscription_charges(
        &self,
        customer_code: &str,
        authorization_code: Option<&str>,
    ) -> Result<Vec<ChargePayload>, DomainError> {
        let mut collected = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_RESYNC_PAGES {
            let query = TransactionListQuery {
                customer: customer_code.to_string(),
                cursor: cursor.clone(),
            };

            let page = match self.gateway.list_transactions(query).await {
                Ok(page) => page,
                Err(err) => {
                    warn!(
                        customer = %customer_code,
                        error = %err,
                        "Transaction listing failed mid-resync, continuing with collected pages"
                    );
                    break;
                }
            };

            collected.extend(page.transactions.into_iter().filter(|charge| {
                match authorization_code {
                    Some(code) => charge.authorization_code() == Some(code),
                    None => false,
                }
            }));

            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        if cursor.is_some() {
            warn!(
                customer = %customer_code,
                pages = MAX_RESYNC_PAGES,
                "Stopping resync page walk at the page limit"
            );
        }

        // The API lists newest first; charges are applied in payment order
        collected.reverse();
        Ok(collected)
    }

    async fn refresh_order_status(&self, order_id: &OrderId) -> Result<(), DomainError> {
        let transactions = self.transactions.find_for_order(order_id).await?;
        let status = Order::status_from_transactions(&transactions);
        self.orders.update_status(order_id, status).await
    }
}

/// Overwrites the stored card snapshot when the charge carries one.
fn refresh_payment_method(subscription: &mut Subscription, authorization: &Value) {
    if authorization.as_object().map_or(false, |o| !o.is_empty()) {
        subscription.set_active_payment_method(&BillingSnapshot::from_authorization(authorization));
    }
}

/// Builds the succeeded local row for a remote charge that was never seen
/// while it was live, backdated to the remote payment time.
fn renewal_row(subscription: &Subscription, charge: &ChargePayload) -> OrderTransaction {
    let billing = charge.billing_snapshot();
    let mut row =
        OrderTransaction::new_charge(subscription.order_id, charge.amount, &charge.currency);
    row.subscription_id = Some(subscription.id);
    row.status = TransactionStatus::Succeeded;
    row.vendor_charge_id = Some(charge.vendor_charge_id());
    row.payment_method_type =
        (!billing.payment_type.is_empty()).then(|| billing.payment_type.clone());
    row.card_last_4 = billing.last4.clone();
    row.card_brand = billing.brand.clone();
    if let Value::Object(map) = &charge.authorization {
        row.meta = map.clone();
    }
    if let Some(paid_at) = charge.paid_at_timestamp() {
        row.created_at = paid_at;
    }
    row
}
