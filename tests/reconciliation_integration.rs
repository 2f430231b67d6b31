//! End-to-end reconciliation scenarios across the application services.
//!
//! Each test walks a slice of an order's life with every adapter in play:
//! 1. Checkout opens the hosted session and registers resolution metadata
//! 2. The gateway reports back, by browser redirect, webhook, or both
//! 3. Settlement books the charge exactly once regardless of arrival order
//! 4. Later deliveries (renewals, reversals, cancellations) fold into the
//!    existing local rows instead of creating parallel history
//!
//! Webhook payloads are built by echoing what checkout actually registered
//! with the (mock) gateway, the same loop the real gateway closes.

use std::sync::Arc;

use serde_json::{json, Value};

use cartflow::adapters::memory::{InMemoryAuditLog, InMemoryNotifier, InMemoryStore};
use cartflow::adapters::paystack::MockPaystackGateway;
use cartflow::application::{
    default_dispatcher, CheckoutService, ConfirmPaymentRequest, ConfirmationService,
    DispatchOutcome, RefundService, SettlementService, SubscriptionService, WebhookDispatcher,
    MAX_RESYNC_PAGES,
};
use cartflow::domain::foundation::{minimum_authorization_amount, ConfirmationNonce, ProductId};
use cartflow::domain::orders::{
    Order, OrderMode, OrderStatus, OrderTransaction, OrderType, TransactionStatus,
    TransactionType, REFUND_ID_META_KEY,
};
use cartflow::domain::subscriptions::{BillingInterval, Subscription, SubscriptionStatus};
use cartflow::domain::webhook::WebhookEvent;
use cartflow::ports::{
    ChargePayload, InitializeTransactionRequest, RefundPayload, SubscriptionPayload,
    TransactionPage,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

const CALLBACK_URL: &str = "https://shop.example.com/paystack/confirm";
const RECEIPT_BASE_URL: &str = "https://shop.example.com/receipt";
const NONCE_SECRET: &str = "reconciliation-nonce-secret";

/// Authorization and customer codes the mock gateway reports for charges
/// made through the echoed checkout session.
const AUTH_CODE: &str = "AUTH_recon";
const CUSTOMER_CODE: &str = "CUS_recon";

/// The full service graph over shared in-memory adapters, wired the way the
/// production composition root wires it.
struct Services {
    store: Arc<InMemoryStore>,
    gateway: Arc<MockPaystackGateway>,
    audit: Arc<InMemoryAuditLog>,
    notifier: Arc<InMemoryNotifier>,
    checkout: CheckoutService,
    confirmation: Arc<ConfirmationService>,
    dispatcher: WebhookDispatcher,
    subscriptions: Arc<SubscriptionService>,
}

fn services() -> Services {
    let store = Arc::new(InMemoryStore::new());
    let gateway = Arc::new(MockPaystackGateway::new());
    let audit = Arc::new(InMemoryAuditLog::new());
    let notifier = Arc::new(InMemoryNotifier::new());

    let refunds = Arc::new(RefundService::new(
        gateway.clone(),
        store.clone(),
        store.clone(),
        audit.clone(),
        notifier.clone(),
    ));
    let subscription_service = Arc::new(SubscriptionService::new(
        gateway.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        audit.clone(),
        notifier.clone(),
    ));
    let settlement = Arc::new(SettlementService::new(
        store.clone(),
        store.clone(),
        audit.clone(),
        refunds.clone(),
        subscription_service.clone(),
    ));
    let dispatcher = default_dispatcher(
        store.clone(),
        store.clone(),
        store.clone(),
        audit.clone(),
        settlement.clone(),
        subscription_service.clone(),
        refunds,
    );
    let checkout = CheckoutService::new(
        gateway.clone(),
        store.clone(),
        subscription_service.clone(),
    );
    let confirmation = Arc::new(ConfirmationService::new(
        gateway.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        ConfirmationNonce::new(NONCE_SECRET),
        settlement,
        subscription_service.clone(),
        RECEIPT_BASE_URL,
    ));

    Services {
        store,
        gateway,
        audit,
        notifier,
        checkout,
        confirmation,
        dispatcher,
        subscriptions: subscription_service,
    }
}

async fn dispatch(services: &Services, payload: &Value) -> DispatchOutcome {
    let event = WebhookEvent::parse(payload.to_string().as_bytes()).unwrap();
    services.dispatcher.dispatch(&event).await.unwrap()
}

fn seed_order(store: &InMemoryStore, total: i64) -> (Order, OrderTransaction) {
    let order = Order::new(
        OrderType::Normal,
        OrderMode::Test,
        "Ada Lovelace",
        "ada@example.com",
        total,
        "NGN",
    );
    store.seed_order(order.clone());
    let transaction = OrderTransaction::new_charge(order.id, total, "NGN");
    store.seed_transaction(transaction.clone());
    (order, transaction)
}

fn seed_subscription_order(
    store: &InMemoryStore,
    total: i64,
    recurring: i64,
) -> (Order, OrderTransaction, Subscription) {
    let (order, transaction) = seed_order(store, total);
    let subscription = Subscription::new(order.id, "Pro Monthly", recurring, BillingInterval::Monthly);
    store.seed_subscription(subscription.clone());
    (order, transaction, subscription)
}

/// The `charge.success` delivery for a hosted session: the gateway echoes the
/// registered reference and metadata verbatim and attaches the card it
/// captured.
fn charge_success_for(request: &InitializeTransactionRequest, charge_id: i64) -> Value {
    json!({
        "event": "charge.success",
        "data": {
            "id": charge_id,
            "status": "success",
            "reference": request.reference,
            "amount": request.amount,
            "currency": request.currency,
            "paid_at": "2026-08-23T10:00:00.000Z",
            "metadata": request.metadata,
            "authorization": {
                "authorization_code": AUTH_CODE,
                "channel": "card",
                "last4": "4081",
                "brand": "visa"
            },
            "customer": {
                "customer_code": CUSTOMER_CODE,
                "email": request.email
            }
        }
    })
}

/// The same charge as the REST API reports it, for the redirect-confirm path.
fn gateway_charge_from(delivery: &Value) -> ChargePayload {
    serde_json::from_value(delivery["data"].clone()).unwrap()
}

/// A remote subscription as `fetch_subscription` reports it during a resync.
fn remote_subscription(code: &str, customer: &str, authorization: &str) -> SubscriptionPayload {
    SubscriptionPayload {
        subscription_code: code.to_string(),
        status: "active".to_string(),
        email_token: Some("tok_remote".to_string()),
        amount: Some(250_000),
        next_payment_date: Some("2026-09-23 08:00:00".to_string()),
        canceled_at: None,
        customer: json!({ "customer_code": customer }),
        authorization: json!({ "authorization_code": authorization }),
        plan: json!({ "plan_code": "PLN_remote" }),
    }
}

/// A charge row in the remote transaction listing, made with `authorization`.
fn listed_charge(id: i64, authorization: &str) -> ChargePayload {
    ChargePayload {
        id,
        status: "success".to_string(),
        reference: format!("T{}", id),
        amount: 250_000,
        currency: "NGN".to_string(),
        paid_at: Some("2026-08-20T09:00:00.000Z".to_string()),
        metadata: json!({}),
        authorization: json!({
            "authorization_code": authorization,
            "channel": "card",
            "last4": "4081"
        }),
        customer: json!({ "customer_code": CUSTOMER_CODE }),
    }
}

// =============================================================================
// Signup and Settlement Tests
// =============================================================================

#[tokio::test]
async fn subscription_signup_settles_through_the_webhook() {
    let s = services();
    let (order, transaction, mut subscription) =
        seed_subscription_order(&s.store, 250_000, 250_000);

    let session = s
        .checkout
        .begin_subscription_payment(&order, &transaction, &mut subscription, CALLBACK_URL)
        .await
        .unwrap();
    assert!(session
        .session
        .authorization_url
        .starts_with("https://checkout.paystack.com/"));

    // Checkout registered the plan and the resolution hashes with the gateway
    let request = s.gateway.initialized_transactions().pop().unwrap();
    assert_eq!(request.metadata["paystack_plan"], json!("PLN_mock_1"));
    assert_eq!(
        request.metadata["subscription_hash"],
        json!(subscription.id.to_string())
    );

    let delivery = charge_success_for(&request, 990_001);
    assert_eq!(dispatch(&s, &delivery).await, DispatchOutcome::Processed);

    let settled = s.store.transaction(&transaction.id).unwrap();
    assert!(settled.is_succeeded());
    assert_eq!(settled.vendor_charge_id.as_deref(), Some("990001"));
    assert_eq!(settled.card_last_4.as_deref(), Some("4081"));
    assert_eq!(s.store.order(&order.id).unwrap().status, OrderStatus::Paid);

    // The remote subscription was created against the captured card
    let created = s.gateway.created_subscription_requests();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].customer, CUSTOMER_CODE);
    assert_eq!(created[0].plan, "PLN_mock_1");
    assert_eq!(created[0].authorization.as_deref(), Some(AUTH_CODE));

    let stored = s.store.subscription(&subscription.id).unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Active);
    assert!(stored
        .vendor_subscription_id
        .as_deref()
        .unwrap()
        .starts_with("SUB_mock_"));
    assert!(stored.email_token().is_some());
    assert_eq!(s.notifier.activations(), vec![subscription.id]);

    // The slow browser redirect finally lands; it must not book anything twice
    s.gateway.add_charge(gateway_charge_from(&delivery));
    let confirmation = s
        .confirmation
        .confirm_payment(ConfirmPaymentRequest {
            nonce: Some(s.confirmation.issue_nonce()),
            transaction_id: Some("990001".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(confirmation.message, "Payment already confirmed. Redirecting...!");
    assert_eq!(s.store.transaction_count(), 1);
    assert_eq!(s.gateway.call_count("create_subscription"), 1);
}

#[tokio::test]
async fn redirect_and_webhook_race_settles_once() {
    let s = services();
    let (order, transaction) = seed_order(&s.store, 120_000);

    s.checkout
        .begin_payment(&order, &transaction, CALLBACK_URL)
        .await
        .unwrap();
    let request = s.gateway.initialized_transactions().pop().unwrap();

    let delivery = charge_success_for(&request, 990_010);
    s.gateway.add_charge(gateway_charge_from(&delivery));
    let event = WebhookEvent::parse(delivery.to_string().as_bytes()).unwrap();

    let confirm = s.confirmation.confirm_payment(ConfirmPaymentRequest {
        nonce: Some(s.confirmation.issue_nonce()),
        transaction_id: Some("990010".to_string()),
    });
    let webhook = s.dispatcher.dispatch(&event);
    let (confirmed, dispatched) = tokio::join!(confirm, webhook);

    confirmed.unwrap();
    dispatched.unwrap();

    assert_eq!(s.store.transaction_count(), 1);
    assert!(s.store.transaction(&transaction.id).unwrap().is_succeeded());
    assert_eq!(s.store.order(&order.id).unwrap().status, OrderStatus::Paid);

    let confirmations = s
        .audit
        .entries()
        .iter()
        .filter(|entry| entry.title == "Payment Confirmation")
        .count();
    assert_eq!(confirmations, 1);
}

// =============================================================================
// Authorization-Only Checkout Tests
// =============================================================================

#[tokio::test]
async fn zero_due_signup_charges_and_reverses_the_minimum() {
    let s = services();
    let minimum = minimum_authorization_amount("NGN");
    let (order, transaction, mut subscription) = seed_subscription_order(&s.store, 0, 250_000);
    subscription.trial_days = 14;
    s.store.seed_subscription(subscription.clone());

    s.checkout
        .begin_subscription_payment(&order, &transaction, &mut subscription, CALLBACK_URL)
        .await
        .unwrap();

    // Nothing due today, so the session charges the card-capture minimum
    let request = s.gateway.initialized_transactions().pop().unwrap();
    assert_eq!(request.amount, minimum);
    assert_eq!(
        request.metadata["amount_is_for_authorization_only"],
        json!("yes")
    );

    s.gateway.set_refund(RefundPayload {
        id: 7_701,
        status: "processed".to_string(),
        amount: Some(minimum),
        currency: Some("NGN".to_string()),
    });

    let delivery = charge_success_for(&request, 990_020);
    dispatch(&s, &delivery).await;

    // The minimum settled and was reversed in the same pass
    let rows = s.store.transactions_for_order(&order.id);
    assert_eq!(rows.len(), 2);
    let charge = rows
        .iter()
        .find(|t| t.transaction_type == TransactionType::Charge)
        .unwrap();
    let reversal = rows
        .iter()
        .find(|t| t.transaction_type == TransactionType::Refund)
        .unwrap();
    assert!(charge.is_succeeded());
    assert_eq!(charge.total, minimum);
    assert_eq!(charge.refunded_total, minimum);
    assert_eq!(reversal.total, minimum);
    assert!(reversal.vendor_charge_id.is_none());
    assert_eq!(reversal.meta_str(REFUND_ID_META_KEY), Some("7701"));
    assert_eq!(s.gateway.call_count("create_refund"), 1);
    assert_eq!(s.store.order(&order.id).unwrap().status, OrderStatus::Refunded);

    // The trial still produced a remote subscription with a deferred start
    let created = s.gateway.created_subscription_requests();
    assert_eq!(created.len(), 1);
    assert!(created[0].start_date.is_some());

    // The refund webhook for the reversal merges into the local row
    let refund_delivery = json!({
        "event": "refund.processed",
        "data": {
            "id": 7_701,
            "status": "processed",
            "amount": minimum,
            "currency": "NGN",
            "transaction_reference": request.reference,
            "merchant_note": "Refunded amount for authorization transaction"
        }
    });
    dispatch(&s, &refund_delivery).await;

    let rows = s.store.transactions_for_order(&order.id);
    assert_eq!(rows.len(), 2);
    let reversal = rows
        .iter()
        .find(|t| t.transaction_type == TransactionType::Refund)
        .unwrap();
    assert_eq!(reversal.vendor_charge_id.as_deref(), Some("7701"));
    // Merges confirm an already-recorded refund; no customer notification
    assert!(s.notifier.refund_notifications().is_empty());
}

// =============================================================================
// Renewal Backfill Tests
// =============================================================================

#[tokio::test]
async fn paid_invoice_backfills_missed_renewal_charges() {
    let s = services();

    // A subscription whose signup already settled locally
    let (order, mut signup) = seed_order(&s.store, 250_000);
    signup.status = TransactionStatus::Succeeded;
    signup.vendor_charge_id = Some("990100".to_string());
    s.store.seed_transaction(signup.clone());

    let mut subscription =
        Subscription::new(order.id, "Pro Monthly", 250_000, BillingInterval::Monthly);
    subscription.status = SubscriptionStatus::Active;
    subscription.vendor_subscription_id = Some("SUB_renew".to_string());
    subscription.vendor_customer_id = Some(CUSTOMER_CODE.to_string());
    s.store.seed_subscription(subscription.clone());

    // Remote history holds the signup plus a renewal this site never saw
    s.gateway
        .add_subscription(remote_subscription("SUB_renew", CUSTOMER_CODE, AUTH_CODE));
    s.gateway.add_transaction_page(
        None,
        TransactionPage {
            transactions: vec![listed_charge(990_101, AUTH_CODE), listed_charge(990_100, AUTH_CODE)],
            next_cursor: None,
        },
    );

    let invoice = json!({
        "event": "invoice.update",
        "data": {
            "status": "success",
            "paid": true,
            "amount": 250_000,
            "subscription": { "subscription_code": "SUB_renew" }
        }
    });
    assert_eq!(dispatch(&s, &invoice).await, DispatchOutcome::Processed);

    let rows = s.store.transactions_for_order(&order.id);
    assert_eq!(rows.len(), 2);
    let renewal = rows
        .iter()
        .find(|t| t.vendor_charge_id.as_deref() == Some("990101"))
        .unwrap();
    assert!(renewal.is_succeeded());
    assert_eq!(renewal.subscription_id, Some(subscription.id));
    assert_eq!(renewal.total, 250_000);
    assert!(s.audit.has_title("Subscription Renewal"));
    assert_eq!(s.store.order(&order.id).unwrap().status, OrderStatus::Paid);

    let refreshed = s.store.subscription(&subscription.id).unwrap();
    assert_eq!(refreshed.status, SubscriptionStatus::Active);
    assert!(refreshed.next_billing_date.is_some());

    // A replayed invoice finds every remote charge already recorded
    dispatch(&s, &invoice).await;
    assert_eq!(s.store.transactions_for_order(&order.id).len(), 2);
}

#[tokio::test]
async fn resync_stops_at_the_page_walk_limit() {
    let s = services();
    let (order, _) = seed_order(&s.store, 250_000);
    let mut subscription =
        Subscription::new(order.id, "Pro Monthly", 250_000, BillingInterval::Monthly);
    subscription.status = SubscriptionStatus::Active;
    subscription.vendor_subscription_id = Some("SUB_loop".to_string());
    s.store.seed_subscription(subscription.clone());

    s.gateway
        .add_subscription(remote_subscription("SUB_loop", CUSTOMER_CODE, AUTH_CODE));
    // A cursor that sends every page back to itself
    s.gateway.add_transaction_page(
        None,
        TransactionPage {
            transactions: vec![],
            next_cursor: Some("again".to_string()),
        },
    );
    s.gateway.add_transaction_page(
        Some("again"),
        TransactionPage {
            transactions: vec![],
            next_cursor: Some("again".to_string()),
        },
    );

    s.subscriptions.resync(&order, &mut subscription).await.unwrap();

    assert_eq!(s.gateway.call_count("list_transactions"), MAX_RESYNC_PAGES);
}

// =============================================================================
// Plan Reuse Tests
// =============================================================================

#[tokio::test]
async fn identical_terms_reuse_one_gateway_plan() {
    let s = services();
    let product = ProductId::new();

    let (mut order_a, txn_a, mut sub_a) = seed_subscription_order(&s.store, 250_000, 250_000);
    order_a.product_id = Some(product);
    s.store.seed_order(order_a.clone());

    let (mut order_b, txn_b, mut sub_b) = seed_subscription_order(&s.store, 250_000, 250_000);
    order_b.product_id = Some(product);
    s.store.seed_order(order_b.clone());

    s.checkout
        .begin_subscription_payment(&order_a, &txn_a, &mut sub_a, CALLBACK_URL)
        .await
        .unwrap();
    s.checkout
        .begin_subscription_payment(&order_b, &txn_b, &mut sub_b, CALLBACK_URL)
        .await
        .unwrap();

    // Second checkout revalidates the cached plan instead of recreating it
    assert_eq!(s.gateway.call_count("create_plan"), 1);
    assert_eq!(s.gateway.call_count("fetch_plan"), 1);
    assert_eq!(sub_a.vendor_plan_id.as_deref(), Some("PLN_mock_1"));
    assert_eq!(sub_b.vendor_plan_id.as_deref(), Some("PLN_mock_1"));
}

// =============================================================================
// Cancellation Tests
// =============================================================================

#[tokio::test]
async fn cancellation_disables_remote_billing_and_ignores_the_echo() {
    let s = services();
    let (order, _) = seed_order(&s.store, 250_000);
    let mut subscription =
        Subscription::new(order.id, "Pro Monthly", 250_000, BillingInterval::Monthly);
    subscription.status = SubscriptionStatus::Active;
    subscription.vendor_subscription_id = Some("SUB_cancel".to_string());
    subscription.set_email_token("tok_cancel");
    s.store.seed_subscription(subscription.clone());

    let canceled = s.subscriptions.cancel("SUB_cancel").await.unwrap();

    assert_eq!(canceled.status, SubscriptionStatus::Canceled);
    assert!(canceled.canceled_at.is_some());
    assert_eq!(
        s.gateway.disabled_subscriptions(),
        vec![("SUB_cancel".to_string(), "tok_cancel".to_string())]
    );
    assert!(s.audit.has_title("Subscription Cancelled"));

    // Disabling triggers the gateway's own not_renew webhook; by the time it
    // arrives the local subscription is terminal and must stay untouched
    let audits_before = s.audit.len();
    let echo = json!({
        "event": "subscription.not_renew",
        "data": {
            "subscription_code": "SUB_cancel",
            "status": "non-renewing"
        }
    });
    assert_eq!(dispatch(&s, &echo).await, DispatchOutcome::Processed);

    let stored = s.store.subscription(&subscription.id).unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Canceled);
    assert_eq!(s.audit.len(), audits_before);
    assert!(!s.gateway.was_called("fetch_subscription"));
}
