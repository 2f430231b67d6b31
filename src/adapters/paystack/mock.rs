//! Mock Paystack gateway for testing.
//!
//! Provides a configurable mock implementation of `PaystackGateway` for unit
//! and integration tests. Supports:
//! - Pre-configured responses
//! - Error injection
//! - Call tracking
//! - Scripted transaction list pages for pagination flows

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::ports::{
    ChargePayload, CheckoutSession, CreatePlanRequest, CreateRefundRequest,
    CreateSubscriptionRequest, GatewayError, InitializeTransactionRequest, PaystackGateway,
    PlanPayload, RefundPayload, SubscriptionPayload, TransactionListQuery, TransactionPage,
};

/// Mock Paystack gateway for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaystackGateway::new();
///
/// // Configure responses
/// mock.add_charge(charge_payload);
///
/// // Inject errors
/// mock.set_error(GatewayError::network("connection reset"));
///
/// // Use in tests
/// let result = mock.fetch_transaction("4099260516").await;
/// ```
#[derive(Default)]
pub struct MockPaystackGateway {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Pre-configured charges by gateway id.
    charges: HashMap<String, ChargePayload>,

    /// Scripted list pages keyed by the cursor that requests them;
    /// `None` keys the first page.
    transaction_pages: HashMap<Option<String>, TransactionPage>,

    /// Pre-configured plans by code.
    plans: HashMap<String, PlanPayload>,

    /// Pre-configured subscriptions by code.
    subscriptions: HashMap<String, SubscriptionPayload>,

    /// Next checkout session to return.
    next_checkout: Option<CheckoutSession>,

    /// Next plan to return from `create_plan`.
    next_plan: Option<PlanPayload>,

    /// Next subscription to return from `create_subscription`.
    next_subscription: Option<SubscriptionPayload>,

    /// Next refund to return from `create_refund`.
    next_refund: Option<RefundPayload>,

    /// Captured `create_plan` requests.
    created_plans: Vec<CreatePlanRequest>,

    /// Captured `create_subscription` requests.
    created_subscriptions: Vec<CreateSubscriptionRequest>,

    /// Captured `create_refund` requests.
    created_refunds: Vec<CreateRefundRequest>,

    /// Captured `initialize_transaction` requests.
    initialized_transactions: Vec<InitializeTransactionRequest>,

    /// Captured `(code, token)` pairs from `disable_subscription`.
    disabled_subscriptions: Vec<(String, String)>,

    /// Error to return on next call.
    next_error: Option<GatewayError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, GatewayError>,

    /// Track method calls for assertions.
    call_log: Vec<String>,

    /// Counter for generated ids.
    sequence: u64,
}

impl MockPaystackGateway {
    /// Create a new mock gateway with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set the checkout session to return on the next `initialize_transaction`.
    pub fn set_checkout_session(&self, session: CheckoutSession) {
        self.inner.lock().unwrap().next_checkout = Some(session);
    }

    /// Add a charge to the "database" for `fetch_transaction`.
    pub fn add_charge(&self, charge: ChargePayload) {
        let id = charge.vendor_charge_id();
        self.inner.lock().unwrap().charges.insert(id, charge);
    }

    /// Script a list page; `cursor: None` is the first page.
    pub fn add_transaction_page(&self, cursor: Option<&str>, page: TransactionPage) {
        self.inner
            .lock()
            .unwrap()
            .transaction_pages
            .insert(cursor.map(str::to_string), page);
    }

    /// Add a plan to the "database" for `fetch_plan`.
    pub fn add_plan(&self, plan: PlanPayload) {
        let code = plan.plan_code.clone();
        self.inner.lock().unwrap().plans.insert(code, plan);
    }

    /// Set the plan to return on the next `create_plan` call.
    pub fn set_created_plan(&self, plan: PlanPayload) {
        self.inner.lock().unwrap().next_plan = Some(plan);
    }

    /// Add a subscription to the "database" for `fetch_subscription`.
    pub fn add_subscription(&self, subscription: SubscriptionPayload) {
        let code = subscription.subscription_code.clone();
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .insert(code, subscription);
    }

    /// Set the subscription to return on the next `create_subscription` call.
    pub fn set_created_subscription(&self, subscription: SubscriptionPayload) {
        self.inner.lock().unwrap().next_subscription = Some(subscription);
    }

    /// Set the refund to return on the next `create_refund` call.
    pub fn set_refund(&self, refund: RefundPayload) {
        self.inner.lock().unwrap().next_refund = Some(refund);
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: GatewayError) {
        self.inner.lock().unwrap().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.inner
            .lock()
            .unwrap()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.inner.lock().unwrap();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .any(|c| c == method)
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| *c == method)
            .count()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().call_log.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Captured Requests
    // ════════════════════════════════════════════════════════════════════════════

    /// Requests captured from `initialize_transaction`.
    pub fn initialized_transactions(&self) -> Vec<InitializeTransactionRequest> {
        self.inner.lock().unwrap().initialized_transactions.clone()
    }

    /// Requests captured from `create_plan`.
    pub fn created_plan_requests(&self) -> Vec<CreatePlanRequest> {
        self.inner.lock().unwrap().created_plans.clone()
    }

    /// Requests captured from `create_subscription`.
    pub fn created_subscription_requests(&self) -> Vec<CreateSubscriptionRequest> {
        self.inner.lock().unwrap().created_subscriptions.clone()
    }

    /// Requests captured from `create_refund`.
    pub fn created_refund_requests(&self) -> Vec<CreateRefundRequest> {
        self.inner.lock().unwrap().created_refunds.clone()
    }

    /// `(code, token)` pairs captured from `disable_subscription`.
    pub fn disabled_subscriptions(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().disabled_subscriptions.clone()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str) {
        self.inner.lock().unwrap().call_log.push(method.to_string());
    }

    fn check_error(&self, method: &str) -> Result<(), GatewayError> {
        let mut state = self.inner.lock().unwrap();

        // Check method-specific error first
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        // Check global error (consumes it)
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

impl Clone for MockPaystackGateway {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MockState {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

#[async_trait]
impl PaystackGateway for MockPaystackGateway {
    async fn initialize_transaction(
        &self,
        request: InitializeTransactionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        self.record_call("initialize_transaction");
        self.check_error("initialize_transaction")?;

        let mut state = self.inner.lock().unwrap();
        state.initialized_transactions.push(request.clone());

        let session = state.next_checkout.take().unwrap_or_else(|| {
            let seq = state.next_sequence();
            CheckoutSession {
                authorization_url: format!("https://checkout.paystack.com/mock_{}", seq),
                access_code: format!("ACC_mock_{}", seq),
                reference: request.reference,
            }
        });

        Ok(session)
    }

    async fn fetch_transaction(&self, charge_id: &str) -> Result<ChargePayload, GatewayError> {
        self.record_call("fetch_transaction");
        self.check_error("fetch_transaction")?;

        let state = self.inner.lock().unwrap();
        state
            .charges
            .get(charge_id)
            .cloned()
            .ok_or_else(|| GatewayError::api("Transaction not found"))
    }

    async fn list_transactions(
        &self,
        query: TransactionListQuery,
    ) -> Result<TransactionPage, GatewayError> {
        self.record_call("list_transactions");
        self.check_error("list_transactions")?;

        let state = self.inner.lock().unwrap();
        let page = state
            .transaction_pages
            .get(&query.cursor)
            .cloned()
            .unwrap_or_else(|| TransactionPage {
                transactions: Vec::new(),
                next_cursor: None,
            });

        Ok(page)
    }

    async fn fetch_plan(&self, plan_code: &str) -> Result<PlanPayload, GatewayError> {
        self.record_call("fetch_plan");
        self.check_error("fetch_plan")?;

        let state = self.inner.lock().unwrap();
        state
            .plans
            .get(plan_code)
            .cloned()
            .ok_or_else(|| GatewayError::api("Plan not found"))
    }

    async fn create_plan(&self, request: CreatePlanRequest) -> Result<PlanPayload, GatewayError> {
        self.record_call("create_plan");
        self.check_error("create_plan")?;

        let mut state = self.inner.lock().unwrap();
        state.created_plans.push(request.clone());

        let plan = state.next_plan.take().unwrap_or_else(|| {
            let seq = state.next_sequence();
            PlanPayload {
                plan_code: format!("PLN_mock_{}", seq),
                name: Some(request.name),
                amount: Some(request.amount),
                interval: Some(request.interval),
                currency: None,
            }
        });

        // Store for later retrieval
        state.plans.insert(plan.plan_code.clone(), plan.clone());

        Ok(plan)
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<SubscriptionPayload, GatewayError> {
        self.record_call("create_subscription");
        self.check_error("create_subscription")?;

        let mut state = self.inner.lock().unwrap();
        state.created_subscriptions.push(request.clone());

        let subscription = state.next_subscription.take().unwrap_or_else(|| {
            let seq = state.next_sequence();
            SubscriptionPayload {
                subscription_code: format!("SUB_mock_{}", seq),
                status: "active".to_string(),
                email_token: Some(format!("tok_mock_{}", seq)),
                amount: None,
                next_payment_date: None,
                canceled_at: None,
                customer: json!({ "customer_code": request.customer }),
                authorization: json!({}),
                plan: json!({ "plan_code": request.plan }),
            }
        });

        state
            .subscriptions
            .insert(subscription.subscription_code.clone(), subscription.clone());

        Ok(subscription)
    }

    async fn fetch_subscription(
        &self,
        subscription_code: &str,
    ) -> Result<SubscriptionPayload, GatewayError> {
        self.record_call("fetch_subscription");
        self.check_error("fetch_subscription")?;

        let state = self.inner.lock().unwrap();
        state
            .subscriptions
            .get(subscription_code)
            .cloned()
            .ok_or_else(|| GatewayError::api("Subscription not found"))
    }

    async fn disable_subscription(
        &self,
        subscription_code: &str,
        email_token: &str,
    ) -> Result<(), GatewayError> {
        self.record_call("disable_subscription");
        self.check_error("disable_subscription")?;

        self.inner
            .lock()
            .unwrap()
            .disabled_subscriptions
            .push((subscription_code.to_string(), email_token.to_string()));

        Ok(())
    }

    async fn create_refund(
        &self,
        request: CreateRefundRequest,
    ) -> Result<RefundPayload, GatewayError> {
        self.record_call("create_refund");
        self.check_error("create_refund")?;

        let mut state = self.inner.lock().unwrap();
        state.created_refunds.push(request.clone());

        let refund = state.next_refund.take().unwrap_or_else(|| {
            let seq = state.next_sequence();
            RefundPayload {
                id: seq as i64,
                status: "processed".to_string(),
                amount: request.amount,
                currency: request.currency,
            }
        });

        Ok(refund)
    }
}
