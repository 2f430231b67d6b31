//! In-memory persistence for orders, transactions, subscriptions, and plans.
//!
//! This adapter backs all four repository ports with a single mutex-guarded
//! state. Useful for:
//! - Development and testing environments
//! - Single-process deployments without persistence requirements
//!
//! Holding every entity behind one lock is what makes `settle` and
//! `claim_oldest_placeholder` atomic: the status check and the write cannot
//! interleave with another caller's.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, SubscriptionId, TransactionId};
use crate::domain::orders::{Order, OrderStatus, OrderTransaction, TransactionStatus, TransactionType};
use crate::domain::subscriptions::Subscription;
use crate::ports::{
    ChargeSettlement, OrderRepository, PlanCache, SettleOutcome, SubscriptionRepository,
    TransactionRepository,
};

/// In-memory implementation of the persistence ports.
///
/// Thread-safe via an internal `Mutex`. Does not persist data across
/// restarts.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(InMemoryStore::new());
/// store.seed_order(order);
///
/// // The same store serves every repository port
/// let orders: Arc<dyn OrderRepository> = store.clone();
/// let transactions: Arc<dyn TransactionRepository> = store.clone();
/// ```
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    orders: HashMap<OrderId, Order>,

    /// Insertion order doubles as creation order; "oldest first" scans run
    /// forward and "newest first" scans run backward.
    transactions: Vec<OrderTransaction>,

    subscriptions: Vec<Subscription>,

    /// Plan codes by terms fingerprint.
    plan_codes: HashMap<String, String>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Seeding
    // ════════════════════════════════════════════════════════════════════════════

    pub fn seed_order(&self, order: Order) {
        self.state.lock().unwrap().orders.insert(order.id, order);
    }

    /// Seeding an id twice replaces the row, so tests can reshape fixtures
    /// without growing the table.
    pub fn seed_transaction(&self, transaction: OrderTransaction) {
        let mut state = self.state.lock().unwrap();
        match state
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction.id)
        {
            Some(existing) => *existing = transaction,
            None => state.transactions.push(transaction),
        }
    }

    pub fn seed_subscription(&self, subscription: Subscription) {
        let mut state = self.state.lock().unwrap();
        match state
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription.id)
        {
            Some(existing) => *existing = subscription,
            None => state.subscriptions.push(subscription),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection
    // ════════════════════════════════════════════════════════════════════════════

    /// Returns an order by id.
    pub fn order(&self, id: &OrderId) -> Option<Order> {
        self.state.lock().unwrap().orders.get(id).cloned()
    }

    /// Returns a transaction by id regardless of payment method.
    pub fn transaction(&self, id: &TransactionId) -> Option<OrderTransaction> {
        self.state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .find(|t| t.id == *id)
            .cloned()
    }

    /// Returns a subscription by id.
    pub fn subscription(&self, id: &SubscriptionId) -> Option<Subscription> {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .find(|s| s.id == *id)
            .cloned()
    }

    /// All transactions of an order in creation order.
    pub fn transactions_for_order(&self, order_id: &OrderId) -> Vec<OrderTransaction> {
        self.state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .filter(|t| t.order_id == *order_id)
            .cloned()
            .collect()
    }

    /// Total number of transaction rows.
    pub fn transaction_count(&self) -> usize {
        self.state.lock().unwrap().transactions.len()
    }

    /// Cached plan code for a fingerprint.
    pub fn plan_code(&self, fingerprint: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .plan_codes
            .get(fingerprint)
            .cloned()
    }
}

/// Applies a settlement to a charge row in place.
///
/// Billing fields only overwrite when the settlement carries them, so a
/// sparse gateway response cannot erase data captured earlier.
fn apply_settlement(transaction: &mut OrderTransaction, settlement: &ChargeSettlement) {
    transaction.status = TransactionStatus::Succeeded;
    transaction.vendor_charge_id = Some(settlement.vendor_charge_id.clone());
    transaction.total = settlement.total;
    transaction.currency = settlement.currency.clone();

    if let Some(last4) = &settlement.card_last_4 {
        transaction.card_last_4 = Some(last4.clone());
    }
    if let Some(brand) = &settlement.card_brand {
        transaction.card_brand = Some(brand.clone());
    }
    if let Some(method_type) = &settlement.payment_method_type {
        transaction.payment_method_type = Some(method_type.clone());
    }

    transaction.merge_meta(&settlement.meta_patch);
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.state.lock().unwrap().orders.get(id).cloned())
    }

    async fn update_status(&self, id: &OrderId, status: OrderStatus) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .get_mut(id)
            .ok_or_else(|| DomainError::new(ErrorCode::OrderNotFound, "Order not found"))?;
        order.status = status;
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn find_by_id_and_method(
        &self,
        id: &TransactionId,
        payment_method: &str,
    ) -> Result<Option<OrderTransaction>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .find(|t| t.id == *id && t.payment_method == payment_method)
            .cloned())
    }

    async fn find_by_vendor_charge_id(
        &self,
        vendor_charge_id: &str,
        payment_method: &str,
    ) -> Result<Option<OrderTransaction>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .find(|t| {
                t.payment_method == payment_method
                    && t.vendor_charge_id.as_deref() == Some(vendor_charge_id)
            })
            .cloned())
    }

    async fn find_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<OrderTransaction>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .filter(|t| t.order_id == *order_id)
            .cloned()
            .collect())
    }

    async fn find_refunds_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<OrderTransaction>, DomainError> {
        let mut refunds: Vec<OrderTransaction> = self
            .state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .filter(|t| {
                t.order_id == *order_id && t.transaction_type == TransactionType::Refund
            })
            .cloned()
            .collect();
        refunds.reverse();
        Ok(refunds)
    }

    async fn create(&self, transaction: &OrderTransaction) -> Result<(), DomainError> {
        self.state
            .lock()
            .unwrap()
            .transactions
            .push(transaction.clone());
        Ok(())
    }

    async fn update(&self, transaction: &OrderTransaction) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction.id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::TransactionNotFound, "Transaction not found")
            })?;
        *slot = transaction.clone();
        Ok(())
    }

    async fn settle(
        &self,
        id: &TransactionId,
        settlement: ChargeSettlement,
    ) -> Result<SettleOutcome, DomainError> {
        let mut state = self.state.lock().unwrap();
        let transaction = state
            .transactions
            .iter_mut()
            .find(|t| t.id == *id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::TransactionNotFound, "Transaction not found")
            })?;

        if transaction.status == TransactionStatus::Succeeded {
            return Ok(SettleOutcome::AlreadySettled(transaction.clone()));
        }

        apply_settlement(transaction, &settlement);
        Ok(SettleOutcome::Applied(transaction.clone()))
    }

    async fn claim_oldest_placeholder(
        &self,
        subscription_id: &SubscriptionId,
        settlement: ChargeSettlement,
    ) -> Result<Option<OrderTransaction>, DomainError> {
        let mut state = self.state.lock().unwrap();
        let placeholder = state
            .transactions
            .iter_mut()
            .find(|t| t.subscription_id == Some(*subscription_id) && t.is_placeholder());

        match placeholder {
            Some(transaction) => {
                apply_settlement(transaction, &settlement);
                Ok(Some(transaction.clone()))
            }
            None => Ok(None),
        }
    }

    async fn increment_refunded_total(
        &self,
        id: &TransactionId,
        amount: i64,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        let transaction = state
            .transactions
            .iter_mut()
            .find(|t| t.id == *id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::TransactionNotFound, "Transaction not found")
            })?;
        transaction.refunded_total += amount;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .find(|s| s.id == *id)
            .cloned())
    }

    async fn find_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .find(|s| s.order_id == *order_id)
            .cloned())
    }

    async fn find_by_vendor_subscription_id(
        &self,
        vendor_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .find(|s| s.vendor_subscription_id.as_deref() == Some(vendor_subscription_id))
            .cloned())
    }

    async fn find_by_email_token(
        &self,
        email_token: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .find(|s| s.email_token() == Some(email_token))
            .cloned())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription.id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
            })?;
        *slot = subscription.clone();
        Ok(())
    }
}

#[async_trait]
impl PlanCache for InMemoryStore {
    async fn get(&self, fingerprint: &str) -> Result<Option<String>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .plan_codes
            .get(fingerprint)
            .cloned())
    }

    async fn put(&self, fingerprint: &str, plan_code: &str) -> Result<(), DomainError> {
        self.state
            .lock()
            .unwrap()
            .plan_codes
            .insert(fingerprint.to_string(), plan_code.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::orders::{OrderMode, OrderType, PAYMENT_METHOD};
    use serde_json::json;

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn test_order() -> Order {
        Order::new(
            OrderType::Normal,
            OrderMode::Test,
            "Ada Lovelace",
            "ada@example.com",
            500_000,
            "NGN",
        )
    }

    fn settlement(vendor_id: &str) -> ChargeSettlement {
        ChargeSettlement {
            vendor_charge_id: vendor_id.to_string(),
            total: 500_000,
            currency: "NGN".to_string(),
            card_last_4: Some("4081".to_string()),
            card_brand: Some("visa".to_string()),
            payment_method_type: Some("card".to_string()),
            meta_patch: serde_json::Map::new(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Transaction Lookup Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn find_by_id_and_method_scopes_to_payment_method() {
        let store = InMemoryStore::new();
        let order = test_order();
        let mut txn = OrderTransaction::new_charge(order.id, 500_000, "NGN");
        txn.payment_method = "stripe".to_string();
        let id = txn.id;
        store.seed_order(order);
        store.seed_transaction(txn);

        let found = store.find_by_id_and_method(&id, PAYMENT_METHOD).await.unwrap();

        assert!(found.is_none(), "other gateway's row must stay invisible");
    }

    #[tokio::test]
    async fn refunds_come_back_newest_first() {
        let store = InMemoryStore::new();
        let order = test_order();
        let order_id = order.id;
        store.seed_order(order);

        let charge = OrderTransaction::new_charge(order_id, 500_000, "NGN");
        let charge_id = charge.id;
        store.seed_transaction(charge);

        let first = OrderTransaction::new_refund(order_id, charge_id, 100, "NGN");
        let second = OrderTransaction::new_refund(order_id, charge_id, 200, "NGN");
        let second_id = second.id;
        store.seed_transaction(first);
        store.seed_transaction(second);

        let refunds = store.find_refunds_for_order(&order_id).await.unwrap();

        assert_eq!(refunds.len(), 2);
        assert_eq!(refunds[0].id, second_id, "latest refund leads");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Settle Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn settle_applies_once_then_reports_already_settled() {
        let store = InMemoryStore::new();
        let order = test_order();
        let txn = OrderTransaction::new_charge(order.id, 500_000, "NGN");
        let id = txn.id;
        store.seed_order(order);
        store.seed_transaction(txn);

        let first = store.settle(&id, settlement("409")).await.unwrap();
        let second = store.settle(&id, settlement("409")).await.unwrap();

        assert!(first.was_applied());
        assert!(!second.was_applied());
        assert_eq!(
            store.transaction(&id).unwrap().vendor_charge_id.as_deref(),
            Some("409")
        );
    }

    #[tokio::test]
    async fn settle_unknown_transaction_errors() {
        let store = InMemoryStore::new();
        let result = store.settle(&TransactionId::new(), settlement("1")).await;

        assert_eq!(result.unwrap_err().code, ErrorCode::TransactionNotFound);
    }

    #[tokio::test]
    async fn settle_merges_meta_without_dropping_existing_keys() {
        let store = InMemoryStore::new();
        let order = test_order();
        let mut txn = OrderTransaction::new_charge(order.id, 500_000, "NGN");
        txn.set_meta("checkout_note", json!("keep me"));
        let id = txn.id;
        store.seed_order(order);
        store.seed_transaction(txn);

        let outcome = store
            .settle(&id, settlement("409").with_meta("channel", json!("card")))
            .await
            .unwrap();

        let written = outcome.into_transaction();
        assert_eq!(written.meta_str("checkout_note"), Some("keep me"));
        assert_eq!(written.meta_str("channel"), Some("card"));
    }

    #[tokio::test]
    async fn concurrent_settles_apply_exactly_once() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryStore::new());
        let order = test_order();
        let txn = OrderTransaction::new_charge(order.id, 500_000, "NGN");
        let id = txn.id;
        store.seed_order(order);
        store.seed_transaction(txn);

        let (a, b) = tokio::join!(
            store.settle(&id, settlement("409")),
            store.settle(&id, settlement("409")),
        );

        let applied = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|o| o.was_applied())
            .count();
        assert_eq!(applied, 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Placeholder Claim Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn claim_takes_the_oldest_placeholder() {
        let store = InMemoryStore::new();
        let order = test_order();
        let order_id = order.id;
        store.seed_order(order);

        let sub_id = SubscriptionId::new();
        let mut older = OrderTransaction::new_charge(order_id, 0, "NGN");
        older.subscription_id = Some(sub_id);
        let older_id = older.id;
        let mut newer = OrderTransaction::new_charge(order_id, 0, "NGN");
        newer.subscription_id = Some(sub_id);
        store.seed_transaction(older);
        store.seed_transaction(newer);

        let claimed = store
            .claim_oldest_placeholder(&sub_id, settlement("700"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(claimed.id, older_id);
        assert!(claimed.is_succeeded());
    }

    #[tokio::test]
    async fn claim_without_placeholders_returns_none() {
        let store = InMemoryStore::new();
        let claimed = store
            .claim_oldest_placeholder(&SubscriptionId::new(), settlement("700"))
            .await
            .unwrap();
        assert!(claimed.is_none());
    }

    #[tokio::test]
    async fn settled_rows_are_not_placeholders() {
        let store = InMemoryStore::new();
        let order = test_order();
        let order_id = order.id;
        store.seed_order(order);

        let sub_id = SubscriptionId::new();
        let mut txn = OrderTransaction::new_charge(order_id, 0, "NGN");
        txn.subscription_id = Some(sub_id);
        let id = txn.id;
        store.seed_transaction(txn);

        store.settle(&id, settlement("700")).await.unwrap();

        let claimed = store
            .claim_oldest_placeholder(&sub_id, settlement("701"))
            .await
            .unwrap();
        assert!(claimed.is_none(), "settled row must not be claimed again");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription Lookup Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscription_lookup_by_vendor_id_and_email_token() {
        use crate::domain::subscriptions::{BillingInterval, SubscriptionStatus};

        let store = InMemoryStore::new();
        let order = test_order();
        let mut sub = Subscription::new(order.id, "Pro Monthly", 250_000, BillingInterval::Monthly);
        sub.status = SubscriptionStatus::Active;
        sub.vendor_subscription_id = Some("SUB_x".to_string());
        sub.set_email_token("tok_y");
        let sub_id = sub.id;
        store.seed_order(order);
        store.seed_subscription(sub);

        let by_vendor = store
            .find_by_vendor_subscription_id("SUB_x")
            .await
            .unwrap()
            .unwrap();
        let by_token = store.find_by_email_token("tok_y").await.unwrap().unwrap();

        assert_eq!(by_vendor.id, sub_id);
        assert_eq!(by_token.id, sub_id);
        assert!(store
            .find_by_vendor_subscription_id("SUB_other")
            .await
            .unwrap()
            .is_none());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Order and Plan Cache Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn update_status_rejects_unknown_order() {
        let store = InMemoryStore::new();
        let result = store
            .update_status(&OrderId::new(), OrderStatus::Paid)
            .await;
        assert_eq!(result.unwrap_err().code, ErrorCode::OrderNotFound);
    }

    #[tokio::test]
    async fn plan_cache_round_trips() {
        let store = InMemoryStore::new();
        store.put("fp_monthly_250000", "PLN_1").await.unwrap();

        assert_eq!(
            PlanCache::get(&store, "fp_monthly_250000").await.unwrap(),
            Some("PLN_1".to_string())
        );
        assert_eq!(PlanCache::get(&store, "fp_other").await.unwrap(), None);
    }
}
