//! Browser-side payment confirmation.
//!
//! After paying on the hosted page, the customer lands back on the
//! storefront, which calls this flow with the gateway transaction id from the
//! redirect. The flow verifies the charge against the gateway directly; query
//! parameters name the charge but never prove anything about it.
//!
//! Confirmation races the `charge.success` webhook by design. Whichever
//! arrives first settles the charge, and the loser backs off inside
//! settlement.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::domain::foundation::{ConfirmationNonce, DomainError, ErrorCode, TransactionId};
use crate::domain::orders::{Order, OrderTransaction, PAYMENT_METHOD};
use crate::domain::subscriptions::Subscription;
use crate::ports::{
    ChargePayload, OrderRepository, PaystackGateway, SubscriptionRepository, TransactionRepository,
};

use super::settlement::SettlementService;
use super::subscriptions::SubscriptionService;

/// Action label bound into confirmation nonces.
pub const CONFIRM_NONCE_ACTION: &str = "paystack_payment_confirm";

/// Parameters from the storefront's confirmation call.
#[derive(Debug, Clone, Default)]
pub struct ConfirmPaymentRequest {
    pub nonce: Option<String>,
    /// Gateway transaction id from the redirect query.
    pub transaction_id: Option<String>,
}

/// Successful confirmation response.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentConfirmation {
    pub message: String,
    pub redirect_url: String,
    pub order_id: String,
}

pub struct ConfirmationService {
    gateway: Arc<dyn PaystackGateway>,
    orders: Arc<dyn OrderRepository>,
    transactions: Arc<dyn TransactionRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    nonce: ConfirmationNonce,
    settlement: Arc<SettlementService>,
    subscription_service: Arc<SubscriptionService>,
    receipt_base_url: String,
}

impl ConfirmationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn PaystackGateway>,
        orders: Arc<dyn OrderRepository>,
        transactions: Arc<dyn TransactionRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        nonce: ConfirmationNonce,
        settlement: Arc<SettlementService>,
        subscription_service: Arc<SubscriptionService>,
        receipt_base_url: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            orders,
            transactions,
            subscriptions,
            nonce,
            settlement,
            subscription_service,
            receipt_base_url: receipt_base_url.into(),
        }
    }

    /// Issues the nonce the storefront embeds in its confirmation page.
    pub fn issue_nonce(&self) -> String {
        self.nonce.issue(CONFIRM_NONCE_ACTION)
    }

    pub async fn confirm_payment(
        &self,
        request: ConfirmPaymentRequest,
    ) -> Result<PaymentConfirmation, DomainError> {
        let Some(nonce) = request.nonce.filter(|n| !n.is_empty()) else {
            return Err(DomainError::new(
                ErrorCode::InvalidNonce,
                "Nonce is required for security verification.",
            ));
        };
        if !self.nonce.verify(&nonce, CONFIRM_NONCE_ACTION) {
            return Err(DomainError::new(
                ErrorCode::InvalidNonce,
                "Invalid nonce. Please refresh the page and try again.",
            ));
        }

        let Some(charge_id) = request.transaction_id.filter(|id| !id.is_empty()) else {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "Transaction ID is required to confirm the payment.",
            ));
        };

        let charge = self
            .gateway
            .fetch_transaction(&charge_id)
            .await
            .map_err(DomainError::from)?;

        let transaction = self.resolve_transaction(&charge).await?;
        let order = self
            .orders
            .find_by_id(&transaction.order_id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::OrderNotFound, "Order not found"))?;

        if transaction.is_succeeded() {
            return Ok(self.confirmation(&order, "Payment already confirmed. Redirecting...!"));
        }

        if !charge.is_success() {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "Payment has not completed successfully.",
            ));
        }

        let mut subscription = self.subscriptions.find_by_order_id(&order.id).await?;
        let mut update = None;
        if let Some(subscription) = subscription.as_mut() {
            let customer_code = charge.customer_code().unwrap_or(&order.customer_email);
            update = self
                .subscription_service
                .ensure_remote_subscription(
                    &order,
                    subscription,
                    customer_code,
                    charge.authorization_code(),
                )
                .await?;
        }

        let order = self
            .settlement
            .confirm_charge(
                &transaction,
                &charge,
                subscription.as_mut(),
                update.as_ref(),
            )
            .await?;

        info!(order_id = %order.id, charge_id = %charge.id, "Payment confirmed");
        Ok(self.confirmation(&order, "Payment confirmed successfully. Redirecting...!"))
    }

    /// Finds the local charge row for a gateway charge: the checkout metadata
    /// names it directly, with the merchant reference as fallback for
    /// sessions the gateway stripped metadata from.
    async fn resolve_transaction(
        &self,
        charge: &ChargePayload,
    ) -> Result<OrderTransaction, DomainError> {
        let id = charge
            .metadata_str("transaction_hash")
            .and_then(|hash| hash.parse::<TransactionId>().ok())
            .or_else(|| OrderTransaction::id_from_reference(&charge.reference));

        let transaction = match id {
            Some(id) => {
                self.transactions
                    .find_by_id_and_method(&id, PAYMENT_METHOD)
                    .await?
            }
            None => None,
        };

        transaction.ok_or_else(|| {
            DomainError::new(
                ErrorCode::TransactionNotFound,
                "Transaction not found for the provided reference.",
            )
        })
    }

    fn confirmation(&self, order: &Order, message: &str) -> PaymentConfirmation {
        PaymentConfirmation {
            message: message.to_string(),
            redirect_url: format!(
                "{}/{}",
                self.receipt_base_url.trim_end_matches('/'),
                order.id
            ),
            order_id: order.id.to_string(),
        }
    }
}
