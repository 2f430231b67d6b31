//! Application layer: the reconciliation services and the webhook pipeline.
//!
//! Everything here orchestrates domain state through the ports; nothing
//! talks HTTP or JSON-over-the-wire directly. The three entry points into
//! this layer are checkout initiation ([`checkout`]), the browser-redirect
//! confirmation ([`confirm`]), and the webhook pipeline
//! ([`resolver`] → [`dispatcher`] → [`handlers`]). All three converge on the
//! same settlement, subscription, and refund services, which is what makes
//! duplicate and out-of-order gateway deliveries safe.

pub mod checkout;
pub mod confirm;
pub mod dispatcher;
pub mod handlers;
pub mod refunds;
pub mod resolver;
pub mod settlement;
pub mod subscriptions;

pub use checkout::{CheckoutService, PaymentIntent, PaymentSession};
pub use confirm::{
    ConfirmPaymentRequest, ConfirmationService, PaymentConfirmation, CONFIRM_NONCE_ACTION,
};
pub use dispatcher::{DispatchOutcome, WebhookDispatcher, WebhookHandler};
pub use handlers::default_dispatcher;
pub use refunds::{IncomingRefund, ReconcileOutcome, RefundService};
pub use resolver::OrderResolver;
pub use settlement::{SettlementService, AUTHORIZATION_ONLY_META_KEY};
pub use subscriptions::{SubscriptionService, MAX_RESYNC_PAGES};
