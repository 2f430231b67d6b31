//! Webhook event registry and dispatch.
//!
//! Handlers subscribe to event names in their dot form (`charge.success`).
//! Paystack occasionally emits the underscore form, so names are normalized
//! before both registration and lookup. Events with no registered handler are
//! acknowledged without side effects so the gateway stops retrying them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::orders::Order;
use crate::domain::webhook::WebhookEvent;

use super::resolver::OrderResolver;

/// A single webhook event handler, bound to an event name at registration.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn handle(&self, event: &WebhookEvent, order: &Order) -> Result<(), DomainError>;
}

/// Terminal outcome of a dispatch, both of which acknowledge the delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// At least one handler ran to completion.
    Processed,
    /// No handler is registered for the event name.
    Unhandled,
}

impl DispatchOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            DispatchOutcome::Processed => "Webhook processed successfully",
            DispatchOutcome::Unhandled => "Webhook not handled",
        }
    }
}

/// Routes verified webhook events to their handlers.
///
/// Resolution runs before the registry lookup: a webhook that cannot be tied
/// to an order is rejected even when nobody subscribes to its event name,
/// which surfaces misrouted deliveries instead of silently acknowledging
/// them.
pub struct WebhookDispatcher {
    resolver: OrderResolver,
    handlers: HashMap<String, Vec<Arc<dyn WebhookHandler>>>,
}

impl WebhookDispatcher {
    pub fn new(resolver: OrderResolver) -> Self {
        Self {
            resolver,
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler for `event_name` (dot or underscore form).
    pub fn register(&mut self, event_name: &str, handler: Arc<dyn WebhookHandler>) {
        self.handlers
            .entry(normalize(event_name))
            .or_default()
            .push(handler);
    }

    pub async fn dispatch(&self, event: &WebhookEvent) -> Result<DispatchOutcome, DomainError> {
        let order = self
            .resolver
            .resolve(event)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::OrderNotFound, "Order not found"))?;

        let Some(handlers) = self.handlers.get(&event.normalized_name()) else {
            info!(event = %event.event, order_id = %order.id, "No handler registered for webhook event");
            return Ok(DispatchOutcome::Unhandled);
        };

        for handler in handlers {
            handler.handle(event, &order).await?;
        }

        info!(event = %event.event, order_id = %order.id, "Webhook event processed");
        Ok(DispatchOutcome::Processed)
    }
}

fn normalize(event_name: &str) -> String {
    event_name.replace('.', "_")
}
