//! # Webhook Dispatcher
//!
//! Verifies payment-provider callbacks and routes completed checkouts to the
//! matching confirmation email. Providers deliver at least once, so events
//! are remembered by id and a replay is acknowledged without sending mail a
//! second time.

use crate::checkout::CheckoutIntent;
use crate::error::IntakeResult;
use crate::event::{CompletedCheckout, PaymentEventType};
use crate::gateway::SharedGateway;
use crate::mail::Notifier;
use crate::task::SideTask;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, instrument};

/// Default number of event ids remembered for replay detection
pub const DEFAULT_REPLAY_WINDOW: usize = 4096;

/// Bounded, in-memory set of handled event ids.
///
/// Oldest ids are forgotten first. Contents do not survive a restart.
#[derive(Debug)]
pub struct ProcessedEvents {
    capacity: usize,
    inner: Mutex<ProcessedInner>,
}

#[derive(Debug, Default)]
struct ProcessedInner {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl ProcessedEvents {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(ProcessedInner::default()),
        }
    }

    /// Record `event_id`; returns `false` if it was already recorded.
    pub fn first_delivery(&self, event_id: &str) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.ids.contains(event_id) {
            return false;
        }

        if inner.order.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.ids.remove(&oldest);
            }
        }
        inner.ids.insert(event_id.to_string());
        inner.order.push_back(event_id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProcessedEvents {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_WINDOW)
    }
}

/// What the dispatcher did with an accepted event
#[derive(Debug)]
pub enum WebhookOutcome {
    /// Confirmation email is on its way
    Dispatched { flow: CheckoutIntent, task: SideTask },
    /// Same event id seen before; nothing sent
    Duplicate { event_id: String },
    /// Event type with no handler
    Ignored { event_type: String },
}

/// Verifies and routes payment-provider webhooks
pub struct WebhookDispatcher {
    gateway: SharedGateway,
    notifier: Notifier,
    processed: ProcessedEvents,
}

impl WebhookDispatcher {
    pub fn new(gateway: SharedGateway, notifier: Notifier) -> Self {
        Self::with_processed(gateway, notifier, ProcessedEvents::default())
    }

    pub fn with_processed(
        gateway: SharedGateway,
        notifier: Notifier,
        processed: ProcessedEvents,
    ) -> Self {
        Self {
            gateway,
            notifier,
            processed,
        }
    }

    /// Verify `payload` against `signature` and act on the event.
    ///
    /// Errors only for a bad signature or an unreadable event; email delivery
    /// happens in a detached task and never fails this call.
    #[instrument(skip(self, payload, signature), fields(provider = self.gateway.provider_name()))]
    pub async fn handle(&self, payload: &[u8], signature: &str) -> IntakeResult<WebhookOutcome> {
        let event = self.gateway.verify_event(payload, signature).await?;
        info!(event_id = %event.id, event_type = event.event_type.as_str(), "Webhook verified");

        match &event.event_type {
            PaymentEventType::CheckoutCompleted => {
                let checkout = CompletedCheckout::from_event(&event)?;

                if !self.processed.first_delivery(&event.id) {
                    info!(event_id = %event.id, "Replayed webhook, confirmation already sent");
                    return Ok(WebhookOutcome::Duplicate { event_id: event.id });
                }

                let flow = checkout.intent();
                let notifier = self.notifier.clone();
                let task_name = match flow {
                    CheckoutIntent::Deposit => "deposit-confirmation",
                    CheckoutIntent::Order => "order-confirmation",
                };
                info!(session_id = %checkout.session_id, flow = %flow, "Dispatching confirmation");

                let task = SideTask::spawn(task_name, async move {
                    notifier.send_confirmation(&checkout).await
                });
                Ok(WebhookOutcome::Dispatched { flow, task })
            }
            PaymentEventType::Other(event_type) => {
                debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(WebhookOutcome::Ignored {
                    event_type: event_type.clone(),
                })
            }
        }
    }
}
