use super::service::PaymentService;
use crate::domain::messages::PaymentEvent;
use crate::domain::ports::{EventSourceBox, InboundMessage};
use crate::error::Result;
use tokio::sync::watch;

/// Single sequential reader of settlement events.
///
/// Every message is handled to completion before the next read. Undecodable
/// payloads and failed reconciliations are logged and dropped; either way the
/// offset is committed and nothing is redelivered.
pub struct EventConsumer {
    source: EventSourceBox,
    topic: String,
    service: PaymentService,
}

impl EventConsumer {
    pub fn new(source: EventSourceBox, topic: impl Into<String>, service: PaymentService) -> Self {
        Self {
            source,
            topic: topic.into(),
            service,
        }
    }

    /// Subscribes and processes messages until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Only a failed subscription is returned as an error. A message already
    /// being handled when shutdown is signalled is finished and committed first.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        self.source.subscribe(&self.topic).await?;
        tracing::info!(topic = %self.topic, "consumer subscribed");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let read = tokio::select! {
                biased;
                changed = shutdown.changed() => match changed {
                    Ok(()) => continue,
                    Err(_) => break,
                },
                read = self.source.read_message() => read,
            };

            match read {
                Ok(message) => {
                    self.handle(&message).await;
                    if let Err(e) = self.source.commit(&message).await {
                        tracing::warn!(offset = message.offset, error = %e, "offset commit failed");
                    }
                }
                Err(e) => tracing::error!(topic = %self.topic, error = %e, "consumer error"),
            }
        }

        tracing::info!(topic = %self.topic, "consumer stopped");
        Ok(())
    }

    async fn handle(&self, message: &InboundMessage) {
        let event: PaymentEvent = match serde_json::from_slice(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(offset = message.offset, error = %e, "discarding undecodable message");
                return;
            }
        };

        // Reconciliation errors stop here; the message still counts as consumed.
        if let Err(e) = self.service.update_payment(event.clone()).await {
            tracing::warn!(
                offset = message.offset,
                payment_id = %event.payment_id,
                error = %e,
                "reconciliation failed, event dropped"
            );
        }
    }
}
