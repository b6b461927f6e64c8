use super::broker::InMemoryBroker;
use crate::domain::messages::{PaymentCommand, PaymentEvent};
use crate::domain::ports::EventSource;
use crate::domain::status::{OperationType, PaymentStatus};
use crate::error::{Result, TransportError};
use tokio::sync::watch;

pub const LOOPBACK_GROUP: &str = "loopback-settlement";

/// Local stand-in for the remote settlement system.
///
/// Reads commands from the outbound topic and answers each on the inbound
/// topic: payments are approved under transaction ids `tx-1`, `tx-2`, ... in
/// the order they are read, and refunds are cancelled under `rf-1`, `rf-2`, ...
/// It exists so the binary can run end to end without external infrastructure.
pub struct LoopbackSettlement {
    broker: InMemoryBroker,
    command_topic: String,
    event_topic: String,
    payments: u64,
    refunds: u64,
}

impl LoopbackSettlement {
    pub fn new(
        broker: InMemoryBroker,
        command_topic: impl Into<String>,
        event_topic: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            command_topic: command_topic.into(),
            event_topic: event_topic.into(),
            payments: 0,
            refunds: 0,
        }
    }

    fn answer(&mut self, command: PaymentCommand) -> PaymentEvent {
        match command.r#type {
            OperationType::Payment => {
                self.payments += 1;
                PaymentEvent {
                    payment_id: command.payment_id,
                    transaction_id: format!("tx-{}", self.payments),
                    status: PaymentStatus::Approved.to_string(),
                    msg: "approved".to_string(),
                    refund_id: String::new(),
                }
            }
            OperationType::Refund => {
                self.refunds += 1;
                PaymentEvent {
                    payment_id: command.payment_id,
                    transaction_id: command.transaction_id,
                    status: PaymentStatus::Cancelled.to_string(),
                    msg: "refunded".to_string(),
                    refund_id: format!("rf-{}", self.refunds),
                }
            }
        }
    }

    /// Answers commands until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut source = self.broker.consumer(LOOPBACK_GROUP);
        source.subscribe(&self.command_topic).await?;

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
                read = source.read_message() => read,
            };
            let message = match read {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!(error = %e, "loopback settlement read failed");
                    continue;
                }
            };

            match serde_json::from_slice::<PaymentCommand>(&message.payload) {
                Ok(command) => {
                    let event = self.answer(command);
                    let payload = serde_json::to_vec(&event).map_err(TransportError::Serialization)?;
                    if let Err(e) = self.broker.send(&self.event_topic, payload).await {
                        tracing::error!(payment_id = %event.payment_id, error = %e, "loopback settlement reply lost");
                    }
                }
                Err(e) => tracing::warn!(offset = message.offset, error = %e, "loopback settlement skipped message"),
            }
            source.commit(&message).await?;
        }
        Ok(())
    }
}
