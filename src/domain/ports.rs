use super::messages::PaymentCommand;
use super::payment::Payment;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Storage contract for payments.
///
/// Lookups that find nothing return `PaymentError::PaymentNotFound`.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create_payment(&self, payment: Payment) -> Result<Payment>;
    async fn get_payment_by_id(&self, id: Uuid) -> Result<Payment>;
    async fn get_payment_by_transaction_id(&self, transaction_id: &str) -> Result<Payment>;
    async fn update_payment(&self, payment: Payment) -> Result<Payment>;
}

/// Sends commands toward the settlement system.
///
/// `produce` returns only once the broker has acknowledged or rejected the message.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn produce(&self, command: &PaymentCommand) -> Result<()>;
}

/// A message read from a subscribed topic.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: u64,
    pub payload: Vec<u8>,
}

/// Subscription to a broker topic on behalf of a consumer group.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn subscribe(&mut self, topic: &str) -> Result<()>;
    /// Waits until a message is available. There is no read timeout.
    async fn read_message(&mut self) -> Result<InboundMessage>;
    /// Marks everything up to and including `message` as consumed for the group.
    async fn commit(&mut self, message: &InboundMessage) -> Result<()>;
}

pub type PaymentRepositoryRef = Arc<dyn PaymentRepository>;
pub type CommandPublisherRef = Arc<dyn CommandPublisher>;
pub type EventSourceBox = Box<dyn EventSource>;
