//! Kafka adapters for the publisher and event source ports.
//!
//! Both clients are created lazily by librdkafka: constructing them never
//! touches the network, so connection problems surface on the first produce
//! or read.

use crate::domain::messages::PaymentCommand;
use crate::domain::ports::{CommandPublisher, EventSource, InboundMessage};
use crate::error::{Result, TransportError};
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{Offset, TopicPartitionList};
use std::time::Duration;

/// Publishes payment commands with a `FutureProducer`, keyed by payment id.
///
/// With a delivery timeout, librdkafka is told to expire the message at the
/// same deadline, so a `Timeout` error means the message was dropped, not
/// that it may still arrive.
pub struct KafkaCommandPublisher {
    producer: FutureProducer,
    topic: String,
    delivery_timeout: Option<Duration>,
}

impl KafkaCommandPublisher {
    pub fn new(
        bootstrap_servers: &str,
        topic: impl Into<String>,
        delivery_timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", bootstrap_servers);
        if let Some(limit) = delivery_timeout {
            config.set("message.timeout.ms", limit.as_millis().to_string());
        }
        let producer: FutureProducer = config
            .create()
            .map_err(|e| TransportError::Submission(e.to_string()))?;

        Ok(Self {
            producer,
            topic: topic.into(),
            delivery_timeout,
        })
    }
}

#[async_trait]
impl CommandPublisher for KafkaCommandPublisher {
    async fn produce(&self, command: &PaymentCommand) -> Result<()> {
        let value = serde_json::to_vec(command).map_err(TransportError::Serialization)?;
        let record = FutureRecord::to(&self.topic)
            .key(command.payment_id.as_str())
            .payload(&value);
        let queue_timeout = self.delivery_timeout.map_or(Timeout::Never, Timeout::After);

        let (partition, offset) = self
            .producer
            .send(record, queue_timeout)
            .await
            .map_err(|(e, _)| delivery_error(e, self.delivery_timeout))?;

        tracing::info!(
            topic = %self.topic,
            partition,
            offset,
            payment_id = %command.payment_id,
            operation = ?command.r#type,
            "delivered message"
        );
        Ok(())
    }
}

fn delivery_error(err: KafkaError, limit: Option<Duration>) -> TransportError {
    match (err, limit) {
        (KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut), Some(limit)) => {
            TransportError::Timeout(limit)
        }
        (err, _) => TransportError::Delivery(err.to_string()),
    }
}

/// Reads settlement events as a member of a consumer group.
///
/// Auto-commit is off; offsets move only through [`EventSource::commit`]. A
/// group with no committed offset starts from the earliest record.
pub struct KafkaEventSource {
    consumer: StreamConsumer,
}

impl KafkaEventSource {
    pub fn new(bootstrap_servers: &str, group_id: &str) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("group.id", group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "false")
            .create()
            .map_err(|e| TransportError::Read(e.to_string()))?;
        Ok(Self { consumer })
    }
}

fn inbound<M: Message>(message: &M) -> InboundMessage {
    InboundMessage {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset().max(0) as u64,
        payload: message.payload().unwrap_or_default().to_vec(),
    }
}

#[async_trait]
impl EventSource for KafkaEventSource {
    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.consumer
            .subscribe(&[topic])
            .map_err(|e| TransportError::Read(e.to_string()))?;
        Ok(())
    }

    async fn read_message(&mut self) -> Result<InboundMessage> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| TransportError::Read(e.to_string()))?;
        Ok(inbound(&message))
    }

    async fn commit(&mut self, message: &InboundMessage) -> Result<()> {
        let mut offsets = TopicPartitionList::new();
        offsets
            .add_partition_offset(
                &message.topic,
                message.partition,
                Offset::Offset(message.offset as i64 + 1),
            )
            .map_err(|e| TransportError::Read(e.to_string()))?;
        self.consumer
            .commit(&offsets, CommitMode::Async)
            .map_err(|e| TransportError::Read(e.to_string()))?;
        Ok(())
    }
}
