use super::broker::InMemoryBroker;
use crate::domain::messages::PaymentCommand;
use crate::domain::ports::CommandPublisher;
use crate::error::{Result, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::oneshot;

/// Publishes payment commands to a broker topic and waits for each delivery report.
///
/// The caller is held until the broker answers, so broker latency shows up in
/// request latency. With `delivery_timeout` unset the wait is unbounded. When the
/// deadline passes the pending record is abandoned and the broker discards it.
pub struct BrokerCommandPublisher {
    broker: InMemoryBroker,
    topic: String,
    delivery_timeout: Option<Duration>,
}

impl BrokerCommandPublisher {
    pub fn new(broker: InMemoryBroker, topic: impl Into<String>, delivery_timeout: Option<Duration>) -> Self {
        Self {
            broker,
            topic: topic.into(),
            delivery_timeout,
        }
    }
}

#[async_trait]
impl CommandPublisher for BrokerCommandPublisher {
    async fn produce(&self, command: &PaymentCommand) -> Result<()> {
        let value = serde_json::to_vec(command).map_err(TransportError::Serialization)?;

        let (ack, report) = oneshot::channel();
        self.broker.submit(&self.topic, value, ack)?;

        let report = match self.delivery_timeout {
            Some(limit) => tokio::time::timeout(limit, report)
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => report.await,
        };
        let delivered = report
            .map_err(|_| TransportError::Delivery("delivery report channel dropped".to_string()))??;

        tracing::info!(
            broker = %self.broker.name(),
            topic = %delivered.topic,
            partition = delivered.partition,
            offset = delivered.offset,
            payment_id = %command.payment_id,
            operation = ?command.r#type,
            "delivered message"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::Amount;
    use crate::domain::status::{OperationType, PaymentStatus};
    use crate::error::PaymentError;
    use crate::infrastructure::broker::BrokerSettings;
    use rust_decimal_macros::dec;

    fn command() -> PaymentCommand {
        PaymentCommand {
            payment_id: "p-1".into(),
            transaction_id: String::new(),
            status: PaymentStatus::Pending,
            card_id: "card-1".into(),
            cvc: "123".into(),
            expired_date: "12/30".into(),
            amount: Amount::new(dec!(100)).unwrap(),
            r#type: OperationType::Payment,
            currency: "CLP".into(),
            merchant: "Acme".into(),
        }
    }

    #[tokio::test]
    async fn test_produce_delivers_json() {
        let broker = InMemoryBroker::new(BrokerSettings::default());
        broker.create_topic("commands").await;
        let publisher = BrokerCommandPublisher::new(broker.clone(), "commands", None);

        publisher.produce(&command()).await.unwrap();

        let records = broker.records("commands").await;
        assert_eq!(records.len(), 1);
        let decoded: PaymentCommand = serde_json::from_slice(&records[0]).unwrap();
        assert_eq!(decoded, command());
    }

    #[tokio::test]
    async fn test_produce_unknown_topic() {
        let broker = InMemoryBroker::new(BrokerSettings::default());
        let publisher = BrokerCommandPublisher::new(broker, "missing", None);

        let result = publisher.produce(&command()).await;
        assert!(matches!(
            result,
            Err(PaymentError::Transport(TransportError::Delivery(_)))
        ));
    }

    #[tokio::test]
    async fn test_produce_times_out_on_slow_broker() {
        let broker = InMemoryBroker::new(BrokerSettings {
            delivery_delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        broker.create_topic("commands").await;
        let publisher =
            BrokerCommandPublisher::new(broker, "commands", Some(Duration::from_millis(10)));

        let result = publisher.produce(&command()).await;
        assert!(matches!(
            result,
            Err(PaymentError::Transport(TransportError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn test_timed_out_command_never_reaches_topic() {
        let broker = InMemoryBroker::new(BrokerSettings {
            delivery_delay: Some(Duration::from_millis(100)),
            ..Default::default()
        });
        broker.create_topic("commands").await;
        let publisher =
            BrokerCommandPublisher::new(broker.clone(), "commands", Some(Duration::from_millis(20)));

        assert!(publisher.produce(&command()).await.is_err());
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(broker.records("commands").await.is_empty());
    }

    #[tokio::test]
    async fn test_produce_oversized_is_submission_error() {
        let broker = InMemoryBroker::new(BrokerSettings {
            max_message_bytes: 8,
            ..Default::default()
        });
        broker.create_topic("commands").await;
        let publisher = BrokerCommandPublisher::new(broker.clone(), "commands", None);

        let result = publisher.produce(&command()).await;
        assert!(matches!(
            result,
            Err(PaymentError::Transport(TransportError::Submission(_)))
        ));
        assert!(broker.records("commands").await.is_empty());
    }
}
