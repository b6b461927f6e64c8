#![allow(dead_code)]

use paysync::application::consumer::EventConsumer;
use paysync::application::service::PaymentService;
use paysync::domain::api::PaymentRequest;
use paysync::error::Result;
use paysync::infrastructure::broker::{BrokerSettings, InMemoryBroker};
use paysync::infrastructure::in_memory::InMemoryPaymentRepository;
use paysync::infrastructure::loopback::{LOOPBACK_GROUP, LoopbackSettlement};
use paysync::infrastructure::publisher::BrokerCommandPublisher;
use rust_decimal::Decimal;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const COMMANDS: &str = "commands";
pub const EVENTS: &str = "events";
pub const GROUP: &str = "payments";

/// Service, consumer loop and optionally the loopback settlement, wired over one broker.
pub struct Pipeline {
    pub broker: InMemoryBroker,
    pub repository: Arc<InMemoryPaymentRepository>,
    pub service: PaymentService,
    loopback: bool,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<Result<()>>>,
}

impl Pipeline {
    pub async fn start(loopback: bool) -> Self {
        Self::start_with(BrokerSettings::default(), true, loopback, Duration::from_secs(2)).await
    }

    /// `create_commands_topic = false` makes every publish fail with a delivery error.
    pub async fn start_with(
        settings: BrokerSettings,
        create_commands_topic: bool,
        loopback: bool,
        publish_timeout: Duration,
    ) -> Self {
        let broker = InMemoryBroker::new(settings);
        if create_commands_topic {
            broker.create_topic(COMMANDS).await;
        }
        broker.create_topic(EVENTS).await;

        let repository = Arc::new(InMemoryPaymentRepository::new());
        let publisher = BrokerCommandPublisher::new(broker.clone(), COMMANDS, Some(publish_timeout));
        let service = PaymentService::new(repository.clone(), Arc::new(publisher));

        let (shutdown, rx) = watch::channel(false);
        let mut tasks = Vec::new();
        let consumer = EventConsumer::new(Box::new(broker.consumer(GROUP)), EVENTS, service.clone());
        tasks.push(tokio::spawn(consumer.run(rx.clone())));
        if loopback {
            let settlement = LoopbackSettlement::new(broker.clone(), COMMANDS, EVENTS);
            tasks.push(tokio::spawn(settlement.run(rx)));
        }

        Self {
            broker,
            repository,
            service,
            loopback,
            shutdown,
            tasks,
        }
    }

    /// Puts a raw payload on the inbound topic, as the settlement system would.
    pub async fn emit(&self, payload: &str) {
        self.broker
            .send(EVENTS, payload.as_bytes().to_vec())
            .await
            .expect("event delivery failed");
    }

    /// Waits until every emitted command and event has been handled.
    pub async fn drain(&self) {
        // Loopback first: it appends its reply before committing the command.
        let mut pairs = Vec::new();
        if self.loopback {
            pairs.push((LOOPBACK_GROUP, COMMANDS));
        }
        pairs.push((GROUP, EVENTS));
        assert!(
            self.broker.wait_until_drained(&pairs, Duration::from_secs(2)).await,
            "pipeline did not drain"
        );
    }

    pub async fn commands(&self) -> Vec<serde_json::Value> {
        self.broker
            .records(COMMANDS)
            .await
            .iter()
            .map(|r| serde_json::from_slice(r).unwrap())
            .collect()
    }

    pub async fn stop(self) {
        self.shutdown.send(true).ok();
        for task in self.tasks {
            task.await.unwrap().unwrap();
        }
    }
}

pub fn payment_request(amount: Decimal, currency: &str) -> PaymentRequest {
    PaymentRequest {
        card_id: "card-1".into(),
        cvc: "123".into(),
        expired_date: "12/30".into(),
        amount: Some(amount),
        currency: currency.into(),
        merchant: "Acme".into(),
        user_id: "user-1".into(),
        merchant_id: "merchant-1".into(),
    }
}

pub fn event_json(payment_id: &str, status: &str, transaction_id: &str, msg: &str, refund_id: &str) -> String {
    serde_json::json!({
        "paymentId": payment_id,
        "transactionId": transaction_id,
        "status": status,
        "msg": msg,
        "refundId": refund_id,
    })
    .to_string()
}

pub fn write_requests(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}
