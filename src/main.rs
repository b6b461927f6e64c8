use clap::Parser;
use miette::{IntoDiagnostic, Result};
use paysync::application::consumer::EventConsumer;
use paysync::application::service::PaymentService;
use paysync::config::{BrokerConfig, Cli, StoreConfig};
use paysync::domain::ports::{CommandPublisherRef, EventSourceBox, PaymentRepositoryRef};
use paysync::infrastructure::broker::{BrokerSettings, InMemoryBroker};
use paysync::infrastructure::in_memory::InMemoryPaymentRepository;
use paysync::infrastructure::loopback::{LOOPBACK_GROUP, LoopbackSettlement};
use paysync::infrastructure::publisher::BrokerCommandPublisher;
use paysync::interfaces::json::payment_writer::PaymentWriter;
use paysync::interfaces::json::request_reader::{ApiRequest, RequestReader};
use paysync::telemetry;
use std::fs::File;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn open_repository(store: &StoreConfig) -> Result<PaymentRepositoryRef> {
    match &store.db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(db_path) => {
            use paysync::infrastructure::rocksdb::RocksDbPaymentRepository;
            let repository = RocksDbPaymentRepository::open(db_path)?;
            Ok(Arc::new(repository))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryPaymentRepository::new()))
        }
        None => Ok(Arc::new(InMemoryPaymentRepository::new())),
    }
}

/// Where commands go and settlement events come from.
enum Bus {
    /// In-process broker, answered by the loopback settlement.
    Local(InMemoryBroker),
    #[cfg(feature = "broker-kafka")]
    Kafka(String),
}

impl Bus {
    /// Waits until the loopback has answered every command and its replies are consumed.
    ///
    /// A remote settlement system answers at its own pace, so there is nothing to wait on.
    async fn settle(&self, pairs: &[(&str, &str)], timeout: Duration) -> bool {
        match self {
            Bus::Local(broker) => broker.wait_until_drained(pairs, timeout).await,
            #[cfg(feature = "broker-kafka")]
            Bus::Kafka(_) => true,
        }
    }
}

async fn local_broker(config: &BrokerConfig) -> InMemoryBroker {
    let broker = InMemoryBroker::new(BrokerSettings::default());
    broker.create_topic(&config.producer_topic).await;
    broker.create_topic(&config.consumer_topic).await;
    broker
}

async fn open_bus(config: &BrokerConfig) -> Bus {
    match &config.bootstrap_servers {
        #[cfg(feature = "broker-kafka")]
        Some(servers) => Bus::Kafka(servers.clone()),
        #[cfg(not(feature = "broker-kafka"))]
        Some(_) => {
            eprintln!(
                "WARNING: Kafka requested via --bootstrap-servers, but 'broker-kafka' feature is not enabled. Falling back to the in-process broker."
            );
            Bus::Local(local_broker(config).await)
        }
        None => Bus::Local(local_broker(config).await),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(&cli.log_level);

    let repository = open_repository(&cli.store)?;

    let bus = open_bus(&cli.broker).await;

    // Every loop stops once the sender flips to true.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();
    let (publisher, source): (CommandPublisherRef, EventSourceBox) = match &bus {
        Bus::Local(broker) => {
            let loopback = LoopbackSettlement::new(
                broker.clone(),
                cli.broker.producer_topic.clone(),
                cli.broker.consumer_topic.clone(),
            );
            tasks.push(tokio::spawn(loopback.run(shutdown_rx.clone())));
            let publisher: CommandPublisherRef = Arc::new(BrokerCommandPublisher::new(
                broker.clone(),
                cli.broker.producer_topic.clone(),
                cli.broker.publish_timeout(),
            ));
            let source: EventSourceBox = Box::new(broker.consumer(&cli.broker.group_id));
            (publisher, source)
        }
        #[cfg(feature = "broker-kafka")]
        Bus::Kafka(servers) => {
            use paysync::infrastructure::kafka::{KafkaCommandPublisher, KafkaEventSource};
            let publisher: CommandPublisherRef = Arc::new(KafkaCommandPublisher::new(
                servers,
                cli.broker.producer_topic.clone(),
                cli.broker.publish_timeout(),
            )?);
            let source: EventSourceBox = Box::new(KafkaEventSource::new(servers, &cli.broker.group_id)?);
            (publisher, source)
        }
    };
    let service = PaymentService::new(repository, publisher);

    let consumer = EventConsumer::new(source, cli.broker.consumer_topic.clone(), service.clone());
    tasks.push(tokio::spawn(consumer.run(shutdown_rx)));

    // Loopback first: it appends its reply before committing the command.
    let drain = [
        (LOOPBACK_GROUP, cli.broker.producer_topic.as_str()),
        (cli.broker.group_id.as_str(), cli.broker.consumer_topic.as_str()),
    ];
    let settle_timeout = Duration::from_millis(cli.settle_timeout_ms);

    // Process requests
    let mut created = Vec::new();
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = RequestReader::new(file);
    for request in reader.requests() {
        let outcome = match request {
            Ok(ApiRequest::Create(req)) => service.create_payment(req).await.map(|p| created.push(p.id)),
            Ok(ApiRequest::Refund(req)) => service.refund_payment(req).await.map(|_| ()),
            Err(e) => {
                eprintln!("Error reading request: {}", e);
                continue;
            }
        };
        match outcome {
            Err(e) if e.is_client_error() => eprintln!("Request rejected: {}", e),
            Err(e) => eprintln!("Error processing request: {}", e),
            Ok(()) => {}
        }

        // Let settlement answer before the next request, so refunds see settled transaction ids.
        if !bus.settle(&drain, settle_timeout).await {
            tracing::warn!(timeout_ms = cli.settle_timeout_ms, "settlement did not drain in time");
        }
    }

    // Give a remote settlement system one settle window for the outstanding outcomes.
    #[cfg(feature = "broker-kafka")]
    if let Bus::Kafka(_) = &bus {
        tokio::time::sleep(settle_timeout).await;
    }

    // A loop that already exited has dropped its receiver; its result is checked below.
    let _ = shutdown_tx.send(true);
    for task in tasks {
        task.await.into_diagnostic()??;
    }

    // Collect final state
    let mut views = Vec::with_capacity(created.len());
    for id in created {
        views.push(service.get_payment_by_id(id).await?);
    }

    let stdout = io::stdout();
    let mut writer = PaymentWriter::new(stdout.lock());
    writer.write_payments(views)?;

    Ok(())
}
