use clap::{Args, Parser};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GROUP_ID: &str = "payment-payments-group";
pub const DEFAULT_CONSUMER_TOPIC: &str = "com.deuna.payment.payment.v1.payments.updated";
pub const DEFAULT_PRODUCER_TOPIC: &str = "com.deuna.payment.payment_banking_x.v1.payments";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file of API requests, one JSON object per line
    pub input: PathBuf,

    #[command(flatten)]
    pub broker: BrokerConfig,

    #[command(flatten)]
    pub store: StoreConfig,

    /// Log level (trace, debug, info, warn, error). RUST_LOG overrides it.
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// How long to wait for settlement events after each request, in milliseconds
    #[arg(long, env = "SETTLE_TIMEOUT_MS", default_value_t = 5000)]
    pub settle_timeout_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct BrokerConfig {
    /// Kafka bootstrap servers, e.g. localhost:9092 (optional). If provided, uses Kafka.
    #[arg(long, env = "BOOTSTRAP_SERVERS")]
    pub bootstrap_servers: Option<String>,

    /// Consumer group of the settlement event consumer
    #[arg(long, env = "GROUP_ID", default_value = DEFAULT_GROUP_ID)]
    pub group_id: String,

    /// Topic settlement events are read from
    #[arg(long, env = "CONSUMER_TOPIC", default_value = DEFAULT_CONSUMER_TOPIC)]
    pub consumer_topic: String,

    /// Topic payment and refund commands are published to
    #[arg(long, env = "PRODUCER_TOPIC", default_value = DEFAULT_PRODUCER_TOPIC)]
    pub producer_topic: String,

    /// Upper bound on waiting for a delivery report, in milliseconds. Unbounded if unset.
    #[arg(long, env = "PUBLISH_TIMEOUT_MS")]
    pub publish_timeout_ms: Option<u64>,
}

impl BrokerConfig {
    pub fn publish_timeout(&self) -> Option<Duration> {
        self.publish_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Args, Debug, Clone)]
pub struct StoreConfig {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "DB_PATH")]
    pub db_path: Option<PathBuf>,
}
