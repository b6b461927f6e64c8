//! An in-process, Kafka-like message broker.
//!
//! Each topic is a single partition: an append-only log addressed by offset.
//! Producers submit records together with a one-shot channel and receive a
//! delivery report on it once a background delivery task has appended the
//! record, or refused it. Consumers belong to a group; the group's committed
//! offset decides where a fresh subscription starts reading.

use crate::domain::ports::{EventSource, InboundMessage};
use crate::error::{PaymentError, Result, TransportError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock, mpsc, oneshot};

/// Every topic has exactly one partition.
pub const PARTITION: i32 = 0;

#[derive(Debug, Clone)]
pub struct BrokerSettings {
    /// Label reported in logs.
    pub name: String,
    /// Create topics on first produce instead of failing the delivery.
    pub auto_create_topics: bool,
    /// Submissions larger than this are refused before being queued.
    pub max_message_bytes: usize,
    /// Artificial latency applied by the delivery task to every record.
    pub delivery_delay: Option<Duration>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            name: "in-memory".to_string(),
            auto_create_topics: false,
            max_message_bytes: 1024 * 1024,
            delivery_delay: None,
        }
    }
}

/// Where a delivered record landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub topic: String,
    pub partition: i32,
    pub offset: u64,
}

pub type DeliveryReport = std::result::Result<Delivered, TransportError>;

struct ProduceRequest {
    topic: String,
    payload: Vec<u8>,
    ack: oneshot::Sender<DeliveryReport>,
}

#[derive(Default)]
struct BrokerState {
    topics: RwLock<HashMap<String, Vec<Vec<u8>>>>,
    /// (group, topic) -> next offset to read.
    committed: RwLock<HashMap<(String, String), u64>>,
    appended: Notify,
}

#[derive(Clone)]
pub struct InMemoryBroker {
    state: Arc<BrokerState>,
    requests: mpsc::UnboundedSender<ProduceRequest>,
    settings: Arc<BrokerSettings>,
}

impl InMemoryBroker {
    /// Creates the broker and spawns its delivery task on the current runtime.
    ///
    /// The task exits once every handle to the broker has been dropped.
    pub fn new(settings: BrokerSettings) -> Self {
        let state = Arc::new(BrokerState::default());
        let settings = Arc::new(settings);
        let (requests, rx) = mpsc::unbounded_channel();

        tokio::spawn(deliver(state.clone(), settings.clone(), rx));
        tracing::debug!(broker = %settings.name, "in-memory broker started");

        Self {
            state,
            requests,
            settings,
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub async fn create_topic(&self, topic: &str) {
        self.state
            .topics
            .write()
            .await
            .entry(topic.to_string())
            .or_default();
    }

    /// Queues a record for delivery. The outcome arrives on `ack`.
    ///
    /// Only client-side failures are returned here; per-record failures such as
    /// an unknown topic are reported through `ack`.
    pub fn submit(
        &self,
        topic: &str,
        payload: Vec<u8>,
        ack: oneshot::Sender<DeliveryReport>,
    ) -> std::result::Result<(), TransportError> {
        if payload.len() > self.settings.max_message_bytes {
            return Err(TransportError::Submission(format!(
                "message of {} bytes exceeds limit of {}",
                payload.len(),
                self.settings.max_message_bytes
            )));
        }
        self.requests
            .send(ProduceRequest {
                topic: topic.to_string(),
                payload,
                ack,
            })
            .map_err(|_| TransportError::Submission("broker delivery queue closed".to_string()))
    }

    /// Submits a record and waits for its delivery report.
    pub async fn send(&self, topic: &str, payload: Vec<u8>) -> DeliveryReport {
        let (ack, report) = oneshot::channel();
        self.submit(topic, payload, ack)?;
        report
            .await
            .map_err(|_| TransportError::Delivery("delivery report channel dropped".to_string()))?
    }

    /// Copies every record currently stored on `topic`.
    pub async fn records(&self, topic: &str) -> Vec<Vec<u8>> {
        self.state
            .topics
            .read()
            .await
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn end_offset(&self, topic: &str) -> u64 {
        self.state
            .topics
            .read()
            .await
            .get(topic)
            .map_or(0, |log| log.len() as u64)
    }

    pub async fn committed_offset(&self, group: &str, topic: &str) -> u64 {
        self.state
            .committed
            .read()
            .await
            .get(&(group.to_string(), topic.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Records on `topic` not yet committed by `group`.
    pub async fn lag(&self, group: &str, topic: &str) -> u64 {
        self.end_offset(topic)
            .await
            .saturating_sub(self.committed_offset(group, topic).await)
    }

    /// Polls until every `(group, topic)` pair has zero lag, or `timeout` elapses.
    ///
    /// A pass only counts if no pair's topic grew while it ran, so the order of
    /// `pairs` does not matter when one group produces into another's topic.
    pub async fn wait_until_drained(&self, pairs: &[(&str, &str)], timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let before = self.end_offsets(pairs).await;
            let mut drained = true;
            for (group, topic) in pairs {
                if self.lag(group, topic).await > 0 {
                    drained = false;
                    break;
                }
            }
            if drained && self.end_offsets(pairs).await == before {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    async fn end_offsets(&self, pairs: &[(&str, &str)]) -> Vec<u64> {
        let topics = self.state.topics.read().await;
        pairs
            .iter()
            .map(|(_, topic)| topics.get(*topic).map_or(0, |log| log.len() as u64))
            .collect()
    }

    /// A consumer reading on behalf of `group`.
    pub fn consumer(&self, group: &str) -> BrokerConsumer {
        BrokerConsumer {
            state: self.state.clone(),
            group: group.to_string(),
            topic: None,
            position: 0,
        }
    }
}

async fn deliver(
    state: Arc<BrokerState>,
    settings: Arc<BrokerSettings>,
    mut requests: mpsc::UnboundedReceiver<ProduceRequest>,
) {
    while let Some(request) = requests.recv().await {
        if let Some(delay) = settings.delivery_delay {
            tokio::time::sleep(delay).await;
        }

        let report = {
            let mut topics = state.topics.write().await;
            // The producer gave up waiting and reported the record undelivered; keep it that way.
            if request.ack.is_closed() {
                tracing::warn!(topic = %request.topic, "dropping record abandoned by its producer");
                continue;
            }
            if !topics.contains_key(&request.topic) && settings.auto_create_topics {
                topics.insert(request.topic.clone(), Vec::new());
            }
            match topics.get_mut(&request.topic) {
                Some(log) => {
                    log.push(request.payload);
                    Ok(Delivered {
                        topic: request.topic,
                        partition: PARTITION,
                        offset: log.len() as u64 - 1,
                    })
                }
                None => Err(TransportError::Delivery(format!(
                    "unknown topic or partition: {}",
                    request.topic
                ))),
            }
        };

        if report.is_ok() {
            state.appended.notify_waiters();
        }
        let _ = request.ack.send(report);
    }
}

/// A group member reading one subscribed topic, partition 0.
pub struct BrokerConsumer {
    state: Arc<BrokerState>,
    group: String,
    topic: Option<String>,
    position: u64,
}

#[async_trait]
impl EventSource for BrokerConsumer {
    /// Starts reading from the group's committed offset, or the beginning of the topic.
    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        if !self.state.topics.read().await.contains_key(topic) {
            return Err(PaymentError::Transport(TransportError::Read(format!(
                "cannot subscribe to unknown topic {topic}"
            ))));
        }
        self.position = self
            .state
            .committed
            .read()
            .await
            .get(&(self.group.clone(), topic.to_string()))
            .copied()
            .unwrap_or(0);
        self.topic = Some(topic.to_string());
        Ok(())
    }

    async fn read_message(&mut self) -> Result<InboundMessage> {
        let topic = self.topic.clone().ok_or_else(|| {
            PaymentError::Transport(TransportError::Read("consumer is not subscribed".to_string()))
        })?;

        loop {
            // Register before looking so an append between the check and the wait is not missed.
            let appended = self.state.appended.notified();
            {
                let topics = self.state.topics.read().await;
                let log = topics.get(&topic).ok_or_else(|| {
                    PaymentError::Transport(TransportError::Read(format!("topic {topic} disappeared")))
                })?;
                if let Some(payload) = log.get(self.position as usize) {
                    let message = InboundMessage {
                        topic: topic.clone(),
                        partition: PARTITION,
                        offset: self.position,
                        payload: payload.clone(),
                    };
                    self.position += 1;
                    return Ok(message);
                }
            }
            appended.await;
        }
    }

    async fn commit(&mut self, message: &InboundMessage) -> Result<()> {
        let mut committed = self.state.committed.write().await;
        let entry = committed
            .entry((self.group.clone(), message.topic.clone()))
            .or_insert(0);
        *entry = (*entry).max(message.offset + 1);
        Ok(())
    }
}
