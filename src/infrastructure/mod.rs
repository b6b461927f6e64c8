//! Adapters behind the domain ports.

pub mod broker;
pub mod in_memory;
#[cfg(feature = "broker-kafka")]
pub mod kafka;
pub mod loopback;
pub mod publisher;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
