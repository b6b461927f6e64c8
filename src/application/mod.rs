//! Application layer orchestrating the payment lifecycle.
//!
//! `PaymentService` serves API requests and is the sole writer of payment
//! state. `EventConsumer` runs the single sequential loop that feeds
//! settlement events back into the service.

pub mod consumer;
pub mod service;
