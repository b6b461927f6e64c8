//! Domain model: the payment record, its status model, the wire messages
//! exchanged with the settlement system, and the ports adapters implement.

pub mod api;
pub mod messages;
pub mod payment;
pub mod ports;
pub mod status;
