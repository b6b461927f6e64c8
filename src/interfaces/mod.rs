//! Edge adapters translating between the outside world and the service.

pub mod json;
