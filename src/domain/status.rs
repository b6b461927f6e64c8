use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a payment.
///
/// `Pending` is only ever assigned at creation. Every later value comes from a
/// reconciled settlement event, and no transition is refused: an event may move
/// a payment out of `Approved`, `Cancelled` or `Failed` just as well.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub enum PaymentStatus {
    #[default]
    Unknown,
    Pending,
    InProgress,
    Approved,
    Cancelled,
    Failed,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 6] = [
        PaymentStatus::Unknown,
        PaymentStatus::Pending,
        PaymentStatus::InProgress,
        PaymentStatus::Approved,
        PaymentStatus::Cancelled,
        PaymentStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unknown => "Unknown",
            PaymentStatus::Pending => "Pending",
            PaymentStatus::InProgress => "InProgress",
            PaymentStatus::Approved => "Approved",
            PaymentStatus::Cancelled => "Cancelled",
            PaymentStatus::Failed => "Failed",
        }
    }

    /// Maps a wire value onto a status.
    ///
    /// Matching is exact. Anything unrecognised, including the empty string,
    /// becomes `Unknown` instead of an error.
    pub fn parse(value: &str) -> Self {
        match value {
            "Pending" => PaymentStatus::Pending,
            "InProgress" => PaymentStatus::InProgress,
            "Approved" => PaymentStatus::Approved,
            "Cancelled" => PaymentStatus::Cancelled,
            "Failed" => PaymentStatus::Failed,
            _ => PaymentStatus::Unknown,
        }
    }

    /// Conventionally final. Nothing enforces it on update.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Approved | PaymentStatus::Cancelled | PaymentStatus::Failed
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distinguishes the two operations sharing the outbound command shape.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum OperationType {
    Payment,
    Refund,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_status() {
        for status in PaymentStatus::ALL {
            assert_eq!(PaymentStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_parse_unrecognised_maps_to_unknown() {
        assert_eq!(PaymentStatus::parse("approved"), PaymentStatus::Unknown);
        assert_eq!(PaymentStatus::parse(""), PaymentStatus::Unknown);
        assert_eq!(PaymentStatus::parse("Refunded"), PaymentStatus::Unknown);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(PaymentStatus::Approved.is_terminal());
        assert!(PaymentStatus::Cancelled.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_operation_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&OperationType::Refund).unwrap(),
            "\"Refund\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentStatus::InProgress).unwrap(),
            "\"InProgress\""
        );
    }
}
