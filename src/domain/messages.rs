//! Wire shapes exchanged with the settlement system over the broker.

use super::payment::{Amount, Outcome};
use super::status::{OperationType, PaymentStatus};
use serde::{Deserialize, Serialize};

/// Outbound command asking the settlement system to run a payment or a refund.
///
/// Both operations share this shape; `type` tells them apart. Fields that do
/// not apply to an operation are sent as empty strings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCommand {
    pub payment_id: String,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub card_id: String,
    pub cvc: String,
    pub expired_date: String,
    pub amount: Amount,
    pub r#type: OperationType,
    pub currency: String,
    pub merchant: String,
}

/// Inbound settlement outcome.
///
/// Kept loosely typed: `payment_id` is parsed and `status` is mapped only when
/// the event is reconciled, so a bad value fails that step instead of decoding.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentEvent {
    #[serde(alias = "paymentID")]
    pub payment_id: String,
    #[serde(alias = "transactionID")]
    pub transaction_id: String,
    pub status: String,
    pub msg: String,
    #[serde(alias = "refundID")]
    pub refund_id: String,
}

impl PaymentEvent {
    pub fn outcome(&self) -> Outcome {
        Outcome {
            status: PaymentStatus::parse(&self.status),
            transaction_id: self.transaction_id.clone(),
            msg: self.msg.clone(),
            refund_id: self.refund_id.clone(),
        }
    }
}
