use super::status::PaymentStatus;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a positive requested amount.
///
/// Wraps `rust_decimal::Decimal` so a payment or refund can never be requested
/// for zero or a negative value. Serialized as a plain JSON number.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(
                "amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

/// The durable record of a requested payment and its lifecycle.
///
/// `id`, `amount`, `currency`, `user_id`, `merchant_id` and `merchant` are
/// written once at creation. `status`, `transaction_id`, `refund_id`, `msg`
/// and `updated_at` are only ever rewritten by [`Payment::reconcile`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub card_id: String,
    pub transaction_id: String,
    pub refund_id: String,
    pub user_id: String,
    pub merchant_id: String,
    pub merchant: String,
    pub amount: Amount,
    pub currency: String,
    pub status: PaymentStatus,
    pub msg: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied attributes of a new payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub card_id: String,
    pub user_id: String,
    pub merchant_id: String,
    pub merchant: String,
    pub amount: Amount,
    pub currency: String,
}

/// The outcome fields a settlement event writes onto a payment.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: PaymentStatus,
    pub transaction_id: String,
    pub msg: String,
    pub refund_id: String,
}

impl Payment {
    /// Creates a fresh `Pending` payment with a new id. Both timestamps start at `now`.
    pub fn pending(new: NewPayment, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id: new.card_id,
            transaction_id: String::new(),
            refund_id: String::new(),
            user_id: new.user_id,
            merchant_id: new.merchant_id,
            merchant: new.merchant,
            amount: new.amount,
            currency: new.currency,
            status: PaymentStatus::Pending,
            msg: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the outcome fields. Last write wins, whatever the current status.
    pub fn reconcile(&mut self, outcome: Outcome, now: DateTime<Utc>) {
        self.status = outcome.status;
        self.transaction_id = outcome.transaction_id;
        self.msg = outcome.msg;
        self.refund_id = outcome.refund_id;
        self.updated_at = now;
    }
}
