//! Request and response shapes of the API surface served by the service.

use super::payment::{Amount, NewPayment, Payment};
use super::status::PaymentStatus;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of a create-payment request.
///
/// Fields decode leniently; [`PaymentRequest::validate`] decides what is missing.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentRequest {
    pub card_id: String,
    pub cvc: String,
    pub expired_date: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    pub currency: String,
    pub merchant: String,
    pub user_id: String,
    pub merchant_id: String,
}

/// Body of a refund request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RefundRequest {
    pub transaction_id: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    pub currency: String,
}

fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PaymentError::ValidationError(format!(
            "missing required field: {field}"
        )));
    }
    Ok(())
}

fn require_amount(value: Option<Decimal>) -> Result<Amount> {
    let value = value.ok_or_else(|| {
        PaymentError::ValidationError("missing required field: amount".to_string())
    })?;
    Amount::new(value)
}

impl PaymentRequest {
    /// Checks every required field and returns the attributes to persist.
    pub fn validate(&self) -> Result<NewPayment> {
        require("cardId", &self.card_id)?;
        require("cvc", &self.cvc)?;
        require("expiredDate", &self.expired_date)?;
        let amount = require_amount(self.amount)?;
        require("currency", &self.currency)?;
        require("merchant", &self.merchant)?;
        require("userId", &self.user_id)?;
        require("merchantId", &self.merchant_id)?;

        Ok(NewPayment {
            card_id: self.card_id.clone(),
            user_id: self.user_id.clone(),
            merchant_id: self.merchant_id.clone(),
            merchant: self.merchant.clone(),
            amount,
            currency: self.currency.clone(),
        })
    }
}

impl RefundRequest {
    pub fn validate(&self) -> Result<Amount> {
        require("transactionId", &self.transaction_id)?;
        let amount = require_amount(self.amount)?;
        require("currency", &self.currency)?;
        Ok(amount)
    }
}

/// Read-only projection of a stored payment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub payment_id: Uuid,
    pub transaction_id: String,
    pub refund_id: String,
    pub user_id: String,
    pub merchant_id: String,
    pub msg: String,
    pub amount: Amount,
    pub currency: String,
    pub status: PaymentStatus,
    pub merchant: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentView {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            transaction_id: payment.transaction_id.clone(),
            refund_id: payment.refund_id.clone(),
            user_id: payment.user_id.clone(),
            merchant_id: payment.merchant_id.clone(),
            msg: payment.msg.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            status: payment.status,
            merchant: payment.merchant.clone(),
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}
