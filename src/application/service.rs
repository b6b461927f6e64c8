use crate::domain::api::{PaymentRequest, PaymentView, RefundRequest};
use crate::domain::messages::{PaymentCommand, PaymentEvent};
use crate::domain::payment::Payment;
use crate::domain::ports::{CommandPublisherRef, PaymentRepositoryRef};
use crate::domain::status::{OperationType, PaymentStatus};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use uuid::Uuid;

/// Keeps stored payments in step with the settlement system.
///
/// `PaymentService` is the only writer of payment state. Requests create
/// `Pending` rows and publish commands; the event consumer feeds settlement
/// outcomes back through [`PaymentService::update_payment`].
///
/// Creation is a dual write with no transaction around it: if the command
/// cannot be delivered, the row stays `Pending` and the error names its id.
#[derive(Clone)]
pub struct PaymentService {
    repository: PaymentRepositoryRef,
    publisher: CommandPublisherRef,
}

impl PaymentService {
    pub fn new(repository: PaymentRepositoryRef, publisher: CommandPublisherRef) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    /// Stores a new `Pending` payment and publishes its `Payment` command.
    ///
    /// Nothing is published if the request is invalid or the row cannot be stored.
    pub async fn create_payment(&self, request: PaymentRequest) -> Result<Payment> {
        let new = request.validate()?;
        let payment = self
            .repository
            .create_payment(Payment::pending(new, Utc::now()))
            .await?;

        let command = PaymentCommand {
            payment_id: payment.id.to_string(),
            transaction_id: String::new(),
            status: payment.status,
            card_id: request.card_id,
            cvc: request.cvc,
            expired_date: request.expired_date,
            amount: payment.amount,
            r#type: OperationType::Payment,
            currency: payment.currency.clone(),
            merchant: payment.merchant.clone(),
        };

        if let Err(e) = self.publisher.produce(&command).await {
            tracing::error!(payment_id = %payment.id, error = %e, "payment stored but command not delivered");
            return Err(match e {
                PaymentError::Transport(source) => PaymentError::CommandNotDelivered {
                    payment_id: payment.id,
                    source,
                },
                other => other,
            });
        }

        tracing::info!(payment_id = %payment.id, amount = %payment.amount.value(), currency = %payment.currency, "payment created");
        Ok(payment)
    }

    /// Publishes a `Refund` command for the payment settled under `transaction_id`.
    ///
    /// Local status is left alone; it changes when the refund outcome arrives.
    pub async fn refund_payment(&self, request: RefundRequest) -> Result<Payment> {
        let amount = request.validate()?;
        let payment = self
            .repository
            .get_payment_by_transaction_id(&request.transaction_id)
            .await?;

        if payment.status == PaymentStatus::Cancelled {
            return Err(PaymentError::PaymentAlreadyRefunded);
        }

        let command = PaymentCommand {
            payment_id: payment.id.to_string(),
            transaction_id: request.transaction_id,
            status: payment.status,
            card_id: String::new(),
            cvc: String::new(),
            expired_date: String::new(),
            amount,
            r#type: OperationType::Refund,
            currency: request.currency,
            merchant: String::new(),
        };
        self.publisher.produce(&command).await?;

        tracing::info!(payment_id = %payment.id, transaction_id = %command.transaction_id, "refund requested");
        Ok(payment)
    }

    pub async fn get_payment_by_id(&self, id: Uuid) -> Result<PaymentView> {
        let payment = self.repository.get_payment_by_id(id).await?;
        Ok(PaymentView::from(&payment))
    }

    /// Applies a settlement event onto the stored payment.
    ///
    /// No ordering or transition check is made: the last event applied wins.
    pub async fn update_payment(&self, event: PaymentEvent) -> Result<()> {
        let id = Uuid::parse_str(&event.payment_id)?;
        let mut payment = self.repository.get_payment_by_id(id).await?;

        let outcome = event.outcome();
        if outcome.status == PaymentStatus::Unknown {
            tracing::warn!(payment_id = %id, status = %event.status, "unrecognised status, storing Unknown");
        }
        let previous = payment.status;
        if previous.is_terminal() && outcome.status != previous {
            tracing::warn!(payment_id = %id, from = %previous, to = %outcome.status, "overwriting terminal status");
        }
        payment.reconcile(outcome, Utc::now());
        let payment = self.repository.update_payment(payment).await?;

        tracing::info!(
            payment_id = %payment.id,
            from = %previous,
            to = %payment.status,
            transaction_id = %payment.transaction_id,
            "payment reconciled"
        );
        Ok(())
    }
}
