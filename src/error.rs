use miette::Diagnostic;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Failures raised while moving a message through the broker.
#[derive(Error, Debug, Diagnostic)]
pub enum TransportError {
    #[error("failed to serialize message: {0}")]
    #[diagnostic(code(paysync::transport::serialization))]
    Serialization(#[from] serde_json::Error),
    #[error("failed to produce message: {0}")]
    #[diagnostic(code(paysync::transport::submission))]
    Submission(String),
    #[error("delivery failed: {0}")]
    #[diagnostic(code(paysync::transport::delivery))]
    Delivery(String),
    #[error("no delivery report after {0:?}")]
    #[diagnostic(code(paysync::transport::timeout))]
    Timeout(std::time::Duration),
    #[error("consumer read failed: {0}")]
    #[diagnostic(code(paysync::transport::read))]
    Read(String),
}

#[derive(Error, Debug, Diagnostic)]
pub enum PaymentError {
    #[error("validation error: {0}")]
    #[diagnostic(code(paysync::validation))]
    ValidationError(String),

    #[error("payment not found")]
    #[diagnostic(code(paysync::not_found))]
    PaymentNotFound,

    #[error("payment already refunded")]
    #[diagnostic(code(paysync::already_refunded))]
    PaymentAlreadyRefunded,

    #[error("invalid payment id: {0}")]
    #[diagnostic(code(paysync::invalid_payment_id))]
    InvalidPaymentId(#[from] uuid::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transport(#[from] TransportError),

    /// The payment row exists in `Pending` but its command never reached the broker.
    #[error("payment {payment_id} is stored as Pending but its command was not delivered: {source}")]
    #[diagnostic(
        code(paysync::command_not_delivered),
        help("the record needs out-of-band reconciliation")
    )]
    CommandNotDelivered {
        payment_id: Uuid,
        #[source]
        source: TransportError,
    },

    #[error("persistence error: {0}")]
    #[diagnostic(code(paysync::persistence))]
    Persistence(Box<dyn std::error::Error + Send + Sync>),

    #[error("IO error: {0}")]
    #[diagnostic(code(paysync::io))]
    IoError(#[from] std::io::Error),
}

impl PaymentError {
    /// True for errors a client caused and can correct.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PaymentError::ValidationError(_)
                | PaymentError::PaymentNotFound
                | PaymentError::PaymentAlreadyRefunded
                | PaymentError::InvalidPaymentId(_)
        )
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(err: rocksdb::Error) -> Self {
        PaymentError::Persistence(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(PaymentError::PaymentNotFound.is_client_error());
        assert!(PaymentError::PaymentAlreadyRefunded.is_client_error());
        assert!(PaymentError::ValidationError("cardId".into()).is_client_error());
        assert!(
            !PaymentError::Transport(TransportError::Delivery("unknown topic".into()))
                .is_client_error()
        );
    }

    #[test]
    fn test_command_not_delivered_message() {
        let id = Uuid::new_v4();
        let err = PaymentError::CommandNotDelivered {
            payment_id: id,
            source: TransportError::Delivery("unknown topic".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains(&id.to_string()));
        assert!(msg.contains("unknown topic"));
    }
}
