use crate::domain::payment::Payment;
use crate::domain::ports::PaymentRepository;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory payment repository.
///
/// Uses `Arc<RwLock<HashMap<Uuid, Payment>>>` so clones share the same rows.
/// Lookups by transaction id scan the map; transaction ids are not unique
/// before settlement, so the earliest created match is returned.
#[derive(Default, Clone)]
pub struct InMemoryPaymentRepository {
    payments: Arc<RwLock<HashMap<Uuid, Payment>>>,
}

impl InMemoryPaymentRepository {
    /// Creates a new, empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.payments.read().await.is_empty()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create_payment(&self, payment: Payment) -> Result<Payment> {
        let mut payments = self.payments.write().await;
        if payments.contains_key(&payment.id) {
            return Err(PaymentError::Persistence(
                format!("duplicate payment id {}", payment.id).into(),
            ));
        }
        payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn get_payment_by_id(&self, id: Uuid) -> Result<Payment> {
        let payments = self.payments.read().await;
        payments.get(&id).cloned().ok_or(PaymentError::PaymentNotFound)
    }

    async fn get_payment_by_transaction_id(&self, transaction_id: &str) -> Result<Payment> {
        let payments = self.payments.read().await;
        payments
            .values()
            .filter(|p| p.transaction_id == transaction_id)
            .min_by_key(|p| p.created_at)
            .cloned()
            .ok_or(PaymentError::PaymentNotFound)
    }

    async fn update_payment(&self, payment: Payment) -> Result<Payment> {
        let mut payments = self.payments.write().await;
        match payments.get_mut(&payment.id) {
            Some(stored) => {
                *stored = payment.clone();
                Ok(payment)
            }
            None => Err(PaymentError::PaymentNotFound),
        }
    }
}
