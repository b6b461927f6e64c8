use crate::domain::payment::Payment;
use crate::domain::ports::PaymentRepository;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family holding payments keyed by id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family indexing payments by settlement transaction id.
pub const CF_TRANSACTION_INDEX: &str = "transaction_index";

/// A persistent payment repository backed by RocksDB.
///
/// Payments are stored as JSON under their 16-byte id. The transaction index
/// key is `transaction_id ++ 0x00 ++ created_at (micros, order-preserving) ++ id`,
/// so a prefix scan yields the earliest created payment for a transaction id first.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbPaymentRepository {
    db: Arc<DB>,
}

fn missing_cf(name: &str) -> PaymentError {
    PaymentError::Persistence(format!("{name} column family not found").into())
}

fn index_prefix(transaction_id: &str) -> Vec<u8> {
    let mut key = transaction_id.as_bytes().to_vec();
    key.push(0);
    key
}

fn index_key(payment: &Payment) -> Vec<u8> {
    let mut key = index_prefix(&payment.transaction_id);
    // Flip the sign bit so negative timestamps still sort before positive ones.
    let micros = (payment.created_at.timestamp_micros() as u64) ^ (1 << 63);
    key.extend_from_slice(&micros.to_be_bytes());
    key.extend_from_slice(payment.id.as_bytes());
    key
}

impl RocksDbPaymentRepository {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "payments" and "transaction_index" column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let cf_index = ColumnFamilyDescriptor::new(CF_TRANSACTION_INDEX, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments, cf_index])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn payments_cf(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_PAYMENTS)
            .ok_or_else(|| missing_cf(CF_PAYMENTS))
    }

    fn index_cf(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_TRANSACTION_INDEX)
            .ok_or_else(|| missing_cf(CF_TRANSACTION_INDEX))
    }

    fn load(&self, id: Uuid) -> Result<Option<Payment>> {
        let cf = self.payments_cf()?;
        match self.db.get_cf(cf, id.as_bytes())? {
            Some(bytes) => {
                let payment = serde_json::from_slice(&bytes)
                    .map_err(|e| PaymentError::Persistence(Box::new(e)))?;
                Ok(Some(payment))
            }
            None => Ok(None),
        }
    }

    fn write(&self, payment: &Payment, previous: Option<&Payment>) -> Result<()> {
        let payments = self.payments_cf()?;
        let index = self.index_cf()?;
        let value = serde_json::to_vec(payment).map_err(|e| PaymentError::Persistence(Box::new(e)))?;

        let mut batch = WriteBatch::default();
        batch.put_cf(payments, payment.id.as_bytes(), value);
        if let Some(previous) = previous
            && previous.transaction_id != payment.transaction_id
        {
            batch.delete_cf(index, index_key(previous));
        }
        batch.put_cf(index, index_key(payment), payment.id.as_bytes());
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for RocksDbPaymentRepository {
    async fn create_payment(&self, payment: Payment) -> Result<Payment> {
        if self.load(payment.id)?.is_some() {
            return Err(PaymentError::Persistence(
                format!("duplicate payment id {}", payment.id).into(),
            ));
        }
        self.write(&payment, None)?;
        Ok(payment)
    }

    async fn get_payment_by_id(&self, id: Uuid) -> Result<Payment> {
        self.load(id)?.ok_or(PaymentError::PaymentNotFound)
    }

    async fn get_payment_by_transaction_id(&self, transaction_id: &str) -> Result<Payment> {
        let index = self.index_cf()?;
        let prefix = index_prefix(transaction_id);
        let mut iter = self
            .db
            .iterator_cf(index, IteratorMode::From(&prefix, Direction::Forward));

        if let Some(item) = iter.next() {
            let (key, value) = item?;
            if key.starts_with(&prefix) {
                let id = Uuid::from_slice(&value)
                    .map_err(|e| PaymentError::Persistence(Box::new(e)))?;
                return self.load(id)?.ok_or(PaymentError::PaymentNotFound);
            }
        }
        Err(PaymentError::PaymentNotFound)
    }

    async fn update_payment(&self, payment: Payment) -> Result<Payment> {
        let previous = self.load(payment.id)?.ok_or(PaymentError::PaymentNotFound)?;
        self.write(&payment, Some(&previous))?;
        Ok(payment)
    }
}
