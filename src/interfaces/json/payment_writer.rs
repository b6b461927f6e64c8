use crate::domain::api::PaymentView;
use crate::error::{PaymentError, Result};
use std::io::Write;

/// Writes payment views as JSON lines.
pub struct PaymentWriter<W: Write> {
    writer: W,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_payments<I>(&mut self, payments: I) -> Result<()>
    where
        I: IntoIterator<Item = PaymentView>,
    {
        for payment in payments {
            serde_json::to_writer(&mut self.writer, &payment)
                .map_err(|e| PaymentError::IoError(e.into()))?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
