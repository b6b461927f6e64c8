use crate::domain::api::{PaymentRequest, RefundRequest};
use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};

/// One API call, tagged by `op`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ApiRequest {
    Create(PaymentRequest),
    Refund(RefundRequest),
}

/// Reads API requests from a JSON-lines source.
///
/// Blank lines are skipped. A line that does not decode yields an error item
/// and reading carries on with the next line.
pub struct RequestReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    /// Returns an iterator that lazily reads and decodes requests, line by line.
    pub fn requests(self) -> impl Iterator<Item = Result<ApiRequest>> {
        self.reader
            .lines()
            .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
            .map(|line| {
                let line = line?;
                serde_json::from_str(&line).map_err(|e| {
                    PaymentError::ValidationError(format!("malformed request: {e}"))
                })
            })
    }
}
