//! Persistence seam over the hosted certificate table.

use async_trait::async_trait;
use thiserror::Error;

use crate::certificate::model::{Certificate, CertificatePatch, NewCertificate};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not reach the certificate store: {0}")]
    Transport(String),
    #[error("certificate store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected response from the certificate store: {0}")]
    Decode(String),
}

/// Single-row operations on the `certificates` table. Each call is one
/// round trip; there is no batching or retry.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Inserts one row and returns it as stored, or `None` if the store
    /// acknowledged the write without returning a row.
    async fn insert(&self, row: &NewCertificate) -> Result<Option<Certificate>, StoreError>;

    async fn update(&self, id: i64, patch: &CertificatePatch) -> Result<(), StoreError>;

    async fn select_by_id(&self, id: i64) -> Result<Option<Certificate>, StoreError>;

    /// Exact match on the `rut` column.
    async fn select_by_rut(&self, rut: &str) -> Result<Vec<Certificate>, StoreError>;

    /// Every row, newest first.
    async fn select_all(&self) -> Result<Vec<Certificate>, StoreError>;
}
