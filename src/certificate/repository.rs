//! Certificate data operations used by the flows.
//!
//! Primary reads and the insert propagate their errors. URL attachment,
//! URL reconciliation and the paid-status update are best-effort and run
//! detached from the caller.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;

use super::background::spawn_best_effort;
use super::id::{parse_certificate_id, IdPolicy};
use super::model::{
    Certificate, CertificatePatch, CertificateUrls, CreateCertificateRequest, Estado,
    NewCertificate,
};
use super::validation::{normalize_rut, ValidationErrors};
use crate::db::CertificateStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Error al crear el certificado: {0}")]
    Creation(String),
    #[error("Error al buscar el certificado: {0}")]
    Fetch(String),
    #[error("{0}")]
    Validation(ValidationErrors),
}

/// Derives both verification links from the id.
pub fn canonical_urls(base_url: &str, id: i64) -> CertificateUrls {
    let base = base_url.trim_end_matches('/');
    CertificateUrls {
        qr_url: format!("{}/certificado/{}", base, id),
        view_url: format!("{}/ValidacionQr?id={}", base, id),
    }
}

#[derive(Clone)]
pub struct CertificateRepository {
    store: Arc<dyn CertificateStore>,
    base_url: String,
    default_sede: String,
}

impl CertificateRepository {
    pub fn new(
        store: Arc<dyn CertificateStore>,
        base_url: impl Into<String>,
        default_sede: impl Into<String>,
    ) -> Self {
        Self {
            store,
            base_url: base_url.into(),
            default_sede: default_sede.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_sede(&self) -> &str {
        &self.default_sede
    }

    pub fn urls_for(&self, id: i64) -> CertificateUrls {
        canonical_urls(&self.base_url, id)
    }

    /// Inserts a new `En Proceso` row. Name, career and the RUT check digit
    /// are stored upper-cased, matching what lookup searches for.
    pub async fn create(
        &self,
        request: &CreateCertificateRequest,
        policy: IdPolicy,
    ) -> Result<Certificate, RepositoryError> {
        request.validate().map_err(RepositoryError::Validation)?;

        let row = NewCertificate {
            id: policy.assign(),
            name: request.name.trim().to_uppercase(),
            rut: normalize_rut(&request.rut),
            career: request.career.trim().to_uppercase(),
            graduation_year: request.graduation_year,
            whatsapp: request
                .whatsapp
                .as_deref()
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(str::to_string),
            estado: Estado::EnProceso,
            created_at: Utc::now(),
            sede: self.default_sede.clone(),
        };

        match self.store.insert(&row).await {
            Ok(Some(created)) => {
                log::info!(
                    "Certificate {} created ({} id)",
                    created.id,
                    policy.label()
                );
                Ok(created)
            }
            Ok(None) => Err(RepositoryError::Creation(
                "No se recibió confirmación de la creación del certificado".to_string(),
            )),
            Err(e) => {
                log::error!("Certificate insert failed: {}", e);
                Err(RepositoryError::Creation(e.to_string()))
            }
        }
    }

    /// Writes the canonical links of `id` in the background.
    pub fn attach_urls(&self, id: i64) -> JoinHandle<()> {
        let store = self.store.clone();
        let patch = CertificatePatch::urls(&self.urls_for(id));
        spawn_best_effort("attach urls", id, async move {
            store.update(id, &patch).await
        })
    }

    /// Looks a certificate up by a raw id. A malformed id and a missing row
    /// are both `Ok(None)`. A found row is reconciled before returning.
    pub async fn get_by_id(&self, raw_id: &str) -> Result<Option<Certificate>, RepositoryError> {
        let Some(id) = parse_certificate_id(raw_id) else {
            log::info!("Certificate lookup with malformed id '{}'", raw_id);
            return Ok(None);
        };

        match self.store.select_by_id(id).await {
            Ok(Some(certificate)) => Ok(Some(self.reconcile_urls(certificate))),
            Ok(None) => {
                log::info!("Certificate {} not found", id);
                Ok(None)
            }
            Err(e) => {
                log::error!("Certificate {} fetch failed: {}", id, e);
                Err(RepositoryError::Fetch(e.to_string()))
            }
        }
    }

    /// Exact match on `rut`. The caller normalizes the value first.
    pub async fn find_by_rut(&self, rut: &str) -> Result<Vec<Certificate>, RepositoryError> {
        self.store.select_by_rut(rut).await.map_err(|e| {
            log::error!("Certificate search by RUT failed: {}", e);
            RepositoryError::Fetch(e.to_string())
        })
    }

    pub async fn list_all(&self) -> Result<Vec<Certificate>, RepositoryError> {
        self.store
            .select_all()
            .await
            .map_err(|e| RepositoryError::Fetch(e.to_string()))
    }

    pub fn mark_paid(&self, id: i64) -> JoinHandle<()> {
        let store = self.store.clone();
        spawn_best_effort("mark paid", id, async move {
            store.update(id, &CertificatePatch::estado(Estado::Pagado)).await
        })
    }

    /// Returns `certificate` with canonical links. When the stored links
    /// differ, one overwrite is dispatched in the background.
    pub fn reconcile_urls(&self, mut certificate: Certificate) -> Certificate {
        let expected = self.urls_for(certificate.id);
        let matches = certificate.qr_url.as_deref() == Some(expected.qr_url.as_str())
            && certificate.view_url.as_deref() == Some(expected.view_url.as_str());

        if !matches {
            log::info!("Reconciling verification links of certificate {}", certificate.id);
            let store = self.store.clone();
            let id = certificate.id;
            let patch = CertificatePatch::urls(&expected);
            spawn_best_effort("reconcile urls", id, async move {
                store.update(id, &patch).await
            });
            certificate.qr_url = Some(expected.qr_url);
            certificate.view_url = Some(expected.view_url);
        }

        certificate
    }
}
