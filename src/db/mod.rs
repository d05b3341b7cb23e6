//! Application state and the certificate store.
//!
//! - `store` - the `CertificateStore` seam and its error type
//! - `supabase` - production store over the hosted PostgREST endpoint

mod store;
mod supabase;

pub use store::{CertificateStore, StoreError};
pub use supabase::{parse_rows, SupabaseStore};

use std::sync::Arc;

use crate::certificate::CertificateRepository;
use crate::config::AppConfig;
use crate::render::CertificateDocumentRenderer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: CertificateRepository,
    pub renderer: Arc<CertificateDocumentRenderer>,
}

impl AppState {
    /// Builds the production state: one store handle shared by every request.
    pub async fn new_with_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = SupabaseStore::new(&config);
        match store.ping().await {
            Ok(()) => log::info!("Certificate store reachable at {}", config.rest_endpoint()),
            Err(e) => log::warn!("Certificate store not reachable yet: {}", e),
        }

        Self::new_with_store(config, Arc::new(store))
    }

    pub fn new_with_store(
        config: AppConfig,
        store: Arc<dyn CertificateStore>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let renderer = CertificateDocumentRenderer::new(&config.render, config.branding.clone())?;
        Ok(Self::from_parts(config, store, renderer))
    }

    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn CertificateStore>,
        renderer: CertificateDocumentRenderer,
    ) -> Self {
        let repository = CertificateRepository::new(
            store,
            config.base_url.clone(),
            config.branding.default_sede.clone(),
        );

        Self {
            config: Arc::new(config),
            repository,
            renderer: Arc::new(renderer),
        }
    }
}
