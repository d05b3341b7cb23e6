#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use certificados_server::certificate::model::{
    Certificate, CertificatePatch, CreateCertificateRequest, Estado, NewCertificate,
};
use certificados_server::certificate::CertificateRepository;
use certificados_server::config::{AppConfig, Branding, RenderConfig};
use certificados_server::db::{AppState, CertificateStore, StoreError};
use certificados_server::render::CertificateDocumentRenderer;
use chrono::{NaiveDate, TimeZone, Utc};
use tokio::sync::Mutex;

pub const BASE_URL: &str = "https://certificados.example.cl";
pub const DEFAULT_SEDE: &str = "SEDE CENTRAL";

/// In-memory `certificates` table with failure switches and call counters.
pub struct InMemoryStore {
    rows: Mutex<HashMap<i64, Certificate>>,
    next_id: AtomicI64,
    insert_calls: AtomicUsize,
    update_calls: AtomicUsize,
    select_calls: AtomicUsize,
    fail_inserts: AtomicBool,
    fail_updates: AtomicBool,
    fail_selects: AtomicBool,
    silent_inserts: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            insert_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            select_calls: AtomicUsize::new(0),
            fail_inserts: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
            fail_selects: AtomicBool::new(false),
            silent_inserts: AtomicBool::new(false),
        }
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    pub fn fail_selects(&self) {
        self.fail_selects.store(true, Ordering::SeqCst);
    }

    /// Inserts succeed without returning the stored row.
    pub fn silent_inserts(&self) {
        self.silent_inserts.store(true, Ordering::SeqCst);
    }

    pub async fn put(&self, certificate: Certificate) {
        self.rows.lock().await.insert(certificate.id, certificate);
    }

    pub async fn get(&self, id: i64) -> Option<Certificate> {
        self.rows.lock().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    /// Polls until at least `count` updates were attempted. Best-effort
    /// writes run detached, so tests wait for them here.
    pub async fn wait_for_updates(&self, count: usize) -> bool {
        for _ in 0..200 {
            if self.update_calls() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn check(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CertificateStore for InMemoryStore {
    async fn insert(&self, row: &NewCertificate) -> Result<Option<Certificate>, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected {
                status: 409,
                message: "duplicate key value violates unique constraint".to_string(),
            });
        }

        let id = row
            .id
            .unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&id) {
            return Err(StoreError::Rejected {
                status: 409,
                message: "duplicate key value violates unique constraint".to_string(),
            });
        }

        let stored = Certificate {
            id,
            name: row.name.clone(),
            rut: row.rut.clone(),
            career: row.career.clone(),
            graduation_year: row.graduation_year,
            whatsapp: row.whatsapp.clone(),
            estado: row.estado,
            created_at: Some(row.created_at),
            fecha_certificado: Some(row.created_at.date_naive()),
            qr_url: None,
            view_url: None,
            sede: Some(row.sede.clone()),
        };
        rows.insert(id, stored.clone());

        if self.silent_inserts.load(Ordering::SeqCst) {
            Ok(None)
        } else {
            Ok(Some(stored))
        }
    }

    async fn update(&self, id: i64, patch: &CertificatePatch) -> Result<(), StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_updates)?;

        let mut rows = self.rows.lock().await;
        if let Some(row) = rows.get_mut(&id) {
            if let Some(qr_url) = &patch.qr_url {
                row.qr_url = Some(qr_url.clone());
            }
            if let Some(view_url) = &patch.view_url {
                row.view_url = Some(view_url.clone());
            }
            if let Some(estado) = patch.estado {
                row.estado = estado;
            }
        }
        Ok(())
    }

    async fn select_by_id(&self, id: i64) -> Result<Option<Certificate>, StoreError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_selects)?;
        Ok(self.rows.lock().await.get(&id).cloned())
    }

    async fn select_by_rut(&self, rut: &str) -> Result<Vec<Certificate>, StoreError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_selects)?;
        let rows = self.rows.lock().await;
        let mut matches: Vec<Certificate> =
            rows.values().filter(|c| c.rut == rut).cloned().collect();
        matches.sort_by_key(|c| c.id);
        Ok(matches)
    }

    async fn select_all(&self) -> Result<Vec<Certificate>, StoreError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_selects)?;
        let rows = self.rows.lock().await;
        let mut all: Vec<Certificate> = rows.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

pub fn certificate(id: i64, rut: &str) -> Certificate {
    Certificate {
        id,
        name: "ANA DIAZ".to_string(),
        rut: rut.to_string(),
        career: "INGENIERÍA EN INFORMÁTICA".to_string(),
        graduation_year: 2023,
        whatsapp: None,
        estado: Estado::EnProceso,
        created_at: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).single(),
        fecha_certificado: NaiveDate::from_ymd_opt(2024, 3, 15),
        qr_url: None,
        view_url: None,
        sede: None,
    }
}

pub fn request() -> CreateCertificateRequest {
    CreateCertificateRequest {
        name: "Ana Diaz".to_string(),
        rut: "17616251-1".to_string(),
        career: "Ingeniería en Informática".to_string(),
        graduation_year: 2023,
        whatsapp: Some("+56912345678".to_string()),
    }
}

pub fn repository(store: Arc<InMemoryStore>) -> CertificateRepository {
    CertificateRepository::new(store, BASE_URL, DEFAULT_SEDE)
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::new("http://localhost:54321", "test-anon-key");
    config.base_url = BASE_URL.to_string();
    config
}

/// Renderer whose compiler binary does not exist, so every export fails at
/// the compile step.
pub fn failing_renderer(config: &AppConfig) -> CertificateDocumentRenderer {
    let render = RenderConfig {
        typst_bin: "typst-binary-that-does-not-exist".to_string(),
        ..config.render.clone()
    };
    CertificateDocumentRenderer::with_template("#data.name".to_string(), &render, Branding::default())
}

pub fn app_state(store: Arc<InMemoryStore>) -> AppState {
    let config = test_config();
    let renderer = failing_renderer(&config);
    AppState::from_parts(config, store, renderer)
}
