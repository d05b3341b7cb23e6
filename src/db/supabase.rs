//! `CertificateStore` backed by the hosted PostgREST endpoint.

use async_trait::async_trait;
use postgrest::Postgrest;

use super::store::{CertificateStore, StoreError};
use crate::certificate::model::{Certificate, CertificatePatch, NewCertificate};
use crate::config::AppConfig;

pub struct SupabaseStore {
    client: Postgrest,
    table: String,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        let client = Postgrest::new(config.rest_endpoint())
            .insert_header("apikey", config.supabase_key.as_str())
            .insert_header("Authorization", format!("Bearer {}", config.supabase_key));

        Self {
            client,
            table: config.table.clone(),
        }
    }

    /// Cheap read used at startup to log whether the store is reachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.execute(self.client.from(&self.table).select("id").limit(1))
            .await
            .map(|_| ())
    }

    async fn execute(&self, builder: postgrest::Builder) -> Result<String, StoreError> {
        let response = builder.execute().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }

    async fn fetch_rows(&self, builder: postgrest::Builder) -> Result<Vec<Certificate>, StoreError> {
        let body = self.execute(builder).await?;
        parse_rows(&body)
    }
}

fn transport<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Transport(err.to_string())
}

/// PostgREST returns arrays for every read and for `return=representation`
/// writes.
pub fn parse_rows(body: &str) -> Result<Vec<Certificate>, StoreError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(body).map_err(|e| StoreError::Decode(e.to_string()))
}

#[async_trait]
impl CertificateStore for SupabaseStore {
    async fn insert(&self, row: &NewCertificate) -> Result<Option<Certificate>, StoreError> {
        let payload =
            serde_json::to_string(&[row]).map_err(|e| StoreError::Decode(e.to_string()))?;
        let rows = self
            .fetch_rows(self.client.from(&self.table).insert(payload))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn update(&self, id: i64, patch: &CertificatePatch) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(patch).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.execute(
            self.client
                .from(&self.table)
                .eq("id", id.to_string())
                .update(payload),
        )
        .await
        .map(|_| ())
    }

    async fn select_by_id(&self, id: i64) -> Result<Option<Certificate>, StoreError> {
        let rows = self
            .fetch_rows(
                self.client
                    .from(&self.table)
                    .select("*")
                    .eq("id", id.to_string())
                    .limit(1),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn select_by_rut(&self, rut: &str) -> Result<Vec<Certificate>, StoreError> {
        self.fetch_rows(self.client.from(&self.table).select("*").eq("rut", rut))
            .await
    }

    async fn select_all(&self) -> Result<Vec<Certificate>, StoreError> {
        self.fetch_rows(
            self.client
                .from(&self.table)
                .select("*")
                .order("created_at.desc"),
        )
        .await
    }
}
