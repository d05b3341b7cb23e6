use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Payment state of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
pub enum Estado {
    #[default]
    #[serde(rename = "En Proceso")]
    EnProceso,
    #[serde(rename = "Pagado")]
    Pagado,
}

impl Estado {
    pub fn as_str(&self) -> &'static str {
        match self {
            Estado::EnProceso => "En Proceso",
            Estado::Pagado => "Pagado",
        }
    }
}

/// Row of the `certificates` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Certificate {
    #[schema(example = 4821937465_i64)]
    pub id: i64,
    #[schema(example = "ANA DIAZ")]
    pub name: String,
    #[schema(example = "17616251-1")]
    pub rut: String,
    #[schema(example = "INGENIERÍA EN INFORMÁTICA")]
    pub career: String,
    #[schema(example = 2023)]
    pub graduation_year: i32,
    #[serde(default)]
    #[schema(example = "+56912345678")]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub estado: Estado,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fecha_certificado: Option<NaiveDate>,
    #[serde(default)]
    pub qr_url: Option<String>,
    #[serde(default)]
    pub view_url: Option<String>,
    #[serde(default)]
    pub sede: Option<String>,
}

impl Certificate {
    pub fn sede_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.sede
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(fallback)
    }
}

/// Canonical verification links of one certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CertificateUrls {
    #[schema(example = "https://certificados.example.cl/certificado/4821937465")]
    pub qr_url: String,
    #[schema(example = "https://certificados.example.cl/ValidacionQr?id=4821937465")]
    pub view_url: String,
}

/// Insert payload. `id` is omitted when the store assigns it.
#[derive(Debug, Clone, Serialize)]
pub struct NewCertificate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub rut: String,
    pub career: String,
    pub graduation_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    pub estado: Estado,
    pub created_at: DateTime<Utc>,
    pub sede: String,
}

/// Partial update; unset fields are left untouched in the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CertificatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<Estado>,
}

impl CertificatePatch {
    pub fn urls(urls: &CertificateUrls) -> Self {
        Self {
            qr_url: Some(urls.qr_url.clone()),
            view_url: Some(urls.view_url.clone()),
            estado: None,
        }
    }

    pub fn estado(estado: Estado) -> Self {
        Self {
            estado: Some(estado),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateCertificateRequest {
    #[schema(example = "Ana Diaz")]
    pub name: String,
    #[schema(example = "17616251-1")]
    pub rut: String,
    #[schema(example = "Ingeniería")]
    pub career: String,
    #[schema(example = 2023)]
    pub graduation_year: i32,
    #[serde(default)]
    #[schema(example = "+56912345678")]
    pub whatsapp: Option<String>,
}

/// Returned to the submitter after a successful creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CertificateLinks {
    pub certificate_id: i64,
    pub qr_url: String,
    pub view_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estado_serializes_as_display_label() {
        assert_eq!(
            serde_json::to_string(&Estado::EnProceso).unwrap(),
            "\"En Proceso\""
        );
        let estado: Estado = serde_json::from_str("\"Pagado\"").unwrap();
        assert_eq!(estado, Estado::Pagado);
        assert_eq!(estado.as_str(), "Pagado");
    }

    #[test]
    fn test_certificate_row_with_nulls_deserializes() {
        let json = r#"{
            "id": 1234567890,
            "name": "ANA DIAZ",
            "rut": "17616251-1",
            "career": "INGENIERÍA",
            "graduation_year": 2023,
            "whatsapp": null,
            "estado": "En Proceso",
            "created_at": "2024-03-15T12:30:00.123456+00:00",
            "fecha_certificado": "2024-03-15",
            "qr_url": null,
            "view_url": null,
            "sede": null
        }"#;

        let cert: Certificate = serde_json::from_str(json).unwrap();
        assert_eq!(cert.id, 1234567890);
        assert_eq!(cert.estado, Estado::EnProceso);
        assert_eq!(
            cert.fecha_certificado,
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert!(cert.created_at.is_some());
        assert_eq!(cert.sede_or("SEDE CENTRAL"), "SEDE CENTRAL");
    }

    #[test]
    fn test_new_certificate_omits_missing_id() {
        let row = NewCertificate {
            id: None,
            name: "ANA DIAZ".to_string(),
            rut: "17616251-1".to_string(),
            career: "INGENIERÍA".to_string(),
            graduation_year: 2023,
            whatsapp: None,
            estado: Estado::EnProceso,
            created_at: Utc::now(),
            sede: "SEDE CENTRAL".to_string(),
        };

        let value = serde_json::to_value(&row).unwrap();
        assert!(value.get("id").is_none());
        assert!(value.get("whatsapp").is_none());
        assert_eq!(value["estado"], "En Proceso");
    }

    #[test]
    fn test_patch_only_serializes_set_fields() {
        let value = serde_json::to_value(CertificatePatch::estado(Estado::Pagado)).unwrap();
        assert_eq!(value, serde_json::json!({ "estado": "Pagado" }));
    }
}
