//! Certificate document layout and export.
//!
//! The Typst template in `static/` holds the static layout; this module
//! prepends the data block with the certificate fields, loads every asset the
//! page references and hands the result to the engine.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use utoipa::ToSchema;

use super::common::{format_issue_date, format_today, px_to_pt, sanitize_filename, typst_str};
use super::engine::{Attachment, TypstRenderEngine};
use super::qr::VerificationCode;
use super::{GeneratedDocument, RenderError};
use crate::certificate::Certificate;
use crate::config::{Branding, RenderConfig};

const QR_FILENAME: &str = "qr.png";

/// Fixed page sizes, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PageLayout {
    /// Full certificate offered for download.
    #[default]
    Standard,
    /// Shorter summary card.
    Compact,
}

impl PageLayout {
    pub fn width_px(&self) -> u32 {
        794
    }

    pub fn height_px(&self) -> u32 {
        match self {
            PageLayout::Standard => 1150,
            PageLayout::Compact => 1050,
        }
    }
}

/// Everything the template needs, already formatted for print.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFields {
    pub id: String,
    pub name: String,
    pub rut: String,
    pub career: String,
    pub issued: String,
    pub today: String,
    pub sede: String,
}

impl DocumentFields {
    pub fn from_certificate(certificate: &Certificate, default_sede: &str) -> Self {
        Self {
            id: certificate.id.to_string(),
            name: certificate.name.clone(),
            rut: certificate.rut.clone(),
            career: certificate.career.clone(),
            issued: format_issue_date(certificate.fecha_certificado),
            today: format_today(),
            sede: certificate.sede_or(default_sede).to_string(),
        }
    }
}

pub struct CertificateDocumentRenderer {
    engine: TypstRenderEngine,
    template: String,
    branding: Branding,
    font_dir: Option<PathBuf>,
}

impl CertificateDocumentRenderer {
    pub fn new(render: &RenderConfig, branding: Branding) -> Result<Self, RenderError> {
        let template =
            std::fs::read_to_string(&render.template_path).map_err(RenderError::TemplateIo)?;
        Ok(Self::with_template(template, render, branding))
    }

    pub fn with_template(template: String, render: &RenderConfig, branding: Branding) -> Self {
        Self {
            engine: TypstRenderEngine::new(render.typst_bin.clone(), render.font_dir.clone()),
            template,
            branding,
            font_dir: render.font_dir.clone(),
        }
    }

    pub fn branding(&self) -> &Branding {
        &self.branding
    }

    /// Renders one certificate to PDF. Any asset that cannot be loaded aborts
    /// the export before the compiler runs.
    pub async fn render_document(
        &self,
        certificate: &Certificate,
        code: &VerificationCode,
        layout: PageLayout,
    ) -> Result<GeneratedDocument, RenderError> {
        let mut attachments = vec![Attachment {
            filename: QR_FILENAME.to_string(),
            bytes: code.png.clone(),
        }];
        let logo = self.load_assets(&mut attachments).await?;

        let fields = DocumentFields::from_certificate(certificate, &self.branding.default_sede);
        let source = self.build_source(&fields, layout, logo.as_deref());
        let pdf = self.engine.render(&source, &attachments).await?;

        log::info!(
            "Rendered certificate {} ({} bytes, {:?} layout)",
            certificate.id,
            pdf.len(),
            layout
        );

        Ok(GeneratedDocument {
            filename: document_filename(certificate.id),
            pdf,
        })
    }

    /// Reads the logo and checks the font directory. Returns the logo's
    /// filename inside the scratch directory.
    async fn load_assets(
        &self,
        attachments: &mut Vec<Attachment>,
    ) -> Result<Option<String>, RenderError> {
        if let Some(font_dir) = &self.font_dir {
            let metadata = tokio::fs::metadata(font_dir)
                .await
                .map_err(|source| RenderError::Asset {
                    path: font_dir.clone(),
                    source,
                })?;
            if !metadata.is_dir() {
                return Err(RenderError::Asset {
                    path: font_dir.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "font path is not a directory",
                    ),
                });
            }
        }

        let Some(logo_path) = &self.branding.logo_path else {
            return Ok(None);
        };
        let bytes = tokio::fs::read(logo_path)
            .await
            .map_err(|source| RenderError::Asset {
                path: logo_path.clone(),
                source,
            })?;
        let filename = format!("logo.{}", asset_extension(logo_path));
        attachments.push(Attachment {
            filename: filename.clone(),
            bytes,
        });
        Ok(Some(filename))
    }

    /// Data block followed by the layout template.
    pub fn build_source(
        &self,
        fields: &DocumentFields,
        layout: PageLayout,
        logo: Option<&str>,
    ) -> String {
        let header: String = self
            .branding
            .header_lines
            .iter()
            .map(|line| format!("{}, ", typst_str(line)))
            .collect();
        let logo = logo.map(typst_str).unwrap_or_else(|| "none".to_string());

        format!(
            r#"#let page-width = {:.2}pt
#let page-height = {:.2}pt
#let data = (
  id: {},
  name: {},
  rut: {},
  career: {},
  issued: {},
  today: {},
  sede: {},
  institution: {},
  title: {},
  city: {},
  header: ({}),
  logo: {},
  qr: {},
)

{}"#,
            px_to_pt(layout.width_px()),
            px_to_pt(layout.height_px()),
            typst_str(&fields.id),
            typst_str(&fields.name),
            typst_str(&fields.rut),
            typst_str(&fields.career),
            typst_str(&fields.issued),
            typst_str(&fields.today),
            typst_str(&fields.sede),
            typst_str(&self.branding.institution_name),
            typst_str(&self.branding.title),
            typst_str(&self.branding.city),
            header,
            logo,
            typst_str(QR_FILENAME),
            self.template,
        )
    }
}

pub fn document_filename(id: i64) -> String {
    format!("{}.pdf", sanitize_filename(&format!("certificado {}", id), "certificado"))
}

fn asset_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "png".to_string())
}
