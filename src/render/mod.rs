//! Verification code and certificate document rendering.
//!
//! - `qr` - verification code PNGs
//! - `common` - date formatting and Typst string helpers
//! - `engine` - Typst compilation in a scratch directory
//! - `document` - certificate layout and export

pub mod common;
pub mod document;
pub mod engine;
pub mod qr;

pub use document::{CertificateDocumentRenderer, PageLayout};
pub use qr::{render_code, render_standalone_code, VerificationCode};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load asset {path}: {source}")]
    Asset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build verification code: {0}")]
    Code(String),
    #[error("failed to load Typst template: {0}")]
    TemplateIo(#[source] std::io::Error),
    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] std::io::Error),
    #[error("failed to write Typst sources: {0}")]
    WriteTypst(#[source] std::io::Error),
    #[error("Typst CLI execution failed: {0}")]
    TypstIo(#[source] std::io::Error),
    #[error("Typst CLI exited with status {code}: {stderr}")]
    TypstExit { code: i32, stderr: String },
    #[error("failed to read generated PDF: {0}")]
    ReadPdf(#[source] std::io::Error),
    #[error("generated PDF is incomplete")]
    CorruptOutput,
}

/// A finished export, ready to hand to the user.
#[derive(Debug)]
pub struct GeneratedDocument {
    pub filename: String,
    pub pdf: Vec<u8>,
}
