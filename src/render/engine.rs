//! Typst rendering engine.
//!
//! Writes the Typst source and its attachments into a scratch directory,
//! runs the compiler there and reads the PDF back. The scratch directory is
//! removed when the render finishes, successful or not.

use std::path::{Path, PathBuf};

use tempfile::{tempdir, TempDir};
use tokio::fs;
use tokio::process::Command;

use super::RenderError;

const SOURCE_FILENAME: &str = "certificado.typ";
const OUTPUT_FILENAME: &str = "certificado.pdf";

/// A file the Typst source refers to by name.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct TypstRenderEngine {
    typst_bin: String,
    font_dir: Option<PathBuf>,
}

impl TypstRenderEngine {
    pub fn new(typst_bin: impl Into<String>, font_dir: Option<PathBuf>) -> Self {
        Self {
            typst_bin: typst_bin.into(),
            font_dir,
        }
    }

    /// Compile `source` to PDF bytes. Every attachment is written before the
    /// compiler starts.
    pub async fn render(
        &self,
        source: &str,
        attachments: &[Attachment],
    ) -> Result<Vec<u8>, RenderError> {
        let temp_dir = tempdir().map_err(RenderError::TempDir)?;

        fs::write(temp_dir.path().join(SOURCE_FILENAME), source)
            .await
            .map_err(RenderError::WriteTypst)?;
        for attachment in attachments {
            fs::write(temp_dir.path().join(&attachment.filename), &attachment.bytes)
                .await
                .map_err(RenderError::WriteTypst)?;
        }

        let pdf = self.compile(&temp_dir).await?;
        verify_pdf(&pdf)?;
        Ok(pdf)
    }

    async fn compile(&self, temp_dir: &TempDir) -> Result<Vec<u8>, RenderError> {
        let source_path = temp_dir.path().join(SOURCE_FILENAME);
        let output_path = temp_dir.path().join(OUTPUT_FILENAME);

        let mut command = Command::new(&self.typst_bin);
        command.arg("compile");
        if let Some(font_dir) = &self.font_dir {
            command.arg("--font-path").arg(font_dir);
        }
        command
            .arg(&source_path)
            .arg(&output_path)
            .current_dir(temp_dir.path());

        let output = command.output().await.map_err(RenderError::TypstIo)?;
        if !output.status.success() {
            return Err(RenderError::TypstExit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        read_pdf(&output_path).await
    }
}

async fn read_pdf(path: &Path) -> Result<Vec<u8>, RenderError> {
    fs::read(path).await.map_err(RenderError::ReadPdf)
}

/// Rejects empty or truncated output so a partial file is never offered.
pub fn verify_pdf(bytes: &[u8]) -> Result<(), RenderError> {
    let has_header = bytes.starts_with(b"%PDF-");
    let tail_start = bytes.len().saturating_sub(1024);
    let has_trailer = bytes[tail_start..]
        .windows(5)
        .any(|window| window == b"%%EOF");

    if has_header && has_trailer {
        Ok(())
    } else {
        Err(RenderError::CorruptOutput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_pdf_accepts_complete_file() {
        assert!(verify_pdf(b"%PDF-1.7\n1 0 obj\nendobj\n%%EOF\n").is_ok());
    }

    #[test]
    fn test_verify_pdf_rejects_partial_file() {
        assert!(matches!(verify_pdf(b""), Err(RenderError::CorruptOutput)));
        assert!(matches!(
            verify_pdf(b"%PDF-1.7\n1 0 obj\n"),
            Err(RenderError::CorruptOutput)
        ));
        assert!(matches!(
            verify_pdf(b"<html>%%EOF"),
            Err(RenderError::CorruptOutput)
        ));
    }

    #[tokio::test]
    async fn test_missing_compiler_is_reported() {
        let engine = TypstRenderEngine::new("typst-binary-that-does-not-exist", None);
        let result = engine.render("Hola", &[]).await;
        assert!(matches!(result, Err(RenderError::TypstIo(_))));
    }
}
