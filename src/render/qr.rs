//! Verification code rendering.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::Luma;
use qrcode::QrCode;
use serde::Serialize;
use utoipa::ToSchema;

use super::RenderError;

/// Size used on the certificate page.
pub const DEFAULT_CODE_SIZE_PX: u32 = 120;
pub const MAX_CODE_SIZE_PX: u32 = 1024;

/// PNG-encoded verification code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct VerificationCode {
    pub url: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub png: Vec<u8>,
}

impl VerificationCode {
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Encodes `url` as a QR code at least `size_px` wide, with no quiet zone.
/// Used where the surrounding page supplies the white margin.
/// The same input always produces the same bytes.
pub fn render_code(url: &str, size_px: u32) -> Result<VerificationCode, RenderError> {
    encode(url, size_px, false)
}

/// Same as [`render_code`] with the four-module quiet zone scanners need
/// when the image is shown on its own.
pub fn render_standalone_code(url: &str, size_px: u32) -> Result<VerificationCode, RenderError> {
    encode(url, size_px, true)
}

fn encode(url: &str, size_px: u32, quiet_zone: bool) -> Result<VerificationCode, RenderError> {
    let size = size_px.clamp(1, MAX_CODE_SIZE_PX);
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| RenderError::Code(format!("failed to create QR code: {e}")))?;

    let image = code
        .render::<Luma<u8>>()
        .quiet_zone(quiet_zone)
        .min_dimensions(size, size)
        .build();

    let mut png: Vec<u8> = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png);
    image::ImageEncoder::write_image(
        encoder,
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::L8,
    )
    .map_err(|e| RenderError::Code(format!("failed to encode QR code PNG: {e}")))?;

    Ok(VerificationCode {
        url: url.to_string(),
        width: image.width(),
        height: image.height(),
        png,
    })
}
