use base64::Engine;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;

use crate::utils::error::{AppError, AppResult};

const QR_MIN_DIMENSION: u32 = 400;

/// PNG QR code for `url`, black on white, returned as a `data:` URL.
pub fn generate_qr_data_url(url: &str) -> AppResult<String> {
    let png = generate_qr_png(url)?;
    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    ))
}

pub fn generate_qr_png(url: &str) -> AppResult<Vec<u8>> {
    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::M)
        .map_err(|e| AppError::Internal(format!("Failed to encode QR code: {}", e)))?;

    let image = code
        .render::<Luma<u8>>()
        .dark_color(Luma([0u8]))
        .light_color(Luma([255u8]))
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| AppError::Internal(format!("Failed to render QR code: {}", e)))?;

    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_png_data_url() {
        let url = generate_qr_data_url("https://example.test/share/abcdefghijkl").unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        let encoded = url.trim_start_matches("data:image/png;base64,");
        let png = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&png).unwrap();
        assert!(decoded.width() >= QR_MIN_DIMENSION);
        assert!(decoded.height() >= QR_MIN_DIMENSION);
    }

    #[test]
    fn oversized_payload_is_an_error() {
        let huge = "x".repeat(10_000);
        assert!(generate_qr_png(&huge).is_err());
    }
}
