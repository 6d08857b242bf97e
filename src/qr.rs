//! Renders a pass token as a scannable QR PNG.

use image::{GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::error::{Error, Result};

const MODULE_SIZE: u32 = 10;
/// Quiet-zone border, in modules.
const QUIET_ZONE: u32 = 4;

/// Encodes `data` as a QR code and returns PNG bytes.
pub fn encode_png(data: &str) -> Result<Vec<u8>> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|e| Error::QrEncode(e.to_string()))?;

    let width = code.width() as u32;
    let size = (width + 2 * QUIET_ZONE) * MODULE_SIZE;
    let mut img = GrayImage::from_pixel(size, size, Luma([255u8]));

    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color == Color::Dark {
            let x = (i as u32 % width + QUIET_ZONE) * MODULE_SIZE;
            let y = (i as u32 / width + QUIET_ZONE) * MODULE_SIZE;
            for dy in 0..MODULE_SIZE {
                for dx in 0..MODULE_SIZE {
                    img.put_pixel(x + dx, y + dy, Luma([0u8]));
                }
            }
        }
    }

    let mut bytes = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut bytes),
        image::ImageFormat::Png,
    )
    .map_err(|e| Error::QrEncode(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_png_produces_png() {
        let png = encode_png("E9LxJ7K2mQZ4vN8pR1sT6uW3yA5bC0dF_gH-iJkLmNo").unwrap();
        assert!(png.len() > 8);
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_encode_png_rejects_oversized_payload() {
        let huge = "x".repeat(8000);
        assert!(encode_png(&huge).is_err());
    }
}
