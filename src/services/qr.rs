use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageOutputFormat, Luma};
use qrcode::QrCode;
use std::io::Cursor;

use crate::models::errors::AppError;

const MODULE_PIXELS: u32 = 6;

/// PNG bytes of a QR code encoding `content`
pub fn qr_png(content: &str) -> Result<Vec<u8>, AppError> {
    let code = QrCode::new(content.as_bytes())
        .map_err(|e| AppError::image_processing_failed(format!("QR encoding failed: {}", e)))?;

    let image = code
        .render::<Luma<u8>>()
        .module_dimensions(MODULE_PIXELS, MODULE_PIXELS)
        .build();

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image)
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .map_err(|e| AppError::image_processing_failed(format!("PNG encoding failed: {}", e)))?;

    Ok(buffer.into_inner())
}

pub fn qr_png_base64(content: &str) -> Result<String, AppError> {
    qr_png(content).map(|png| STANDARD.encode(png))
}
