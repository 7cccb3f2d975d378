use image::{imageops, imageops::FilterType, ImageEncoder, Rgba, RgbaImage};

use crate::models::errors::AppError;
use crate::models::transform::{Effect, ResizeMode, TransformChain, Transformation, MAX_DIMENSION};

const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 0, 255]);
const TEXT_OFFSET_Y: u32 = 20;
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// Renders transformation chains onto decoded images. CPU bound, call it
/// from the blocking pool.
pub struct ImageTransformer;

impl ImageTransformer {
    /// Decodes `data`, applies `chain` and encodes the result as PNG
    pub fn render(data: &[u8], chain: &TransformChain) -> Result<Vec<u8>, AppError> {
        let image = image::load_from_memory(data)
            .map_err(|e| AppError::image_processing_failed(format!("Failed to decode image: {}", e)))?
            .to_rgba8();

        let output = Self::apply(image, chain)?;
        encode_png(&output)
    }

    /// Fails with `BadRequest` when a step would grow the image past
    /// `MAX_DIMENSION` on either side
    pub fn apply(image: RgbaImage, chain: &TransformChain) -> Result<RgbaImage, AppError> {
        chain
            .steps()
            .iter()
            .try_fold(image, |image, step| Self::apply_step(image, step))
    }

    fn apply_step(image: RgbaImage, step: &Transformation) -> Result<RgbaImage, AppError> {
        let output = match step {
            // No face detection here: thumbnails use centre gravity
            Transformation::Thumb { width, height }
            | Transformation::Fill { width, height }
            | Transformation::Resize {
                mode: ResizeMode::Fill,
                width,
                height,
            } => fill(image, *width, *height),
            Transformation::Resize {
                mode: ResizeMode::Crop,
                width,
                height,
            } => center_crop(&image, *width, *height),
            Transformation::RoundMax => round_max(image),
            Transformation::Effect(effect) => apply_effect(image, *effect),
            Transformation::Text { size, text } => {
                let mut image = image;
                draw_caption(&mut image, text, *size);
                image
            }
            Transformation::Scale { width } => scale_to_width(&image, *width)?,
            Transformation::FlipVertical => imageops::flip_vertical(&image),
            Transformation::Rotate { degrees } => rotate(&image, *degrees)?,
        };
        Ok(output)
    }
}

/// Shrinking is always allowed; growing only up to `MAX_DIMENSION` a side.
/// Checked before the target buffer is allocated.
fn ensure_fits(from: (u32, u32), to: (u32, u32)) -> Result<(), AppError> {
    let grows = u64::from(to.0) * u64::from(to.1) > u64::from(from.0) * u64::from(from.1);
    if grows && (to.0 > MAX_DIMENSION || to.1 > MAX_DIMENSION) {
        return Err(AppError::bad_request(format!(
            "Transformation result {}x{} exceeds {}px",
            to.0, to.1, MAX_DIMENSION
        )));
    }
    Ok(())
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, AppError> {
    use image::codecs::png::PngEncoder;

    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| AppError::image_processing_failed(format!("PNG encoding failed: {}", e)))?;

    Ok(buffer)
}

/// Crops the largest centred region with the target aspect ratio, then resizes
/// it, so no intermediate buffer is larger than the source or the target
fn fill(image: RgbaImage, width: u32, height: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let (target_w, target_h) = (u64::from(width), u64::from(height));

    let (crop_w, crop_h) = if u64::from(w) * target_h > u64::from(h) * target_w {
        (((u64::from(h) * target_w) / target_h).max(1) as u32, h)
    } else {
        (w, ((u64::from(w) * target_h) / target_w).max(1) as u32)
    };

    let region =
        imageops::crop_imm(&image, (w - crop_w) / 2, (h - crop_h) / 2, crop_w, crop_h).to_image();
    imageops::resize(&region, width, height, FilterType::Triangle)
}

fn center_crop(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let width = width.min(image.width());
    let height = height.min(image.height());
    let x = (image.width() - width) / 2;
    let y = (image.height() - height) / 2;
    imageops::crop_imm(image, x, y, width, height).to_image()
}

fn scale_to_width(image: &RgbaImage, width: u32) -> Result<RgbaImage, AppError> {
    let ratio = width as f64 / image.width().max(1) as f64;
    let height = (image.height() as f64 * ratio).round().clamp(1.0, u32::MAX as f64) as u32;
    ensure_fits(image.dimensions(), (width, height))?;
    Ok(imageops::resize(image, width, height, FilterType::Triangle))
}

/// Clears everything outside the inscribed ellipse
fn round_max(mut image: RgbaImage) -> RgbaImage {
    let rx = image.width() as f32 / 2.0;
    let ry = image.height() as f32 / 2.0;

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = (x as f32 + 0.5 - rx) / rx;
        let dy = (y as f32 + 0.5 - ry) / ry;
        if dx * dx + dy * dy > 1.0 {
            pixel.0[3] = 0;
        }
    }

    image
}

fn apply_effect(image: RgbaImage, effect: Effect) -> RgbaImage {
    match effect {
        Effect::ArtAudrey => {
            let mut warm = image;
            for pixel in warm.pixels_mut() {
                let [r, g, b, a] = pixel.0;
                *pixel = Rgba([
                    clamp(r as f32 * 1.1 + 10.0),
                    clamp(g as f32 * 1.02),
                    clamp(b as f32 * 0.85),
                    a,
                ]);
            }
            imageops::contrast(&warm, 20.0)
        }
        Effect::ArtZorro => {
            let mut grey = image;
            for pixel in grey.pixels_mut() {
                let [r, g, b, a] = pixel.0;
                let luma = clamp(0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32);
                *pixel = Rgba([luma, luma, luma, a]);
            }
            imageops::contrast(&grey, 60.0)
        }
        Effect::Blur(strength) => imageops::blur(&image, strength as f32 / 50.0),
        Effect::Cartoonify => {
            let mut flat = imageops::blur(&image, 1.0);
            for pixel in flat.pixels_mut() {
                let [r, g, b, a] = pixel.0;
                *pixel = Rgba([posterize(r), posterize(g), posterize(b), a]);
            }
            imageops::contrast(&flat, 25.0)
        }
    }
}

fn posterize(channel: u8) -> u8 {
    const STEP: u8 = 64;
    (channel / STEP) * STEP + STEP / 2
}

fn clamp(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Clockwise rotation on a canvas large enough for the rotated image;
/// uncovered corners stay transparent
fn rotate(image: &RgbaImage, degrees: i32) -> Result<RgbaImage, AppError> {
    match degrees.rem_euclid(360) {
        0 => return Ok(image.clone()),
        90 => return Ok(imageops::rotate90(image)),
        180 => return Ok(imageops::rotate180(image)),
        270 => return Ok(imageops::rotate270(image)),
        _ => {}
    }

    let theta = (degrees as f64).to_radians();
    let (sin, cos) = theta.sin_cos();
    let (w, h) = (image.width() as f64, image.height() as f64);

    let out_w = (w * cos.abs() + h * sin.abs()).ceil().max(1.0) as u32;
    let out_h = (w * sin.abs() + h * cos.abs()).ceil().max(1.0) as u32;
    ensure_fits(image.dimensions(), (out_w, out_h))?;
    let mut output = RgbaImage::from_pixel(out_w, out_h, Rgba([0, 0, 0, 0]));

    let (cx, cy) = (w / 2.0, h / 2.0);
    let (ocx, ocy) = (out_w as f64 / 2.0, out_h as f64 / 2.0);

    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let dx = x as f64 + 0.5 - ocx;
        let dy = y as f64 + 0.5 - ocy;
        let sx = dx * cos + dy * sin + cx;
        let sy = -dx * sin + dy * cos + cy;

        if sx >= 0.0 && sy >= 0.0 && sx < w && sy < h {
            *pixel = *image.get_pixel(sx as u32, sy as u32);
        }
    }

    Ok(output)
}

/// Draws `text` centred horizontally, its bottom edge 20px above the image bottom
fn draw_caption(image: &mut RgbaImage, text: &str, font_size: u32) {
    let scale = ((font_size as f32 / GLYPH_HEIGHT as f32).round() as u32).max(1);
    let advance = (GLYPH_WIDTH + 1) * scale;
    let count = text.chars().count() as u32;
    let text_width = (count * advance).saturating_sub(scale);
    let text_height = GLYPH_HEIGHT * scale;

    let origin_x = (image.width() as i64 - text_width as i64) / 2;
    let origin_y = image.height() as i64 - TEXT_OFFSET_Y as i64 - text_height as i64;

    for (i, ch) in text.chars().enumerate() {
        let rows = glyph(ch);
        let glyph_x = origin_x + i as i64 * advance as i64;

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let x0 = glyph_x + (col * scale) as i64;
                let y0 = origin_y + (row as u32 * scale) as i64;
                fill_rect(image, x0, y0, scale, TEXT_COLOR);
            }
        }
    }
}

fn fill_rect(image: &mut RgbaImage, x0: i64, y0: i64, size: u32, color: Rgba<u8>) {
    for y in y0..y0 + size as i64 {
        for x in x0..x0 + size as i64 {
            if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// 5x7 bitmap glyphs, one byte per row, leftmost pixel in bit 4
fn glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        _ => [0x00; 7],
    }
}
