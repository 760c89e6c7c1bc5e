use image::{
    DynamicImage, ImageEncoder, ImageFormat,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
};
use tracing::debug;

use super::WatermarkError;

/// Quality used for every JPEG the service produces
pub const JPEG_QUALITY: u8 = 95;

/// Image types accepted for upload. Output always mirrors the input type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type {
            "image/png" => Some(ImageKind::Png),
            "image/jpeg" => Some(ImageKind::Jpeg),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
        }
    }

    pub fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>, WatermarkError> {
        match self {
            ImageKind::Png => encode_png(image),
            ImageKind::Jpeg => encode_jpeg(image, JPEG_QUALITY),
        }
    }
}

/// Name of the processed file: the upload name with its extension replaced.
///
/// Only a final `.ext` with at least one character is stripped, so
/// `"plan.v2.jpeg"` becomes `"plan.v2.jpg"` and `"scan"` becomes `"scan.png"`.
pub fn output_file_name(name: &str, kind: ImageKind) -> String {
    let stem = match name.rfind('.') {
        Some(index) if index + 1 < name.len() => &name[..index],
        _ => name,
    };
    format!("{}.{}", stem, kind.extension())
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, WatermarkError> {
    let mut buffer = Vec::new();
    let encoder = PngEncoder::new(&mut buffer);
    image.write_with_encoder(encoder)?;
    debug!("PNG encoded: {} bytes", buffer.len());
    Ok(buffer)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, WatermarkError> {
    // JPEG doesn't support alpha channel, so convert to RGB
    let rgb_image = image.to_rgb8();
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder.write_image(
        &rgb_image,
        rgb_image.width(),
        rgb_image.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    debug!("JPEG encoded at quality {}: {} bytes", quality, buffer.len());
    Ok(buffer)
}
