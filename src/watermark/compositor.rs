use image::{DynamicImage, ImageBuffer, ImageReader, RgbaImage};
use resvg::tiny_skia;
use std::{io::Cursor, path::Path, sync::Arc};
use tracing::{debug, info, warn};
use usvg::fontdb::{Database, Family, Query};

use super::{ImageKind, WatermarkError, overlay::render_overlay};
use crate::WatermarkConfig;

/// Rasterizes watermark overlays and composites them onto uploaded images.
///
/// The font database is built once at startup and shared by every request.
#[derive(Clone)]
pub struct Compositor {
    fontdb: Arc<Database>,
}

impl Compositor {
    pub fn new(config: &WatermarkConfig) -> Self {
        let mut fontdb = Database::new();

        if config.load_system_fonts {
            fontdb.load_system_fonts();
        }

        if let Some(font_path) = &config.font_path {
            load_font_file(&mut fontdb, font_path);
        }

        if let Some(family) = &config.font_family {
            fontdb.set_sans_serif_family(family.clone());
        }

        if !resolves_sans_serif(&fontdb) {
            match fallback_family(&fontdb) {
                Some(family) => {
                    info!("Using {:?} for sans-serif watermark text", family);
                    fontdb.set_sans_serif_family(family);
                }
                None => warn!("No fonts available, watermark text will not be visible"),
            }
        }

        info!("Watermark font database ready with {} faces", fontdb.len());

        Self {
            fontdb: Arc::new(fontdb),
        }
    }

    /// Watermark `bytes` with `text` and re-encode in the same format.
    pub fn apply(
        &self,
        bytes: &[u8],
        kind: ImageKind,
        text: &str,
    ) -> Result<Vec<u8>, WatermarkError> {
        let image = decode(bytes)?;
        let (width, height) = (image.width(), image.height());
        debug!("Decoded {}x{} {} image", width, height, kind.mime_type());

        let overlay = self.rasterize_overlay(width, height, text)?;

        let has_alpha = image.color().has_alpha();
        let mut canvas = image.to_rgba8();
        image::imageops::overlay(&mut canvas, &overlay, 0, 0);

        let composited = if kind == ImageKind::Png && has_alpha {
            DynamicImage::ImageRgba8(canvas)
        } else {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
        };

        kind.encode(&composited)
    }

    /// Render the overlay markup into an RGBA layer of exactly `width x height`
    pub fn rasterize_overlay(
        &self,
        width: u32,
        height: u32,
        text: &str,
    ) -> Result<RgbaImage, WatermarkError> {
        let svg = render_overlay(width, height, text);

        let mut options = usvg::Options::default();
        options.fontdb = self.fontdb.clone();
        let tree = usvg::Tree::from_str(&svg, &options)?;

        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| WatermarkError::Processing("Failed to create pixmap".to_string()))?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        // tiny-skia stores premultiplied colour, image expects straight alpha
        let data: Vec<u8> = pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let color = pixel.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect();

        ImageBuffer::from_raw(width, height, data)
            .ok_or_else(|| WatermarkError::Processing("Failed to create overlay buffer".to_string()))
    }
}

/// Decode an upload, guessing the format from its content
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, WatermarkError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| WatermarkError::UnprocessableImage(e.to_string()))?;

    if reader.format().is_none() {
        return Err(WatermarkError::UnprocessableImage(
            "Unrecognized image format".to_string(),
        ));
    }

    let image = reader
        .decode()
        .map_err(|e| WatermarkError::UnprocessableImage(e.to_string()))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(WatermarkError::UnprocessableImage(
            "Image has no pixels".to_string(),
        ));
    }

    Ok(image)
}

const PREFERRED_SANS_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Helvetica",
    "Arial",
];

fn resolves_sans_serif(fontdb: &Database) -> bool {
    fontdb
        .query(&Query {
            families: &[Family::SansSerif],
            ..Default::default()
        })
        .is_some()
}

/// First preferred family that is installed, else any loaded family
fn fallback_family(fontdb: &Database) -> Option<String> {
    PREFERRED_SANS_FAMILIES
        .iter()
        .find(|name| {
            fontdb
                .query(&Query {
                    families: &[Family::Name(name)],
                    ..Default::default()
                })
                .is_some()
        })
        .map(|name| name.to_string())
        .or_else(|| {
            fontdb
                .faces()
                .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
        })
}

fn load_font_file(fontdb: &mut Database, font_path: &Path) {
    if !font_path.exists() {
        debug!("Font file not found at {:?}, relying on system fonts", font_path);
        return;
    }

    match fontdb.load_font_file(font_path) {
        Ok(()) => info!("Loaded watermark font {:?}", font_path),
        Err(e) => warn!("Failed to load watermark font {:?}: {}", font_path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb, Rgba};

    fn test_compositor() -> Compositor {
        Compositor::new(&WatermarkConfig {
            font_path: None,
            font_family: None,
            load_system_fonts: false,
        })
    }

    fn bundled_font_compositor() -> Compositor {
        Compositor::new(&WatermarkConfig {
            font_path: Some(Path::new(env!("CARGO_MANIFEST_DIR")).join("static/DejaVuSans.ttf")),
            font_family: None,
            load_system_fonts: false,
        })
    }

    fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_png_round_trip_keeps_size_and_format() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(800, 600, Rgb([30, 60, 90])));
        let input = encode(&img, ImageFormat::Png);

        let output = test_compositor()
            .apply(&input, ImageKind::Png, "Ada architecte")
            .unwrap();

        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.dimensions(), (800, 600));
    }

    #[test]
    fn test_jpeg_round_trip_keeps_size_and_format() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(320, 480, Rgb([200, 180, 160])));
        let input = encode(&img, ImageFormat::Jpeg);

        let output = test_compositor()
            .apply(&input, ImageKind::Jpeg, "Ada architecte")
            .unwrap();

        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.dimensions(), (320, 480));
    }

    #[test]
    fn test_png_alpha_is_preserved() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(64, 64, Rgba([0, 0, 0, 0])));
        let input = encode(&img, ImageFormat::Png);

        let output = test_compositor().apply(&input, ImageKind::Png, "x").unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert!(decoded.color().has_alpha());
    }

    #[test]
    fn test_corrupt_bytes_are_unprocessable() {
        let result = test_compositor().apply(b"definitely not an image", ImageKind::Png, "x");
        assert!(matches!(result, Err(WatermarkError::UnprocessableImage(_))));

        // A truncated PNG has a valid signature but cannot be decoded
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(50, 50, Rgb([1, 2, 3])));
        let mut truncated = encode(&img, ImageFormat::Png);
        truncated.truncate(40);
        let result = test_compositor().apply(&truncated, ImageKind::Png, "x");
        assert!(matches!(result, Err(WatermarkError::UnprocessableImage(_))));
    }

    #[test]
    fn test_overlay_layer_matches_image_size() {
        let layer = test_compositor()
            .rasterize_overlay(123, 45, "Ada architecte")
            .unwrap();
        assert_eq!(layer.dimensions(), (123, 45));
    }

    #[test]
    fn test_empty_text_leaves_pixels_untouched() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(100, 80, Rgb([12, 34, 56])));
        let input = encode(&img, ImageFormat::Png);

        let output = test_compositor().apply(&input, ImageKind::Png, "").unwrap();
        let decoded = image::load_from_memory(&output).unwrap().to_rgb8();
        assert!(decoded.pixels().all(|p| *p == Rgb([12, 34, 56])));
    }

    #[test]
    fn test_missing_font_file_is_not_fatal() {
        let compositor = Compositor::new(&WatermarkConfig {
            font_path: Some("does/not/exist.ttf".into()),
            font_family: Some("DejaVu Sans".to_string()),
            load_system_fonts: false,
        });
        assert!(compositor.rasterize_overlay(10, 10, "x").is_ok());
    }

    #[test]
    fn test_sans_serif_falls_back_to_loaded_family() {
        assert!(resolves_sans_serif(&bundled_font_compositor().fontdb));
        assert!(!resolves_sans_serif(&test_compositor().fontdb));
        assert_eq!(fallback_family(&test_compositor().fontdb), None);
    }

    #[test]
    fn test_unknown_font_family_still_resolves() {
        let compositor = Compositor::new(&WatermarkConfig {
            font_path: Some(Path::new(env!("CARGO_MANIFEST_DIR")).join("static/DejaVuSans.ttf")),
            font_family: Some("No Such Family".to_string()),
            load_system_fonts: false,
        });
        assert!(resolves_sans_serif(&compositor.fontdb));
    }

    #[test]
    fn test_png_watermark_changes_pixels() {
        let background = Rgb([30, 60, 90]);
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(800, 600, background));
        let input = encode(&img, ImageFormat::Png);

        let output = bundled_font_compositor()
            .apply(&input, ImageKind::Png, "Ada architecte")
            .unwrap();
        let decoded = image::load_from_memory(&output).unwrap().to_rgb8();

        let changed = decoded.pixels().filter(|p| **p != background).count();
        let total = (800 * 600) as usize;
        assert!(changed * 100 > total, "only {changed} of {total} pixels changed");
    }

    #[test]
    fn test_jpeg_watermark_changes_pixels() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(640, 480, Rgb([40, 40, 40])));
        let input = encode(&img, ImageFormat::Jpeg);
        let before = image::load_from_memory(&input).unwrap().to_rgb8();

        let output = bundled_font_compositor()
            .apply(&input, ImageKind::Jpeg, "Ada architecte")
            .unwrap();
        let after = image::load_from_memory(&output).unwrap().to_rgb8();

        let changed = before
            .pixels()
            .zip(after.pixels())
            .filter(|(a, b)| a.0.iter().zip(b.0.iter()).any(|(x, y)| x.abs_diff(*y) > 32))
            .count();
        let total = (640 * 480) as usize;
        assert!(changed * 100 > total, "only {changed} of {total} pixels changed");
    }
}
