// Watermark module - geometry, overlay markup, compositing and the upload endpoints
mod compositor;
mod error;
mod formats;
mod geometry;
mod handlers;
mod overlay;

pub use compositor::Compositor;
pub use error::WatermarkError;
pub use formats::{ImageKind, output_file_name};
pub use geometry::WatermarkGeometry;
pub use handlers::{
    OverlayQuery, ProcessedImage, UploadedFile, WatermarkResponse, overlay_preview_handler,
    resolve_watermark_text, validate_uploads, watermark_handler,
};
pub use overlay::{escape_markup, render_overlay};
