use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("Unprocessable image: {0}")]
    UnprocessableImage(String),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Overlay error: {0}")]
    OverlayError(#[from] usvg::Error),

    #[error("Processing error: {0}")]
    Processing(String),
}
