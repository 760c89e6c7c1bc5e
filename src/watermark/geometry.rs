/// Smallest font size the overlay will use, whatever the image size
pub const MIN_FONT_SIZE: f64 = 16.0;

/// Layout of the diagonal, tiled watermark for one image size.
///
/// Every value is derived from the image dimensions alone, so the server
/// render and the dashboard preview always agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkGeometry {
    pub width: f64,
    pub height: f64,
    pub font_size: f64,
    /// Distance between two text rows
    pub line_spacing: f64,
    /// Rotation of the text rows; negative is counter-clockwise in image space
    pub rotation_degrees: f64,
    /// Side of the square the rows are tiled across
    pub cover_diagonal: f64,
    /// Offset of the tiling square relative to the image origin
    pub tile_origin: (f64, f64),
}

impl WatermarkGeometry {
    pub fn compute(width: u32, height: u32) -> Self {
        let width = f64::from(width);
        let height = f64::from(height);

        let diagonal = (width * width + height * height).sqrt();
        let font_size = (diagonal / 30.0).round().max(MIN_FONT_SIZE);
        let line_spacing = font_size * 3.0;

        // Bottom-left to top-right diagonal
        let rotation_degrees = -height.atan2(width) * (180.0 / std::f64::consts::PI);

        let cover_diagonal = diagonal * 2.0;
        let tile_origin = (
            -cover_diagonal / 2.0 + width / 2.0,
            -cover_diagonal / 2.0 + height / 2.0,
        );

        Self {
            width,
            height,
            font_size,
            line_spacing,
            rotation_degrees,
            cover_diagonal,
            tile_origin,
        }
    }

    /// Baselines of every text row, from the top of the tiling square
    pub fn row_baselines(&self) -> impl Iterator<Item = f64> + '_ {
        let mut y = 0.0;
        std::iter::from_fn(move || {
            if y < self.cover_diagonal {
                let current = y;
                y += self.line_spacing;
                Some(current)
            } else {
                None
            }
        })
    }
}
