use super::geometry::WatermarkGeometry;

const FONT_FAMILY: &str = "sans-serif";
const FILL: &str = "white";
const FILL_OPACITY: &str = "0.5";
const LETTER_SPACING: &str = "2";

/// Build the SVG overlay for an image of the given size.
///
/// The document is exactly `width x height`; text rows are tiled across a
/// square twice the image diagonal and rotated about the image center so
/// that they cover every pixel. The same markup is used for the server
/// composite and for the dashboard preview.
pub fn render_overlay(width: u32, height: u32, text: &str) -> String {
    let geometry = WatermarkGeometry::compute(width, height);
    render_with_geometry(&geometry, text)
}

fn render_with_geometry(geometry: &WatermarkGeometry, text: &str) -> String {
    let escaped = escape_markup(text);
    let center_x = geometry.cover_diagonal / 2.0;

    let rows: Vec<String> = geometry
        .row_baselines()
        .map(|y| {
            format!(
                r#"<text x="{}" y="{}" text-anchor="middle" font-family="{}" font-size="{}" fill="{}" fill-opacity="{}" letter-spacing="{}">{}</text>"#,
                center_x,
                y,
                FONT_FAMILY,
                geometry.font_size,
                FILL,
                FILL_OPACITY,
                LETTER_SPACING,
                escaped
            )
        })
        .collect();

    let half_width = geometry.width / 2.0;
    let half_height = geometry.height / 2.0;
    let (offset_x, offset_y) = geometry.tile_origin;

    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\">\n  <g transform=\"translate({}, {}) rotate({}) translate({}, {})\">\n    {}\n  </g>\n</svg>",
        geometry.width,
        geometry.height,
        half_width,
        half_height,
        geometry.rotation_degrees,
        offset_x - half_width,
        offset_y - half_height,
        rows.join("\n    ")
    )
}

/// Escape the five XML metacharacters so user text can be embedded safely
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
