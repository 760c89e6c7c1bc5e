use serde::Deserialize;
use serde_json::Value;

/// Body of `POST /api/watermark-texts`.
///
/// `text` is kept loosely typed: a missing or non-string value is treated
/// the same as an empty one.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTextRequest {
    #[serde(default)]
    pub text: Value,
}

impl CreateTextRequest {
    /// Trimmed text, or `None` when nothing usable was sent
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_str()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> CreateTextRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_trimmed_text() {
        assert_eq!(parse(r#"{"text": "  Atelier Nord  "}"#).trimmed_text(), Some("Atelier Nord"));
        assert_eq!(parse(r#"{"text": "   "}"#).trimmed_text(), None);
        assert_eq!(parse(r#"{"text": ""}"#).trimmed_text(), None);
    }

    #[test]
    fn test_non_string_text_is_empty() {
        assert_eq!(parse(r#"{"text": 42}"#).trimmed_text(), None);
        assert_eq!(parse(r#"{"text": null}"#).trimmed_text(), None);
        assert_eq!(parse(r#"{}"#).trimmed_text(), None);
    }
}
