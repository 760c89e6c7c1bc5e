// Per-account watermark text library
mod handlers;
mod types;

pub use handlers::{create_text, delete_text, list_texts};
pub use types::CreateTextRequest;
