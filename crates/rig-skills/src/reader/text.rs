//! Plain text, markdown, source and config files

use std::path::Path;

use super::{parse_error, DocumentParser};
use crate::error::ReadError;

/// Extensions decoded as UTF-8 text
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "log", "tsv",
    "json", "jsonl", "yaml", "yml", "toml", "ini", "cfg", "conf", "env", "xml",
    "html", "htm", "css", "svg",
    "py", "sh", "bash", "zsh", "js", "mjs", "ts", "rb", "rs", "go", "java", "kt",
    "c", "h", "cpp", "hpp", "cs", "php", "pl", "r", "sql", "lua",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct TextParser;

impl DocumentParser for TextParser {
    fn name(&self) -> &'static str {
        "text"
    }

    fn parse(&self, path: &Path) -> Result<String, ReadError> {
        let bytes = std::fs::read(path).map_err(|e| parse_error(path, e))?;
        decode_text(&bytes).map_err(|message| parse_error(path, message))
    }
}

/// Decode UTF-8, refusing content that looks binary
pub(crate) fn decode_text(bytes: &[u8]) -> Result<String, String> {
    if bytes.contains(&0) {
        return Err("binary content (NUL byte)".to_string());
    }
    let text = std::str::from_utf8(bytes).map_err(|e| format!("not valid UTF-8: {}", e))?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}
