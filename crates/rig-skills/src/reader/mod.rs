//! Universal document reader ("explore")
//!
//! Turns any file inside a skill package into text for the model. Parsers
//! are looked up by lowercased extension in a table that callers can extend
//! with [`UniversalReader::register`].
//!
//! | Extension | Parser |
//! |-----------|--------|
//! | text, source, config, none | [`TextParser`] |
//! | `pdf` | [`PdfParser`] |
//! | `docx` | [`DocxParser`] |
//! | `pptx` | [`PptxParser`] |
//! | `xlsx` | [`XlsxParser`] |
//! | `csv` | [`CsvParser`] |

mod office;
mod pdf;
mod sheet;
mod text;

pub use office::{DocxParser, PptxParser};
pub use pdf::PdfParser;
pub use sheet::{CsvParser, XlsxParser, MAX_TABLE_ROWS};
pub use text::{TextParser, TEXT_EXTENSIONS};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ReadError;

/// Format-specific text extraction
pub trait DocumentParser: Send + Sync {
    /// Short parser name for logs
    fn name(&self) -> &'static str;

    /// Extract text from an existing regular file
    fn parse(&self, path: &Path) -> Result<String, ReadError>;
}

/// Extension-dispatching reader
#[derive(Clone)]
pub struct UniversalReader {
    parsers: HashMap<String, Arc<dyn DocumentParser>>,
    fallback: Arc<dyn DocumentParser>,
}

impl std::fmt::Debug for UniversalReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut exts: Vec<&String> = self.parsers.keys().collect();
        exts.sort();
        f.debug_struct("UniversalReader").field("extensions", &exts).finish()
    }
}

impl Default for UniversalReader {
    fn default() -> Self {
        Self::new()
    }
}

impl UniversalReader {
    /// Reader with every built-in parser registered
    pub fn new() -> Self {
        let text: Arc<dyn DocumentParser> = Arc::new(TextParser);
        let mut reader = Self {
            parsers: HashMap::new(),
            fallback: text.clone(),
        };

        for ext in TEXT_EXTENSIONS {
            reader.parsers.insert((*ext).to_string(), text.clone());
        }
        reader.register("pdf", Arc::new(PdfParser::default()));
        reader.register("docx", Arc::new(DocxParser));
        reader.register("pptx", Arc::new(PptxParser));
        reader.register("xlsx", Arc::new(XlsxParser));
        reader.register("csv", Arc::new(CsvParser));
        reader
    }

    /// Add or replace the parser for an extension (without the dot)
    pub fn register(&mut self, extension: &str, parser: Arc<dyn DocumentParser>) {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.parsers.insert(ext, parser);
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.parsers.contains_key(&extension.to_lowercase())
    }

    /// Read `path` as text
    ///
    /// The path must already be resolved inside the active skill root.
    pub fn read(&self, path: &Path) -> Result<String, ReadError> {
        let shown = path.display().to_string();

        let meta = std::fs::metadata(path).map_err(|_| ReadError::NotFound(shown.clone()))?;
        if meta.is_dir() {
            return Err(ReadError::Parse {
                path: shown,
                message: "path is a directory".to_string(),
            });
        }

        let parser = match path.extension().and_then(|e| e.to_str()) {
            None => self.fallback.clone(),
            Some(ext) => match self.parsers.get(&ext.to_lowercase()) {
                Some(parser) => parser.clone(),
                None => return Err(ReadError::UnsupportedFormat(shown)),
            },
        };

        debug!("Reading {} with {} parser", shown, parser.name());
        parser.parse(path).inspect_err(|e| {
            if let ReadError::Parse { .. } = e {
                warn!("{}", e);
            }
        })
    }
}

/// Shorthand for a parser failure
pub(crate) fn parse_error(path: &Path, message: impl std::fmt::Display) -> ReadError {
    ReadError::Parse {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Upper;

    impl DocumentParser for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn parse(&self, path: &Path) -> Result<String, ReadError> {
            let text = std::fs::read_to_string(path).map_err(|e| parse_error(path, e))?;
            Ok(text.to_uppercase())
        }
    }

    #[test]
    fn test_read_text_and_extensionless() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("notes.txt"), "plain notes").unwrap();
        std::fs::write(temp.path().join("Makefile"), "all:\n\techo hi").unwrap();

        let reader = UniversalReader::new();
        assert_eq!(reader.read(&temp.path().join("notes.txt")).unwrap(), "plain notes");
        assert!(reader.read(&temp.path().join("Makefile")).unwrap().contains("echo hi"));
    }

    #[test]
    fn test_read_unsupported_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("image.xyz");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let result = UniversalReader::new().read(&path);
        assert!(matches!(result, Err(ReadError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_read_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = UniversalReader::new().read(&temp.path().join("missing.txt"));
        assert!(matches!(result, Err(ReadError::NotFound(_))));
    }

    #[test]
    fn test_read_directory() {
        let temp = TempDir::new().unwrap();
        let result = UniversalReader::new().read(temp.path());
        assert!(matches!(result, Err(ReadError::Parse { .. })));
    }

    #[test]
    fn test_register_custom_parser() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("shout.LOUD");
        std::fs::write(&path, "quiet").unwrap();

        let mut reader = UniversalReader::new();
        assert!(!reader.supports("loud"));
        reader.register(".loud", Arc::new(Upper));

        assert_eq!(reader.read(&path).unwrap(), "QUIET");
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("README.TXT");
        std::fs::write(&path, "shouting file name").unwrap();

        assert_eq!(UniversalReader::new().read(&path).unwrap(), "shouting file name");
    }
}
