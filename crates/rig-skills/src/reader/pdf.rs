//! PDF text extraction via `pdf-extract`

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use super::{parse_error, DocumentParser};
use crate::error::ReadError;

pub const DEFAULT_MAX_PAGES: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct PdfParser {
    max_pages: usize,
}

impl Default for PdfParser {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl PdfParser {
    pub fn with_max_pages(max_pages: usize) -> Self {
        Self { max_pages }
    }
}

impl DocumentParser for PdfParser {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn parse(&self, path: &Path) -> Result<String, ReadError> {
        let bytes = std::fs::read(path).map_err(|e| parse_error(path, e))?;

        // pdf-extract panics on some malformed inputs
        let pages = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        }))
        .map_err(|_| parse_error(path, "PDF parser panicked on malformed input"))?
        .map_err(|e| parse_error(path, e))?;

        Ok(render_pages(&pages, self.max_pages))
    }
}

fn render_pages(pages: &[String], max_pages: usize) -> String {
    let mut out: Vec<String> = pages
        .iter()
        .take(max_pages)
        .enumerate()
        .map(|(i, text)| format!("--- Page {} ---\n{}", i + 1, text.trim()))
        .collect();

    if pages.len() > max_pages {
        out.push(format!(
            "[Truncated] {} more page(s) not shown",
            pages.len() - max_pages
        ));
    }
    out.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_pages_truncates() {
        let pages: Vec<String> = (1..=3).map(|i| format!("page text {}", i)).collect();
        let text = render_pages(&pages, 2);

        assert!(text.starts_with("--- Page 1 ---\npage text 1"));
        assert!(text.contains("--- Page 2 ---\npage text 2"));
        assert!(!text.contains("page text 3"));
        assert!(text.ends_with("[Truncated] 1 more page(s) not shown"));
    }

    #[test]
    fn test_corrupt_pdf_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 this is not really a pdf").unwrap();

        let result = PdfParser::default().parse(&path);
        assert!(matches!(result, Err(ReadError::Parse { .. })));
    }
}
