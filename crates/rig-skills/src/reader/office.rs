//! Office Open XML documents (docx, pptx)
//!
//! OOXML files are zip archives of XML parts. Only the text runs are
//! needed, so the parts are scanned with a handful of regexes instead of a
//! full XML parser.

use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use zip::ZipArchive;

use super::{parse_error, DocumentParser};
use crate::error::ReadError;

pub(crate) type Archive = ZipArchive<File>;

pub(crate) fn open_archive(path: &Path) -> Result<Archive, ReadError> {
    let file = File::open(path).map_err(|e| parse_error(path, e))?;
    ZipArchive::new(file).map_err(|e| parse_error(path, e))
}

/// Read one archive member as a string, `None` when absent
pub(crate) fn read_member(
    archive: &mut Archive,
    name: &str,
    path: &Path,
) -> Result<Option<String>, ReadError> {
    let mut member = match archive.by_name(name) {
        Ok(member) => member,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(parse_error(path, e)),
    };
    let mut xml = String::new();
    member
        .read_to_string(&mut xml)
        .map_err(|e| parse_error(path, format!("{}: {}", name, e)))?;
    Ok(Some(xml))
}

pub(crate) fn require_member(archive: &mut Archive, name: &str, path: &Path) -> Result<String, ReadError> {
    read_member(archive, name, path)?
        .ok_or_else(|| parse_error(path, format!("missing archive member {}", name)))
}

/// Decode the five predefined XML entities and numeric references
pub(crate) fn unescape_xml(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
            }
            _ if entity.starts_with('#') => entity[1..].parse::<u32>().ok().and_then(char::from_u32),
            _ => None,
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("invalid regex"))
}

fn word_table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<w:tbl\b[^>]*>.*?</w:tbl>")
}

fn word_row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<w:tr\b[^>]*?(?:/>|>(.*?)</w:tr>)")
}

fn word_cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<w:tc\b[^>]*?(?:/>|>(.*?)</w:tc>)")
}

fn word_paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<w:p\b[^>]*?(?:/>|>(.*?)</w:p>)")
}

fn word_text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>")
}

fn drawing_paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<a:p\b[^>]*?(?:/>|>(.*?)</a:p>)")
}

fn drawing_text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<a:t(?:\s[^>]*)?>(.*?)</a:t>")
}

fn slide_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^ppt/slides/slide(\d+)\.xml$")
}

/// Concatenated text runs of every paragraph, one line per non-empty paragraph
fn paragraphs(xml: &str, paragraph: &Regex, text: &Regex) -> Vec<String> {
    paragraph
        .captures_iter(xml)
        .filter_map(|cap| cap.get(1))
        .map(|inner| {
            text.captures_iter(inner.as_str())
                .filter_map(|t| t.get(1))
                .map(|t| unescape_xml(t.as_str()))
                .collect::<String>()
        })
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Word documents: body paragraphs followed by table rows
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxParser;

impl DocumentParser for DocxParser {
    fn name(&self) -> &'static str {
        "docx"
    }

    fn parse(&self, path: &Path) -> Result<String, ReadError> {
        let mut archive = open_archive(path)?;
        let xml = require_member(&mut archive, "word/document.xml", path)?;
        Ok(render_docx(&xml))
    }
}

fn render_docx(xml: &str) -> String {
    let body = word_table_re().replace_all(xml, "");
    let mut lines = paragraphs(&body, word_paragraph_re(), word_text_re());

    for table in word_table_re().find_iter(xml) {
        let rows: Vec<String> = word_row_re()
            .captures_iter(table.as_str())
            .filter_map(|row| row.get(1))
            .map(|row| {
                word_cell_re()
                    .captures_iter(row.as_str())
                    .map(|cell| {
                        cell.get(1)
                            .map(|c| paragraphs(c.as_str(), word_paragraph_re(), word_text_re()).join(" "))
                            .unwrap_or_default()
                    })
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect();
        if !rows.is_empty() {
            lines.push(String::new());
            lines.extend(rows);
        }
    }

    lines.join("\n")
}

/// PowerPoint decks: text per slide in slide-number order
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxParser;

impl DocumentParser for PptxParser {
    fn name(&self) -> &'static str {
        "pptx"
    }

    fn parse(&self, path: &Path) -> Result<String, ReadError> {
        let mut archive = open_archive(path)?;

        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| {
                slide_name_re()
                    .captures(name)
                    .and_then(|c| c.get(1))
                    .and_then(|n| n.as_str().parse::<u32>().ok())
                    .map(|n| (n, name.to_string()))
            })
            .collect();
        if slides.is_empty() {
            return Err(parse_error(path, "no slides found"));
        }
        slides.sort();

        let mut out = Vec::with_capacity(slides.len());
        for (number, member) in slides {
            let xml = require_member(&mut archive, &member, path)?;
            let lines = paragraphs(&xml, drawing_paragraph_re(), drawing_text_re());
            out.push(format!("--- Slide {} ---\n{}", number, lines.join("\n")));
        }
        Ok(out.join("\n\n"))
    }
}
