//! Tabular formats (xlsx, csv) rendered as markdown tables

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use super::office::{open_archive, read_member, require_member, unescape_xml};
use super::text::decode_text;
use super::{parse_error, DocumentParser};
use crate::error::ReadError;

/// Data rows shown per table before the truncation marker
pub const MAX_TABLE_ROWS: usize = 50;

/// Render rows as a markdown table; the first row is the header
pub(crate) fn markdown_table(rows: &[Vec<String>], max_rows: usize) -> String {
    let Some(header) = rows.first() else {
        return "(empty)".to_string();
    };
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);

    let render_row = |row: &[String]| {
        let cells: Vec<String> = (0..width)
            .map(|i| {
                row.get(i)
                    .map(|c| c.replace('|', "\\|").replace('\n', " "))
                    .unwrap_or_default()
            })
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = vec![
        render_row(header),
        format!("|{}", " --- |".repeat(width)),
    ];
    let body = &rows[1..];
    lines.extend(body.iter().take(max_rows).map(|r| render_row(r)));
    if body.len() > max_rows {
        lines.push(format!(
            "... [{} more rows truncated, showing first {}]",
            body.len() - max_rows,
            max_rows
        ));
    }
    lines.join("\n")
}

/// Comma-separated values with double-quote escaping
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser;

impl DocumentParser for CsvParser {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn parse(&self, path: &Path) -> Result<String, ReadError> {
        let bytes = std::fs::read(path).map_err(|e| parse_error(path, e))?;
        let text = decode_text(&bytes).map_err(|m| parse_error(path, m))?;
        let rows = split_csv(&text).map_err(|m| parse_error(path, m))?;
        Ok(markdown_table(&rows, MAX_TABLE_ROWS))
    }
}

/// Split CSV text into records
///
/// Quoted fields may contain commas, newlines and doubled quotes.
pub(crate) fn split_csv(text: &str) -> Result<Vec<Vec<String>>, String> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows.retain(|r| !(r.len() == 1 && r[0].is_empty()));
    Ok(rows)
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("invalid regex"))
}

fn sheet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"<sheet\b[^>]*>")
}

fn relationship_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"<Relationship\b[^>]*>")
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r#"([\w:]+)="([^"]*)""#)
}

fn shared_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<si\b[^>]*?(?:/>|>(.*?)</si>)")
}

fn text_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<t(?:\s[^>]*)?>(.*?)</t>")
}

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<row\b[^>]*?(?:/>|>(.*?)</row>)")
}

fn cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<c\b([^>]*?)(?:/>|>(.*?)</c>)")
}

fn value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<v>(.*?)</v>")
}

fn attributes(tag: &str) -> HashMap<String, String> {
    attr_re()
        .captures_iter(tag)
        .map(|c| (c[1].to_string(), unescape_xml(&c[2])))
        .collect()
}

/// Last column a worksheet can address (`XFD`)
const MAX_COLUMN: usize = 16_383;

/// Zero-based column index from a cell reference such as `AB12`
///
/// `None` for references without column letters or past `XFD`.
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let index = letters
        .iter()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize);
    (index - 1 <= MAX_COLUMN).then_some(index - 1)
}

fn run_text(xml: &str) -> String {
    text_run_re()
        .captures_iter(xml)
        .map(|c| unescape_xml(&c[1]))
        .collect()
}

/// Excel workbooks: one markdown table per sheet in workbook order
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxParser;

impl DocumentParser for XlsxParser {
    fn name(&self) -> &'static str {
        "xlsx"
    }

    fn parse(&self, path: &Path) -> Result<String, ReadError> {
        let mut archive = open_archive(path)?;

        let workbook = require_member(&mut archive, "xl/workbook.xml", path)?;
        let rels = read_member(&mut archive, "xl/_rels/workbook.xml.rels", path)?.unwrap_or_default();
        let shared: Vec<String> = read_member(&mut archive, "xl/sharedStrings.xml", path)?
            .map(|xml| {
                shared_item_re()
                    .captures_iter(&xml)
                    .map(|c| c.get(1).map(|m| run_text(m.as_str())).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();

        let targets: HashMap<String, String> = relationship_re()
            .find_iter(&rels)
            .filter_map(|m| {
                let attrs = attributes(m.as_str());
                Some((attrs.get("Id")?.clone(), attrs.get("Target")?.clone()))
            })
            .collect();

        let mut out = Vec::new();
        for (i, tag) in sheet_re().find_iter(&workbook).enumerate() {
            let attrs = attributes(tag.as_str());
            let name = attrs
                .get("name")
                .cloned()
                .unwrap_or_else(|| format!("Sheet{}", i + 1));
            let member = attrs
                .get("r:id")
                .and_then(|id| targets.get(id))
                .map(|target| match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("xl/{}", target),
                })
                .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", i + 1));

            let Some(xml) = read_member(&mut archive, &member, path)? else {
                return Err(parse_error(path, format!("missing worksheet {}", member)));
            };
            let rows = sheet_rows(&xml, &shared, MAX_TABLE_ROWS + 1)
                .map_err(|m| parse_error(path, format!("{}: {}", member, m)))?;
            out.push(format!("--- Sheet: {} ---\n{}", name, markdown_table(&rows, MAX_TABLE_ROWS)));
        }

        if out.is_empty() {
            return Err(parse_error(path, "workbook has no sheets"));
        }
        Ok(out.join("\n\n"))
    }
}

/// Non-empty rows of a worksheet
///
/// Only the first `keep` rows carry cells; later rows are counted as empty
/// placeholders so the table can report how many were left out.
fn sheet_rows(xml: &str, shared: &[String], keep: usize) -> Result<Vec<Vec<String>>, String> {
    let mut rows = Vec::new();
    for row in row_re().captures_iter(xml) {
        let Some(inner) = row.get(1) else {
            continue;
        };
        let mut cells: Vec<String> = Vec::new();
        let mut any_value = false;
        for cell in cell_re().captures_iter(inner.as_str()) {
            let attrs = attributes(&cell[1]);
            let body = cell.get(2).map(|m| m.as_str()).unwrap_or("");
            let raw = value_re()
                .captures(body)
                .map(|v| unescape_xml(&v[1]))
                .unwrap_or_default();

            let value = match attrs.get("t").map(String::as_str) {
                Some("s") => raw
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| shared.get(idx).cloned())
                    .unwrap_or_default(),
                Some("inlineStr") => run_text(body),
                Some("b") => (if raw == "1" { "TRUE" } else { "FALSE" }).to_string(),
                _ => raw,
            };

            let col = match attrs.get("r") {
                Some(r) => column_index(r).ok_or_else(|| format!("invalid cell reference {:?}", r))?,
                None => cells.len(),
            };
            any_value |= !value.is_empty();
            if rows.len() >= keep {
                continue;
            }
            if col >= cells.len() {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value;
        }
        if any_value {
            rows.push(cells);
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_csv_quotes() {
        let rows = split_csv("name,note\r\n\"Smith, J\",\"said \"\"hi\"\"\"\nLee,\"two\nlines\"\n").unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["name".to_string(), "note".to_string()],
                vec!["Smith, J".to_string(), "said \"hi\"".to_string()],
                vec!["Lee".to_string(), "two\nlines".to_string()],
            ]
        );
    }

    #[test]
    fn test_split_csv_unterminated() {
        assert!(split_csv("a,\"open\n").is_err());
    }

    #[test]
    fn test_markdown_table_truncates() {
        let mut rows = vec![vec!["id".to_string()]];
        rows.extend((0..60).map(|i| vec![i.to_string()]));

        let table = markdown_table(&rows, MAX_TABLE_ROWS);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "| id |");
        assert_eq!(lines[1], "| --- |");
        assert_eq!(lines.len(), 2 + MAX_TABLE_ROWS + 1);
        assert!(lines.last().unwrap().contains("10 more rows truncated"));
    }

    #[test]
    fn test_markdown_table_pads_and_escapes() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["x|y".to_string()],
        ];
        assert_eq!(markdown_table(&rows, 10), "| a | b |\n| --- | --- |\n| x\\|y |  |");
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("C7"), Some(2));
        assert_eq!(column_index("AA3"), Some(26));
        assert_eq!(column_index("XFD1"), Some(MAX_COLUMN));
        assert_eq!(column_index("xfd1"), Some(MAX_COLUMN));
        assert_eq!(column_index("12"), None);
        assert_eq!(column_index("XFE1"), None);
        assert_eq!(column_index("ZZZZ1"), None);
        assert_eq!(column_index("ZZZZZZZZZZZZZZZ1"), None);
    }

    #[test]
    fn test_sheet_rows_rejects_out_of_range_reference() {
        for reference in ["ZZZZ1", "ZZZZZZZ1", "ZZZZZZZZZZZZZZZ1"] {
            let xml = format!(r#"<sheetData><row r="1"><c r="{}"><v>1</v></c></row></sheetData>"#, reference);
            let err = sheet_rows(&xml, &[], MAX_TABLE_ROWS).unwrap_err();
            assert!(err.contains(reference), "{}", err);
        }
    }

    #[test]
    fn test_sheet_rows_keeps_only_leading_rows() {
        let xml = r#"<sheetData>
<row r="1"><c r="A1"><v>h</v></c></row>
<row r="2"><c r="XFD2"><v>far</v></c></row>
<row r="3"><c r="XFD3"><v>far</v></c></row>
</sheetData>"#;

        let rows = sheet_rows(xml, &[], 1).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["h".to_string()]);
        assert!(rows[1].is_empty() && rows[2].is_empty());
    }

    #[test]
    fn test_sheet_rows_shared_and_inline() {
        let shared = vec!["Region".to_string(), "North".to_string()];
        let xml = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="inlineStr"><is><t>Sales</t></is></c></row>
<row r="2"/>
<row r="3"><c r="A3" t="s"><v>1</v></c><c r="C3"><v>42.5</v></c></row>
</sheetData></worksheet>"#;

        let rows = sheet_rows(xml, &shared, MAX_TABLE_ROWS).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["Region".to_string(), "Sales".to_string()],
                vec!["North".to_string(), String::new(), "42.5".to_string()],
            ]
        );
    }
}
