//! Integration tests for the universal reader
//!
//! Office files are assembled in the test with `zip` so every supported
//! format has a small valid sample.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use rig_skills::{ReadError, UniversalReader};

fn write_zip(path: &Path, members: &[(&str, &str)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, content) in members {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

fn sample_docx(dir: &Path) -> PathBuf {
    let path = dir.join("brief.docx");
    write_zip(
        &path,
        &[(
            "word/document.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Quarterly Brief</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Revenue grew </w:t></w:r><w:r><w:t>12% &amp; costs fell.</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Region</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Sales</w:t></w:r></w:p></w:tc></w:tr>
<w:tr><w:tc><w:p><w:r><w:t>EMEA</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>42</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
</w:body></w:document>"#,
        )],
    );
    path
}

fn sample_pptx(dir: &Path) -> PathBuf {
    let slide = |text: &str| {
        format!(
            r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            text
        )
    };
    let path = dir.join("deck.pptx");
    let (s1, s2, s10) = (slide("Intro"), slide("Findings"), slide("Appendix"));
    write_zip(
        &path,
        &[
            ("ppt/slides/slide10.xml", s10.as_str()),
            ("ppt/slides/slide2.xml", s2.as_str()),
            ("ppt/slides/slide1.xml", s1.as_str()),
            ("ppt/presentation.xml", "<p:presentation/>"),
        ],
    );
    path
}

fn sample_xlsx(dir: &Path) -> PathBuf {
    let path = dir.join("sales.xlsx");
    write_zip(
        &path,
        &[
            (
                "xl/workbook.xml",
                r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Q1" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<Relationships><Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
            ),
            (
                "xl/sharedStrings.xml",
                r#"<sst><si><t>region</t></si><si><t>units</t></si><si><t>EMEA</t></si></sst>"#,
            ),
            (
                "xl/worksheets/sheet1.xml",
                r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
<row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>42</v></c></row>
</sheetData></worksheet>"#,
            ),
        ],
    );
    path
}

#[test]
fn test_every_format_yields_text() {
    let dir = TempDir::new().unwrap();
    let reader = UniversalReader::new();

    std::fs::write(dir.path().join("notes.md"), "# Notes\nhello").unwrap();
    std::fs::write(dir.path().join("config.yaml"), "key: value\n").unwrap();
    std::fs::write(dir.path().join("Makefile"), "all:\n\techo hi\n").unwrap();
    std::fs::write(dir.path().join("data.csv"), "a,b\n1,2\n").unwrap();

    for name in ["notes.md", "config.yaml", "Makefile", "data.csv"] {
        let text = reader.read(&dir.path().join(name)).unwrap();
        assert!(!text.trim().is_empty(), "{} produced no text", name);
    }

    for path in [sample_docx(dir.path()), sample_pptx(dir.path()), sample_xlsx(dir.path())] {
        let text = reader.read(&path).unwrap();
        assert!(!text.trim().is_empty(), "{:?} produced no text", path);
    }
}

#[test]
fn test_docx_paragraphs_and_table() {
    let dir = TempDir::new().unwrap();
    let text = UniversalReader::new().read(&sample_docx(dir.path())).unwrap();

    assert!(text.starts_with("Quarterly Brief\nRevenue grew 12% & costs fell."));
    assert!(text.contains("Region | Sales\nEMEA | 42"));
}

#[test]
fn test_pptx_slides_in_numeric_order() {
    let dir = TempDir::new().unwrap();
    let text = UniversalReader::new().read(&sample_pptx(dir.path())).unwrap();

    let intro = text.find("--- Slide 1 ---\nIntro").unwrap();
    let findings = text.find("--- Slide 2 ---\nFindings").unwrap();
    let appendix = text.find("--- Slide 10 ---\nAppendix").unwrap();
    assert!(intro < findings && findings < appendix);
}

#[test]
fn test_xlsx_sheet_as_markdown_table() {
    let dir = TempDir::new().unwrap();
    let text = UniversalReader::new().read(&sample_xlsx(dir.path())).unwrap();

    assert!(text.starts_with("--- Sheet: Q1 ---"));
    assert!(text.contains("| region | units |"));
    assert!(text.contains("| EMEA | 42 |"));
}

#[test]
fn test_csv_truncates_long_tables() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.csv");
    let mut content = String::from("id,value\n");
    for i in 0..120 {
        content.push_str(&format!("{},{}\n", i, i * 2));
    }
    std::fs::write(&path, content).unwrap();

    let text = UniversalReader::new().read(&path).unwrap();
    assert!(text.contains("| 49 | 98 |"));
    assert!(!text.contains("| 50 | 100 |"));
    assert!(text.contains("... [70 more rows truncated, showing first 50]"));
}

#[test]
fn test_failures_are_typed() {
    let dir = TempDir::new().unwrap();
    let reader = UniversalReader::new();

    let unsupported = dir.path().join("model.bin3d");
    std::fs::write(&unsupported, [1u8, 2, 3]).unwrap();
    assert!(matches!(reader.read(&unsupported), Err(ReadError::UnsupportedFormat(_))));

    assert!(matches!(
        reader.read(&dir.path().join("missing.txt")),
        Err(ReadError::NotFound(_))
    ));

    let corrupt = dir.path().join("broken.docx");
    std::fs::write(&corrupt, "not a zip archive").unwrap();
    assert!(matches!(reader.read(&corrupt), Err(ReadError::Parse { .. })));

    let binary = dir.path().join("blob.txt");
    std::fs::write(&binary, [0u8, 159, 146, 150]).unwrap();
    assert!(matches!(reader.read(&binary), Err(ReadError::Parse { .. })));
}

#[test]
fn test_xlsx_with_oversized_cell_reference_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crafted.xlsx");
    write_zip(
        &path,
        &[
            (
                "xl/workbook.xml",
                r#"<workbook><sheets><sheet name="Bad" sheetId="1"/></sheets></workbook>"#,
            ),
            (
                "xl/worksheets/sheet1.xml",
                r#"<worksheet><sheetData><row r="1"><c r="ZZZZZZZ1"><v>1</v></c></row></sheetData></worksheet>"#,
            ),
        ],
    );

    match UniversalReader::new().read(&path) {
        Err(ReadError::Parse { message, .. }) => assert!(message.contains("ZZZZZZZ1"), "{}", message),
        other => panic!("expected parse error, got {:?}", other),
    }
}
