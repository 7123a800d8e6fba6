//! DOCX Paragraph Extraction
//!
//! A .docx file is a zip container; the body lives in `word/document.xml`.
//! The parser streams that XML and collects the text of each body paragraph
//! (`w:p`), in document order:
//! - run text (`w:t`) is concatenated
//! - `w:tab` becomes a tab
//! - `w:br` / `w:cr` become a space, so a paragraph stays on one line
//! - paragraphs inside tables (`w:tbl`) and text boxes (`w:txbxContent`) are
//!   skipped, as are deleted-text and field-instruction runs
//!
//! Extracted text is every paragraph followed by a newline, so the number of
//! newline-terminated segments always equals the paragraph count.

use crate::error::ExtractionCause;
use crate::extractors::Extractor;
use crate::types::{Document, DocumentKind, Extraction, ExtractionMethod};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn extract(&self, document: &Document) -> Result<Extraction, ExtractionCause> {
        let bytes = document.read_bytes()?;
        let paragraphs = parse_docx(&bytes)?;

        let mut text = String::with_capacity(paragraphs.iter().map(|p| p.len() + 1).sum());
        for paragraph in &paragraphs {
            text.push_str(paragraph);
            text.push('\n');
        }

        tracing::debug!(paragraphs = paragraphs.len(), "extracted DOCX paragraphs");
        Ok(Extraction::new(text, ExtractionMethod::Paragraphs, None))
    }

    fn name(&self) -> &str {
        "DocxExtractor"
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Docx
    }
}

/// Paragraph texts of a DOCX file, in document order
pub fn parse_docx(bytes: &[u8]) -> Result<Vec<String>, ExtractionCause> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionCause::decode("docx", format!("not a zip container: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractionCause::decode("docx", format!("missing {DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionCause::decode("docx", format!("unreadable {DOCUMENT_PART}: {e}")))?;

    parse_document_xml(&xml)
}

/// Paragraph texts of a `word/document.xml` body
pub fn parse_document_xml(xml: &str) -> Result<Vec<String>, ExtractionCause> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;
    // Depth inside tables / text boxes; paragraphs there are not body paragraphs
    let mut nested = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tbl" | b"txbxContent" => nested += 1,
                b"p" if nested == 0 => {
                    in_paragraph = true;
                    current.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if nested > 0 {
                    continue;
                }
                match e.local_name().as_ref() {
                    // <w:p/> is an empty paragraph
                    b"p" => paragraphs.push(String::new()),
                    b"tab" if in_paragraph => current.push('\t'),
                    b"br" | b"cr" if in_paragraph => current.push(' '),
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                if in_text && in_paragraph && nested == 0 {
                    let text = t
                        .unescape()
                        .map_err(|e| ExtractionCause::decode("docx", format!("bad text escape: {e}")))?;
                    // Keep one line per paragraph even if a run carries raw line breaks
                    current.extend(text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"tbl" | b"txbxContent" => nested = nested.saturating_sub(1),
                b"p" if nested == 0 && in_paragraph => {
                    paragraphs.push(std::mem::take(&mut current));
                    in_paragraph = false;
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionCause::decode(
                    "docx",
                    format!("malformed {DOCUMENT_PART} at byte {}: {e}", reader.buffer_position()),
                ))
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{inner}</w:body></w:document>"#
        )
    }

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(DOCUMENT_PART, FileOptions::default()).unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_paragraph_runs_concatenate() {
        let xml = body(
            r#"<w:p><w:r><w:t>Q1. What is </w:t></w:r><w:r><w:t xml:space="preserve">2+2?</w:t></w:r></w:p>
<w:p><w:r><w:t>A) 3</w:t><w:tab/><w:t>B) 4</w:t></w:r></w:p>"#,
        );
        let paragraphs = parse_document_xml(&xml).unwrap();
        assert_eq!(paragraphs, vec!["Q1. What is 2+2?", "A) 3\tB) 4"]);
    }

    #[test]
    fn test_empty_paragraphs_and_breaks() {
        let xml = body(r#"<w:p/><w:p><w:r><w:t>line one</w:t><w:br/><w:t>line two</w:t></w:r></w:p><w:p></w:p>"#);
        let paragraphs = parse_document_xml(&xml).unwrap();
        assert_eq!(paragraphs, vec!["", "line one line two", ""]);
    }

    #[test]
    fn test_table_paragraphs_skipped() {
        let xml = body(
            r#"<w:p><w:r><w:t>Before</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:r><w:t>After &amp; more</w:t></w:r></w:p>"#,
        );
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["Before", "After & more"]);
    }

    #[test]
    fn test_extracted_text_has_one_line_per_paragraph() {
        let xml = body(r#"<w:p><w:r><w:t>One</w:t></w:r></w:p><w:p/><w:p><w:r><w:t>Three</w:t></w:r></w:p>"#);
        let doc = Document::from_bytes(DocumentKind::Docx, "exam.docx", docx_bytes(&xml));
        let extraction = DocxExtractor.extract(&doc).unwrap();
        assert_eq!(extraction.text, "One\n\nThree\n");
        assert_eq!(extraction.text.matches('\n').count(), 3);
        assert_eq!(extraction.method, ExtractionMethod::Paragraphs);
    }

    #[test]
    fn test_not_a_docx() {
        let err = parse_docx(b"plain text").unwrap_err();
        assert!(matches!(err, ExtractionCause::Decode { format: "docx", .. }));

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("readme.txt", FileOptions::default()).unwrap();
        writer.write_all(b"hi").unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        let err = parse_docx(&bytes).unwrap_err();
        assert!(err.to_string().contains(DOCUMENT_PART));
    }
}
