// catalog-core/src/extract/pdf.rs
//! PDF 逐页提取
//!
//! 正常情况下用 pdf-extract 按页取文本；整份文档解析失败（包括库内部 panic）时
//! 改用 lopdf 逐页提取，单页失败只跳过该页。

use std::path::Path;

use super::{BoundedText, ExtractError, Extracted, Format, TextExtractor, guard_panic};

pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn format(&self) -> Format {
        Format::Pdf
    }

    fn extract(&self, path: &Path, limit: usize) -> Result<Extracted, ExtractError> {
        match guard_panic(Format::Pdf, || read_pages(path, limit)) {
            Ok(text) => Ok(text.into()),
            Err(e) => {
                tracing::debug!("pdf-extract 解析失败，改为逐页提取 {:?}: {}", path, e);
                let text = guard_panic(Format::Pdf, || read_pages_lenient(path, limit))?;
                Ok(Extracted {
                    text,
                    fallback: true,
                })
            }
        }
    }
}

fn read_pages(path: &Path, limit: usize) -> Result<String, ExtractError> {
    let pages =
        pdf_extract::extract_text_by_pages(path).map_err(|e| ExtractError::malformed(Format::Pdf, e))?;
    let mut buf = BoundedText::new(limit);
    for page in pages {
        if buf.is_full() {
            break;
        }
        buf.push(&page);
    }
    Ok(buf.into_string())
}

fn read_pages_lenient(path: &Path, limit: usize) -> Result<String, ExtractError> {
    let doc = lopdf::Document::load(path).map_err(|e| ExtractError::malformed(Format::Pdf, e))?;
    let mut buf = BoundedText::new(limit);
    for page_number in doc.get_pages().into_keys() {
        if buf.is_full() {
            break;
        }
        match doc.extract_text(&[page_number]) {
            Ok(text) => buf.push(&text),
            Err(e) => tracing::debug!("跳过无法解析的第 {} 页 {:?}: {}", page_number, path, e),
        }
    }
    Ok(buf.into_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 单页、内容为 `phrase` 的最小 PDF
    pub(crate) fn minimal_pdf(phrase: &str) -> Vec<u8> {
        let content = format!("BT /F1 12 Tf 100 700 Td ({phrase}) Tj ET");
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");
        let o1 = out.len();
        out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
        let o2 = out.len();
        out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
        let o3 = out.len();
        out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
        let o4 = out.len();
        out.extend_from_slice(
            format!("4 0 obj << /Length {} >> stream\n{content}\nendstream endobj\n", content.len()).as_bytes(),
        );
        let o5 = out.len();
        out.extend_from_slice(b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n");
        let xref_start = out.len();
        out.extend_from_slice(b"xref\n0 6\n");
        out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
        for offset in [o1, o2, o3, o4, o5] {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
        out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
        out.extend_from_slice(b"%%EOF\n");
        out
    }

    #[test]
    fn test_minimal_pdf_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, minimal_pdf("lighthouse keeper notes")).unwrap();
        let extraction = super::super::extract(&path, Format::Pdf, 10);
        assert!(extraction.text.chars().count() <= 10);
    }

    #[test]
    fn test_garbage_pdf_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 this is not really a pdf").unwrap();
        let extraction = super::super::extract(&path, Format::Pdf, 100);
        assert!(extraction.text.is_empty());
    }
}
