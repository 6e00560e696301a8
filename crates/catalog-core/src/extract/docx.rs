// catalog-core/src/extract/docx.rs
//! DOCX 段落文本

use std::fs;
use std::path::Path;

use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild, read_docx};

use super::{BoundedText, ExtractError, Extracted, Format, TextExtractor};

pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn format(&self) -> Format {
        Format::Docx
    }

    fn extract(&self, path: &Path, limit: usize) -> Result<Extracted, ExtractError> {
        let bytes = fs::read(path)?;
        let docx = read_docx(&bytes).map_err(|e| ExtractError::malformed(Format::Docx, e))?;

        let mut buf = BoundedText::new(limit);
        for child in &docx.document.children {
            if buf.is_full() {
                break;
            }
            if let DocumentChild::Paragraph(paragraph) = child {
                buf.push(&paragraph_text(paragraph));
                buf.push("\n");
            }
        }
        Ok(buf.into_string().into())
    }
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut out = String::new();
    collect_runs(&paragraph.children, &mut out);
    out
}

fn collect_runs(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for run_child in &run.children {
                    if let RunChild::Text(text) = run_child {
                        out.push_str(&text.text);
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => collect_runs(&link.children, out),
            _ => {}
        }
    }
}
