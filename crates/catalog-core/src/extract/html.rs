// catalog-core/src/extract/html.rs
//! HTML 去标签

use std::fs;
use std::path::Path;

use scraper::Html;

use super::text::decode_text;
use super::{ExtractError, Extracted, Format, TextExtractor};

pub struct HtmlExtractor;

impl TextExtractor for HtmlExtractor {
    fn format(&self) -> Format {
        Format::Html
    }

    fn extract(&self, path: &Path, _limit: usize) -> Result<Extracted, ExtractError> {
        let bytes = fs::read(path)?;
        Ok(html_to_text(&decode_text(&bytes)).into())
    }
}

/// 提取可见文本，跳过 script 和 style
pub fn html_to_text(markup: &str) -> String {
    let document = Html::parse_document(markup);
    let mut out = String::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| matches!(e.name(), "script" | "style")))
            .unwrap_or(false);
        if hidden {
            continue;
        }
        let text = text.trim();
        if !text.is_empty() {
            out.push_str(text);
            out.push(' ');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markup_and_scripts() {
        let html = r#"<html><head><title>제목</title><style>p { color: red; }</style></head>
            <body><h1>Chapter</h1><p>First <b>bold</b> line</p><script>var x = 1;</script></body></html>"#;
        let text = html_to_text(html);
        assert!(text.contains("제목"));
        assert!(text.contains("Chapter"));
        assert!(text.contains("bold"));
        assert!(!text.contains("color"));
        assert!(!text.contains("var x"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_extractor_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "<p>hello page</p>").unwrap();
        let extracted = HtmlExtractor.extract(&path, 100).unwrap();
        assert_eq!(extracted.text.trim(), "hello page");
    }
}
