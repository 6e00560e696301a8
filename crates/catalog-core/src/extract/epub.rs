// catalog-core/src/extract/epub.rs
//! EPUB 文本提取
//!
//! 先用 `epub` 库按 spine 顺序读取；库解析失败时退回到直接解包 zip，
//! 按 OPF 清单顺序读取 XHTML 文件。

use std::fs::{self, File};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::html::html_to_text;
use super::text::decode_text;
use super::{BoundedText, ExtractError, Extracted, Format, TextExtractor, guard_panic};

static ROOTFILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<rootfile\b[^>]*\bfull-path="(?P<path>[^"]+)""#).unwrap());

static MANIFEST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(?:opf:)?item\b[^>]*>").unwrap());

static HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bhref="(?P<href>[^"]+)""#).unwrap());

static MEDIA_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bmedia-type="application/xhtml\+xml""#).unwrap());

/// 没有 container.xml 时使用的 OPF 位置
const DEFAULT_OPF: &str = "OEBPS/content.opf";

pub struct EpubExtractor;

impl TextExtractor for EpubExtractor {
    fn format(&self) -> Format {
        Format::Epub
    }

    fn extract(&self, path: &Path, limit: usize) -> Result<Extracted, ExtractError> {
        match guard_panic(Format::Epub, || read_structured(path, limit)) {
            Ok(text) => Ok(text.into()),
            Err(e) => {
                tracing::warn!("EPUB 结构化解析失败，改为直接解包 {:?}: {}", path, e);
                Ok(Extracted {
                    text: read_unpacked(path, limit)?,
                    fallback: true,
                })
            }
        }
    }
}

/// 元数据（书名、作者）加上每个 spine 文档的正文
fn read_structured(path: &Path, limit: usize) -> Result<String, ExtractError> {
    let mut doc = epub::doc::EpubDoc::new(path).map_err(|e| ExtractError::malformed(Format::Epub, e))?;
    let mut buf = BoundedText::new(limit);

    for key in ["title", "creator"] {
        if let Some(value) = doc.mdata(key).map(|m| m.value.clone()) {
            buf.push(&value);
            buf.push(" ");
        }
    }

    for chapter in 0..doc.get_num_chapters() {
        if buf.is_full() {
            break;
        }
        doc.set_current_chapter(chapter);
        if let Some((content, _mime)) = doc.get_current_str() {
            buf.push(&html_to_text(&content));
        }
    }

    Ok(buf.into_string())
}

/// 解包到临时目录后按清单读取，临时目录随返回自动删除
pub fn read_unpacked(path: &Path, limit: usize) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(File::open(path)?).map_err(|e| ExtractError::malformed(Format::Epub, e))?;
    let scratch = tempfile::Builder::new().prefix("catalog-epub-").tempdir()?;
    archive
        .extract(scratch.path())
        .map_err(|e| ExtractError::malformed(Format::Epub, e))?;

    let root = scratch.path();
    let opf_path = match fs::read(root.join("META-INF").join("container.xml")) {
        Ok(bytes) => {
            let container = decode_text(&bytes);
            let rootfile = ROOTFILE
                .captures(&container)
                .map(|caps| caps["path"].to_string())
                .unwrap_or_else(|| DEFAULT_OPF.to_string());
            root.join(rootfile)
        }
        Err(_) => root.join(DEFAULT_OPF),
    };

    let opf = decode_text(&fs::read(&opf_path)?);
    let base = opf_path.parent().unwrap_or(root);
    let mut buf = BoundedText::new(limit);

    for item in MANIFEST_ITEM.find_iter(&opf) {
        if buf.is_full() {
            break;
        }
        let item = item.as_str();
        if !MEDIA_TYPE.is_match(item) {
            continue;
        }
        let Some(href) = HREF.captures(item).map(|caps| caps["href"].to_string()) else {
            continue;
        };
        match fs::read(base.join(&href)) {
            Ok(bytes) => buf.push(&html_to_text(&decode_text(&bytes))),
            Err(e) => tracing::debug!("跳过无法读取的章节 {}: {}", href, e),
        }
    }

    Ok(buf.into_string())
}
