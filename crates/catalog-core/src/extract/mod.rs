// catalog-core/src/extract/mod.rs
//! 文本提取模块
//!
//! 每种支持的格式对应一个处理器，输出统一经过 [`normalize`] 规范化并截断到上限。
//! 提取永远不会失败：解析出错时记录警告，返回能恢复的部分（可能为空）。

pub mod docx;
pub mod epub;
pub mod html;
pub mod pdf;
pub mod rtf;
pub mod text;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::ExtractStat;

/// 默认识别为图片的扩展名
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "svg"];

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());

/// 处理器内部错误，只在模块内传播，最终由 [`extract`] 吞掉
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("读取文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("{format} 文件格式错误: {message}")]
    Malformed { format: Format, message: String },

    #[error("{0} 解析库发生 panic")]
    Panicked(Format),
}

impl ExtractError {
    pub fn malformed(format: Format, err: impl fmt::Display) -> Self {
        Self::Malformed {
            format,
            message: err.to_string(),
        }
    }
}

/// 支持的文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Text,
    Epub,
    Pdf,
    Docx,
    Rtf,
    Html,
    Image,
}

impl Format {
    /// 按小写扩展名识别格式，不支持的扩展名返回 None
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::from_extension_with_images(ext, IMAGE_EXTENSIONS)
    }

    /// 同 [`Format::from_extension`]，图片扩展名由调用方给出
    pub fn from_extension_with_images<S: AsRef<str>>(ext: &str, images: &[S]) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        let format = match ext.as_str() {
            "txt" => Format::Text,
            "epub" => Format::Epub,
            "pdf" => Format::Pdf,
            "docx" => Format::Docx,
            "rtf" => Format::Rtf,
            "html" | "htm" => Format::Html,
            other if images.iter().any(|image| image.as_ref() == other) => Format::Image,
            _ => return None,
        };
        Some(format)
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Epub => "epub",
            Format::Pdf => "pdf",
            Format::Docx => "docx",
            Format::Rtf => "rtf",
            Format::Html => "html",
            Format::Image => "image",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 文件类型对应的 MIME 类型，用于文件下载
pub fn media_type(file_type: &str) -> &'static str {
    match file_type.to_ascii_lowercase().as_str() {
        "txt" => "text/plain",
        "epub" => "application/epub+zip",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "rtf" => "application/rtf",
        "html" | "htm" => "text/html",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// 处理器的原始输出
#[derive(Debug, Default)]
pub struct Extracted {
    pub text: String,
    /// 是否走了降级路径（例如 EPUB 解包、PDF 逐页）
    pub fallback: bool,
}

impl From<String> for Extracted {
    fn from(text: String) -> Self {
        Self {
            text,
            fallback: false,
        }
    }
}

/// 单一格式的文本提取器
pub trait TextExtractor: Send + Sync {
    fn format(&self) -> Format;

    /// 读取原始文本，累计到 `limit` 个字符后可以提前停止
    fn extract(&self, path: &Path, limit: usize) -> Result<Extracted, ExtractError>;
}

/// 图片没有可提取的文本
pub struct ImageExtractor;

impl TextExtractor for ImageExtractor {
    fn format(&self) -> Format {
        Format::Image
    }

    fn extract(&self, _path: &Path, _limit: usize) -> Result<Extracted, ExtractError> {
        Ok(Extracted::default())
    }
}

/// 格式到处理器的分派
pub fn handler_for(format: Format) -> &'static dyn TextExtractor {
    match format {
        Format::Text => &text::PlainTextExtractor,
        Format::Epub => &epub::EpubExtractor,
        Format::Pdf => &pdf::PdfExtractor,
        Format::Docx => &docx::DocxExtractor,
        Format::Rtf => &rtf::RtfExtractor,
        Format::Html => &html::HtmlExtractor,
        Format::Image => &ImageExtractor,
    }
}

/// 一次提取的结果
#[derive(Debug)]
pub struct Extraction {
    pub text: String,
    pub stat: ExtractStat,
}

/// 提取文件文本并规范化到 `limit` 个字符以内
pub fn extract(path: &Path, format: Format, limit: usize) -> Extraction {
    let started = Instant::now();
    let bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or_default();

    tracing::debug!("正在解析文件: {:?} ({})", path, format);

    let (raw, fallback, failed) = match handler_for(format).extract(path, limit) {
        Ok(extracted) => (extracted.text, extracted.fallback, false),
        Err(e) => {
            tracing::warn!("提取文本失败 {:?}: {}", path, e);
            (String::new(), false, true)
        }
    };

    Extraction {
        text: normalize(&raw, limit),
        stat: ExtractStat {
            format,
            elapsed: started.elapsed(),
            bytes,
            fallback,
            failed,
        },
    }
}

/// 把连续的非单词字符折叠成一个空格，再按字符数截断
pub fn normalize(text: &str, limit: usize) -> String {
    let collapsed = NON_WORD.replace_all(text, " ");
    match collapsed.char_indices().nth(limit) {
        Some((end, _)) => collapsed[..end].to_string(),
        None => collapsed.into_owned(),
    }
}

/// 把第三方库的 panic 转成错误
pub(crate) fn guard_panic<T>(
    format: Format,
    f: impl FnOnce() -> Result<T, ExtractError>,
) -> Result<T, ExtractError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or(Err(ExtractError::Panicked(format)))
}

/// 有字符数上限的文本缓冲
///
/// 处理器按块追加，达到上限后停止读取后续内容
pub(crate) struct BoundedText {
    text: String,
    chars: usize,
    limit: usize,
}

impl BoundedText {
    pub fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            chars: 0,
            limit,
        }
    }

    pub fn is_full(&self) -> bool {
        self.chars >= self.limit
    }

    /// 追加一块文本；已满时忽略
    pub fn push(&mut self, piece: &str) {
        if self.is_full() {
            return;
        }
        self.chars += piece.chars().count();
        self.text.push_str(piece);
    }

    pub fn into_string(self) -> String {
        self.text
    }
}
