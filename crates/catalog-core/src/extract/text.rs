// catalog-core/src/extract/text.rs
//! 纯文本读取（自动检测编码）

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

use super::{ExtractError, Extracted, Format, TextExtractor};

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn format(&self) -> Format {
        Format::Text
    }

    /// 最多读取 `limit * 4` 字节，足够容纳 `limit` 个 UTF-8 字符
    fn extract(&self, path: &Path, limit: usize) -> Result<Extracted, ExtractError> {
        let mut bytes = Vec::new();
        File::open(path)?
            .take(limit.saturating_mul(4) as u64)
            .read_to_end(&mut bytes)?;
        Ok(decode_text(&bytes).into())
    }
}

/// 字节解码为字符串
///
/// 优先按 BOM，其次 UTF-8，最后用 chardetng 猜测编码
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (decoded, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return strip_bom(decoded.into_owned());
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => return strip_bom(text.to_string()),
        // 截断读取可能切断最后一个多字节字符
        Err(e) if e.error_len().is_none() && e.valid_up_to() > 0 => {
            if let Ok(text) = std::str::from_utf8(&bytes[..e.valid_up_to()]) {
                return strip_bom(text.to_string());
            }
        }
        Err(_) => {}
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let detected = detector.guess(None, true);

    tracing::debug!("检测到文件编码: {}", detected.name());

    let (decoded, encoding_used, had_errors) = detected.decode(bytes);
    if had_errors {
        tracing::warn!("使用 {} 解码时有部分错误，可能影响搜索准确性", encoding_used.name());
    }
    strip_bom(decoded.into_owned())
}

/// 整个文件转为 UTF-8，返回文本和原编码
///
/// 与 [`decode_text`] 不同，输入须是完整文件，不处理截断的尾部字符
pub fn transcode_to_utf8(bytes: &[u8]) -> (String, &'static Encoding) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (decoded, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return (decoded.into_owned(), encoding);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), encoding_rs::UTF_8);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (decoded, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::warn!("按 {} 转换时有无法解码的字节，已替换为 U+FFFD", encoding.name());
    }
    (decoded.into_owned(), encoding)
}

fn strip_bom(text: String) -> String {
    if text.contains('\u{feff}') {
        text.replace('\u{feff}', "")
    } else {
        text
    }
}
