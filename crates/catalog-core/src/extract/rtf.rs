// catalog-core/src/extract/rtf.rs
//! RTF 控制字剥离
//!
//! 跳过字体表、样式表、图片等目标组和 `\*` 可忽略组；
//! `\'hh` 按 `\ansicpgN` 代码页解码，`\uN` 转换为 Unicode 字符。

use std::fs;
use std::path::Path;

use encoding_rs::{
    BIG5, EUC_KR, Encoding, GBK, SHIFT_JIS, UTF_8, WINDOWS_874, WINDOWS_1250, WINDOWS_1251, WINDOWS_1252,
    WINDOWS_1253, WINDOWS_1254, WINDOWS_1255, WINDOWS_1256, WINDOWS_1257, WINDOWS_1258,
};

use super::{ExtractError, Extracted, Format, TextExtractor};

/// 内容不属于正文的目标组
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "object",
    "header",
    "headerl",
    "headerr",
    "headerf",
    "footer",
    "footerl",
    "footerr",
    "footerf",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "themedata",
    "colorschememapping",
    "datastore",
    "latentstyles",
    "filetbl",
    "revtbl",
    "fldinst",
    "xmlnstbl",
    "pgdsctbl",
];

pub struct RtfExtractor;

impl TextExtractor for RtfExtractor {
    fn format(&self) -> Format {
        Format::Rtf
    }

    fn extract(&self, path: &Path, _limit: usize) -> Result<Extracted, ExtractError> {
        let bytes = fs::read(path)?;
        Ok(rtf_to_text(&bytes)?.into())
    }
}

/// 代码页到编码的映射，未知代码页按 Windows-1252 处理
fn encoding_for_codepage(codepage: i32) -> &'static Encoding {
    match codepage {
        949 => EUC_KR,
        936 => GBK,
        950 => BIG5,
        932 => SHIFT_JIS,
        874 => WINDOWS_874,
        1250 => WINDOWS_1250,
        1251 => WINDOWS_1251,
        1253 => WINDOWS_1253,
        1254 => WINDOWS_1254,
        1255 => WINDOWS_1255,
        1256 => WINDOWS_1256,
        1257 => WINDOWS_1257,
        1258 => WINDOWS_1258,
        65001 => UTF_8,
        _ => WINDOWS_1252,
    }
}

#[derive(Clone, Copy)]
struct GroupState {
    skip: bool,
    uc: usize,
}

/// 正文输出，按来源分别缓存字节和 UTF-16 单元，切换时解码
struct Output {
    text: String,
    bytes: Vec<u8>,
    units: Vec<u16>,
    encoding: &'static Encoding,
}

impl Output {
    fn push_byte(&mut self, byte: u8) {
        self.flush_units();
        self.bytes.push(byte);
    }

    fn push_unit(&mut self, unit: u16) {
        self.flush_bytes();
        self.units.push(unit);
    }

    fn push_char(&mut self, c: char) {
        self.flush();
        self.text.push(c);
    }

    fn flush_bytes(&mut self) {
        if !self.bytes.is_empty() {
            let (decoded, _) = self.encoding.decode_without_bom_handling(&self.bytes);
            self.text.push_str(&decoded);
            self.bytes.clear();
        }
    }

    fn flush_units(&mut self) {
        if !self.units.is_empty() {
            self.text.extend(
                char::decode_utf16(self.units.drain(..)).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
            );
        }
    }

    fn flush(&mut self) {
        self.flush_bytes();
        self.flush_units();
    }
}

/// 把 RTF 字节转换为纯文本，缺少 `{\rtf` 头时报错
pub fn rtf_to_text(input: &[u8]) -> Result<String, ExtractError> {
    let start = input.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(input.len());
    if !input[start..].starts_with(b"{\\rtf") {
        return Err(ExtractError::malformed(Format::Rtf, "缺少 {\\rtf 文件头"));
    }

    let mut out = Output {
        text: String::new(),
        bytes: Vec::new(),
        units: Vec::new(),
        encoding: WINDOWS_1252,
    };
    let mut stack: Vec<GroupState> = Vec::new();
    let mut state = GroupState { skip: false, uc: 1 };
    // \uN 之后需要跳过的替代字符数
    let mut pending_skip = 0usize;
    let mut i = start;

    while i < input.len() {
        let byte = input[i];
        match byte {
            b'{' => {
                stack.push(state);
                pending_skip = 0;
                i += 1;
            }
            b'}' => {
                state = stack.pop().unwrap_or(GroupState { skip: false, uc: 1 });
                pending_skip = 0;
                i += 1;
            }
            b'\\' => {
                i += 1;
                let Some(&next) = input.get(i) else { break };
                if next.is_ascii_alphabetic() {
                    let word_start = i;
                    while i < input.len() && input[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    let word = std::str::from_utf8(&input[word_start..i]).unwrap_or_default();
                    let param_start = i;
                    if i < input.len() && input[i] == b'-' {
                        i += 1;
                    }
                    while i < input.len() && input[i].is_ascii_digit() {
                        i += 1;
                    }
                    let param: Option<i32> = std::str::from_utf8(&input[param_start..i])
                        .ok()
                        .and_then(|s| s.parse().ok());
                    if i < input.len() && input[i] == b' ' {
                        i += 1;
                    }

                    match word {
                        "ansicpg" => {
                            if let Some(codepage) = param {
                                out.flush();
                                out.encoding = encoding_for_codepage(codepage);
                            }
                        }
                        "uc" => state.uc = param.unwrap_or(1).max(0) as usize,
                        "u" => {
                            if let Some(value) = param {
                                if !state.skip {
                                    let unit = if value < 0 { value + 65536 } else { value };
                                    out.push_unit(unit as u16);
                                }
                                pending_skip = state.uc;
                            }
                        }
                        "bin" => i += param.unwrap_or(0).max(0) as usize,
                        "par" | "line" | "sect" | "page" | "row" if !state.skip => out.push_char('\n'),
                        "tab" | "cell" if !state.skip => out.push_char('\t'),
                        "emdash" | "endash" if !state.skip => out.push_char('-'),
                        "lquote" | "rquote" if !state.skip => out.push_char('\''),
                        "ldblquote" | "rdblquote" if !state.skip => out.push_char('"'),
                        "bullet" if !state.skip => out.push_char('•'),
                        w if SKIPPED_DESTINATIONS.contains(&w) => state.skip = true,
                        _ => {}
                    }
                    continue;
                }

                i += 1;
                match next {
                    b'*' => state.skip = true,
                    b'\'' => {
                        let hex = input.get(i..i + 2).and_then(|h| std::str::from_utf8(h).ok());
                        if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                            i += 2;
                            if pending_skip > 0 {
                                pending_skip -= 1;
                            } else if !state.skip {
                                out.push_byte(value);
                            }
                        }
                    }
                    b'\\' | b'{' | b'}' if !state.skip => out.push_char(next as char),
                    b'~' if !state.skip => out.push_char(' '),
                    b'_' if !state.skip => out.push_char('-'),
                    b'\n' | b'\r' if !state.skip => out.push_char('\n'),
                    _ => {}
                }
            }
            b'\r' | b'\n' => i += 1,
            _ => {
                if pending_skip > 0 {
                    pending_skip -= 1;
                } else if !state.skip {
                    out.push_byte(byte);
                }
                i += 1;
            }
        }
    }

    out.flush();
    Ok(out.text)
}
