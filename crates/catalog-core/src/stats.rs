// catalog-core/src/stats.rs
//! 提取统计
//!
//! 每次提取返回一个 [`ExtractStat`]，由调用方汇总成只读的 [`LoadReport`]

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::extract::Format;

/// 单次提取的统计样本
#[derive(Debug, Clone, Copy)]
pub struct ExtractStat {
    pub format: Format,
    pub elapsed: Duration,
    pub bytes: u64,
    pub fallback: bool,
    pub failed: bool,
}

/// 单一格式的汇总
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct FormatTally {
    pub count: usize,
    #[serde(with = "duration_secs")]
    pub total: Duration,
    pub bytes: u64,
    pub fallbacks: usize,
    pub failures: usize,
}

impl FormatTally {
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count as u32
        }
    }
}

/// 一次加载的汇总报告
#[derive(Debug, Default, Clone, Serialize)]
pub struct LoadReport {
    formats: BTreeMap<Format, FormatTally>,
    skipped: usize,
}

impl LoadReport {
    pub(crate) fn record(&mut self, stat: ExtractStat) {
        let tally = self.formats.entry(stat.format).or_default();
        tally.count += 1;
        tally.total += stat.elapsed;
        tally.bytes += stat.bytes;
        tally.fallbacks += usize::from(stat.fallback);
        tally.failures += usize::from(stat.failed);
    }

    pub(crate) fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn tally(&self, format: Format) -> FormatTally {
        self.formats.get(&format).copied().unwrap_or_default()
    }

    pub fn formats(&self) -> impl Iterator<Item = (Format, &FormatTally)> {
        self.formats.iter().map(|(format, tally)| (*format, tally))
    }

    /// 提取过的文件总数
    pub fn extracted(&self) -> usize {
        self.formats.values().map(|t| t.count).sum()
    }

    /// 不支持或无法读取而跳过的文件数
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Stat]")?;
        for (format, tally) in &self.formats {
            write!(
                f,
                " {}: {} / {:.4}s",
                format,
                tally.count,
                tally.mean().as_secs_f64()
            )?;
            if tally.fallbacks > 0 {
                write!(f, " (降级 {})", tally.fallbacks)?;
            }
            if tally.failures > 0 {
                write!(f, " (失败 {})", tally.failures)?;
            }
            write!(f, ",")?;
        }
        write!(f, " 跳过: {}", self.skipped)
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(format: Format, millis: u64, fallback: bool) -> ExtractStat {
        ExtractStat {
            format,
            elapsed: Duration::from_millis(millis),
            bytes: 10,
            fallback,
            failed: false,
        }
    }

    #[test]
    fn test_report_aggregates_per_format() {
        let mut report = LoadReport::default();
        report.record(stat(Format::Text, 10, false));
        report.record(stat(Format::Text, 30, false));
        report.record(stat(Format::Epub, 5, true));
        report.record_skipped();

        let text = report.tally(Format::Text);
        assert_eq!(text.count, 2);
        assert_eq!(text.mean(), Duration::from_millis(20));
        assert_eq!(text.bytes, 20);
        assert_eq!(report.tally(Format::Epub).fallbacks, 1);
        assert_eq!(report.tally(Format::Pdf).count, 0);
        assert_eq!(report.extracted(), 3);
        assert_eq!(report.skipped(), 1);
    }

    #[test]
    fn test_display_lists_formats() {
        let mut report = LoadReport::default();
        report.record(stat(Format::Pdf, 1, false));
        let line = report.to_string();
        assert!(line.starts_with("[Stat]"));
        assert!(line.contains("pdf: 1"));
    }
}
