//! CSV output format.

use barline_types::Bar;
use std::io::Write;

use crate::{FormatError, Formatter};

/// CSV formatter.
///
/// Each row carries the bucket start both as epoch milliseconds and as an
/// ISO-8601 UTC timestamp.
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    delimiter: char,
    include_header: bool,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvFormatter {
    /// Creates a comma-separated formatter with a header row.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }

    /// Sets the field delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether to include a header row.
    #[must_use]
    pub const fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    /// Creates a tab-separated formatter.
    #[must_use]
    pub const fn tsv() -> Self {
        Self::new().with_delimiter('\t')
    }
}

impl Formatter for CsvFormatter {
    fn write_bars(&self, bars: &[Bar], writer: &mut dyn Write) -> Result<(), FormatError> {
        let d = self.delimiter;

        if self.include_header {
            writeln!(writer, "time_ms{d}time{d}open{d}high{d}low{d}close{d}volume")?;
        }

        for bar in bars {
            let time = bar
                .time()
                .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                .unwrap_or_default();
            writeln!(
                writer,
                "{}{d}{time}{d}{}{d}{}{d}{}{d}{}{d}{}",
                bar.time_ms, bar.open, bar.high, bar.low, bar.close, bar.volume
            )?;
        }

        Ok(())
    }

    fn extension(&self) -> &str {
        if self.delimiter == '\t' { "tsv" } else { "csv" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars() -> Vec<Bar> {
        vec![
            Bar::new(1_705_321_800_000, 1.1000, 1.1005, 1.0999, 1.1003, 12.5),
            Bar::new(1_705_321_860_000, 1.1003, 1.1003, 1.0998, 1.0998, 3.0),
        ]
    }

    fn render(formatter: &CsvFormatter) -> String {
        let mut output = Vec::new();
        formatter.write_bars(&bars(), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_csv_bars() {
        let result = render(&CsvFormatter::new());
        let lines: Vec<_> = result.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "time_ms,time,open,high,low,close,volume");
        assert_eq!(
            lines[1],
            "1705321800000,2024-01-15T12:30:00Z,1.1,1.1005,1.0999,1.1003,12.5"
        );
    }

    #[test]
    fn test_csv_no_header() {
        let result = render(&CsvFormatter::new().with_header(false));
        assert!(!result.contains("time_ms"));
        assert_eq!(result.lines().count(), 2);
    }

    #[test]
    fn test_tsv() {
        let formatter = CsvFormatter::tsv();
        assert!(render(&formatter).starts_with("time_ms\ttime\topen"));
        assert_eq!(formatter.extension(), "tsv");
    }
}
