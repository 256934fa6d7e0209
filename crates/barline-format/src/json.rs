//! JSON output format.

use barline_types::Bar;
use std::io::Write;

use crate::{FormatError, Formatter};

/// JSON output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    /// A single JSON array.
    #[default]
    Array,
    /// Newline-delimited JSON.
    Ndjson,
}

/// JSON formatter.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    style: JsonStyle,
    /// Only honored for [`JsonStyle::Array`].
    pretty: bool,
}

impl JsonFormatter {
    /// Creates an array-style formatter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            style: JsonStyle::Array,
            pretty: false,
        }
    }

    /// Creates an NDJSON formatter.
    #[must_use]
    pub const fn ndjson() -> Self {
        Self {
            style: JsonStyle::Ndjson,
            pretty: false,
        }
    }

    /// Sets whether to pretty-print array output.
    #[must_use]
    pub const fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the output style.
    #[must_use]
    pub const fn with_style(mut self, style: JsonStyle) -> Self {
        self.style = style;
        self
    }
}

impl Formatter for JsonFormatter {
    fn write_bars(&self, bars: &[Bar], mut writer: &mut dyn Write) -> Result<(), FormatError> {
        match self.style {
            JsonStyle::Array if self.pretty => serde_json::to_writer_pretty(&mut writer, bars)?,
            JsonStyle::Array => serde_json::to_writer(&mut writer, bars)?,
            JsonStyle::Ndjson => {
                for bar in bars {
                    serde_json::to_writer(&mut writer, bar)?;
                    writeln!(writer)?;
                }
                return Ok(());
            }
        }
        writeln!(writer)?;
        Ok(())
    }

    fn extension(&self) -> &str {
        match self.style {
            JsonStyle::Array => "json",
            JsonStyle::Ndjson => "ndjson",
        }
    }
}
