//! Display utilities and output formatting for the barline CLI.

use anyhow::{Context, Result};
use barline_lib::prelude::*;
use barline_lib::formatter_for;
use clap::ValueEnum;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output format for built bars.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Format {
    Csv,
    Json,
    Ndjson,
}

impl Format {
    pub(crate) const fn output_format(self) -> OutputFormat {
        match self {
            Self::Csv => OutputFormat::Csv,
            Self::Json => OutputFormat::Json,
            Self::Ndjson => OutputFormat::Ndjson,
        }
    }

    /// Returns the file extension for this format.
    pub(crate) const fn extension(self) -> &'static str {
        self.output_format().extension()
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Write bars to a file in the specified format.
pub(crate) fn write_bars(bars: &[Bar], output: &Path, format: Format) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("Cannot create output file: {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    formatter_for(format.output_format()).write_bars(bars, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// File name for the bars of one subscription, safe for any symbol.
pub(crate) fn bar_file_name(symbol: &str, resolution: Resolution, format: Format) -> String {
    let stem: String = symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{stem}_{}.{}", resolution.code(), format.extension())
}
