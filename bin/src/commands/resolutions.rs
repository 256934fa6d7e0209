//! Resolutions command implementation.

use anyhow::Result;
use barline_lib::prelude::*;
use serde::Serialize;

#[derive(Serialize)]
struct ResolutionRow {
    code: &'static str,
    interval_seconds: u64,
    description: &'static str,
}

/// List the supported resolution codes and their intervals.
pub(crate) fn list_resolutions(json: bool) -> Result<()> {
    let rows: Vec<_> = Resolution::all()
        .iter()
        .map(|r| ResolutionRow {
            code: r.code(),
            interval_seconds: r.interval_seconds(),
            description: r.description(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<6} {:>10} {:<20}", "CODE", "SECONDS", "DESCRIPTION");
    println!("{}", "-".repeat(38));

    for row in &rows {
        println!("{:<6} {:>10} {:<20}", row.code, row.interval_seconds, row.description);
    }

    println!("\nUnknown codes fall back to {}.", Resolution::default().code());
    Ok(())
}
