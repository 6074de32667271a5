use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::csv::parse_records;
use super::row::header_line;
use super::sink::write_atomically;
use crate::error::Result;

/// Name of the combined dataset inside an invocation directory.
pub const COMBINED_FILE: &str = "jobs.csv";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Sinks that contributed rows
    pub sinks: usize,
    /// Data rows written, header excluded
    pub rows: usize,
    /// Combined file, when one was written
    pub output: Option<PathBuf>,
}

/// Concatenates repository sinks, in the order given, into `dest`.
///
/// Rows are copied verbatim behind a single header. Sinks that are missing or
/// carry a different header are skipped. Nothing is written when no sink
/// contributes.
pub fn merge_sinks(sinks: &[PathBuf], dest: &Path) -> Result<MergeSummary> {
    let expected_header = header_line();
    let mut bodies = Vec::new();
    let mut rows = 0;

    for sink in sinks {
        if !sink.exists() {
            debug!("Skipping absent sink {}", sink.display());
            continue;
        }

        let contents = fs::read_to_string(sink)?;
        let (header, body) = contents.split_once('\n').unwrap_or((contents.as_str(), ""));

        if header.trim_end_matches('\r') != expected_header {
            warn!("Skipping {}: unexpected header", sink.display());
            continue;
        }

        let count = match parse_records(body) {
            Ok(records) => records.len(),
            Err(reason) => {
                warn!("Skipping {}: {reason}", sink.display());
                continue;
            }
        };
        if count == 0 {
            continue;
        }

        rows += count;
        bodies.push(body.to_string());
    }

    if bodies.is_empty() {
        warn!("No repository produced any jobs; {} not written", dest.display());
        return Ok(MergeSummary::default());
    }

    write_atomically(dest, |out| {
        writeln!(out, "{expected_header}")?;
        for body in &bodies {
            out.write_all(body.as_bytes())?;
            if !body.ends_with('\n') {
                out.write_all(b"\n")?;
            }
        }
        Ok(())
    })?;

    info!(
        "Merged {rows} rows from {} repositories into {}",
        bodies.len(),
        dest.display()
    );

    Ok(MergeSummary {
        sinks: bodies.len(),
        rows,
        output: Some(dest.to_path_buf()),
    })
}
