//! Union of datasets from separate invocations, one row per `job_id`.
//!
//! Overlapping date ranges fetch the same job more than once. Files are read
//! in path order and the first row seen for a `job_id` wins, so the output is
//! stable for a given directory tree.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::csv::parse_records;
use super::row::{header_line, OutputRow, COLUMNS};
use super::sink::write_atomically;
use crate::error::{Result, RunCostError};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DedupSummary {
    pub files: usize,
    pub rows_read: usize,
    pub rows_written: usize,
}

/// Every `*.csv` file below `roots`, sorted by path, excluding `exclude`.
pub fn collect_csv_files(roots: &[PathBuf], exclude: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending: Vec<PathBuf> = roots.to_vec();

    while let Some(path) = pending.pop() {
        if path.is_dir() {
            for entry in fs::read_dir(&path)? {
                pending.push(entry?.path());
            }
        } else if path.extension().is_some_and(|ext| ext == "csv")
            && exclude.map_or(true, |excluded| excluded != path)
        {
            files.push(path);
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Reads one dataset file, skipping it when its header is not ours.
fn read_rows(path: &Path) -> Result<Option<Vec<OutputRow>>> {
    let contents = fs::read_to_string(path)?;
    let records = parse_records(&contents).map_err(|reason| RunCostError::Csv {
        path: path.to_path_buf(),
        reason,
    })?;

    let mut records = records.into_iter();
    match records.next() {
        Some(header) if header.iter().map(String::as_str).eq(COLUMNS) => {}
        _ => {
            warn!("Skipping {}: not a job dataset", path.display());
            return Ok(None);
        }
    }

    records
        .enumerate()
        .map(|(index, record)| {
            OutputRow::from_record(&record).map_err(|reason| RunCostError::Csv {
                path: path.to_path_buf(),
                reason: format!("record {}: {reason}", index + 1),
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Writes the rows of `files` to `dest`, keeping the first row per `job_id`.
pub fn dedup_files(files: &[PathBuf], dest: &Path) -> Result<DedupSummary> {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut summary = DedupSummary::default();

    for file in files {
        let Some(rows) = read_rows(file)? else {
            continue;
        };
        summary.files += 1;
        summary.rows_read += rows.len();
        debug!("{}: {} rows", file.display(), rows.len());

        kept.extend(rows.into_iter().filter(|row| seen.insert(row.job_id)));
    }

    write_atomically(dest, |out| {
        writeln!(out, "{}", header_line())?;
        for row in &kept {
            row.write_csv(out)?;
        }
        Ok(())
    })?;

    summary.rows_written = kept.len();
    info!(
        "Kept {} of {} rows from {} files in {}",
        summary.rows_written,
        summary.rows_read,
        summary.files,
        dest.display()
    );

    Ok(summary)
}
