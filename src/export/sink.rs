use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;

use super::row::{header_line, OutputRow};
use crate::error::Result;
use crate::worklist::Repository;

/// Sub-directory of an invocation directory holding per-repository files.
pub const REPOS_DIR: &str = "repos";

/// CSV file owned by exactly one repository pipeline.
#[derive(Debug, Clone)]
pub struct RepoSink {
    path: PathBuf,
}

impl RepoSink {
    pub fn new(invocation_dir: &Path, repo: &Repository) -> Self {
        Self {
            path: invocation_dir
                .join(REPOS_DIR)
                .join(format!("{}.csv", repo.slug())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the header and all rows, replacing any previous file in one step.
    pub fn write(&self, rows: &[OutputRow]) -> Result<PathBuf> {
        write_atomically(&self.path, |out| {
            writeln!(out, "{}", header_line())?;
            for row in rows {
                row.write_csv(out)?;
            }
            Ok(())
        })?;

        debug!("Wrote {} rows to {}", rows.len(), self.path.display());
        Ok(self.path.clone())
    }
}

/// Writes to a sibling temporary file and renames it over `path`, so readers
/// never observe a half-written file.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let mut out = BufWriter::new(File::create(&partial)?);
    let written = write(&mut out).and_then(|()| out.flush());
    drop(out);

    if let Err(e) = written {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }

    fs::rename(&partial, path)?;
    Ok(())
}
