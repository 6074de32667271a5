use std::io::{self, Write};

use chrono::DateTime;

use super::csv::write_record;
use crate::billing::{billed_minutes, OsCategory};
use crate::providers::github::{Job, WorkflowRun};
use crate::worklist::Repository;

/// Column order of every CSV file this tool writes.
pub const COLUMNS: [&str; 18] = [
    "repo",
    "workflow_name",
    "workflow_file",
    "run_id",
    "run_number",
    "event",
    "branch",
    "run_started_at",
    "job_id",
    "job_name",
    "runner_label",
    "runner_os",
    "runner_group",
    "status",
    "conclusion",
    "job_started_at",
    "job_completed_at",
    "duration_sec",
];

pub const JOB_ID_COLUMN: usize = 8;

pub fn header_line() -> String {
    COLUMNS.join(",")
}

/// One job joined with the run it belongs to, flattened for export.
///
/// `job_id` identifies a row across files; nothing else does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub repo: String,
    pub workflow_name: String,
    pub workflow_file: String,
    pub run_id: u64,
    pub run_number: u64,
    pub event: String,
    pub branch: String,
    pub run_started_at: String,
    pub job_id: u64,
    pub job_name: String,
    pub runner_label: String,
    pub runner_os: String,
    pub runner_group: String,
    pub status: String,
    pub conclusion: String,
    pub job_started_at: String,
    pub job_completed_at: String,
    pub duration_sec: u64,
}

impl OutputRow {
    /// Maps one run and one of its jobs to a row. Every job maps, whatever its
    /// status or conclusion.
    pub fn from_run_job(repo: &Repository, run: &WorkflowRun, job: &Job) -> Self {
        Self {
            repo: repo.to_string(),
            workflow_name: run.name.clone().unwrap_or_default(),
            workflow_file: run.path.clone().unwrap_or_default(),
            run_id: run.id,
            run_number: run.run_number,
            event: run.event.clone(),
            branch: run.head_branch.clone().unwrap_or_default(),
            run_started_at: run.run_started_at.clone().unwrap_or_default(),
            job_id: job.id,
            job_name: job.name.clone(),
            runner_label: job.runner_label(),
            runner_os: job.runner_os(),
            runner_group: job.runner_group_name.clone().unwrap_or_default(),
            status: job.status.clone(),
            conclusion: job.conclusion.clone().unwrap_or_default(),
            job_started_at: job.started_at.clone().unwrap_or_default(),
            job_completed_at: job.completed_at.clone().unwrap_or_default(),
            duration_sec: duration_sec(job.started_at.as_deref(), job.completed_at.as_deref()),
        }
    }

    /// Rebuilds a row from a parsed CSV record in [`COLUMNS`] order.
    pub fn from_record(record: &[String]) -> Result<Self, String> {
        if record.len() != COLUMNS.len() {
            return Err(format!(
                "expected {} fields, found {}",
                COLUMNS.len(),
                record.len()
            ));
        }

        let number = |index: usize| -> Result<u64, String> {
            record[index]
                .parse()
                .map_err(|_| format!("{} is not a number: '{}'", COLUMNS[index], record[index]))
        };

        Ok(Self {
            repo: record[0].clone(),
            workflow_name: record[1].clone(),
            workflow_file: record[2].clone(),
            run_id: number(3)?,
            run_number: number(4)?,
            event: record[5].clone(),
            branch: record[6].clone(),
            run_started_at: record[7].clone(),
            job_id: number(JOB_ID_COLUMN)?,
            job_name: record[9].clone(),
            runner_label: record[10].clone(),
            runner_os: record[11].clone(),
            runner_group: record[12].clone(),
            status: record[13].clone(),
            conclusion: record[14].clone(),
            job_started_at: record[15].clone(),
            job_completed_at: record[16].clone(),
            duration_sec: number(17)?,
        })
    }

    pub fn write_csv<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let run_id = self.run_id.to_string();
        let run_number = self.run_number.to_string();
        let job_id = self.job_id.to_string();
        let duration = self.duration_sec.to_string();

        write_record(
            out,
            &[
                self.repo.as_str(),
                self.workflow_name.as_str(),
                self.workflow_file.as_str(),
                run_id.as_str(),
                run_number.as_str(),
                self.event.as_str(),
                self.branch.as_str(),
                self.run_started_at.as_str(),
                job_id.as_str(),
                self.job_name.as_str(),
                self.runner_label.as_str(),
                self.runner_os.as_str(),
                self.runner_group.as_str(),
                self.status.as_str(),
                self.conclusion.as_str(),
                self.job_started_at.as_str(),
                self.job_completed_at.as_str(),
                duration.as_str(),
            ],
        )
    }

    pub fn os_category(&self) -> OsCategory {
        OsCategory::from_runner_os(&self.runner_os)
    }

    pub fn billed_minutes(&self) -> u64 {
        billed_minutes(self.duration_sec)
    }
}

/// Whole seconds between two RFC 3339 timestamps.
///
/// Zero when either is missing or unparsable, or when the end precedes the start.
pub fn duration_sec(started_at: Option<&str>, completed_at: Option<&str>) -> u64 {
    let (Some(started), Some(completed)) = (started_at, completed_at) else {
        return 0;
    };
    let (Ok(started), Ok(completed)) = (
        DateTime::parse_from_rfc3339(started),
        DateTime::parse_from_rfc3339(completed),
    ) else {
        return 0;
    };

    u64::try_from((completed - started).num_seconds()).unwrap_or(0)
}
