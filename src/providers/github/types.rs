use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::runner::derive_runner_os;

/// Run status filter accepted by the runs endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Completed,
    Success,
    Failure,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// GitHub Actions workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    /// Unique identifier for the workflow run
    pub id: u64,
    /// Per-workflow run counter
    pub run_number: u64,
    /// Name of the workflow
    #[serde(default)]
    pub name: Option<String>,
    /// Path to the workflow file
    #[serde(default)]
    pub path: Option<String>,
    /// Event that triggered the run
    #[serde(default)]
    pub event: String,
    /// Head branch or tag name
    #[serde(default)]
    pub head_branch: Option<String>,
    /// When the current attempt started, as reported
    #[serde(default)]
    pub run_started_at: Option<String>,
    /// When the run was created
    pub created_at: DateTime<Utc>,
}

/// Job within a GitHub Actions workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    /// Unique identifier for the job
    pub id: u64,
    /// Run the job belongs to
    pub run_id: u64,
    /// Name of the job
    pub name: String,
    /// Labels requested for the runner
    #[serde(default)]
    pub labels: Vec<String>,
    /// Runner group the job was scheduled on
    #[serde(default)]
    pub runner_group_name: Option<String>,
    /// Status of the job
    #[serde(default)]
    pub status: String,
    /// Conclusion of the job
    #[serde(default)]
    pub conclusion: Option<String>,
    /// When the job started, as reported
    #[serde(default)]
    pub started_at: Option<String>,
    /// When the job completed, as reported
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl Job {
    /// Raw label set, comma joined.
    pub fn runner_label(&self) -> String {
        self.labels.join(",")
    }

    pub fn runner_os(&self) -> String {
        derive_runner_os(&self.labels)
    }
}

/// One page of the list-runs response.
#[derive(Debug, Deserialize)]
pub(super) struct WorkflowRunsPage {
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

/// One page of the list-jobs response.
#[derive(Debug, Deserialize)]
pub(super) struct WorkflowJobsPage {
    #[serde(default)]
    pub jobs: Vec<Job>,
}
