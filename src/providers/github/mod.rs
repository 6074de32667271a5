mod client;
mod rate_limit;
mod runner;
mod types;

pub use client::{ClientSettings, GitHubClient, RetryPolicy};
pub use types::{Job, RunStatus, WorkflowRun};
