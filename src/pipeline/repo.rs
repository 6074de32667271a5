use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, error, info, warn};

use super::scheduler::Shutdown;
use crate::billing::OsCategory;
use crate::export::{OutputRow, RepoSink};
use crate::output::FetchProgress;
use crate::providers::github::{GitHubClient, RunStatus, WorkflowRun};
use crate::window::TimeWindow;
use crate::worklist::Repository;

/// Fixed pacing applied while walking a repository's runs.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    /// Pause after this many runs; 0 disables the pause
    pub pause_every: usize,
    pub pause: Duration,
    /// Report progress after this many runs; 0 disables reporting
    pub progress_every: usize,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            pause_every: 10,
            pause: Duration::from_secs(1),
            progress_every: 25,
        }
    }
}

/// Everything a repository pipeline reads. Shared read-only by all pipelines.
pub struct PipelineContext {
    pub client: GitHubClient,
    pub window: TimeWindow,
    pub status: RunStatus,
    pub invocation_dir: PathBuf,
    pub cadence: Cadence,
    pub progress: FetchProgress,
    pub shutdown: Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    Idle,
    ListingRuns,
    FetchingJobs { run_id: u64 },
    Flushing,
    Done,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoStatus {
    Written(PathBuf),
    NoRuns,
    ListingFailed(String),
    NoJobs,
    SinkFailed(String),
}

#[derive(Debug, Clone)]
pub struct RepoOutcome {
    pub repo: Repository,
    pub runs: usize,
    pub jobs: usize,
    /// Runs whose job listing failed and were counted as empty
    pub failed_runs: usize,
    pub billed_minutes: BTreeMap<OsCategory, u64>,
    /// Cadence pauses taken between runs
    pub pauses: usize,
    pub status: RepoStatus,
    /// Stopped early on shutdown; the sink holds the runs processed so far
    pub interrupted: bool,
}

impl RepoOutcome {
    fn new(repo: &Repository, status: RepoStatus) -> Self {
        Self {
            repo: repo.clone(),
            runs: 0,
            jobs: 0,
            failed_runs: 0,
            billed_minutes: BTreeMap::new(),
            pauses: 0,
            status,
            interrupted: false,
        }
    }

    /// Sink written by this pipeline, if any.
    pub fn sink(&self) -> Option<&Path> {
        match &self.status {
            RepoStatus::Written(path) => Some(path),
            _ => None,
        }
    }
}

pub(super) struct RepoPipeline<'a> {
    ctx: &'a PipelineContext,
    repo: &'a Repository,
    state: RepoState,
}

impl<'a> RepoPipeline<'a> {
    pub(super) fn new(ctx: &'a PipelineContext, repo: &'a Repository) -> Self {
        Self {
            ctx,
            repo,
            state: RepoState::Idle,
        }
    }

    fn advance(&mut self, next: RepoState) {
        debug!("{}: {:?} -> {:?}", self.repo, self.state, next);
        self.state = next;
    }

    async fn list_runs(&mut self) -> Result<Vec<WorkflowRun>, String> {
        self.advance(RepoState::ListingRuns);
        self.ctx
            .client
            .list_runs(self.repo, &self.ctx.window, self.ctx.status)
            .await
            .map_err(|e| e.to_string())
    }

    pub(super) async fn run(mut self) -> RepoOutcome {
        let runs = match self.list_runs().await {
            Ok(runs) => runs,
            Err(e) => {
                warn!("Failed to list runs for {}: {e}", self.repo);
                self.advance(RepoState::Skipped);
                return RepoOutcome::new(self.repo, RepoStatus::ListingFailed(e));
            }
        };

        if runs.is_empty() {
            info!("No runs found for {}", self.repo);
            self.advance(RepoState::Skipped);
            return RepoOutcome::new(self.repo, RepoStatus::NoRuns);
        }

        info!("{}: {} runs to process", self.repo, runs.len());

        let cadence = self.ctx.cadence;
        let mut outcome = RepoOutcome::new(self.repo, RepoStatus::NoJobs);
        let mut rows = Vec::new();
        let mut seen_jobs = HashSet::new();

        for (index, run) in runs.iter().enumerate() {
            if self.ctx.shutdown.is_triggered() {
                warn!(
                    "{}: stopping after {index} of {} runs on shutdown",
                    self.repo,
                    runs.len()
                );
                outcome.interrupted = true;
                break;
            }

            self.advance(RepoState::FetchingJobs { run_id: run.id });
            match self.ctx.client.fetch_jobs(self.repo, run.id).await {
                Ok(jobs) => {
                    for job in &jobs {
                        if job.run_id != run.id {
                            warn!(
                                "{}: job {} belongs to run {} but was listed under run {}",
                                self.repo, job.id, job.run_id, run.id
                            );
                        }
                        if !seen_jobs.insert(job.id) {
                            debug!("{}: job {} repeated, skipping", self.repo, job.id);
                            continue;
                        }
                        let row = OutputRow::from_run_job(self.repo, run, job);
                        *outcome.billed_minutes.entry(row.os_category()).or_default() +=
                            row.billed_minutes();
                        rows.push(row);
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch jobs for {} run {}: {e}", self.repo, run.id);
                    outcome.failed_runs += 1;
                }
            }

            let processed = index + 1;
            outcome.runs = processed;

            if cadence.progress_every > 0 && processed % cadence.progress_every == 0 {
                info!(
                    "{}: processed {processed}/{} runs, {} jobs so far",
                    self.repo,
                    runs.len(),
                    rows.len()
                );
                self.ctx
                    .progress
                    .runs_processed(self.repo, processed, runs.len());
            }

            if cadence.pause_every > 0
                && processed % cadence.pause_every == 0
                && processed < runs.len()
                && !cadence.pause.is_zero()
            {
                debug!("{}: pausing {:?} after {processed} runs", self.repo, cadence.pause);
                tokio::time::sleep(cadence.pause).await;
                outcome.pauses += 1;
            }
        }

        self.advance(RepoState::Flushing);
        outcome.jobs = rows.len();

        if rows.is_empty() {
            warn!("No jobs found for {}; no file written", self.repo);
        } else {
            let sink = RepoSink::new(&self.ctx.invocation_dir, self.repo);
            let target = sink.path().to_path_buf();
            let written = tokio::task::spawn_blocking(move || sink.write(&rows)).await;
            outcome.status = match written {
                Ok(Ok(path)) => {
                    info!("{}: wrote {} jobs to {}", self.repo, outcome.jobs, path.display());
                    RepoStatus::Written(path)
                }
                Ok(Err(e)) => {
                    error!("Failed to write {}: {e}", target.display());
                    RepoStatus::SinkFailed(e.to_string())
                }
                Err(e) => {
                    error!("Writer for {} did not finish: {e}", target.display());
                    RepoStatus::SinkFailed(e.to_string())
                }
            };
        }

        self.advance(RepoState::Done);
        outcome
    }
}

/// Lists, fetches, maps and flushes one repository, sequentially.
///
/// Never fails: upstream errors degrade to fewer rows and are reported in the
/// returned outcome.
pub async fn run_repository(ctx: &PipelineContext, repo: &Repository) -> RepoOutcome {
    let outcome = RepoPipeline::new(ctx, repo).run().await;
    ctx.progress.repo_finished(repo);
    outcome
}
