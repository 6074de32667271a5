use std::collections::BTreeMap;
use std::path::PathBuf;

use super::repo::{RepoOutcome, RepoStatus};
use super::scheduler::Scheduled;
use crate::billing::OsCategory;
use crate::export::MergeSummary;
use crate::worklist::Repository;

/// Everything one `fetch` invocation produced, in worklist order.
#[derive(Debug)]
pub struct FetchReport {
    pub window_label: String,
    pub invocation_dir: PathBuf,
    pub outcomes: Vec<RepoOutcome>,
    /// Repositories that never produced an outcome, with the reason
    pub unfinished: Vec<(Repository, String)>,
    pub merge: MergeSummary,
    pub interrupted: bool,
}

impl FetchReport {
    pub fn new(
        window_label: String,
        invocation_dir: PathBuf,
        scheduled: Vec<(Repository, Scheduled<RepoOutcome>)>,
        interrupted: bool,
    ) -> Self {
        let mut outcomes = Vec::new();
        let mut unfinished = Vec::new();

        for (repo, result) in scheduled {
            match result {
                Scheduled::Finished(outcome) => outcomes.push(outcome),
                Scheduled::NotStarted => unfinished.push((repo, "not started".to_string())),
                Scheduled::Panicked(reason) => unfinished.push((repo, reason)),
            }
        }

        Self {
            window_label,
            invocation_dir,
            outcomes,
            unfinished,
            merge: MergeSummary::default(),
            interrupted,
        }
    }

    /// Sinks written in this invocation, in worklist order.
    pub fn sinks(&self) -> Vec<PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.sink().map(PathBuf::from))
            .collect()
    }

    pub fn total_runs(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.runs).sum()
    }

    pub fn total_jobs(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.jobs).sum()
    }

    /// Runs whose job listing failed, across all repositories.
    pub fn failed_runs(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.failed_runs).sum()
    }

    pub fn billed_minutes(&self) -> BTreeMap<OsCategory, u64> {
        let mut totals = BTreeMap::new();
        for outcome in &self.outcomes {
            for (category, minutes) in &outcome.billed_minutes {
                *totals.entry(*category).or_default() += minutes;
            }
        }
        totals
    }

    /// Repositories whose runs could not be listed or whose sink failed.
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| {
                matches!(
                    outcome.status,
                    RepoStatus::ListingFailed(_) | RepoStatus::SinkFailed(_)
                )
            })
            .count()
            + self.unfinished.len()
    }
}
