use futures::{Stream, TryStreamExt};
use log::debug;

use super::core::GitHubClient;
use crate::error::{Result, RunCostError};
use crate::providers::github::types::{RunStatus, WorkflowRun, WorkflowRunsPage};
use crate::window::TimeWindow;
use crate::worklist::Repository;

impl GitHubClient {
    /// Streams every workflow run of `repo` created inside `window` with the
    /// given status, page by page.
    ///
    /// The API's `created` range is inclusive, so runs are re-checked against
    /// the half-open window before they are yielded.
    pub fn runs<'a>(
        &'a self,
        repo: &Repository,
        window: &TimeWindow,
        status: RunStatus,
    ) -> Result<impl Stream<Item = Result<WorkflowRun>> + 'a> {
        let path = format!("repos/{}/{}/actions/runs", repo.owner(), repo.name());
        let created = window.created_filter();
        let url = self.first_page_url(
            &path,
            &[("status", status.as_str()), ("created", created.as_str())],
        )?;
        let window = *window;

        Ok(self
            .paginate::<WorkflowRunsPage>(url)
            .map_ok(|page| {
                futures::stream::iter(
                    page.workflow_runs
                        .into_iter()
                        .map(Ok::<WorkflowRun, RunCostError>),
                )
            })
            .try_flatten()
            .try_filter(move |run| futures::future::ready(window.contains(run.created_at))))
    }

    /// All runs for `repo` in `window`, unique by run id, sorted by run id.
    pub async fn list_runs(
        &self,
        repo: &Repository,
        window: &TimeWindow,
        status: RunStatus,
    ) -> Result<Vec<WorkflowRun>> {
        let mut runs: Vec<WorkflowRun> = self.runs(repo, window, status)?.try_collect().await?;

        let fetched = runs.len();
        runs.sort_by_key(|run| run.id);
        runs.dedup_by_key(|run| run.id);

        if runs.len() < fetched {
            debug!(
                "{repo}: dropped {} runs repeated across pages",
                fetched - runs.len()
            );
        }

        Ok(runs)
    }
}
