use futures::{Stream, TryStreamExt};

use super::core::GitHubClient;
use crate::error::{Result, RunCostError};
use crate::providers::github::types::{Job, WorkflowJobsPage};
use crate::worklist::Repository;

impl GitHubClient {
    /// Streams the jobs of one run in the order the API delivers them.
    pub fn jobs<'a>(
        &'a self,
        repo: &Repository,
        run_id: u64,
    ) -> Result<impl Stream<Item = Result<Job>> + 'a> {
        let path = format!(
            "repos/{}/{}/actions/runs/{run_id}/jobs",
            repo.owner(),
            repo.name()
        );
        let url = self.first_page_url(&path, &[])?;

        Ok(self
            .paginate::<WorkflowJobsPage>(url)
            .map_ok(|page| {
                futures::stream::iter(page.jobs.into_iter().map(Ok::<Job, RunCostError>))
            })
            .try_flatten())
    }

    /// Every job of one run. Any failing page fails the whole run.
    pub async fn fetch_jobs(&self, repo: &Repository, run_id: u64) -> Result<Vec<Job>> {
        self.jobs(repo, run_id)?.try_collect().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::{Matcher, Server};

    use crate::providers::github::client::{ClientSettings, GitHubClient, RetryPolicy};
    use crate::worklist::Repository;

    fn test_client(base_url: &str) -> GitHubClient {
        GitHubClient::new(
            base_url,
            None,
            ClientSettings {
                per_page: 2,
                retry: RetryPolicy {
                    max_retries: 0,
                    base_delay: Duration::ZERO,
                },
                min_remaining: 0,
            },
        )
        .unwrap()
    }

    fn job_json(id: u64, name: &str, labels: &[&str]) -> String {
        let labels: Vec<String> = labels.iter().map(|l| format!("\"{l}\"")).collect();
        format!(
            r#"{{"id": {id}, "run_id": 42, "name": "{name}", "labels": [{}],
                "runner_group_name": "GitHub Actions", "status": "completed",
                "conclusion": "success", "started_at": "2025-01-06T10:00:00Z",
                "completed_at": "2025-01-06T10:01:30Z"}}"#,
            labels.join(",")
        )
    }

    #[tokio::test]
    async fn test_fetch_jobs_across_pages_keeps_api_order() {
        let mut server = Server::new_async().await;
        let next = format!(
            "<{}/repos/acme/api/actions/runs/42/jobs?per_page=2&page=2>; rel=\"next\"",
            server.url()
        );

        server
            .mock("GET", "/repos/acme/api/actions/runs/42/jobs")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("link", &next)
            .with_body(format!(
                r#"{{"total_count": 3, "jobs": [{}, {}]}}"#,
                job_json(502, "test", &["ubuntu-latest"]),
                job_json(501, "build", &["windows-2022"])
            ))
            .create_async()
            .await;

        server
            .mock("GET", "/repos/acme/api/actions/runs/42/jobs")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"total_count": 3, "jobs": [{}]}}"#,
                job_json(503, "deploy", &["self-hosted"])
            ))
            .create_async()
            .await;

        let repo: Repository = "acme/api".parse().unwrap();
        let jobs = test_client(&server.url()).fetch_jobs(&repo, 42).await.unwrap();

        let ids: Vec<u64> = jobs.iter().map(|job| job.id).collect();
        assert_eq!(ids, vec![502, 501, 503]);
        assert_eq!(jobs[1].runner_os(), "windows-2022");
        assert_eq!(jobs[2].runner_os(), "unknown");
    }

    #[tokio::test]
    async fn test_failing_later_page_fails_the_run() {
        let mut server = Server::new_async().await;
        let next = format!(
            "<{}/repos/acme/api/actions/runs/42/jobs?per_page=2&page=2>; rel=\"next\"",
            server.url()
        );

        server
            .mock("GET", "/repos/acme/api/actions/runs/42/jobs")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("link", &next)
            .with_body(format!(
                r#"{{"total_count": 3, "jobs": [{}]}}"#,
                job_json(1, "build", &["ubuntu-latest"])
            ))
            .create_async()
            .await;

        server
            .mock("GET", "/repos/acme/api/actions/runs/42/jobs")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(502)
            .create_async()
            .await;

        let repo: Repository = "acme/api".parse().unwrap();
        let result = test_client(&server.url()).fetch_jobs(&repo, 42).await;

        assert!(result.is_err());
    }
}
