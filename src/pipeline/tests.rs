use std::fs;
use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Mock, Server, ServerGuard};
use tempfile::TempDir;

use super::repo::RepoPipeline;
use super::*;
use crate::billing::OsCategory;
use crate::export::{merge_sinks, row::header_line, COMBINED_FILE};
use crate::output::FetchProgress;
use crate::providers::github::{ClientSettings, GitHubClient, RetryPolicy, RunStatus};
use crate::window::TimeWindow;
use crate::worklist::Repository;

fn context(server: &ServerGuard, invocation_dir: &std::path::Path) -> PipelineContext {
    let client = GitHubClient::new(
        &server.url(),
        None,
        ClientSettings {
            per_page: 100,
            retry: RetryPolicy {
                max_retries: 0,
                base_delay: Duration::ZERO,
            },
            min_remaining: 0,
        },
    )
    .unwrap();

    PipelineContext {
        client,
        window: TimeWindow::resolve(Some("2025-01-06"), None, None).unwrap(),
        status: RunStatus::Completed,
        invocation_dir: invocation_dir.to_path_buf(),
        cadence: Cadence {
            pause_every: 1,
            pause: Duration::ZERO,
            progress_every: 1,
        },
        progress: FetchProgress::hidden(),
        shutdown: Shutdown::default(),
    }
}

fn run_json(id: u64) -> String {
    format!(
        r#"{{"id": {id}, "run_number": {id}, "name": "CI", "path": ".github/workflows/ci.yml",
            "event": "push", "head_branch": "main", "run_started_at": "2025-01-06T10:00:00Z",
            "created_at": "2025-01-06T10:00:00Z", "status": "completed"}}"#
    )
}

fn job_json(id: u64, run_id: u64, label: &str, conclusion: &str) -> String {
    format!(
        r#"{{"id": {id}, "run_id": {run_id}, "name": "job-{id}", "labels": ["{label}"],
            "runner_group_name": "GitHub Actions", "status": "completed",
            "conclusion": "{conclusion}", "started_at": "2025-01-06T10:00:00Z",
            "completed_at": "2025-01-06T10:01:30Z"}}"#
    )
}

async fn mock_runs(server: &mut ServerGuard, repo: &str, run_ids: &[u64]) -> Mock {
    let runs: Vec<String> = run_ids.iter().map(|id| run_json(*id)).collect();
    server
        .mock("GET", format!("/repos/{repo}/actions/runs").as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"workflow_runs": [{}]}}"#, runs.join(",")))
        .create_async()
        .await
}

async fn mock_jobs(server: &mut ServerGuard, repo: &str, run_id: u64, jobs: &[String]) -> Mock {
    server
        .mock(
            "GET",
            format!("/repos/{repo}/actions/runs/{run_id}/jobs").as_str(),
        )
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"jobs": [{}]}}"#, jobs.join(",")))
        .create_async()
        .await
}

fn data_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_every_job_becomes_a_row_whatever_its_conclusion() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    mock_runs(&mut server, "acme/api", &[1, 2]).await;
    mock_jobs(
        &mut server,
        "acme/api",
        1,
        &[
            job_json(11, 1, "ubuntu-latest", "success"),
            job_json(12, 1, "windows-2022", "failure"),
        ],
    )
    .await;
    mock_jobs(
        &mut server,
        "acme/api",
        2,
        &[job_json(21, 2, "macos-14", "cancelled")],
    )
    .await;

    let ctx = context(&server, temp_dir.path());
    let repo: Repository = "acme/api".parse().unwrap();
    let outcome = run_repository(&ctx, &repo).await;

    assert_eq!(outcome.runs, 2);
    assert_eq!(outcome.jobs, 3);
    assert!(!outcome.interrupted);
    assert_eq!(outcome.billed_minutes[&OsCategory::Linux], 2);
    assert_eq!(outcome.billed_minutes[&OsCategory::Windows], 2);
    assert_eq!(outcome.billed_minutes[&OsCategory::MacOs], 2);

    let sink = outcome.sink().unwrap();
    assert_eq!(sink, temp_dir.path().join("repos/acme_api.csv"));
    let contents = fs::read_to_string(sink).unwrap();
    assert_eq!(contents.lines().next().unwrap(), header_line());
    let rows = data_lines(sink);
    assert_eq!(rows.len(), 3);
    assert!(rows[1].contains(",failure,"));
    assert!(rows[2].contains(",cancelled,"));
    assert!(rows.iter().all(|row| row.ends_with(",90")));
    assert_eq!(ctx.progress.position(), 1);
}

#[tokio::test]
async fn test_cadence_pauses_between_runs_but_not_after_the_last() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    mock_runs(&mut server, "acme/api", &[1, 2, 3, 4, 5]).await;
    for run_id in 1..=5 {
        mock_jobs(
            &mut server,
            "acme/api",
            run_id,
            &[job_json(run_id * 10, run_id, "ubuntu-latest", "success")],
        )
        .await;
    }

    let mut ctx = context(&server, temp_dir.path());
    ctx.cadence = Cadence {
        pause_every: 2,
        pause: Duration::from_millis(20),
        progress_every: 2,
    };
    let repo: Repository = "acme/api".parse().unwrap();

    let started = std::time::Instant::now();
    let outcome = RepoPipeline::new(&ctx, &repo).run().await;

    assert_eq!(outcome.runs, 5);
    assert_eq!(outcome.jobs, 5);
    assert_eq!(outcome.pauses, 2);
    assert!(started.elapsed() >= Duration::from_millis(40));
    // Reported after runs 2 and 4 only; run 5 is not a multiple of two.
    assert!(ctx.progress.message().contains("acme/api: 4/5 runs"));
}

#[tokio::test]
async fn test_cadence_pause_after_the_last_run_is_skipped() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    mock_runs(&mut server, "acme/api", &[1, 2]).await;
    mock_jobs(&mut server, "acme/api", 1, &[job_json(11, 1, "ubuntu-latest", "success")]).await;
    mock_jobs(&mut server, "acme/api", 2, &[job_json(21, 2, "ubuntu-latest", "success")]).await;

    let mut ctx = context(&server, temp_dir.path());
    ctx.cadence = Cadence {
        pause_every: 2,
        pause: Duration::from_secs(30),
        progress_every: 0,
    };

    let outcome = run_repository(&ctx, &"acme/api".parse().unwrap()).await;

    assert_eq!(outcome.pauses, 0);
    assert_eq!(outcome.jobs, 2);
    assert_eq!(ctx.progress.position(), 1);
}

#[tokio::test]
async fn test_failed_job_listing_only_drops_that_run() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    mock_runs(&mut server, "acme/api", &[1, 2]).await;
    server
        .mock("GET", "/repos/acme/api/actions/runs/1/jobs")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    mock_jobs(
        &mut server,
        "acme/api",
        2,
        &[
            job_json(21, 2, "ubuntu-latest", "success"),
            job_json(21, 2, "ubuntu-latest", "success"),
        ],
    )
    .await;

    let ctx = context(&server, temp_dir.path());
    let outcome = run_repository(&ctx, &"acme/api".parse().unwrap()).await;

    assert_eq!(outcome.runs, 2);
    assert_eq!(outcome.failed_runs, 1);
    assert_eq!(outcome.jobs, 1);
    assert!(matches!(outcome.status, RepoStatus::Written(_)));
}

#[tokio::test]
async fn test_repository_without_runs_writes_nothing() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    mock_runs(&mut server, "acme/api", &[]).await;

    let ctx = context(&server, temp_dir.path());
    let outcome = run_repository(&ctx, &"acme/api".parse().unwrap()).await;

    assert_eq!(outcome.status, RepoStatus::NoRuns);
    assert!(!temp_dir.path().join("repos").exists());
}

#[tokio::test]
async fn test_runs_without_jobs_write_nothing() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    mock_runs(&mut server, "acme/api", &[1]).await;
    mock_jobs(&mut server, "acme/api", 1, &[]).await;

    let ctx = context(&server, temp_dir.path());
    let outcome = run_repository(&ctx, &"acme/api".parse().unwrap()).await;

    assert_eq!(outcome.status, RepoStatus::NoJobs);
    assert_eq!(outcome.runs, 1);
    assert!(outcome.sink().is_none());
}

#[tokio::test]
async fn test_shutdown_before_first_run_stops_at_run_boundary() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    mock_runs(&mut server, "acme/api", &[1, 2]).await;
    let jobs = server
        .mock("GET", Matcher::Regex(r"^/repos/acme/api/actions/runs/\d+/jobs".to_string()))
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let ctx = context(&server, temp_dir.path());
    ctx.shutdown.trigger();
    let outcome = run_repository(&ctx, &"acme/api".parse().unwrap()).await;

    assert!(outcome.interrupted);
    assert_eq!(outcome.runs, 0);
    jobs.assert_async().await;
}

#[tokio::test]
async fn test_failing_repository_does_not_affect_the_others() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();

    mock_runs(&mut server, "o/a", &[1]).await;
    mock_jobs(
        &mut server,
        "o/a",
        1,
        &[
            job_json(101, 1, "ubuntu-latest", "success"),
            job_json(102, 1, "ubuntu-latest", "success"),
        ],
    )
    .await;
    server
        .mock("GET", "/repos/o/b/actions/runs")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    mock_runs(&mut server, "o/c", &[3]).await;
    mock_jobs(
        &mut server,
        "o/c",
        3,
        &[job_json(301, 3, "windows-latest", "failure")],
    )
    .await;

    let ctx = Arc::new(context(&server, temp_dir.path()));
    let repos: Vec<Repository> = ["o/a", "o/b", "o/c"]
        .iter()
        .map(|r| r.parse().unwrap())
        .collect();
    let shutdown = ctx.shutdown.clone();

    let scheduled = run_bounded(repos, 2, &shutdown, |repo| {
        let ctx = Arc::clone(&ctx);
        async move { run_repository(&ctx, &repo).await }
    })
    .await;
    let mut report = FetchReport::new(
        ctx.window.label(),
        temp_dir.path().to_path_buf(),
        scheduled,
        false,
    );
    report.merge = merge_sinks(&report.sinks(), &temp_dir.path().join(COMBINED_FILE)).unwrap();

    assert!(matches!(report.outcomes[1].status, RepoStatus::ListingFailed(_)));
    assert_eq!(report.failed(), 1);
    assert_eq!(data_lines(&temp_dir.path().join("repos/o_a.csv")).len(), 2);
    assert_eq!(data_lines(&temp_dir.path().join("repos/o_c.csv")).len(), 1);
    assert!(!temp_dir.path().join("repos/o_b.csv").exists());

    let combined = data_lines(&temp_dir.path().join(COMBINED_FILE));
    assert_eq!(combined.len(), 3);
    assert!(combined[0].starts_with("o/a,"));
    assert!(combined[2].starts_with("o/c,"));
    assert!(combined.iter().all(|row| !row.starts_with("o/b,")));
    assert_eq!(report.merge.sinks, 2);
}
