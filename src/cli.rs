use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Token;
use crate::config::Config;
use crate::error::RunCostError;
use crate::export::{collect_csv_files, dedup_files, merge_sinks, COMBINED_FILE};
use crate::output::{print_dedup_summary, print_fetch_summary, FetchProgress};
use crate::pipeline::{
    run_bounded, run_repository, Cadence, FetchReport, PipelineContext, Shutdown,
};
use crate::providers::github::{ClientSettings, GitHubClient, RetryPolicy, RunStatus};
use crate::window::TimeWindow;
use crate::worklist::Worklist;

#[derive(Parser)]
#[command(name = "runcost")]
#[command(author, version, about = "GitHub Actions job history collector", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch job records for a time window into per-repository and combined CSV files
    Fetch(FetchArgs),

    /// Union CSV datasets from several invocations, one row per job id
    Dedup {
        /// Directories (or files) to collect `*.csv` files from
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct FetchArgs {
    /// Repository as owner/name (repeatable)
    #[arg(short, long = "repo", value_name = "OWNER/NAME")]
    repos: Vec<String>,

    /// File with one owner/name per line
    #[arg(long)]
    repos_file: Option<PathBuf>,

    /// Single UTC day, YYYY-MM-DD
    #[arg(short, long, conflicts_with_all = ["from", "to"])]
    date: Option<String>,

    /// First UTC day of a range, inclusive
    #[arg(long, requires = "to")]
    from: Option<String>,

    /// Last UTC day of a range, inclusive
    #[arg(long, requires = "from")]
    to: Option<String>,

    /// Repositories fetched concurrently
    #[arg(short = 'j', long)]
    parallel: Option<usize>,

    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    status: Option<RunStatus>,

    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    max_retries: Option<u32>,
}

/// Fetch settings after layering flags over the config file.
#[derive(Debug)]
struct FetchSettings {
    token: Option<Token>,
    base_url: String,
    parallel: usize,
    status: RunStatus,
    output_dir: PathBuf,
    repos_file: Option<PathBuf>,
    client: ClientSettings,
    cadence: Cadence,
}

impl FetchSettings {
    fn resolve(args: &FetchArgs, config: &Config) -> Result<Self> {
        let fetch = &config.fetch;

        let parallel = args.parallel.unwrap_or(fetch.parallel);
        if parallel == 0 {
            return Err(RunCostError::Config("--parallel must be at least 1".to_string()).into());
        }

        let token = args
            .token
            .as_deref()
            .or(config.github.token.as_deref())
            .filter(|token| !token.is_empty())
            .map(Token::from);

        Ok(Self {
            token,
            base_url: args
                .base_url
                .clone()
                .unwrap_or_else(|| config.github.base_url.clone()),
            parallel,
            status: args.status.unwrap_or(fetch.status),
            output_dir: args
                .output_dir
                .clone()
                .unwrap_or_else(|| fetch.output_dir.clone()),
            repos_file: args.repos_file.clone().or_else(|| fetch.repos_file.clone()),
            client: ClientSettings {
                per_page: config.github.per_page,
                retry: RetryPolicy {
                    max_retries: args.max_retries.unwrap_or(fetch.max_retries),
                    base_delay: Duration::from_secs(fetch.retry_delay_secs),
                },
                min_remaining: fetch.min_remaining,
            },
            cadence: Cadence {
                pause_every: fetch.pause_every,
                pause: Duration::from_secs(fetch.pause_secs),
                progress_every: fetch.progress_every,
            },
        })
    }
}

impl Cli {
    async fn execute_fetch(args: &FetchArgs, config: &Config) -> Result<()> {
        let settings = FetchSettings::resolve(args, config)?;
        let window = TimeWindow::resolve(
            args.date.as_deref(),
            args.from.as_deref(),
            args.to.as_deref(),
        )?;
        let worklist = Worklist::build(&args.repos, settings.repos_file.as_deref())?;

        let Some(token) = settings.token else {
            return Err(RunCostError::Config(
                "a GitHub token is required (--token, GITHUB_TOKEN or [github] token)".to_string(),
            )
            .into());
        };

        debug!("Window [{}, {})", window.since(), window.until());

        let invocation_dir = settings.output_dir.join(window.label());
        std::fs::create_dir_all(&invocation_dir).with_context(|| {
            format!("Failed to create output directory: {}", invocation_dir.display())
        })?;

        info!(
            "Fetching {} runs for {} repositories in {} ({} at a time)",
            settings.status.as_str(),
            worklist.len(),
            window.label(),
            settings.parallel
        );

        let client = GitHubClient::new(&settings.base_url, Some(token), settings.client)?;
        let shutdown = Shutdown::default();
        shutdown.listen_for_ctrl_c();
        let progress = FetchProgress::start(worklist.len());

        let ctx = Arc::new(PipelineContext {
            client,
            window,
            status: settings.status,
            invocation_dir: invocation_dir.clone(),
            cadence: settings.cadence,
            progress: progress.clone(),
            shutdown: shutdown.clone(),
        });

        let scheduled = run_bounded(worklist.to_vec(), settings.parallel, &shutdown, |repo| {
            let ctx = Arc::clone(&ctx);
            async move { run_repository(&ctx, &repo).await }
        })
        .await;
        progress.finish();

        let mut report = FetchReport::new(
            window.label(),
            invocation_dir.clone(),
            scheduled,
            shutdown.is_triggered(),
        );
        report.merge = merge_sinks(&report.sinks(), &invocation_dir.join(COMBINED_FILE))?;

        print_fetch_summary(&report);

        if report.interrupted {
            bail!("Interrupted: {} repositories not fetched", report.unfinished.len());
        }
        if report.failed() > 0 {
            warn!("{} repositories failed; see the warnings above", report.failed());
        }

        Ok(())
    }

    fn execute_dedup(inputs: &[PathBuf], output: &Path) -> Result<()> {
        let files = collect_csv_files(inputs, Some(output))?;
        if files.is_empty() {
            bail!("No CSV files found under the given inputs");
        }

        info!("Deduplicating {} files into {}", files.len(), output.display());
        let summary = dedup_files(&files, output)?;
        print_dedup_summary(&summary, output);

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Fetch(args) => Self::execute_fetch(args, &config).await,
            Commands::Dedup { inputs, output } => Self::execute_dedup(inputs, output),
        }
    }
}
