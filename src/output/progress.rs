use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{figure, heading, success};
use crate::worklist::Repository;

/// Repository-level progress shared by every pipeline of an invocation.
///
/// Cloning is cheap; all clones drive the same bar.
#[derive(Clone)]
pub struct FetchProgress {
    pb: ProgressBar,
}

impl FetchProgress {
    pub fn start(repositories: usize) -> Self {
        eprintln!("{}", heading("⚙️ ", "Fetching"));

        let pb = ProgressBar::new(repositories as u64);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(style) =
            ProgressStyle::default_bar().template("  {msg} [{bar:30}] {pos}/{len} {spinner}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message(figure("Repositories").to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self { pb }
    }

    /// Progress that draws nothing, for tests and non-interactive runs.
    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
        }
    }

    pub fn runs_processed(&self, repo: &Repository, processed: usize, total: usize) {
        self.pb.set_message(
            figure(format!("Repositories ({repo}: {processed}/{total} runs)")).to_string(),
        );
    }

    pub fn repo_finished(&self, repo: &Repository) {
        self.pb.inc(1);
        self.pb
            .set_message(figure(format!("Repositories (last: {repo})")).to_string());
    }

    pub fn finish(&self) {
        self.pb
            .finish_with_message(success("Repositories fetched ✓").to_string());
        eprintln!();
    }

    #[cfg(test)]
    pub fn position(&self) -> u64 {
        self.pb.position()
    }

    #[cfg(test)]
    pub fn message(&self) -> String {
        self.pb.message()
    }
}
