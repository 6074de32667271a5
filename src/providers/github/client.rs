mod core;
mod jobs;
mod runs;

pub use self::core::{ClientSettings, GitHubClient, RetryPolicy};
