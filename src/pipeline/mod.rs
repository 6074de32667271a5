//! Bounded-parallel fetch: one sequential pipeline per repository, at most
//! `parallel` of them in flight.

mod repo;
mod report;
mod scheduler;
#[cfg(test)]
mod tests;

pub use repo::{run_repository, Cadence, PipelineContext, RepoOutcome, RepoStatus};
pub use report::FetchReport;
pub use scheduler::{run_bounded, Scheduled, Shutdown};
