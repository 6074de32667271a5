mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::FetchProgress;
pub use summary::{print_dedup_summary, print_fetch_summary};

/// Prints the `runcost` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        styling::banner("💸 runcost"),
        styling::label(env!("CARGO_PKG_VERSION")),
        styling::label("GitHub Actions job history collector")
    );
}
