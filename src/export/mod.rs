mod csv;
pub mod dedup;
pub mod merge;
pub mod row;
pub mod sink;

pub use dedup::{collect_csv_files, dedup_files, DedupSummary};
pub use merge::{merge_sinks, MergeSummary, COMBINED_FILE};
pub use row::OutputRow;
pub use sink::RepoSink;
