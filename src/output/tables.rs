use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::pipeline::RepoStatus;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn status_cell(status: &RepoStatus, interrupted: bool) -> Cell {
    match status {
        RepoStatus::Written(_) if interrupted => Cell::new("partial").fg(TableColor::Yellow),
        RepoStatus::Written(_) => Cell::new("written").fg(TableColor::Green),
        RepoStatus::NoRuns => Cell::new("no runs").fg(TableColor::DarkGrey),
        RepoStatus::NoJobs => Cell::new("no jobs").fg(TableColor::Yellow),
        RepoStatus::ListingFailed(_) => Cell::new("listing failed").fg(TableColor::Red),
        RepoStatus::SinkFailed(_) => Cell::new("write failed").fg(TableColor::Red),
    }
}

pub fn minutes_cell(minutes: u64) -> Cell {
    if minutes == 0 {
        Cell::new("-").fg(TableColor::DarkGrey)
    } else {
        Cell::new(minutes)
    }
}
