use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use super::styling::{failures, figure, heading, label, location};
use super::tables::{create_table, cyan_header, minutes_cell, status_cell};
use crate::billing::OsCategory;
use crate::export::DedupSummary;
use crate::pipeline::FetchReport;

/// Prints the per-repository outcome of a `fetch` invocation to stdout.
///
/// Billed minutes are shown per runner OS family so Linux, Windows and macOS
/// usage can be priced separately.
pub fn print_fetch_summary(report: &FetchReport) {
    println!("{}", render_fetch_summary(report));
}

pub fn print_dedup_summary(summary: &DedupSummary, output: &std::path::Path) {
    println!(
        "{}\n  {} {}\n  {} {}\n  {} {}\n",
        heading("🧹", "Deduplicated"),
        label("Files read:"),
        figure(summary.files),
        label("Rows kept:"),
        figure(format!("{} of {}", summary.rows_written, summary.rows_read)),
        label("Output:"),
        location(output.display()),
    );
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{}", heading(emoji, title));
}

fn render_fetch_summary(report: &FetchReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");

    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        label("Window:"),
        location(&report.window_label),
        label("Repositories:"),
        figure(report.outcomes.len() + report.unfinished.len()),
        label("Runs processed:"),
        figure(report.total_runs()),
        label("Jobs collected:"),
        figure(report.total_jobs()),
        label("Runs without jobs (listing failed):"),
        figure(report.failed_runs()),
        label("Failed repositories:"),
        failures(report.failed()),
    );

    if report.interrupted {
        let _ = writeln!(
            output,
            "{}\n",
            figure("Interrupted: files hold only the runs processed before shutdown.")
        );
    }

    add_section_header(&mut output, "📋", "Repositories");

    let mut header = vec!["Repository", "Runs", "Jobs", "Status"];
    let category_labels: Vec<String> = OsCategory::ALL
        .iter()
        .map(|category| format!("{category} min"))
        .collect();
    header.extend(category_labels.iter().map(String::as_str));

    let mut repos_table = create_table();
    repos_table.set_header(cyan_header(&header));

    for outcome in &report.outcomes {
        let mut row = vec![
            Cell::new(&outcome.repo),
            Cell::new(outcome.runs),
            Cell::new(outcome.jobs),
            status_cell(&outcome.status, outcome.interrupted),
        ];
        row.extend(OsCategory::ALL.iter().map(|category| {
            minutes_cell(
                outcome
                    .billed_minutes
                    .get(category)
                    .copied()
                    .unwrap_or_default(),
            )
        }));
        repos_table.add_row(row);
    }

    for (repo, reason) in &report.unfinished {
        let mut row = vec![
            Cell::new(repo),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new(reason).fg(TableColor::Red),
        ];
        row.extend(OsCategory::ALL.iter().map(|_| Cell::new("")));
        repos_table.add_row(row);
    }

    let totals = report.billed_minutes();
    let mut total_row = vec![
        Cell::new("Total").fg(TableColor::Cyan),
        Cell::new(report.total_runs()),
        Cell::new(report.total_jobs()),
        Cell::new(""),
    ];
    total_row.extend(
        OsCategory::ALL
            .iter()
            .map(|category| minutes_cell(totals.get(category).copied().unwrap_or_default())),
    );
    repos_table.add_row(total_row);

    let _ = writeln!(output, "{repos_table}\n");

    add_section_header(&mut output, "📁", "Output");
    let _ = writeln!(
        output,
        "  {} {}",
        label("Directory:"),
        location(report.invocation_dir.display())
    );
    match &report.merge.output {
        Some(path) => {
            let _ = writeln!(
                output,
                "  {} {} ({} rows from {} repositories)",
                label("Combined:"),
                location(path.display()),
                figure(report.merge.rows),
                report.merge.sinks
            );
        }
        None => {
            let _ = writeln!(
                output,
                "  {} {}",
                label("Combined:"),
                figure("not written, no repository produced jobs")
            );
        }
    }

    output
}
