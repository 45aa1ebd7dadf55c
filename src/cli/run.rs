use super::ui;
use crate::pipeline::{Pipeline, RunOutcome, RunReport};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::{Cell, CellAlignment, Color};

pub fn display_report(report: &RunReport) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Task"), ui::header_cell("Attempts")]);
    for run in &report.tasks {
        table.add_row(vec![
            Cell::new(run.task.name()),
            Cell::new(run.attempts).set_alignment(CellAlignment::Right),
        ]);
    }

    let mut output = format!(
        "Run: {}\n\n{}\n\n",
        ui::style_text(&report.date.to_string(), ui::StyleType::Title),
        table
    );
    if report.published_date != report.date {
        output.push_str(&ui::style_text(
            &format!("Provider dated these rates {}\n", report.published_date),
            ui::StyleType::Subtle,
        ));
    }
    output.push_str(&format!(
        "{} {} ({} {} rates)",
        ui::style_text("Published:", ui::StyleType::TotalLabel),
        ui::style_text(&report.remote_key, ui::StyleType::TotalValue),
        report.currencies,
        report.base,
    ));
    output
}

/// One row per date: the published key, or the failing task and error.
pub fn display_backfill(outcomes: &[RunOutcome]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Status"),
        ui::header_cell("Details"),
    ]);

    let mut failed = 0;
    for outcome in outcomes {
        match outcome {
            Ok(report) => table.add_row(vec![
                Cell::new(report.date),
                Cell::new("ok").fg(Color::Green),
                Cell::new(&report.remote_key),
            ]),
            Err(failure) => {
                failed += 1;
                table.add_row(vec![
                    Cell::new(failure.date),
                    Cell::new("failed").fg(Color::Red),
                    Cell::new(format!("{}: {}", failure.task, failure.source)),
                ])
            }
        };
    }

    let summary_style = if failed == 0 {
        ui::StyleType::TotalValue
    } else {
        ui::StyleType::Error
    };
    format!(
        "{}\n\n{} {}",
        table,
        ui::style_text("Failed runs:", ui::StyleType::TotalLabel),
        ui::style_text(&format!("{failed}/{}", outcomes.len()), summary_style)
    )
}

/// Runs the range with a progress bar, prints the summary and fails if any
/// date failed.
pub async fn backfill(
    pipeline: &Pipeline,
    from: NaiveDate,
    to: NaiveDate,
    concurrency: usize,
) -> Result<()> {
    let total = (to - from).num_days() + 1;
    let pb = ui::new_progress_bar(total.max(0) as u64, true);
    pb.set_message(format!("Backfilling {from}..{to}"));

    let outcomes = pipeline
        .backfill(from, to, concurrency, |_| pb.inc(1))
        .await;
    pb.finish_and_clear();

    println!("{}", display_backfill(&outcomes));

    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} backfill runs failed", outcomes.len());
    }
    Ok(())
}
