//! Terminal rendering for the dashboard.

use colored::Colorize;
use dataset_session::{SessionSnapshot, SourceKind, ViewState};
use shared::charts::{averages_series, distribution_series, ChartSeries};
use shared::{DatasetId, DatasetRecord, HistoryEntry, Summary, PARAMETERS};
use tabled::settings::Style;
use tabled::{Table, Tabled};

const BAR_WIDTH: usize = 40;

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Equipment Name")]
    name: String,
    #[tabled(rename = "Type")]
    equipment_type: String,
    #[tabled(rename = "Flowrate")]
    flowrate: String,
    #[tabled(rename = "Pressure")]
    pressure: String,
    #[tabled(rename = "Temperature")]
    temperature: String,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "ID")]
    id: DatasetId,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Rows")]
    rows: u64,
    #[tabled(rename = "Uploaded")]
    uploaded: String,
}

/// Two decimal places, or "-" for a missing value
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

/// Bar length for `value` scaled against `max`
pub fn bar_len(value: f64, max: f64, width: usize) -> usize {
    if max <= 0.0 || value <= 0.0 {
        return 0;
    }
    let len = (value / max * width as f64).round() as usize;
    len.clamp(1, width)
}

pub fn print_error(message: &str) {
    println!("  {} {}", "✗".bright_red(), message.bright_red());
}

pub fn print_signed_in(username: &str) {
    println!("{} Signed in as {}", "✓".green(), username.bold());
}

pub fn print_signed_out() {
    println!("{} Signed out", "✓".green());
}

pub fn print_not_signed_in() {
    println!("{} Not signed in", "✗".red());
    println!("  Run {} to sign in.", "equipment-viz login -u <user>".bright_yellow());
}

pub fn print_status(username: Option<&str>, server_url: &str, session_file: &str) {
    match username {
        Some(user) => println!("{} Signed in as {}", "✓".green(), user.bold()),
        None => println!("{} Not signed in", "✗".red()),
    }
    println!("  {} {}", "Server:".dimmed(), server_url.bright_white());
    println!("  {} {}", "Session file:".dimmed(), session_file.bright_white());
}

fn print_summary_cards(summary: &Summary, view: &ViewState) {
    let source = match view.source_kind {
        Some(SourceKind::Fresh) => "uploaded".bright_green(),
        Some(SourceKind::Historical) => "history".bright_cyan(),
        None => "-".normal(),
    };
    if let Some(id) = view.active_dataset_id {
        println!(
            "{} {} ({})",
            "Dataset".bold(),
            id.to_string().bright_cyan(),
            source
        );
    }
    println!();
    println!(
        "  {:<22} {}",
        "Total Equipment".dimmed(),
        summary.total_count.to_string().bright_white().bold()
    );
    for param in PARAMETERS {
        println!(
            "  {:<22} {}",
            format!("Avg {}", param).dimmed(),
            format_value(summary.average(param)).bright_white()
        );
    }
    println!();
}

fn print_chart(series: &ChartSeries) {
    println!("{}", series.title.bold());
    if series.is_empty() {
        println!("  {}", "No data".dimmed());
        println!();
        return;
    }

    let max = series.max_value();
    let label_width = series
        .points
        .iter()
        .map(|p| p.label.chars().count())
        .max()
        .unwrap_or(0);

    for point in &series.points {
        let (r, g, b) = point.color;
        let bar = "█".repeat(bar_len(point.value.unwrap_or(0.0), max, BAR_WIDTH));
        println!(
            "  {:<width$} {} {}",
            point.label,
            bar.truecolor(r, g, b),
            format_value(point.value).dimmed(),
            width = label_width
        );
    }
    println!();
}

fn history_rows(history: &[HistoryEntry], active: Option<DatasetId>) -> Vec<HistoryRow> {
    history
        .iter()
        .map(|entry| HistoryRow {
            marker: if Some(entry.id) == active { "●" } else { "" },
            id: entry.id,
            name: entry.name.clone(),
            rows: entry.row_count,
            uploaded: entry.created_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect()
}

pub fn print_history(snapshot: &SessionSnapshot) {
    println!("{}", "Recent Uploads".bold());
    if snapshot.history.is_empty() {
        println!("  {}", "No uploads yet".dimmed());
        println!();
        return;
    }

    let active = snapshot.view.active_dataset_id;
    for entry in &snapshot.history {
        let marker = if Some(entry.id) == active {
            "●".bright_green()
        } else if Some(entry.id) == snapshot.selected_history_id {
            "○".bright_yellow()
        } else {
            " ".normal()
        };
        println!(
            "  {} {} {}",
            marker,
            entry.name.bright_white(),
            format!("#{}", entry.id).dimmed()
        );
        println!(
            "      {} rows, {}",
            entry.row_count,
            entry.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
}

pub fn print_history_table(snapshot: &SessionSnapshot) {
    if snapshot.history.is_empty() {
        println!("No uploads yet");
        return;
    }
    let mut table = Table::new(history_rows(
        &snapshot.history,
        snapshot.view.active_dataset_id,
    ));
    table.with(Style::rounded());
    println!("{}", table);
}

fn record_rows(records: &[DatasetRecord]) -> Vec<RecordRow> {
    records
        .iter()
        .map(|r| {
            let [flowrate, pressure, temperature] =
                PARAMETERS.map(|param| format_value(r.parameter(param)));
            RecordRow {
                name: r.equipment_name.clone(),
                equipment_type: r.equipment_type.clone(),
                flowrate,
                pressure,
                temperature,
            }
        })
        .collect()
}

pub fn print_records(view: &ViewState) {
    if view.records.is_empty() {
        if view.source_kind == Some(SourceKind::Historical) {
            println!(
                "{}",
                "Summary only. Raw records are available for fresh uploads.".dimmed()
            );
        }
        return;
    }

    println!("{} ({} rows)", "Records".bold(), view.records.len());
    let mut table = Table::new(record_rows(&view.records));
    table.with(Style::rounded());
    println!("{}", table);
}

/// Cards, charts, history and records for the current view
pub fn print_dashboard(snapshot: &SessionSnapshot, with_history: bool) {
    if let Some(message) = &snapshot.error {
        print_error(message);
        println!();
    }

    match &snapshot.view.summary {
        Some(summary) => {
            print_summary_cards(summary, &snapshot.view);
            print_chart(&distribution_series(summary));
            print_chart(&averages_series(summary));
        }
        None => {
            println!("{}", "No dataset loaded".dimmed());
            println!(
                "  Upload one with {}.",
                "equipment-viz upload <file.csv>".bright_yellow()
            );
            println!();
        }
    }

    if with_history {
        print_history(snapshot);
    }
    print_records(&snapshot.view);
}

/// Tables only, for `--format table`
pub fn print_tables(snapshot: &SessionSnapshot, with_history: bool) {
    if let Some(message) = &snapshot.error {
        eprintln!("Error: {}", message);
    }
    if with_history {
        print_history_table(snapshot);
    }
    if let Some(summary) = &snapshot.view.summary {
        let metric = |metric: String, value: String| MetricRow { metric, value };
        let mut rows = vec![metric("Total".to_string(), summary.total_count.to_string())];
        rows.extend(
            summary
                .equipment_type_distribution
                .iter()
                .map(|(k, v)| metric(k.clone(), v.to_string())),
        );
        rows.extend(
            PARAMETERS
                .iter()
                .map(|p| metric(format!("Avg {}", p), format_value(summary.average(p)))),
        );

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{}", table);
    }
    if !snapshot.view.records.is_empty() {
        let mut table = Table::new(record_rows(&snapshot.view.records));
        table.with(Style::rounded());
        println!("{}", table);
    }
}
