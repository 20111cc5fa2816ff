use chrono::Duration;
use clap::ValueEnum;
use colored::Colorize as _;
use itertools::Itertools as _;
use qstats_data::{
    sge::SgeUser,
    summary::{JobSummaryTable, QueueActivity, QueueStatusTable},
};
use tabled::{builder::Builder, settings::Style, Table};

const MISSING: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TableFormat {
    /// header separated by a single line, no outer border
    #[default]
    Presto,
    Ascii,
    Markdown,
    Modern,
    Rounded,
    Sharp,
    /// whitespace only
    Plain,
}

impl TableFormat {
    fn apply(self, table: &mut Table) {
        match self {
            TableFormat::Presto => table.with(Style::psql()),
            TableFormat::Ascii => table.with(Style::ascii()),
            TableFormat::Markdown => table.with(Style::markdown()),
            TableFormat::Modern => table.with(Style::modern()),
            TableFormat::Rounded => table.with(Style::rounded()),
            TableFormat::Sharp => table.with(Style::sharp()),
            TableFormat::Plain => table.with(Style::blank()),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    None,
    /// table headers
    Header,
    /// rows of the users asked about
    User,
}

/// Wrap `text` in the terminal codes for `highlight`. Every line is painted on its own so
/// multi-line cells keep their style after the table splits them.
pub fn paint(text: &str, highlight: Highlight, colorize: bool) -> String {
    if !colorize || highlight == Highlight::None {
        return text.to_owned();
    }
    text.split('\n')
        .map(|line| match highlight {
            Highlight::None => line.to_owned(),
            Highlight::Header => line.bold().to_string(),
            Highlight::User => line.magenta().bold().to_string(),
        })
        .join("\n")
}

/// `<days> days HH:MM:SS`, zero (and negative, i.e. not started yet) as `-`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds();
    if secs <= 0 {
        return MISSING.to_owned();
    }
    let (days, rest) = (secs / 86_400, secs % 86_400);
    format!("{days} days {:02}:{:02}:{:02}", rest / 3600, rest % 3600 / 60, rest % 60)
}

fn format_optional<T>(value: Option<T>, format: impl FnOnce(T) -> String) -> String {
    value.map(format).unwrap_or_else(|| MISSING.to_owned())
}

fn build(headers: Vec<String>, rows: Vec<(Vec<String>, Highlight)>, format: TableFormat, colorize: bool) -> String {
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|header| paint(header, Highlight::Header, colorize)));
    for (row, highlight) in rows {
        builder.push_record(row.iter().map(|cell| paint(cell, highlight, colorize)));
    }
    let mut table = builder.build();
    format.apply(&mut table);
    table.to_string()
}

pub fn queue_table(table: &QueueStatusTable, format: TableFormat, colorize: bool) -> String {
    let headers = std::iter::once("queue".to_owned())
        .chain(table.columns.iter().map(|column| column.name().to_owned()))
        .collect_vec();
    let rows = table
        .rows
        .iter()
        .map(|queue| {
            let cells = std::iter::once(queue.name.clone())
                .chain(table.columns.iter().map(|column| column.value(queue).to_string()))
                .collect_vec();
            (cells, Highlight::None)
        })
        .collect_vec();
    build(headers, rows, format, colorize)
}

/// Header cells of one queue's column group: queue, measure, aggregate. Repeated queue and
/// measure names are left blank.
fn queue_headers(queue: &str) -> [String; 6] {
    [
        format!("{queue}\nrunning\nsum"),
        "\npending\nsum".to_owned(),
        "\nduration\nmin".to_owned(),
        "\n\nmean".to_owned(),
        "\n\nmax".to_owned(),
        "\npriority\nmax".to_owned(),
    ]
}

fn activity_cells(activity: Option<&QueueActivity>) -> [String; 6] {
    let Some(activity) = activity else {
        return std::array::from_fn(|_| MISSING.to_owned());
    };
    [
        activity.running.to_string(),
        activity.pending.to_string(),
        format_optional(activity.duration_min, format_duration),
        format_optional(activity.duration_mean, format_duration),
        format_optional(activity.duration_max, format_duration),
        format_optional(activity.priority_max, |priority| format!("{priority:.3}")),
    ]
}

pub fn job_table(table: &JobSummaryTable, highlight: &[String], format: TableFormat, colorize: bool) -> String {
    let headers = std::iter::once("\n\nuser".to_owned())
        .chain(table.queues.iter().flat_map(|queue| queue_headers(queue)))
        .collect_vec();
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let cells = std::iter::once(row.user.to_string())
                .chain(row.queues.iter().flat_map(|activity| activity_cells(activity.as_ref())))
                .collect_vec();
            (cells, highlight_for(&row.user, highlight))
        })
        .collect_vec();
    build(headers, rows, format, colorize)
}

fn highlight_for(user: &SgeUser, highlight: &[String]) -> Highlight {
    if highlight.iter().any(|name| name == user.as_str()) {
        Highlight::User
    } else {
        Highlight::None
    }
}
