use anyhow::Context;

use crate::filters::Filterable;
use crate::models::{GroupAverage, SatisfactionSummary, Series};

/// A derived result flattened for export: one header row plus data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Field names that carry a percentage get a `%` suffix in exports.
fn is_rate_column(column: &str) -> bool {
    column.contains("rate") || column.contains("percentage") || column.contains("improvement")
}

fn format_number(column: &str, value: f64) -> String {
    if is_rate_column(column) {
        format!("{value:.1}%")
    } else {
        format!("{value:.1}")
    }
}

/// Builds a table from any filterable collection, keeping only the selected
/// columns. Unknown columns render as empty cells.
pub fn table_for<R: Filterable>(records: &[R], columns: &[&str]) -> Table {
    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| {
                    if let Some(value) = record.column_number(column) {
                        format_number(column, value)
                    } else {
                        record.column_text(column).unwrap_or_default()
                    }
                })
                .collect()
        })
        .collect();

    Table {
        headers: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

pub fn group_average_table(averages: &[GroupAverage]) -> Table {
    Table {
        headers: vec![
            "group".to_string(),
            "before_correction".to_string(),
            "after_correction".to_string(),
            "improvement".to_string(),
            "count".to_string(),
        ],
        rows: averages
            .iter()
            .map(|g| {
                vec![
                    g.key.clone(),
                    format!("{:.1}", g.before_correction),
                    format!("{:.1}", g.after_correction),
                    format!("{:.1}%", g.improvement),
                    g.count.to_string(),
                ]
            })
            .collect(),
    }
}

pub fn satisfaction_summary_table(summaries: &[SatisfactionSummary]) -> Table {
    Table {
        headers: vec![
            "assistant".to_string(),
            "satisfaction_rate".to_string(),
            "total_responses".to_string(),
            "count".to_string(),
        ],
        rows: summaries
            .iter()
            .map(|s| {
                vec![
                    s.key.clone(),
                    format!("{:.1}%", s.satisfaction_rate),
                    s.total_responses.to_string(),
                    s.count.to_string(),
                ]
            })
            .collect(),
    }
}

pub fn series_table(series: &Series) -> Table {
    let rows = series
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            vec![
                label.clone(),
                format!("{:.1}", series.before_correction[i]),
                format!("{:.1}", series.after_correction[i]),
                format!("{:.1}%", series.improvement[i]),
            ]
        })
        .collect();

    Table {
        headers: vec![
            "label".to_string(),
            "before_correction".to_string(),
            "after_correction".to_string(),
            "improvement".to_string(),
        ],
        rows,
    }
}

/// Serializes a table to CSV text. The csv writer quotes values containing
/// commas, so cells survive a standard round-trip.
pub fn to_csv(table: &Table) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().context("failed to flush csv writer")?;
    String::from_utf8(bytes).context("csv output was not valid UTF-8")
}
