//! Plain-text tables for the command-line reports.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{error::RowError, record::DynamicRecord, stats::Stats};

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }

    for width in &mut widths {
        *width = (*width).max(1);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));

    let separator_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<usize>>();
    let separator_cells = separator_widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator_cells, &separator_widths));

    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }

    output
}

/// One line per rejected row: position, failure kind, field, message.
pub fn render_errors(errors: &[RowError]) -> String {
    let headers = ["row", "kind", "field", "message"].map(String::from);
    let rows = errors
        .iter()
        .map(|error| {
            vec![
                error.row.to_string(),
                format!("{:?}", error.kind).to_lowercase(),
                error.field.clone().unwrap_or_default(),
                error.message.clone(),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

/// Records laid out with one column per field, in `fields` order.
pub fn render_records(fields: &[String], records: &[DynamicRecord]) -> String {
    let rows = records
        .iter()
        .map(|record| {
            fields
                .iter()
                .map(|field| {
                    record
                        .get(field)
                        .map(|value| value.as_display())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect::<Vec<Vec<String>>>();
    render_table(fields, &rows)
}

pub fn render_stats(stats: &Stats) -> String {
    let headers = ["metric", "value"].map(String::from);
    let processing_time = stats
        .processing_time()
        .map(|elapsed| format!("{:.3}s", elapsed.as_secs_f64()))
        .unwrap_or_else(|| "-".to_string());
    let rows = vec![
        vec!["processed_rows".to_string(), stats.processed_rows().to_string()],
        vec!["valid_rows".to_string(), stats.valid_rows().to_string()],
        vec!["error_rows".to_string(), stats.error_rows().to_string()],
        vec![
            "success_rate".to_string(),
            format!("{:.2}%", stats.success_rate()),
        ],
        vec!["processing_time".to_string(), processing_time],
    ];
    render_table(&headers, &rows)
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate().take(widths.len()) {
        let sanitized = sanitize_cell(value);
        let padding = widths[idx].saturating_sub(display_width(&sanitized));
        let mut cell = sanitized.into_owned();
        cell.push_str(&" ".repeat(padding));
        cells.push(cell);
    }
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
