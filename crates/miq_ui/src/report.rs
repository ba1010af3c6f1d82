//! Plain-text table structure report.

use std::fmt::Write as _;

use miq_db::{Column, TableStructure};

use crate::display::{MAX_CELL_WIDTH, display_width, pad_display, truncate_display};

const RULE_WIDTH: usize = 80;
const GAP: &str = "  ";

/// Render the structure of one table: header, columns, keys, indexes and a
/// sample of its newest rows.
#[must_use]
pub fn render_structure(structure: &TableStructure, sample_rows: u64) -> String {
    let mut out = format!("Table: {}.{}", structure.database, structure.table);
    if let Some(comment) = &structure.comment {
        let _ = write!(out, " [{comment}]");
    }
    out.push('\n');
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push_str("\n\n");

    out.push_str("-- Columns --\n");
    out.push_str(&structure.structure_sql);
    out.push_str("\n\n");
    render_columns(&mut out, &structure.columns);
    out.push('\n');

    if !structure.primary_key.is_empty() {
        out.push_str("-- Primary Key --\n");
        let _ = writeln!(out, "Primary Key({})\n", structure.primary_key.join(", "));
    }

    if !structure.foreign_keys.is_empty() {
        out.push_str("-- Foreign Keys --\n");
        for fk in &structure.foreign_keys {
            let _ = writeln!(
                out,
                "FOREIGN KEY ({}) REFERENCES {}({})",
                fk.column, fk.referenced_table, fk.referenced_column
            );
        }
        out.push('\n');
    }

    if !structure.indexes.is_empty() {
        out.push_str("-- Indexes --\n");
        for index in &structure.indexes {
            let unique = if index.unique { "UNIQUE " } else { "" };
            let _ = writeln!(out, "{unique}INDEX {} ({})", index.name, index.columns.join(", "));
        }
    }

    let _ = writeln!(out, "\n-- Sample Data ({sample_rows} rows) --");
    if let Some(sql) = &structure.sample_sql {
        out.push_str(sql);
        out.push_str("\n\n");
    }
    render_sample(&mut out, structure);
    out
}

fn render_columns(out: &mut String, columns: &[Column]) {
    if columns.is_empty() {
        out.push_str("No columns found.\n");
        return;
    }

    let widest = |min: usize, f: fn(&Column) -> String| {
        columns
            .iter()
            .map(|c| display_width(&f(c)))
            .fold(min, usize::max)
    };
    let default_text = |c: &Column| c.default.clone().unwrap_or_else(|| "NULL".to_string());
    let widths = [
        widest(15, |c| c.name.clone()),
        widest(20, |c| c.column_type.clone()),
        8,
        widest(15, |c| c.default.clone().unwrap_or_else(|| "NULL".to_string())),
        widest(10, |c| c.comment.clone()),
    ];

    let line = |cells: [&str; 5]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| pad_display(cell, width))
            .collect::<Vec<_>>()
            .join(GAP)
    };

    out.push_str(&line(["Field", "Type", "Null", "Default", "Comment"]));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join(GAP),
    );
    out.push('\n');
    for column in columns {
        let nullable = if column.nullable { "YES" } else { "NO" };
        out.push_str(&line([
            &column.name,
            &column.column_type,
            nullable,
            &default_text(column),
            &column.comment,
        ]));
        out.push('\n');
    }
}

fn render_sample(out: &mut String, structure: &TableStructure) {
    let Some(sample) = structure.sample.as_ref().filter(|s| !s.is_empty()) else {
        out.push_str("(No data)\n");
        return;
    };

    // Columns with at least one non-empty value, in table order.
    let active: Vec<(String, Vec<String>)> = structure
        .columns
        .iter()
        .filter_map(|column| {
            let index = sample.column_index(&column.name)?;
            let values: Vec<Option<&str>> = sample
                .rows
                .iter()
                .map(|row| row.get(index).and_then(Option::as_deref))
                .collect();
            if !values.iter().any(|v| v.is_some_and(|v| !v.is_empty())) {
                return None;
            }
            let header = if column.comment.is_empty() {
                column.name.clone()
            } else {
                format!("{} ({})", column.name, column.comment)
            };
            let values = values
                .into_iter()
                .map(|v| truncate_display(v.unwrap_or("NULL")))
                .collect();
            Some((header, values))
        })
        .collect();

    if active.is_empty() {
        out.push_str("(No data in any column)\n");
        return;
    }

    let widths: Vec<usize> = active
        .iter()
        .map(|(header, values)| {
            values
                .iter()
                .map(|v| display_width(v))
                .fold(display_width(header), usize::max)
                .min(MAX_CELL_WIDTH)
        })
        .collect();

    for ((header, _), width) in active.iter().zip(&widths) {
        out.push_str(&pad_display(header, width + 2));
    }
    out.push('\n');
    for width in &widths {
        out.push_str(&"-".repeat(width + 2));
    }
    out.push('\n');
    for row in 0..sample.len() {
        for ((_, values), width) in active.iter().zip(&widths) {
            let value = values.get(row).map_or("", String::as_str);
            out.push_str(&pad_display(value, width + 2));
        }
        out.push('\n');
    }
}
