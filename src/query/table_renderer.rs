use std::io::{self, Write};

use crate::decoding::FieldRecord;

use super::query_runner::RecordRenderer;

/// Writes each file's records as a plain ASCII grid.
///
/// Columns follow the display names of the first record. Later records are
/// laid out by position; missing cells stay blank and extra cells are dropped.
pub struct AsciiTableRenderer<W: Write> {
    out: W,
}

impl<W: Write> AsciiTableRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordRenderer for AsciiTableRenderer<W> {
    fn render(&mut self, file_name: &str, records: &[FieldRecord]) -> io::Result<()> {
        writeln!(self.out, "File: {}", file_name)?;
        self.out.write_all(render_table(records).as_bytes())?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

pub fn render_table(records: &[FieldRecord]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let headers: Vec<&str> = first.names().collect();
    let rows: Vec<Vec<&str>> = records
        .iter()
        .map(|record| {
            let mut cells: Vec<&str> = record.values().take(headers.len()).collect();
            cells.resize(headers.len(), "");
            cells
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut table = String::new();
    push_rule(&mut table, &widths, '-');
    push_row(&mut table, &widths, &headers);
    push_rule(&mut table, &widths, '=');
    for row in &rows {
        push_row(&mut table, &widths, row);
    }
    push_rule(&mut table, &widths, '-');
    table
}

fn push_rule(table: &mut String, widths: &[usize], fill: char) {
    table.push('+');
    for width in widths {
        table.extend(std::iter::repeat(fill).take(width + 2));
        table.push('+');
    }
    table.push('\n');
}

fn push_row(table: &mut String, widths: &[usize], cells: &[&str]) {
    table.push('|');
    for (cell, width) in cells.iter().zip(widths) {
        let padding = width - cell.chars().count();
        table.push(' ');
        table.push_str(cell);
        table.extend(std::iter::repeat(' ').take(padding + 1));
        table.push('|');
    }
    table.push('\n');
}
