//! Aggregate output: a borderless table, or a bare value for single-cell results

use comfy_table::{presets, ColumnConstraint, ContentArrangement, Table, Width};
use std::collections::HashSet;
use std::io::{self, Write};
use trawl_shared::utils::format_value;
use trawl_shared::QueryResult;

/// Widest a cell may get before its content wraps, unless wrapping is off
const WRAP_WIDTH: u16 = 30;

/// Prints aggregate snapshots. The column set is remembered across calls and
/// only grows.
#[derive(Debug)]
pub struct AggregatePrinter {
    columns: Vec<String>,
    wrap: bool,
}

impl AggregatePrinter {
    pub fn new(wrap: bool) -> Self {
        Self {
            columns: Vec::new(),
            wrap,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn print<W: Write>(&mut self, out: &mut W, result: &QueryResult) -> io::Result<()> {
        self.update_columns(result);

        if self.columns.is_empty() {
            return Ok(());
        }

        if let ([column], [row]) = (self.columns.as_slice(), result.events.as_slice()) {
            let value = row.get(column).map(format_value).unwrap_or_default();
            writeln!(out, "{value}")?;
            return out.flush();
        }

        let arrangement = if self.wrap {
            ContentArrangement::Dynamic
        } else {
            ContentArrangement::Disabled
        };

        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(arrangement)
            .set_header(self.columns.iter());

        for event in &result.events {
            table.add_row(
                self.columns
                    .iter()
                    .map(|c| event.get(c).map(format_value).unwrap_or_default()),
            );
        }

        // Dynamic arrangement only knows a width on a terminal; the bound
        // keeps piped output wrapped too.
        if self.wrap {
            table.set_constraints(
                self.columns
                    .iter()
                    .map(|_| ColumnConstraint::UpperBoundary(Width::Fixed(WRAP_WIDTH))),
            );
        }

        writeln!(out, "{table}")?;
        writeln!(out)?;
        out.flush()
    }

    /// Use the service's field order when given; otherwise append columns in
    /// first-seen order.
    fn update_columns(&mut self, result: &QueryResult) {
        if !result.metadata.field_order.is_empty() {
            self.columns = result.metadata.field_order.clone();
            return;
        }

        let mut known: HashSet<String> = self.columns.iter().cloned().collect();
        for event in &result.events {
            for key in event.keys() {
                if known.insert(key.clone()) {
                    self.columns.push(key.clone());
                }
            }
        }
    }
}
