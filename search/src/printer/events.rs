//! Event list output: one formatted line per new event

use crate::dedup::Deduplicator;
use crate::format::EventFormatter;
use std::io::{self, Write};
use trawl_shared::QueryResult;

#[derive(Debug)]
pub struct EventListPrinter {
    formatter: EventFormatter,
    dedup: Deduplicator,
}

impl EventListPrinter {
    pub fn new(formatter: EventFormatter) -> Self {
        Self {
            formatter,
            dedup: Deduplicator::new(),
        }
    }

    /// Print the events of `result` that were not printed before, oldest first.
    pub fn print<W: Write>(&mut self, out: &mut W, result: QueryResult) -> io::Result<()> {
        for event in self.dedup.filter(result.events) {
            writeln!(out, "{}", self.formatter.format(&event))?;
        }
        out.flush()
    }
}
