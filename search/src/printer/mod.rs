//! Result rendering
//!
//! The printer is chosen once per session from the first snapshot's
//! `isAggregate` flag and keeps its state (printed ids, known columns) for
//! every later snapshot of that session.

pub mod aggregate;
pub mod events;

use crate::format::{EventFormatter, FieldPrinters, FormatSpec};
use std::io::{self, Write};
use trawl_shared::QueryResult;

pub use aggregate::AggregatePrinter;
pub use events::EventListPrinter;

#[derive(Debug)]
pub enum ResultPrinter {
    Aggregate(AggregatePrinter),
    EventList(EventListPrinter),
}

impl ResultPrinter {
    /// Pick the printer matching the shape of `result`.
    pub fn for_result(
        result: &QueryResult,
        format: &FormatSpec,
        printers: &FieldPrinters,
        wrap: bool,
    ) -> Self {
        if result.metadata.is_aggregate {
            Self::Aggregate(AggregatePrinter::new(wrap))
        } else {
            Self::EventList(EventListPrinter::new(EventFormatter::new(format, printers)))
        }
    }

    pub fn print<W: Write>(&mut self, out: &mut W, result: QueryResult) -> io::Result<()> {
        match self {
            Self::Aggregate(p) => p.print(out, &result),
            Self::EventList(p) => p.print(out, result),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate(_))
    }
}
