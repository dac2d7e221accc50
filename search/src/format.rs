//! Event line format strings
//!
//! A format string is literal text with field references in braces:
//! `{@timestamp:-30} {loglevel} {@rawstring}`. A reference may carry a signed
//! width: positive widths right-align (pad on the left), negative widths
//! left-align (pad on the right). Everything outside braces is copied as-is.
//!
//! The string is parsed once into a [`FormatSpec`] and compiled together with
//! a [`FieldPrinters`] registry into an [`EventFormatter`] that is reused for
//! every event of the session.

use crate::error::FormatError;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;
use trawl_shared::utils::format_value;
use trawl_shared::utils::time::format_epoch_millis;
use trawl_shared::{Event, TIMESTAMP_FIELD};

static FIELD_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+)\}").unwrap_or_else(|_| unreachable!()));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Fixed width and alignment for one field slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Width {
    pub width: usize,
    pub align: Align,
}

impl Width {
    fn parse(field: &str, modifier: &str) -> Result<Option<Self>, FormatError> {
        let n: i64 = modifier
            .trim()
            .parse()
            .map_err(|_| FormatError::InvalidModifier {
                field: field.to_string(),
                modifier: modifier.to_string(),
            })?;

        if n == 0 {
            return Ok(None);
        }
        let align = if n < 0 { Align::Left } else { Align::Right };
        Ok(Some(Self {
            width: n.unsigned_abs() as usize,
            align,
        }))
    }

    fn apply(&self, value: &str) -> String {
        match self.align {
            Align::Right => format!("{value:>width$}", width = self.width),
            Align::Left => format!("{value:<width$}", width = self.width),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Field { name: String, width: Option<Width> },
}

/// Parsed format string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    segments: Vec<Segment>,
}

impl FormatSpec {
    pub fn parse(template: &str) -> Result<Self, FormatError> {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in FIELD_REF.captures_iter(template) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(template[last..whole.start()].to_string()));
            }
            last = whole.end();

            let (name, width) = match inner.as_str().split_once(':') {
                Some((name, modifier)) => (name, Width::parse(name, modifier)?),
                None => (inner.as_str(), None),
            };
            if name.is_empty() {
                return Err(FormatError::EmptyField(whole.as_str().to_string()));
            }
            segments.push(Segment::Field {
                name: name.to_string(),
                width,
            });
        }

        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_string()));
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl FromStr for FormatSpec {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Field-specific value transform. Returns `None` to fall back to the
/// generic rendering.
pub type FieldPrinter = fn(&Value) -> Option<String>;

/// Registry of field-specific transforms
#[derive(Debug, Clone)]
pub struct FieldPrinters {
    printers: HashMap<String, FieldPrinter>,
}

impl FieldPrinters {
    /// A registry with no transforms: every field renders generically.
    pub fn empty() -> Self {
        Self {
            printers: HashMap::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, printer: FieldPrinter) -> Self {
        self.printers.insert(field.into(), printer);
        self
    }

    pub fn get(&self, field: &str) -> Option<FieldPrinter> {
        self.printers.get(field).copied()
    }
}

impl Default for FieldPrinters {
    /// `@timestamp` epoch milliseconds render as RFC3339.
    fn default() -> Self {
        Self::empty().with(TIMESTAMP_FIELD, print_timestamp)
    }
}

fn print_timestamp(value: &Value) -> Option<String> {
    value.as_f64().and_then(format_epoch_millis)
}

#[derive(Debug, Clone)]
enum Slot {
    Literal(String),
    Field {
        name: String,
        width: Option<Width>,
        printer: Option<FieldPrinter>,
    },
}

/// A [`FormatSpec`] with its field transforms resolved
#[derive(Debug, Clone)]
pub struct EventFormatter {
    slots: Vec<Slot>,
}

impl EventFormatter {
    pub fn new(spec: &FormatSpec, printers: &FieldPrinters) -> Self {
        let slots = spec
            .segments()
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => Slot::Literal(text.clone()),
                Segment::Field { name, width } => Slot::Field {
                    name: name.clone(),
                    width: *width,
                    printer: printers.get(name),
                },
            })
            .collect();
        Self { slots }
    }

    /// Render one event. Missing fields render as empty strings.
    pub fn format(&self, event: &Event) -> String {
        let mut line = String::new();
        for slot in &self.slots {
            match slot {
                Slot::Literal(text) => line.push_str(text),
                Slot::Field {
                    name,
                    width,
                    printer,
                } => {
                    let value = event
                        .get(name)
                        .map(|v| printer.and_then(|p| p(v)).unwrap_or_else(|| format_value(v)))
                        .unwrap_or_default();
                    match width {
                        Some(w) => line.push_str(&w.apply(&value)),
                        None => line.push_str(&value),
                    }
                }
            }
        }
        line
    }
}
