//! Utility functions and helpers

pub mod time;

use anyhow::Result;
use serde_json::Value;

/// Render a field value the way it should appear in search output.
///
/// Strings are printed without quotes; `null` renders as an empty string;
/// nested objects and arrays fall back to compact JSON.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Scale a value down to a unit prefix.
///
/// Decimal values use powers of 1000 (`k`, `M`, `G`...); `binary` values use
/// powers of 1024 (`Ki`, `Mi`, `Gi`...). Returns the scaled value and the prefix,
/// which is empty when no scaling happened.
pub fn add_si_suffix(value: f64, binary: bool) -> (f64, &'static str) {
    const DECIMAL: [&str; 7] = ["", "k", "M", "G", "T", "P", "E"];
    const BINARY: [&str; 7] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];

    let (base, suffixes) = if binary {
        (1024.0, &BINARY)
    } else {
        (1000.0, &DECIMAL)
    };

    let mut scaled = value;
    let mut idx = 0;
    while scaled.abs() >= base && idx < suffixes.len() - 1 {
        scaled /= base;
        idx += 1;
    }
    (scaled, suffixes[idx])
}

/// Parse a duration string (e.g., "30s", "5m", "1h")
pub fn parse_duration(s: &str) -> Result<std::time::Duration> {
    let s = s.trim();

    if let Some(num_str) = s.strip_suffix("ms") {
        let millis: u64 = num_str.parse()?;
        Ok(std::time::Duration::from_millis(millis))
    } else if let Some(num_str) = s.strip_suffix('s') {
        let secs: u64 = num_str.parse()?;
        Ok(std::time::Duration::from_secs(secs))
    } else if let Some(num_str) = s.strip_suffix('m') {
        let mins: u64 = num_str.parse()?;
        Ok(std::time::Duration::from_secs(mins * 60))
    } else if let Some(num_str) = s.strip_suffix('h') {
        let hours: u64 = num_str.parse()?;
        Ok(std::time::Duration::from_secs(hours * 3600))
    } else {
        // Default to seconds if no suffix
        let secs: u64 = s.parse()?;
        Ok(std::time::Duration::from_secs(secs))
    }
}
