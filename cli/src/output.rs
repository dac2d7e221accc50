//! User-facing status lines
//!
//! Everything here goes to stderr so search results on stdout stay clean.

use colored::Colorize;

/// Print error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print info message
pub fn info(msg: &str) {
    eprintln!("{} {}", "ℹ".blue(), msg);
}

/// Render the token column without revealing the token.
pub fn token_presence(token: Option<&str>) -> String {
    match token {
        Some(t) if !t.is_empty() => "set".green().to_string(),
        _ => "-".dimmed().to_string(),
    }
}
