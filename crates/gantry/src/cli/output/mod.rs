//! Console output helpers

use console::style;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message to stderr
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", style("⚠").yellow().bold(), message);
}

/// Print an informational message
pub fn info(message: &str) {
    println!("{} {}", style("ℹ").blue().bold(), message);
}

/// Print a section header
pub fn header(title: &str) {
    println!("\n{}", style(title).bold().underlined());
}

/// Print an aligned key/value line
pub fn key_value(key: &str, value: &str) {
    println!("  {:<22} {}", style(key).dim(), value);
}
