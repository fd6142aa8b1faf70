//! Terminal output for wattprobe commands

use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Display;
use std::time::Duration;

pub fn success(msg: impl Display) {
    println!("{} {}", "✓".green().bold(), msg);
}

pub fn error(msg: impl Display) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

pub fn info(msg: impl Display) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Warnings go to stderr so JSON on stdout stays parseable
pub fn warning(msg: impl Display) {
    eprintln!("{} {}", "⚠".yellow(), msg);
}

/// Power figure in watts
pub fn watts(value: f64) -> ColoredString {
    format!("{:.2} W", value).bold()
}

/// Warn when a board report carries a power warning; `false` means none
pub fn power_warning(flag: Option<&str>) {
    match flag.map(str::trim) {
        None | Some("") | Some("false") => {}
        Some(text) => warning(format!("Board reports a power warning: {}", text.red())),
    }
}

/// Announce an output file written by a command
pub fn written(what: &str, path: &str) {
    success(format!("{} written to {}", what, path.cyan()));
}

/// Spinner shown while a blocking session runs
pub fn spinner(msg: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
        bar.set_style(style);
    }
    bar.set_message(msg.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watts_rounds_to_two_places() {
        assert!(watts(45.256).to_string().contains("45.26 W"));
        assert!(watts(0.0).to_string().contains("0.00 W"));
    }
}
