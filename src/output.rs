//! Terminal output formatting for validation results.

use crate::markers::Marker;
use crate::protocol::{ValidationReport, ValidationStatus};

/// Human-readable formatter with ANSI color when stdout is a terminal.
pub struct Output {
    show_colors: bool,
}

impl Output {
    pub fn new() -> Self {
        Self {
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn plain() -> Self {
        Self { show_colors: false }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_report(&self, report: &ValidationReport, markers: &[Marker]) -> String {
        let mut output = String::new();

        match report.status {
            ValidationStatus::Pass => {
                output.push_str(&format!(
                    "{}  score {}\n",
                    self.colorize("✓ PASS", "32"),
                    report.score
                ));
            }
            ValidationStatus::Fail => {
                output.push_str(&format!(
                    "{}  score {} - {} error{}\n",
                    self.colorize("✗ FAIL", "31"),
                    report.score,
                    report.errors.len(),
                    if report.errors.len() == 1 { "" } else { "s" }
                ));
                for error in &report.errors {
                    output.push_str(&format!("    {}\n", error));
                }
                if !markers.is_empty() {
                    output.push_str(&format!(
                        "  {} marker{} on line{} {}\n",
                        markers.len(),
                        if markers.len() == 1 { "" } else { "s" },
                        if markers.len() == 1 { "" } else { "s" },
                        markers
                            .iter()
                            .map(|m| m.line.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ));
                }
            }
        }

        output
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
