//! Output formatting

use miette::{IntoDiagnostic, Result};
use sqlqualify_core::{Diagnostic, Severity, Span};

use crate::args::OutputFormat;

/// Output formatter for diagnostics
pub struct OutputFormatter {
    format: OutputFormat,
    file_name: String,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, file_name: String) -> Self {
        Self { format, file_name }
    }

    /// Print diagnostics in the configured format
    pub fn print_diagnostics(&self, diagnostics: &[Diagnostic], source: &str) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                self.print_human(diagnostics, source);
                Ok(())
            }
            OutputFormat::Json => self.print_json(diagnostics),
            OutputFormat::Sarif => self.print_sarif(diagnostics, source),
        }
    }

    fn print_human(&self, diagnostics: &[Diagnostic], source: &str) {
        for diag in diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "\x1b[31merror\x1b[0m",
                Severity::Warning => "\x1b[33mwarning\x1b[0m",
                Severity::Info => "\x1b[34minfo\x1b[0m",
            };

            eprintln!("{}[{}]: {}", severity_str, diag.code(), diag.message);

            if let Some(span) = &diag.span {
                let (line, col) = span_line_col(source, span);
                eprintln!("  --> {}:{}:{}", self.file_name, line, col);

                if let Some(source_line) = get_source_line(source, line) {
                    eprintln!("   |");
                    eprintln!("{:>3} | {}", line, source_line);

                    let padding = " ".repeat(col.saturating_sub(1));
                    let remaining = source_line.chars().count().saturating_sub(col - 1);
                    let underline = "^".repeat(span.length.min(remaining).max(1));
                    eprintln!("   | {}{}", padding, underline);
                }
            }

            for label in &diag.labels {
                let (line, col) = span_line_col(source, &label.span);
                eprintln!("   = note: {} at {}:{}", label.message, line, col);
            }

            if let Some(help) = &diag.help {
                eprintln!("   = help: {}", help);
            }

            eprintln!();
        }
    }

    fn print_json(&self, diagnostics: &[Diagnostic]) -> Result<()> {
        let output = serde_json::json!({
            "file": self.file_name,
            "diagnostics": diagnostics
        });
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
        Ok(())
    }

    fn print_sarif(&self, diagnostics: &[Diagnostic], source: &str) -> Result<()> {
        let results: Vec<serde_json::Value> = diagnostics
            .iter()
            .map(|d| {
                let mut location = serde_json::json!({
                    "physicalLocation": {
                        "artifactLocation": {
                            "uri": self.file_name
                        }
                    }
                });
                if let Some(span) = &d.span {
                    location["physicalLocation"]["region"] = sarif_region(source, span);
                }
                let related: Vec<serde_json::Value> = d
                    .labels
                    .iter()
                    .enumerate()
                    .map(|(id, label)| {
                        serde_json::json!({
                            "id": id,
                            "message": { "text": label.message },
                            "physicalLocation": {
                                "artifactLocation": { "uri": self.file_name },
                                "region": sarif_region(source, &label.span)
                            }
                        })
                    })
                    .collect();
                serde_json::json!({
                    "ruleId": d.code(),
                    "level": match d.severity {
                        Severity::Error => "error",
                        Severity::Warning => "warning",
                        Severity::Info => "note",
                    },
                    "message": {
                        "text": d.message
                    },
                    "locations": [location],
                    "relatedLocations": related
                })
            })
            .collect();

        let sarif = serde_json::json!({
            "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
            "version": "2.1.0",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": "sqlqualify",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                },
                "results": results
            }]
        });

        println!("{}", serde_json::to_string_pretty(&sarif).into_diagnostic()?);
        Ok(())
    }
}

/// Line and column (1-indexed) of a span, falling back to its byte offset
fn span_line_col(source: &str, span: &Span) -> (usize, usize) {
    if span.is_located() {
        (span.line, span.column.max(1))
    } else {
        offset_to_line_col(source, span.offset)
    }
}

fn sarif_region(source: &str, span: &Span) -> serde_json::Value {
    let (line, col) = span_line_col(source, span);
    serde_json::json!({
        "startLine": line,
        "startColumn": col,
        "endColumn": col + span.length
    })
}

/// Convert byte offset to line and column (1-indexed)
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Get a specific line from source (1-indexed)
fn get_source_line(source: &str, line: usize) -> Option<&str> {
    source.lines().nth(line.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_to_line_col() {
        let source = "SELECT a\nFROM foo";
        assert_eq!(offset_to_line_col(source, 0), (1, 1));
        assert_eq!(offset_to_line_col(source, 7), (1, 8));
        assert_eq!(offset_to_line_col(source, 9), (2, 1));
    }

    #[test]
    fn test_located_span_wins_over_offset() {
        let span = Span::with_location(2, 5, 3);
        assert_eq!(span_line_col("irrelevant", &span), (2, 5));
        assert_eq!(span_line_col("ab\ncd", &Span::new(4, 1)), (2, 2));
    }

    #[test]
    fn test_sarif_region_columns() {
        let region = sarif_region("SELECT a FROM t", &Span::with_location(1, 8, 1));
        assert_eq!(region["startLine"], 1);
        assert_eq!(region["startColumn"], 8);
        assert_eq!(region["endColumn"], 9);
    }

    #[test]
    fn test_get_source_line() {
        assert_eq!(get_source_line("a\nb\nc", 2), Some("b"));
        assert_eq!(get_source_line("a", 3), None);
    }
}
