//! sqlqualify CLI - flags unqualified column references in multi-table SQL

mod args;
mod config;
mod output;

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use sqlqualify_core::{Analyzer, Severity, SqlDialect};

use crate::args::{Args, Command, OutputFormat};
use crate::config::Config;
use crate::output::OutputFormatter;

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.quiet {
        tracing::Level::ERROR
    } else {
        match args.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match run(args) {
        Ok(has_findings) => {
            if has_findings {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let quiet = args.quiet;
    match args.command {
        Command::Check {
            files,
            config: config_path,
            dialect,
            format,
            disable,
            max_errors,
        } => {
            let config = if let Some(path) = config_path {
                Config::from_file(&path)?
            } else {
                Config::find_and_load()?.unwrap_or_default()
            };

            // CLI takes precedence over the config file
            let config = config.merge_with_args(&files, &dialect, &format, &disable);

            let dialect = match &config.dialect {
                Some(name) => parse_dialect(name)?,
                None => SqlDialect::default(),
            };

            let output_format = match &config.format {
                Some(fmt_str) => OutputFormat::from_str(fmt_str, true)
                    .map_err(|_| miette::miette!("Unknown output format: '{}'", fmt_str))?,
                None => OutputFormat::Human,
            };

            let query_files = collect_query_files(&config.files)?;
            if query_files.is_empty() {
                miette::bail!(
                    "No query files specified. Use positional arguments or configure in sqlqualify.toml"
                );
            }

            let disabled_rules: HashSet<&str> = config.disable.iter().map(String::as_str).collect();
            let max_findings = finding_limit(max_errors);
            let mut analyzer = Analyzer::with_dialect(dialect);
            let mut total_errors = 0;
            let mut total_warnings = 0;
            let mut checked = 0;

            for query_file in &query_files {
                if total_errors + total_warnings >= max_findings {
                    tracing::warn!(max_errors, "finding limit reached, stopping");
                    break;
                }
                checked += 1;

                let content = fs::read_to_string(query_file).into_diagnostic()?;
                tracing::debug!(file = %query_file.display(), %dialect, "checking");

                let remaining = max_findings - (total_errors + total_warnings);
                let diagnostics: Vec<_> = analyzer
                    .analyze(&content)
                    .into_iter()
                    .filter(|d| !disabled_rules.contains(d.code()))
                    .take(remaining)
                    .collect();

                if diagnostics.is_empty() {
                    continue;
                }

                let formatter =
                    OutputFormatter::new(output_format, query_file.display().to_string());
                formatter.print_diagnostics(&diagnostics, &content)?;

                for diag in &diagnostics {
                    match diag.severity {
                        Severity::Error => total_errors += 1,
                        Severity::Warning => total_warnings += 1,
                        Severity::Info => {}
                    }
                }
            }

            if !quiet {
                if total_errors > 0 || total_warnings > 0 {
                    eprintln!();
                    eprintln!(
                        "Found {} error(s), {} warning(s) in {} file(s)",
                        total_errors, total_warnings, checked
                    );
                } else {
                    eprintln!("All {} file(s) passed", checked);
                }
            }

            Ok(total_errors > 0 || total_warnings > 0)
        }

        Command::Facts { file, dialect } => {
            let dialect = parse_dialect(&dialect)?;
            let content = fs::read_to_string(&file).into_diagnostic()?;

            match Analyzer::with_dialect(dialect).analyze_facts(&content) {
                Ok(facts) => {
                    println!("{}", serde_json::to_string_pretty(&facts).into_diagnostic()?);
                    Ok(false)
                }
                Err(diag) => {
                    let formatter =
                        OutputFormatter::new(OutputFormat::Human, file.display().to_string());
                    formatter.print_diagnostics(&[diag], &content)?;
                    Ok(true)
                }
            }
        }

        Command::Parse { file, dialect } => {
            // Parse and display AST (for debugging)
            let dialect = parse_dialect(&dialect)?;
            let content = fs::read_to_string(&file).into_diagnostic()?;

            use sqlparser::parser::Parser;

            let parser_dialect = dialect.parser_dialect();
            match Parser::parse_sql(parser_dialect.as_ref(), &content) {
                Ok(statements) => {
                    for (i, stmt) in statements.iter().enumerate() {
                        println!("Statement {}:", i + 1);
                        println!("{:#?}", stmt);
                        println!();
                    }
                }
                Err(e) => {
                    eprintln!("Parse error: {}", e);
                    return Ok(true);
                }
            }

            Ok(false)
        }
    }
}

/// `--max-errors 0` means no limit
fn finding_limit(max_errors: usize) -> usize {
    if max_errors == 0 {
        usize::MAX
    } else {
        max_errors
    }
}

fn parse_dialect(name: &str) -> Result<SqlDialect> {
    name.parse::<SqlDialect>().into_diagnostic()
}

/// Expand file arguments, treating any entry containing `*` as a glob
fn collect_query_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut query_files = Vec::new();
    for pattern in patterns {
        if pattern.contains('*') {
            for path in glob::glob(pattern).into_diagnostic()?.flatten() {
                query_files.push(path);
            }
        } else {
            query_files.push(PathBuf::from(pattern));
        }
    }
    Ok(query_files)
}
