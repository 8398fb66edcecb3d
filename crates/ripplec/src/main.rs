//! The Ripple compiler CLI.
//!
//! Subcommands:
//!
//! - `ripplec build <file.rpl>` - compile a program to CUDA-flavored C++
//! - `ripplec check <file.rpl>` - parse and lower, reporting diagnostics
//!
//! Backend configuration comes in through flags: `--module-name` prefixes
//! generated symbols, `--direction label=push|pull|hybrid[:threshold]`
//! overrides the traversal flavor at a labeled statement, and
//! `--fuse label` compiles the labeled while loop as a single fused
//! kernel.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use ripple_codegen::{BackendConfig, DirectionChoice};
use ripple_common::span::LineIndex;

#[derive(Parser)]
#[command(name = "ripplec", version, about = "The Ripple compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a Ripple program to GPU source
    Build {
        /// Path to the source file
        file: PathBuf,

        /// Output path for the generated source (defaults to the input
        /// with a .cu extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Identifier prefix for generated symbols
        #[arg(long = "module-name", default_value = "ripple")]
        module_name: String,

        /// Traversal direction override: label=push|pull|hybrid[:threshold]
        #[arg(long = "direction")]
        directions: Vec<String>,

        /// Compile the while loop with this label as a fused kernel
        #[arg(long = "fuse")]
        fused: Vec<String>,
    },

    /// Parse and lower a program, reporting diagnostics only
    Check {
        /// Path to the source file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            file,
            output,
            module_name,
            directions,
            fused,
        } => build(&file, output.as_deref(), module_name, &directions, &fused),
        Commands::Check { file } => check(&file),
    };

    if let Err(message) = result {
        eprintln!("error: {message}");
        process::exit(1);
    }
}

/// Full pipeline: read -> parse -> lower -> direction choice -> generate.
fn build(
    file: &Path,
    output: Option<&Path>,
    module_name: String,
    directions: &[String],
    fused: &[String],
) -> Result<(), String> {
    let source = read_source(file)?;
    let parse = ripple_parser::parse(&source);

    let mut config = BackendConfig {
        module_name,
        ..BackendConfig::default()
    };
    for spec in directions {
        let (label, choice) = parse_direction(spec)?;
        config.directions.insert(label, choice);
    }
    for label in fused {
        config.fused_kernels.insert(label.clone());
    }

    let (mut ctx, lowering_diags) = ripple_codegen::lower(&parse, config);
    if report_diagnostics(&source, &parse, &lowering_diags) {
        return Err("compilation failed due to errors above".to_string());
    }

    ripple_codegen::resolve_directions(&mut ctx);
    let generated = ripple_codegen::generate(&ctx).map_err(|e| e.to_string())?;

    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => file.with_extension("cu"),
    };
    std::fs::write(&output_path, generated)
        .map_err(|e| format!("failed to write '{}': {e}", output_path.display()))?;

    eprintln!("  Generated: {}", output_path.display());
    Ok(())
}

/// Front half of the pipeline only; succeeds when there are no diagnostics.
fn check(file: &Path) -> Result<(), String> {
    let source = read_source(file)?;
    let parse = ripple_parser::parse(&source);
    let (_ctx, lowering_diags) =
        ripple_codegen::lower(&parse, BackendConfig::default());
    if report_diagnostics(&source, &parse, &lowering_diags) {
        return Err("checks failed due to errors above".to_string());
    }
    eprintln!("  OK: {}", file.display());
    Ok(())
}

fn read_source(file: &Path) -> Result<String, String> {
    if !file.exists() {
        return Err(format!("'{}' does not exist", file.display()));
    }
    std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read '{}': {e}", file.display()))
}

/// `label=push`, `label=pull`, `label=hybrid`, or `label=hybrid:2048`.
fn parse_direction(spec: &str) -> Result<(String, DirectionChoice), String> {
    let (label, choice) = spec
        .split_once('=')
        .ok_or_else(|| format!("--direction takes label=choice, got '{spec}'"))?;
    let choice = match choice {
        "push" => DirectionChoice::Push,
        "pull" => DirectionChoice::Pull,
        other => match other.strip_prefix("hybrid") {
            Some("") => DirectionChoice::Hybrid { threshold: 1024 },
            Some(rest) => {
                let threshold = rest
                    .strip_prefix(':')
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| {
                        format!("bad hybrid threshold in '{spec}'; use hybrid:<n>")
                    })?;
                DirectionChoice::Hybrid { threshold }
            }
            None => {
                return Err(format!(
                    "unknown direction '{other}'; use push, pull, or hybrid[:<n>]"
                ))
            }
        },
    };
    Ok((label.to_string(), choice))
}

/// Render parse and lowering diagnostics with ariadne. Returns true when
/// any were reported.
fn report_diagnostics(
    source: &str,
    parse: &ripple_parser::Parse,
    lowering: &[ripple_codegen::LoweringDiagnostic],
) -> bool {
    use ariadne::{Label, Report, ReportKind, Source};

    let index = LineIndex::new(source);
    let mut has_errors = false;

    for error in parse.errors() {
        has_errors = true;
        let (line, col, _, _) = error.line_cols(&index);
        let start = error.span.start as usize;
        let end = (error.span.end as usize).max(start + 1);
        let _ = Report::<std::ops::Range<usize>>::build(ReportKind::Error, start..end)
            .with_message(format!("Parse error at {line}:{col}"))
            .with_label(Label::new(start..end).with_message(&error.message))
            .finish()
            .eprint(Source::from(source));
    }

    for diag in lowering {
        has_errors = true;
        let (line, col) = index.line_col(diag.span.start);
        let start = diag.span.start as usize;
        let end = (diag.span.end as usize).max(start + 1);
        let _ = Report::<std::ops::Range<usize>>::build(ReportKind::Error, start..end)
            .with_message(format!("Lowering error at {line}:{col}"))
            .with_label(Label::new(start..end).with_message(&diag.message))
            .finish()
            .eprint(Source::from(source));
    }

    has_errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_spec_parsing() {
        assert_eq!(
            parse_direction("s1=push").unwrap(),
            ("s1".to_string(), DirectionChoice::Push)
        );
        assert_eq!(
            parse_direction("s1=pull").unwrap(),
            ("s1".to_string(), DirectionChoice::Pull)
        );
        assert_eq!(
            parse_direction("s1=hybrid").unwrap(),
            ("s1".to_string(), DirectionChoice::Hybrid { threshold: 1024 })
        );
        assert_eq!(
            parse_direction("s1=hybrid:4096").unwrap(),
            ("s1".to_string(), DirectionChoice::Hybrid { threshold: 4096 })
        );
        assert!(parse_direction("nonsense").is_err());
        assert!(parse_direction("s1=sideways").is_err());
    }
}
