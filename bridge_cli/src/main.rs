//! # Girderline CLI
//!
//! Command-line surface over `bridge_core`:
//!
//! - `demo` writes one of the example projects as a `.pgx` file
//! - `validate` checks a project's geometry and timeline, listing every issue
//! - `analyze` runs the full pass and reports the specification checks
//!
//! Logs go to stderr (`RUST_LOG` or `--verbose`); results go to stdout.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use bridge_core::artifacts::{Artifact, CheckKind, CheckLocation, CheckSelection, CheckStatus, GirderArtifact};
use bridge_core::file_io::{load_project, save_project};
use bridge_core::pipeline::{AnalysisOutput, BridgeAnalysis, TracingProgress};
use bridge_core::project::Project;
use bridge_core::settings::LossMethod;
use bridge_core::{BridgeError, BridgeResult};

#[derive(Parser, Debug)]
#[command(
    name = "bridge-cli",
    version,
    about = "Staged construction analysis of precast and spliced girder bridges",
    arg_required_else_help = true
)]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an example project
    Demo {
        #[arg(long, short = 'e', value_enum, default_value_t = Example::SingleSpan)]
        example: Example,
        /// Output .pgx file; stdout when omitted
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Validate a project's girder geometry and construction timeline
    Validate {
        #[arg(value_name = "FILE")]
        project: PathBuf,
    },
    /// Run the analysis and the specification checks
    Analyze {
        #[arg(value_name = "FILE")]
        project: PathBuf,
        /// Override the loss method stored in the project
        #[arg(long, value_enum)]
        losses: Option<LossArg>,
        /// Run only these checks (repeatable), e.g. FlexuralCapacity
        #[arg(long = "check", value_name = "KIND")]
        checks: Vec<String>,
        /// Analyze with gross section properties
        #[arg(long, default_value_t = false)]
        gross: bool,
        /// Print every artifact as JSON instead of the summary
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Write a fixed-format artifact table to FILE
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Example {
    SingleSpan,
    Minimal,
    Spliced,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LossArg {
    Approximate,
    TimeStep,
}

impl From<LossArg> for LossMethod {
    fn from(arg: LossArg) -> Self {
        match arg {
            LossArg::Approximate => LossMethod::Approximate,
            LossArg::TimeStep => LossMethod::TimeStep,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "bridge_core=debug,bridge_cli=debug" } else { "info" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let outcome = match cli.command {
        Command::Demo { example, output } => demo(example, output.as_deref()),
        Command::Validate { project } => validate(&project),
        Command::Analyze {
            project,
            losses,
            checks,
            gross,
            json,
            report,
        } => analyze(&project, losses, &checks, gross, json, report.as_deref()),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(code = e.error_code(), "{}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!("{}", json);
            }
            ExitCode::from(2)
        }
    }
}

fn demo(example: Example, output: Option<&Path>) -> BridgeResult<bool> {
    let project = match example {
        Example::SingleSpan => Project::single_span_example(),
        Example::Minimal => Project::minimal_example(),
        Example::Spliced => Project::spliced_example(),
    };
    match output {
        Some(path) => save_project(&project, path)?,
        None => println!("{}", bridge_core::file_io::to_json(&project)?),
    }
    Ok(true)
}

/// Every problem at once; `false` when there are any
fn validate(path: &Path) -> BridgeResult<bool> {
    let project = load_project(path)?;
    let mut problems = Vec::new();
    if let Err(e) = project.bridge.validate() {
        problems.push(json!({ "code": e.error_code(), "message": e.to_string() }));
    }
    for issue in project.timeline.validate(&project.bridge) {
        problems.push(json!({ "code": issue.code(), "message": issue.to_string() }));
    }
    let valid = problems.is_empty();
    let report = json!({
        "project": project.meta.job_id,
        "intervals": project.timeline.interval_count(),
        "valid": valid,
        "issues": problems,
    });
    println!("{}", to_pretty(&report)?);
    Ok(valid)
}

fn analyze(
    path: &Path,
    losses: Option<LossArg>,
    checks: &[String],
    gross: bool,
    as_json: bool,
    report: Option<&Path>,
) -> BridgeResult<bool> {
    let mut project = load_project(path)?;
    if let Some(method) = losses {
        project.settings.loss_method = method.into();
    }
    let selection = if checks.is_empty() {
        CheckSelection::all()
    } else {
        CheckSelection::only(&parse_checks(checks)?)
    };

    let mut analysis = BridgeAnalysis::new(project).with_selection(selection);
    if gross {
        let mut overrides = analysis.overrides();
        overrides.force_gross_section = true;
        analysis.set_overrides(overrides);
    }
    let output = analysis.run(&TracingProgress, None)?;
    let girder = &output.artifacts;

    if as_json {
        println!("{}", to_pretty(girder)?);
    } else {
        println!("{}", summary(analysis.project(), &output));
    }
    if let Some(report_path) = report {
        fs::write(report_path, artifact_table(girder)).map_err(|e| {
            BridgeError::file_error("write report", report_path.display().to_string(), e.to_string())
        })?;
        tracing::info!(path = %report_path.display(), "artifact table written");
    }
    Ok(girder.passed())
}

fn parse_checks(names: &[String]) -> BridgeResult<Vec<CheckKind>> {
    names
        .iter()
        .map(|name| {
            serde_json::from_value(json!(name)).map_err(|_| {
                BridgeError::invalid_input(
                    "check",
                    name.as_str(),
                    format!("expected one of {:?}", CheckKind::ALL),
                )
            })
        })
        .collect()
}

fn to_pretty<T: serde::Serialize + ?Sized>(value: &T) -> BridgeResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| BridgeError::SerializationError { reason: e.to_string() })
}

fn summary(project: &Project, output: &AnalysisOutput) -> String {
    let girder = &output.artifacts;
    let mut lines = vec![
        format!("{} ({})", project.meta.bridge_name, project.meta.job_id),
        format!(
            "{} intervals, {} points of interest",
            output.results.interval_count,
            output.pois.len()
        ),
        String::new(),
    ];
    for kind in CheckKind::ALL {
        let status = girder.status(kind);
        let governing = girder
            .governing(kind)
            .and_then(|a| a.ratio().map(|r| format!("  governing {:.3} ({})", r, a.label)))
            .unwrap_or_default();
        lines.push(format!("{:<28}{:<14}{}", kind.display_name(), status_label(status), governing));
    }
    lines.push(String::new());
    lines.push(format!("RESULT: {}", if girder.passed() { "PASS" } else { "FAIL" }));
    lines.join("\n")
}

fn status_label(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::NotRun => "[not run]",
        CheckStatus::Computing => "[running]",
        CheckStatus::Passed => "[OK]",
        CheckStatus::Failed => "[FAIL]",
        CheckStatus::Inapplicable => "[n/a]",
    }
}

fn location_label(location: &CheckLocation) -> String {
    match location {
        CheckLocation::Girder => "girder".to_string(),
        CheckLocation::Segment(i) => format!("segment {}", i + 1),
        CheckLocation::Tendon(i) => format!("tendon {}", i + 1),
        CheckLocation::Span(i) => format!("span {}", i + 1),
        CheckLocation::Support(support) => format!("{:?}", support),
        CheckLocation::Poi { station, .. } => format!("x = {:.3}", station),
    }
}

/// One line per artifact, fixed-width columns, raw SI values
fn artifact_table(girder: &GirderArtifact) -> String {
    let row = |a: &Artifact| {
        format!(
            "{:<24} {:<20} {:<36} {:>6} {:<13} {:>16.6e} {:>16.6e}\n",
            format!("{:?}", a.kind),
            location_label(&a.location),
            a.label,
            a.interval.map(|k| k.to_string()).unwrap_or_else(|| "-".to_string()),
            format!("{:?}", a.status),
            a.demand,
            a.capacity,
        )
    };
    let mut out = format!(
        "{:<24} {:<20} {:<36} {:>6} {:<13} {:>16} {:>16}\n",
        "CHECK", "LOCATION", "LABEL", "INT", "STATUS", "DEMAND", "CAPACITY"
    );
    for artifact in girder.all_artifacts() {
        out.push_str(&row(artifact));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_checks() {
        let kinds = parse_checks(&["FlexuralCapacity".to_string(), "Deflection".to_string()]).unwrap();
        assert_eq!(kinds, vec![CheckKind::FlexuralCapacity, CheckKind::Deflection]);
        assert_eq!(
            parse_checks(&["Bogus".to_string()]).unwrap_err().error_code(),
            "INVALID_INPUT"
        );
    }

    #[test]
    fn test_artifact_table_has_one_row_per_artifact() {
        let mut girder = GirderArtifact::new();
        girder.begin(CheckKind::Deflection).unwrap();
        girder
            .finish(
                CheckKind::Deflection,
                vec![Artifact::evaluate(CheckKind::Deflection, CheckLocation::Span(0), "span 1", 0.01, 0.0375, true)],
            )
            .unwrap();
        let table = artifact_table(&girder);
        assert_eq!(table.lines().count(), 2);
        assert!(table.contains("span 1"));
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from(["bridge-cli", "-v", "analyze", "girder.pgx", "--losses", "time-step", "--json"])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Analyze { json: true, losses: Some(LossArg::TimeStep), .. }
        ));
    }
}
