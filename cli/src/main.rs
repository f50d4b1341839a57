//! labreport: analyze blood-test reports from the command line.
//!
//! Usage:
//!   labreport analyze scan.txt
//!   labreport analyze scan.txt --config labreport.toml --output reports/
//!   labreport analyze scan.txt --generator "ollama run llama3:8b" --json
//!   labreport evaluate records.json truth.json
//!   labreport truth-template records.json > truth.json
//!   labreport catalog

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use labreport_contracts::{
    error::{LabReportError, LabReportResult},
    record::LabReport,
};
use labreport_pipeline::{
    adapters::JsonFileSink,
    evaluate::{evaluate, load_records, load_truth, truth_template},
    GeneratorConfig, LabReportPipeline, PipelineConfig,
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Extract, classify and explain blood-test report values.
#[derive(Parser)]
#[command(
    name = "labreport",
    version,
    about = "Lab report extraction, classification and reasoning",
    long_about = "Reads a lab report's text, extracts and classifies test values against\n\
                  reference ranges, and asks a local model for cautious pattern reasoning.\n\
                  Set RUST_LOG=debug for per-stage logs."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one document.
    Analyze {
        /// UTF-8 text of the report (OCR or PDF export).
        document: PathBuf,
        /// Pipeline TOML. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Catalog TOML, overriding the config.
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Reference-context file for the prompt, overriding the config.
        #[arg(long)]
        knowledge: Option<PathBuf>,
        /// Write the record here (a file, or a directory for `<id>_report.json`).
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Generator command line, e.g. "ollama run mistral:7b-instruct".
        #[arg(long)]
        generator: Option<String>,
        /// Print the record as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
    /// Score records against labelled ground truth.
    Evaluate {
        /// A record JSON file, or an array of records.
        records: PathBuf,
        /// Ground-truth JSON array.
        truth: PathBuf,
    },
    /// Print a ground-truth file pre-filled from records, for hand labelling.
    TruthTemplate {
        records: PathBuf,
    },
    /// Print the effective reference catalog as TOML.
    Catalog {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for per-stage output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Analyze { document, config, catalog, knowledge, output, generator, json } => {
            run_analyze(document, config, catalog, knowledge, output, generator, json)
        }
        Command::Evaluate { records, truth } => run_evaluate(records, truth),
        Command::TruthTemplate { records } => run_truth_template(records),
        Command::Catalog { config, catalog } => run_catalog(config, catalog),
    };

    if let Err(e) = result {
        let kind = if e.is_infrastructure() { "infrastructure" } else { "input" };
        eprintln!("labreport: halted at {} stage ({} problem): {}", e.stage(), kind, e);
        std::process::exit(1);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn load_config(
    path: Option<PathBuf>,
    catalog: Option<PathBuf>,
    knowledge: Option<PathBuf>,
    generator: Option<String>,
) -> LabReportResult<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(&path)?,
        None => PipelineConfig::default(),
    };
    if catalog.is_some() {
        config.catalog = catalog;
    }
    if knowledge.is_some() {
        config.knowledge_path = knowledge;
    }
    if let Some(command) = generator {
        let timeout_secs = config.generator.timeout_secs;
        config.generator = GeneratorConfig {
            timeout_secs,
            ..GeneratorConfig::from_command_line(&command)?
        };
    }
    Ok(config)
}

fn run_analyze(
    document: PathBuf,
    config: Option<PathBuf>,
    catalog: Option<PathBuf>,
    knowledge: Option<PathBuf>,
    output: Option<PathBuf>,
    generator: Option<String>,
    json: bool,
) -> LabReportResult<()> {
    let config = load_config(config, catalog, knowledge, generator)?;

    let mut pipeline = LabReportPipeline::from_config(&config)?;
    if let Some(output) = output {
        pipeline = pipeline.with_sink(Box::new(JsonFileSink::new(output)));
    }

    let report = pipeline.run(&document)?;

    if json {
        println!("{}", to_pretty_json(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_evaluate(records: PathBuf, truth: PathBuf) -> LabReportResult<()> {
    let records = load_records(&records)?;
    let truth = load_truth(&truth)?;
    let summary = evaluate(&records, &truth);

    println!("Matched rows:                 {}", summary.matched_rows);
    println!("Value extraction accuracy:    {:.2}", summary.value_accuracy);
    println!("Status classification acc.:   {:.2}", summary.status_accuracy);
    println!("Pattern similarity (Jaccard): {:.2}", summary.pattern_similarity);
    println!("Risk level accuracy:          {:.2}", summary.risk_accuracy);
    Ok(())
}

fn run_truth_template(records: PathBuf) -> LabReportResult<()> {
    let records = load_records(&records)?;
    println!("{}", to_pretty_json(&truth_template(&records))?);
    Ok(())
}

fn run_catalog(config: Option<PathBuf>, catalog: Option<PathBuf>) -> LabReportResult<()> {
    let config = load_config(config, catalog, None, None)?;
    print!("{}", config.load_catalog()?.to_toml_string()?);
    Ok(())
}

// ── Output ────────────────────────────────────────────────────────────────────

fn to_pretty_json<T: serde::Serialize>(value: &T) -> LabReportResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| LabReportError::SinkFailed {
        reason: format!("failed to serialize output: {e}"),
    })
}

fn print_report(report: &LabReport) {
    println!();
    println!("Report {}  ({})", report.report_id.0, report.generated_at.format("%Y-%m-%d %H:%M UTC"));
    println!("Patient: {}", report.patient_name);
    println!();
    println!("{:<28} {:>12} {:<10} {}", "Test", "Value", "Unit", "Status");
    println!("{}", "-".repeat(60));
    for row in &report.rows {
        let value = row.value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<28} {:>12} {:<10} {}",
            row.test_name,
            value,
            row.unit.as_deref().unwrap_or(""),
            row.status
        );
    }

    let reasoning = &report.reasoning;
    println!();
    println!("Severity score: {}", report.severity_score);
    println!("Risk: {} ({:.0}/100)", reasoning.risk_level, reasoning.risk_score);
    println!();
    println!("Patterns:");
    for pattern in &reasoning.patterns {
        println!("  - {} (confidence {:.2})", pattern.label, pattern.confidence);
    }
    println!();
    println!("Summary: {}", reasoning.summary);
    println!();
    println!("Recommendations:");
    for recommendation in &reasoning.recommendations {
        println!("  - {}", recommendation);
    }
    if !report.repairs.is_clean() {
        println!();
        println!(
            "Note: model output needed {} repair(s) and had {} schema violation(s).",
            report.repairs.repairs.len(),
            report.repairs.schema_violations.len()
        );
    }
    println!();
}
