//! frise - clinical timeline extraction CLI
//!
//! Extracts dated clinical events from French medical documents and
//! assembles per-patient timelines.
//!
//! # Usage
//!
//! ```bash
//! # Associations for one document (text argument or stdin)
//! frise extract "Diagnostic de diabète le 12 janvier 2023."
//!
//! # Timelines for a JSONL batch ({"id": "...", "text": "..."} per line)
//! frise timeline documents.jsonl --patients patients.json
//!
//! # Score predicted timelines against gold entries
//! frise eval predicted.json gold.jsonl
//!
//! # Show defaults and backend info
//! frise info
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use frise::{
    evaluate_timelines, DocumentId, DocumentRecord, Error, EvalReport, GoldEntry,
    PatientMapping, PatientTimeline, Pipeline, PipelineConfig, Result, RunOutput,
};

// ============================================================================
// CLI structure
// ============================================================================

/// Clinical timeline extraction for French medical documents.
#[derive(Debug, Parser)]
#[command(name = "frise", version, about)]
struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract event-date associations from one document.
    Extract {
        /// Document text; reads stdin when omitted.
        text: Option<String>,
        /// Document identifier for the output artifacts.
        #[arg(long, default_value = "stdin")]
        id: String,
        /// Pipeline configuration JSON file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Build per-patient timelines from a JSONL document batch.
    Timeline {
        /// JSONL file: one {"id": ..., "text": ...} object per line.
        documents: PathBuf,
        /// JSON object mapping document ids to patient ids.
        #[arg(long)]
        patients: Option<PathBuf>,
        /// Pipeline configuration JSON file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Score predicted timelines against gold entries.
    Eval {
        /// JSON array of predicted patient timelines.
        predicted: PathBuf,
        /// JSONL file of gold entries.
        gold: PathBuf,
    },
    /// Show configuration defaults and backend information.
    Info,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Extract { text, id, config } => cmd_extract(text, &id, config, cli.output),
        Commands::Timeline {
            documents,
            patients,
            config,
        } => cmd_timeline(&documents, patients, config, cli.output),
        Commands::Eval { predicted, gold } => cmd_eval(&predicted, &gold, cli.output),
        Commands::Info => cmd_info(cli.output),
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_extract(
    text: Option<String>,
    id: &str,
    config_path: Option<PathBuf>,
    output: OutputFormat,
) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => read_stdin()?,
    };
    if text.trim().is_empty() {
        return Err(Error::invalid_input("empty document text"));
    }

    let pipeline = Pipeline::with_lexicon(load_config(config_path.as_deref())?)?;
    let document_id = DocumentId::new(id);
    let associations = pipeline.process_document(&document_id, &text)?;

    match output {
        OutputFormat::Json => print_json(&associations)?,
        OutputFormat::Text => {
            if associations.is_empty() {
                println!("no clinical events detected");
            }
            for assoc in &associations {
                let date = assoc
                    .date
                    .as_ref()
                    .map_or_else(|| "no date".to_string(), |d| {
                        d.resolved
                            .map_or_else(|| format!("unresolved ({})", d.raw_text), |r| r.to_string())
                    });
                let flag = if assoc.is_ambiguous { " [ambiguous]" } else { "" };
                println!(
                    "{:<14} {:<28} -> {}  (confidence {:.2}){}",
                    assoc.event.event_type.to_string(),
                    truncate(&assoc.event.raw_text, 28),
                    date,
                    assoc.final_confidence,
                    flag
                );
            }
        }
    }
    Ok(())
}

fn cmd_timeline(
    documents_path: &Path,
    patients_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    output: OutputFormat,
) -> Result<()> {
    let documents = read_documents_jsonl(documents_path)?;
    let mapping = match patients_path {
        Some(path) => read_patient_mapping(&path)?,
        None => PatientMapping::new(),
    };

    let pipeline = Pipeline::with_lexicon(load_config(config_path.as_deref())?)?;
    let run_output = pipeline.run(&documents, &mapping);

    match output {
        OutputFormat::Json => print_json(&run_output)?,
        OutputFormat::Text => render_run_text(&run_output),
    }
    Ok(())
}

fn cmd_eval(predicted_path: &Path, gold_path: &Path, output: OutputFormat) -> Result<()> {
    let predicted: Vec<PatientTimeline> = serde_json::from_str(&fs::read_to_string(predicted_path)?)
        .map_err(|err| Error::serde(format!("{}: {err}", predicted_path.display())))?;
    let gold = read_gold_jsonl(gold_path)?;
    let report = evaluate_timelines(&predicted, &gold);

    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => render_eval_text(&report),
    }
    Ok(())
}

fn cmd_info(output: OutputFormat) -> Result<()> {
    let config = PipelineConfig::default();
    match output {
        OutputFormat::Json => print_json(&config)?,
        OutputFormat::Text => {
            println!("frise {}", env!("CARGO_PKG_VERSION"));
            println!("backend: lexicon (deterministic French clinical triggers)");
            println!();
            println!("default configuration:");
            let json = serde_json::to_string_pretty(&config)
                .map_err(|err| Error::serde(err.to_string()))?;
            println!("{json}");
        }
    }
    Ok(())
}

// ============================================================================
// Rendering
// ============================================================================

fn render_run_text(run_output: &RunOutput) {
    let report = &run_output.report;
    println!(
        "{} documents processed, {} failed, {} events ({} ambiguous)",
        report.success_count, report.failure_count, report.total_events, report.ambiguous_count
    );
    for failure in &report.failures {
        println!("  failed {}: {}", failure.document_id, failure.reason);
    }
    for timeline in &run_output.timelines {
        println!();
        match timeline.status {
            frise::TimelineStatus::NoData => {
                println!("patient {}: no data", timeline.patient_id);
            }
            frise::TimelineStatus::Ok => {
                println!("patient {} ({} entries):", timeline.patient_id, timeline.entries.len());
                for entry in &timeline.entries {
                    let date = entry
                        .resolved_date
                        .map_or_else(|| "????".to_string(), |d| d.to_string());
                    let flag = if entry.is_ambiguous { " [ambiguous]" } else { "" };
                    println!(
                        "  {:<10} {:<14} confidence {:.2}  ({} doc{}){}",
                        date,
                        entry.event_type.to_string(),
                        entry.confidence,
                        entry.supporting_documents.len(),
                        if entry.supporting_documents.len() == 1 { "" } else { "s" },
                        flag
                    );
                }
            }
        }
    }
}

fn render_eval_text(report: &EvalReport) {
    println!(
        "overall: precision {:.3}  recall {:.3}  F1 {:.3}",
        report.overall.precision(),
        report.overall.recall(),
        report.overall.f1()
    );
    for (event_type, counts) in &report.per_type {
        println!(
            "  {:<14} precision {:.3}  recall {:.3}  F1 {:.3}  (tp {}, fp {}, fn {})",
            event_type.to_string(),
            counts.precision(),
            counts.recall(),
            counts.f1(),
            counts.true_positives,
            counts.false_positives,
            counts.false_negatives
        );
    }
}

// ============================================================================
// IO helpers
// ============================================================================

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str(&raw)
                .map_err(|err| Error::serde(format!("{}: {err}", path.display())))
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn read_documents_jsonl(path: &Path) -> Result<Vec<DocumentRecord>> {
    let raw = fs::read_to_string(path)?;
    let mut documents = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: DocumentRecord = serde_json::from_str(line).map_err(|err| {
            Error::serde(format!("{}:{}: {err}", path.display(), line_no + 1))
        })?;
        documents.push(record);
    }
    if documents.is_empty() {
        return Err(Error::invalid_input(format!(
            "no documents in {}",
            path.display()
        )));
    }
    Ok(documents)
}

fn read_patient_mapping(path: &Path) -> Result<PatientMapping> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|err| Error::serde(format!("{}: {err}", path.display())))
}

fn read_gold_jsonl(path: &Path) -> Result<Vec<GoldEntry>> {
    let raw = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: GoldEntry = serde_json::from_str(line).map_err(|err| {
            Error::serde(format!("{}:{}: {err}", path.display(), line_no + 1))
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|err| Error::serde(err.to_string()))?;
    println!("{json}");
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
