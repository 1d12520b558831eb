//! CLI binary for sop2docx.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `MigrationConfig`, prints a summary and turns the error kind into a
//! sysexits-style exit status.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sop2docx::{
    extract_document, migrate, migrate_to_file, resolve_model, ConfidenceBand, MigrationConfig,
    MigrationError, MigrationOutput, MigrationProgressCallback, OutputFormat, ProgressCallback,
    Stage,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that shows the current pipeline stage and logs each finished one.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("sop2docx");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl MigrationProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{}…", stage.label()));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed: Duration) {
        self.bar.println(format!(
            "  {} {:<30} {}",
            green("✓"),
            stage.label(),
            dim(&format!("{:.1}s", elapsed.as_secs_f64())),
        ));
    }

    fn on_stage_error(&self, stage: Stage, _error: &str) {
        self.bar
            .println(format!("  {} {}", red("✗"), stage.label()));
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Migrate a text SOP into ./output_docs/
  sop2docx legacy_sop.txt

  # Migrate a PDF to an explicit file
  sop2docx old_procedure.pdf -o Pump_Startup.docx

  # Preview the extracted record without writing a document
  sop2docx --extract-only --json legacy_sop.txt

  # Markdown instead of Word
  sop2docx --format markdown legacy_sop.txt

EXIT STATUS:
  0   success
  65  source could not be decoded, or format unsupported
  66  source file not found or unreadable
  69  model call failed (network, auth, rate limit, timeout)
  70  internal error
  73  output document could not be written
  76  model reply violated the record schema
  78  configuration error (no API key, bad flag, pdfium missing)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (also read from .env)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  SOP2DOCX_OUTPUT_DIR     Default output directory
  PDFIUM_LIB_PATH         Path to libpdfium for PDF input
"#;

/// Migrate legacy SOP documents into standardized Word documents using an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "sop2docx",
    version,
    about = "Migrate legacy SOP documents (text or PDF) into standardized Word documents",
    long_about = "Reads a legacy Standard Operating Procedure, extracts a structured record \
(title, id, version, department, safety warnings, equipment, steps, confidence) with an LLM \
under a JSON-schema constraint, and renders it with a fixed branded template.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source document: .txt, .text, .md or .pdf.
    input: PathBuf,

    /// Write the document to this file instead of the output directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for generated documents.
    #[arg(long, env = "SOP2DOCX_OUTPUT_DIR", default_value = "output_docs")]
    output_dir: PathBuf,

    /// Output document format.
    #[arg(long, value_enum, default_value = "docx")]
    format: FormatArg,

    /// LLM model ID (e.g. gpt-4o-mini, gpt-4o).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SOP2DOCX_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "SOP2DOCX_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM call timeout in seconds.
    #[arg(long, env = "SOP2DOCX_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Assign this document id instead of the one the model proposes.
    #[arg(long)]
    document_id: Option<String>,

    /// Version the model is told to assign (also used when it leaves it blank).
    #[arg(long, default_value = "2.0")]
    doc_version: String,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SOP2DOCX_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Print the result (record, output path, stats) as JSON.
    #[arg(long)]
    json: bool,

    /// Extract and print the record without writing a document.
    #[arg(long)]
    extract_only: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "SOP2DOCX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and the final result.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Docx,
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Docx => OutputFormat::Docx,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; keys may come from the real environment.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = err
                .chain()
                .find_map(|e| e.downcast_ref::<MigrationError>())
                .map(|e| e.kind());
            match kind {
                Some(kind) => {
                    eprintln!("{} [{}] {:#}", red("error"), kind, err);
                    ExitCode::from(kind.exit_code())
                }
                None => {
                    eprintln!("{} {:#}", red("error"), err);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    let config = build_config(cli).await?;

    // Fail on a missing key before the source is even opened.
    let model = resolve_model(&config)?;

    // The spinner only starts once nothing can fail outside the pipeline.
    let progress = show_progress.then(CliProgressCallback::new);
    let config = MigrationConfig {
        provider: Some(model),
        progress_callback: progress
            .clone()
            .map(|cb| cb as ProgressCallback),
        ..config
    };

    let result = if cli.extract_only {
        extract_document(&cli.input, &config).await
    } else if let Some(ref path) = cli.output {
        migrate_to_file(&cli.input, path, &config).await
    } else {
        migrate(&cli.input, &config).await
    };
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let output = result.with_context(|| format!("Migration of {:?} failed", cli.input))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        print_summary(&output, cli.extract_only);
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }
    Ok(())
}

fn print_summary(output: &MigrationOutput, extract_only: bool) {
    let record = &output.record;
    let score = record.confidence_score();
    let paint = match score.band() {
        ConfidenceBand::High => green,
        ConfidenceBand::Medium => yellow,
        ConfidenceBand::Low => red,
    };

    println!("Title:       {}", bold(record.title()));
    println!("Document ID: {}", record.document_id());
    println!("Version:     {}", record.version());
    println!("Department:  {}", record.department());
    println!(
        "Confidence:  {}",
        paint(&format!("{} ({})", score, score.band().label()))
    );

    if extract_only {
        println!();
        print_list("Safety Warnings", record.safety_warnings());
        print_list("Equipment", record.equipment());
        println!("Steps:");
        for (i, step) in record.steps().iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
    }

    if let Some(ref path) = output.output_path {
        println!("Output:      {}", path.display());
    }
}

fn print_list(heading: &str, items: &[String]) {
    println!("{}:", heading);
    for item in items {
        println!("  - {}", item);
    }
}

/// Map CLI args to `MigrationConfig`.
async fn build_config(cli: &Cli) -> Result<MigrationConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path).await.map_err(|e| {
                MigrationError::InvalidConfig(format!(
                    "failed to read system prompt from {:?}: {}",
                    path, e
                ))
            })?,
        )
    } else {
        None
    };

    let mut builder = MigrationConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .default_version(cli.doc_version.clone())
        .output_dir(cli.output_dir.clone())
        .output_format(cli.format.into());

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref id) = cli.document_id {
        builder = builder.document_id(id.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }

    Ok(builder.build()?)
}
