//! CLI binary for docanalyze.
//!
//! A thin shim over the library crate: maps flags to `AnalyzerConfig`, then
//! runs the HTTP server, a batch over a directory, or a single file.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docanalyze::pipeline::render::describe_library;
use docanalyze::{
    run_batch, AnalysisProgressCallback, AnalysisStatus, Analyzer, AnalyzerConfig, BatchConfig,
    ProgressCallback, ServerConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress for batch runs: one bar plus a log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    file_started: std::sync::Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("looking for files…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            file_started: std::sync::Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.file_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_files as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Analysing");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analysing {total_files} files…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, name: &str) {
        if let Ok(mut t) = self.file_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, name: &str, status: AnalysisStatus) {
        let mark = match status {
            AnalysisStatus::Success => green("✓"),
            AnalysisStatus::Info => cyan("i"),
            AnalysisStatus::Error => red("✗"),
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            mark,
            index,
            total,
            name,
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, error_count: usize) {
        self.bar.finish_and_clear();
        if error_count == 0 {
            eprintln!(
                "{} {} files analysed successfully",
                green("✔"),
                bold(&total_files.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files analysed  ({} failed)",
                if error_count == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                total_files - error_count,
                total_files,
                error_count
            );
        }
    }
}

// ── CLI definition ───────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the upload API on port 5000
  docanalyze serve

  # Analyse everything under ./inputs into ./outputs/results.json
  docanalyze batch

  # Batch with parsed sections and a custom prompt
  docanalyze batch --input-dir scans --sections --prompt "Extract the totals."

  # One file, printed to stdout
  docanalyze analyze receipt.jpg --prompt "What was bought?"

  # Use a specific model for this run
  docanalyze --model gemini-2.0-flash-001 analyze report.pdf --prompt "Summarise" --json

ENVIRONMENT VARIABLES:
  GCP_PROJECT_ID                  Google Cloud project (required)
  GCP_REGION                      Vertex AI region (required)
  TUNED_MODEL_ID                  Tuned endpoint, preferred over the base model
  BASE_MODEL_ID                   Base model (default gemini-2.0-flash-lite-001)
  VERTEX_API_ENDPOINT             Base URL override for the Vertex REST API
  GCP_ACCESS_TOKEN                Static OAuth bearer token
  GOOGLE_APPLICATION_CREDENTIALS  Service-account key file
  PDFIUM_LIB_PATH                 Path to libpdfium (default: system library)
  DOCANALYZE_API_TIMEOUT          Seconds per model call (default 120)
  RUST_LOG                        Log filter, overrides -v / -q

  A .env file in the working directory is loaded first.
"#;

/// Analyse images, text files and PDFs with Gemini on Vertex AI.
#[derive(Parser, Debug)]
#[command(
    name = "docanalyze",
    version,
    about = "Analyse images, text files and PDFs with Gemini on Vertex AI",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Google Cloud project id.
    #[arg(long, global = true, env = "GCP_PROJECT_ID")]
    project_id: Option<String>,

    /// Vertex AI region, e.g. europe-west4.
    #[arg(long, global = true, env = "GCP_REGION")]
    region: Option<String>,

    /// Tuned endpoint id or full resource name.
    #[arg(long, global = true, env = "TUNED_MODEL_ID")]
    tuned_model: Option<String>,

    /// Base model used when no tuned endpoint is configured.
    #[arg(long, global = true, env = "BASE_MODEL_ID")]
    base_model: Option<String>,

    /// Model identifier overriding the tuned/base choice for every file.
    #[arg(long, global = true, env = "DOCANALYZE_MODEL")]
    model: Option<String>,

    /// Base URL replacing https://{region}-aiplatform.googleapis.com.
    #[arg(long, global = true, env = "VERTEX_API_ENDPOINT")]
    api_endpoint: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Leading PDF pages sent per file (1–5).
    #[arg(long, global = true, env = "DOCANALYZE_MAX_PDF_PAGES",
          value_parser = clap::value_parser!(u32).range(1..=5))]
    max_pdf_pages: Option<u32>,

    /// Timeout for one remote model call, in seconds.
    #[arg(long, global = true, env = "DOCANALYZE_API_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    api_timeout: Option<u64>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCANALYZE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCANALYZE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP upload API.
    Serve(ServeArgs),
    /// Analyse every supported file under a directory.
    Batch(BatchArgs),
    /// Analyse a single file and print the result.
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "DOCANALYZE_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Request body limit for uploads, in MiB.
    #[arg(long, env = "DOCANALYZE_MAX_UPLOAD_MB", default_value_t = 32)]
    max_upload_mb: usize,
}

#[derive(Args, Debug)]
struct BatchArgs {
    #[arg(long, env = "DOCANALYZE_INPUT_DIR", default_value = "inputs")]
    input_dir: PathBuf,

    #[arg(long, env = "DOCANALYZE_OUTPUT_DIR", default_value = "outputs")]
    output_dir: PathBuf,

    /// Name of the results file inside the output directory.
    #[arg(long, default_value = "results.json")]
    output_file: String,

    /// Instruction sent with every file.
    #[arg(long, env = "DOCANALYZE_BATCH_PROMPT")]
    prompt: Option<String>,

    /// Embed parsed sections next to each successful analysis.
    #[arg(long)]
    sections: bool,

    /// Disable the progress bar.
    #[arg(long, env = "DOCANALYZE_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// File to analyse.
    file: PathBuf,

    /// Instruction sent with the file.
    #[arg(short, long)]
    prompt: String,

    /// Print the result (with parsed sections) as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine; flags and the real environment still apply.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = matches!(&cli.command, Command::Batch(b) if !b.no_progress) && !cli.quiet;
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

    let config = build_config(&cli)?;
    let pdfium = describe_library(&config);
    let analyzer =
        Analyzer::from_config(config).context("Failed to initialise the Vertex AI client")?;
    let model_override = cli.model.as_deref();
    let candidates: Vec<String> = analyzer
        .policy()
        .candidates(model_override)
        .iter()
        .map(ToString::to_string)
        .collect();
    info!(
        "Using {} with model order [{}] (pdfium: {})",
        analyzer.model_name(),
        candidates.join(" → "),
        pdfium
    );

    match &cli.command {
        Command::Serve(args) => {
            let server = ServerConfig {
                host: args.host.clone(),
                port: args.port,
                max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
            };
            docanalyze::server::serve(Arc::new(analyzer), server)
                .await
                .context("Server failed")?;
        }

        Command::Batch(args) => {
            let mut batch = BatchConfig {
                input_dir: args.input_dir.clone(),
                output_dir: args.output_dir.clone(),
                output_filename: args.output_file.clone(),
                include_sections: args.sections,
                ..BatchConfig::default()
            };
            if let Some(p) = args.prompt.as_ref().filter(|p| !p.trim().is_empty()) {
                batch.prompt = p.clone();
            }

            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
            } else {
                None
            };

            let started = Instant::now();
            let run = run_batch(&analyzer, &batch, model_override, progress.as_ref()).await;
            let report = &run.report;

            if !cli.quiet {
                match &run.written_to {
                    _ if report.is_empty() => eprintln!(
                        "{}  no supported files in {}",
                        cyan("⚠"),
                        bold(&batch.input_dir.display().to_string())
                    ),
                    Some(path) => eprintln!(
                        "{}  {}/{} files  {}ms  →  {}",
                        if report.error_count() == 0 {
                            green("✔")
                        } else {
                            cyan("⚠")
                        },
                        report.success_count(),
                        report.len(),
                        started.elapsed().as_millis(),
                        bold(&path.display().to_string()),
                    ),
                    None => eprintln!(
                        "{}  {} files analysed but {} could not be written",
                        red("✘"),
                        report.len(),
                        bold(&batch.output_path().display().to_string())
                    ),
                }
            }
        }

        Command::Analyze(args) => {
            let result = analyzer
                .analyze_file(&args.file, &args.prompt, model_override)
                .await;

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            if args.json {
                let value = serde_json::json!({
                    "filename": result.filename,
                    "status": result.status,
                    "analysis": result.rendered(),
                    "sections": result.sections(),
                });
                let json =
                    serde_json::to_string_pretty(&value).context("Failed to serialise result")?;
                writeln!(handle, "{json}").context("Failed to write to stdout")?;
            } else {
                let text = result.rendered();
                handle
                    .write_all(text.as_bytes())
                    .context("Failed to write to stdout")?;
                if !text.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
        }
    }

    Ok(())
}

/// Map global CLI args to `AnalyzerConfig`.
fn build_config(cli: &Cli) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder();
    if let Some(ref v) = cli.project_id {
        builder = builder.project_id(v);
    }
    if let Some(ref v) = cli.region {
        builder = builder.region(v);
    }
    if let Some(ref v) = cli.tuned_model {
        builder = builder.tuned_endpoint(v);
    }
    if let Some(ref v) = cli.base_model {
        builder = builder.base_model(v);
    }
    if let Some(ref v) = cli.api_endpoint {
        builder = builder.api_endpoint(v);
    }
    if let Some(ref v) = cli.pdfium_lib {
        builder = builder.pdfium_library(v);
    }
    if let Some(n) = cli.max_pdf_pages {
        builder = builder.max_pdf_pages(n as usize);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    builder.build().context("Invalid configuration")
}
