//! CLI binary for cvslides.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs the pipeline and prints the candidates.

use anyhow::{Context, Result};
use clap::Parser;
use cvslides::pipeline::input::collect_inputs;
use cvslides::{
    save_results, ExtractionProgressCallback, Pipeline, PipelineConfig, ProgressCallback,
    ProviderKind, ProviderTier, RunSummary, SegmentationMode,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

/// Spinner while PDFs are decoded, then a bar advanced per settled batch.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Parsing");
        bar.set_message("Reading PDFs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_documents: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} CVs  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_documents as u64);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_documents} candidate documents"))
        ));
    }

    fn on_document_complete(&self, index: usize, total: usize, name: &str) {
        self.bar.println(format!(
            "  {} CV {:>3}/{:<3}  {}",
            green("✓"),
            index + 1,
            total,
            name
        ));
    }

    fn on_document_error(&self, index: usize, total: usize, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} CV {:>3}/{:<3}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg)
        ));
    }

    fn on_batch_complete(&self, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }

    fn on_run_complete(&self, succeeded: usize, failed: usize) {
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} candidates extracted",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {} candidates extracted  ({} failed)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # A longlist PDF with many CVs, free Gemini key
  cvslides longlist.pdf

  # A folder of one-CV-per-file PDFs, paid tier, three at a time
  cvslides --mode individual --tier paid -c 3 ./cvs/

  # Save the full run state as JSON
  cvslides longlist.pdf -o candidates.json

  # Another provider and model
  cvslides --provider anthropic --model claude-sonnet-4-20250514 longlist.pdf

SEGMENTATION:
  longlist     Split each PDF at pages whose text contains "Page 1 of N",
               "1/N" or "Page 1". Pages before the first marker form their
               own document.
  individual   Each PDF is one candidate.

RATE LIMITS:
  Tier   Min delay   Backoff ladder
  free   4000 ms     15 s, 30 s
  paid   500 ms      2 s, 5 s
  A 429 response with Retry-After overrides the ladder.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY
                          Key for the matching provider
  CVSLIDES_API_KEY        Key for any provider (takes precedence)
  CVSLIDES_PROVIDER       gemini, openai, anthropic, or an edgequake-llm name
  CVSLIDES_MODEL          Model ID
  PDFIUM_LIB_PATH         Directory containing libpdfium
"#;

/// Extract structured candidate records from CV PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "cvslides",
    version,
    about = "Extract structured candidate records from CV PDFs using LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files or directories of PDFs.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// How pages map to candidates: longlist or individual.
    #[arg(long, env = "CVSLIDES_MODE", value_enum, default_value = "longlist")]
    mode: ModeArg,

    /// Documents per batch (1–5).
    #[arg(short, long, env = "CVSLIDES_CONCURRENCY", default_value_t = 2,
          value_parser = clap::value_parser!(u8).range(1..=5))]
    concurrency: u8,

    /// LLM provider: gemini, openai, anthropic, or any edgequake-llm provider.
    #[arg(long, env = "CVSLIDES_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Model ID. Defaults per provider.
    #[arg(long, env = "CVSLIDES_MODEL")]
    model: Option<String>,

    /// API key. Falls back to the provider's usual variable.
    #[arg(long, env = "CVSLIDES_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override the provider endpoint.
    #[arg(long, env = "CVSLIDES_BASE_URL")]
    base_url: Option<String>,

    /// Provider pricing tier: free or paid. Sets delay and backoff defaults.
    #[arg(long, env = "CVSLIDES_TIER", value_enum, default_value = "free")]
    tier: TierArg,

    /// Minimum milliseconds between dispatched calls.
    #[arg(long, env = "CVSLIDES_MIN_DELAY_MS")]
    min_delay_ms: Option<u64>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "CVSLIDES_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "CVSLIDES_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Write the run state as JSON to this file.
    #[arg(short, long, env = "CVSLIDES_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the run summary as JSON on stdout.
    #[arg(long, env = "CVSLIDES_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "CVSLIDES_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CVSLIDES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CVSLIDES_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ModeArg {
    Longlist,
    Individual,
}

impl From<ModeArg> for SegmentationMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Longlist => SegmentationMode::Longlist,
            ModeArg::Individual => SegmentationMode::Individual,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum TierArg {
    Free,
    Paid,
}

impl From<TierArg> for ProviderTier {
    fn from(v: TierArg) -> Self {
        match v {
            TierArg::Free => ProviderTier::Free,
            TierArg::Paid => ProviderTier::Paid,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs while it is on screen.
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

    // ── Build pipeline ───────────────────────────────────────────────────
    let files = collect_inputs(&cli.inputs).context("Failed to read inputs")?;
    if files.is_empty() {
        anyhow::bail!("No PDF files found in the given inputs");
    }

    let config = build_config(&cli).await?;
    let mut pipeline = Pipeline::new(config).context("Failed to set up the pipeline")?;
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        pipeline = pipeline.with_progress(cb);
    }
    let pipeline = Arc::new(pipeline);

    // ── Ctrl-C stops at the next batch boundary ──────────────────────────
    {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{}", dim("Stopping after the current batch…"));
                pipeline.cancel();
            }
        });
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let result = pipeline.run(&files).await;

    if let Some(ref path) = cli.output {
        save_results(path, &pipeline.snapshot())
            .await
            .context("Failed to write results")?;
    }

    let summary = result.context("Extraction failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        print_candidates(&summary);
        print_summary(&summary, cli.output.as_ref());
    }

    if summary.candidates.is_empty() && !summary.failures.is_empty() {
        anyhow::bail!("Every document failed to extract");
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let kind = ProviderKind::from_name(&cli.provider);

    let mut builder = PipelineConfig::builder()
        .mode(cli.mode.clone().into())
        .concurrency(cli.concurrency as usize)
        .tier(cli.tier.clone().into())
        .provider(kind.clone());

    if let Some(key) = cli.api_key.clone().or_else(|| provider_key_from_env(&kind)) {
        builder = builder.api_key(key);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ms) = cli.min_delay_ms {
        builder = builder.min_delay_ms(ms);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.pdf_password(pwd);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

fn provider_key_from_env(kind: &ProviderKind) -> Option<String> {
    let var = match kind {
        ProviderKind::Gemini => "GEMINI_API_KEY",
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        ProviderKind::Edgequake(_) => return None,
    };
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn print_candidates(summary: &RunSummary) {
    for (i, c) in summary.candidates.iter().enumerate() {
        println!("{}", bold(&format!("{}. {}", i + 1, c.name)));
        for w in &c.work_history {
            match w.dates {
                Some(ref d) => println!("   {}, {}  {}", w.job_title, w.company, dim(d)),
                None => println!("   {}, {}", w.job_title, w.company),
            }
        }
        for e in &c.education {
            let degree = e.degree.as_deref().unwrap_or("");
            let dates = e.dates.as_deref().unwrap_or("");
            let detail = format!("{degree} {dates}");
            println!("   {} {} {}", cyan("◇"), e.institution, dim(detail.trim()));
        }
    }
    for f in &summary.failures {
        println!("{} document {}: {}", red("✗"), f.document_index + 1, f.error_message);
    }
}

fn print_summary(summary: &RunSummary, output: Option<&PathBuf>) {
    let u = &summary.usage_totals;
    eprintln!(
        "{}  {}/{} documents  {}ms{}",
        if summary.was_cancelled() {
            cyan("⏸")
        } else if summary.failures.is_empty() {
            green("✔")
        } else {
            cyan("⚠")
        },
        summary.candidates.len(),
        summary.documents,
        summary.duration_ms,
        output
            .map(|p| format!("  →  {}", bold(&p.display().to_string())))
            .unwrap_or_default(),
    );
    eprintln!(
        "   {} tokens in  /  {} tokens out  /  ~${:.4}",
        dim(&u.input_tokens.to_string()),
        dim(&u.output_tokens.to_string()),
        u.estimated_cost_usd,
    );
}
