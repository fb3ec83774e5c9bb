//! CLI binary for pdfcite.
//!
//! A thin shim over the library crate that maps CLI flags to `ApiConfig`,
//! drives the ask and registry workflows, and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use pdfcite::report::{format_ask_output, format_response};
use pdfcite::search::describe_title;
use pdfcite::session::{is_exit, QuestionCollector, Step};
use pdfcite::{
    ask_document, ask_documents, compose_query, load_pdf, ApiConfig, AskProgressCallback,
    Document, DocumentSearch, HttpMessagesClient, LoadedPdf, ProgressCallback, SearchMethod,
    DEFAULT_MODEL,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a progress bar plus one log line per finished
/// document. Documents may finish out of order when concurrency > 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Asking");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed(&self, index: usize) -> String {
        let ms = self
            .start_times
            .lock()
            .remove(&index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        dim(&format!("{:.1}s", ms as f64 / 1000.0))
    }
}

impl AskProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Asking {total_documents} document(s)…"))
        ));
    }

    fn on_document_start(&self, index: usize, title: &str, _total: usize) {
        self.start_times.lock().insert(index, Instant::now());
        self.bar.set_message(title.to_string());
    }

    fn on_document_complete(&self, index: usize, title: &str, total: usize, citations: usize) {
        let elapsed = self.elapsed(index);
        self.bar.println(format!(
            "  {} [{:>2}/{:<2}] {}  {}  {}",
            green("✓"),
            index + 1,
            total,
            title,
            dim(&format!("{citations} citations")),
            elapsed,
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, title: &str, total: usize, error: &str) {
        let elapsed = self.elapsed(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} [{:>2}/{:<2}] {}  {}  {}",
            red("✗"),
            index + 1,
            total,
            title,
            red(&msg),
            elapsed,
        ));
        self.bar.inc(1);
    }

    fn on_summary(&self, ok: bool) {
        if ok {
            self.bar.println(format!("  {} consolidated answer", green("✓")));
        } else {
            self.bar.println(format!("  {} summarize request failed", red("✗")));
        }
    }

    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let failed = total.saturating_sub(succeeded);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} document(s) answered",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} document(s) answered  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Ask questions about one PDF
  pdfcite ask report.pdf -q "What was total revenue?" -q "Who is the auditor?"

  # Interactive questions ('done' sends the batch, 'exit' quits)
  pdfcite ask report.pdf

  # Several PDFs, 2 requests in flight, consolidated answer
  pdfcite --concurrency 2 ask q1.pdf q2.pdf https://example.com/q3.pdf \
      -q "How did gross margin change?" --summarize

  # Register every PDF in a directory, then search the registry
  pdfcite ingest ./reports
  pdfcite search "revenue Q1 2025"

  # Let the model rank registered documents (keyword search on failure)
  pdfcite rank "which filing discusses share buybacks?"

ENVIRONMENT VARIABLES:
  PDFCITE_API_URL     Messages endpoint URL
  PDFCITE_API_TOKEN   Bearer token for the endpoint
  PDFCITE_MODEL       Model ID (default: claude-3-7-sonnet-20250219)
  PDFCITE_DB          SQLite registry path (default: pdfcite.db)
  RUST_LOG            Overrides the log filter (e.g. pdfcite=debug)
"#;

/// Ask cited questions about PDFs and search a document registry.
#[derive(Parser, Debug)]
#[command(
    name = "pdfcite",
    version,
    about = "Ask cited questions about PDFs and search a document registry",
    long_about = "Send PDF documents (local files or URLs) to a citation-capable LLM messages \
endpoint, print the answers with their [Cited from: …, Pages: …] references and token usage, \
and keep a SQLite registry of documents searchable by keyword or by model-ranked relevance.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Messages endpoint URL.
    #[arg(long, global = true, env = "PDFCITE_API_URL")]
    api_url: Option<String>,

    /// Bearer token for the endpoint.
    #[arg(long, global = true, env = "PDFCITE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Model ID placed in every request.
    #[arg(long, global = true, env = "PDFCITE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Max output tokens for answers and summaries.
    #[arg(long, global = true, env = "PDFCITE_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: u32,

    /// Number of requests in flight during a batch.
    #[arg(short, long, global = true, env = "PDFCITE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Retries per request on 429 / 5xx / transport failures.
    #[arg(long, global = true, env = "PDFCITE_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Per-request API timeout in seconds.
    #[arg(long, global = true, env = "PDFCITE_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout for URL inputs, in seconds.
    #[arg(long, global = true, env = "PDFCITE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// SQLite registry path.
    #[arg(long, global = true, env = "PDFCITE_DB", default_value = "pdfcite.db")]
    db: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFCITE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(long, global = true, env = "PDFCITE_QUIET")]
    quiet: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "PDFCITE_NO_PROGRESS")]
    no_progress: bool,

    /// Print structured JSON instead of the console report.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask questions about one or more PDFs (interactive without --question).
    Ask {
        /// Local PDF paths or HTTP/HTTPS URLs.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// A question; repeat for several. Omit to enter questions interactively.
        #[arg(short, long = "question")]
        questions: Vec<String>,

        /// Consolidate the per-document answers with a second request.
        #[arg(long)]
        summarize: bool,

        /// Document title sent to the model (single input only; default: file stem).
        #[arg(long)]
        title: Option<String>,

        /// Context line sent with every document.
        #[arg(long)]
        context: Option<String>,
    },

    /// Register every *.pdf in a directory.
    Ingest {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Register one document by title.
    Add {
        title: String,

        #[arg(long)]
        path: Option<String>,

        #[arg(long)]
        url: Option<String>,

        /// Default: "Financial document: {title}".
        #[arg(long)]
        description: Option<String>,
    },

    /// List registered documents, newest first.
    List,

    /// Keyword search (interactive loop when QUERY is omitted; 'exit' quits).
    Search { query: Option<String> },

    /// Rank registered documents by model-judged relevance.
    Rank { query: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs during `ask`.
    let show_progress = !cli.quiet
        && !cli.no_progress
        && !cli.json
        && matches!(cli.command, Command::Ask { .. });
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

    match &cli.command {
        Command::Ask {
            inputs,
            questions,
            summarize,
            title,
            context,
        } => {
            if title.is_some() && inputs.len() > 1 {
                anyhow::bail!("--title can only be used with a single input");
            }
            let config = build_config(&cli, *summarize)?;
            let client = HttpMessagesClient::new(&config).context("Failed to create HTTP client")?;

            let mut pdfs = Vec::with_capacity(inputs.len());
            for input in inputs {
                let mut pdf = load_pdf(input, &config)
                    .await
                    .with_context(|| format!("Failed to load {input}"))?;
                if let Some(t) = title {
                    pdf = pdf.with_title(t.clone());
                }
                if let Some(c) = context {
                    pdf = pdf.with_context(c.clone());
                }
                pdfs.push(pdf);
            }

            if questions.is_empty() {
                ask_interactive(&cli, &client, &pdfs, &config, show_progress).await?;
            } else if let Some(query) = compose_query(questions) {
                run_ask(&cli, &client, &pdfs, &query, &config, show_progress).await?;
            }
        }

        Command::Ingest { dir } => {
            let search = open_registry(&cli)?;
            let report = search
                .ingest_dir(dir)
                .with_context(|| format!("Failed to ingest {}", dir.display()))?;
            if cli.json {
                print_json(&report)?;
            } else {
                for doc in &report.added {
                    println!("Added: {}", doc.title);
                }
                if !cli.quiet {
                    eprintln!(
                        "{} {} added, {} already registered",
                        green("✔"),
                        report.added.len(),
                        report.skipped.len()
                    );
                }
            }
        }

        Command::Add {
            title,
            path,
            url,
            description,
        } => {
            let search = open_registry(&cli)?;
            let mut doc = describe_title(title);
            doc.path = path.clone();
            doc.url = url.clone();
            if let Some(d) = description {
                doc.description = d.clone();
            }
            let id = search.add_document(&doc).context("Failed to add document")?;
            if cli.json {
                print_json(&search.store().get(id)?)?;
            } else {
                println!("Added: {} (id {id})", doc.title);
            }
        }

        Command::List => {
            let search = open_registry(&cli)?;
            let docs = search.all_documents().context("Failed to list documents")?;
            print_documents(&cli, &docs)?;
        }

        Command::Search { query: Some(q) } => {
            let search = open_registry(&cli)?;
            let docs = search.keyword_search(q).context("Search failed")?;
            print_documents(&cli, &docs)?;
        }

        Command::Search { query: None } => {
            let search = open_registry(&cli)?;
            say(cli.json, "Interactive search (type 'exit' to quit):\n");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = prompt_line(&mut lines, cli.json, "\nEnter search query: ").await? {
                if is_exit(&line) {
                    break;
                }
                let docs = search.keyword_search(line.trim()).context("Search failed")?;
                print_documents(&cli, &docs)?;
            }
        }

        Command::Rank { query } => {
            let search = open_registry(&cli)?;
            let config = build_config(&cli, false)?;
            let client = HttpMessagesClient::new(&config).context("Failed to create HTTP client")?;

            match query {
                Some(q) => run_rank(&cli, &search, &client, &config, q).await?,
                None => {
                    say(cli.json, "Interactive ranking (type 'exit' to quit):\n");
                    let mut lines = BufReader::new(tokio::io::stdin()).lines();
                    while let Some(line) =
                        prompt_line(&mut lines, cli.json, "\nEnter search query: ").await?
                    {
                        if is_exit(&line) {
                            break;
                        }
                        run_rank(&cli, &search, &client, &config, line.trim()).await?;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ApiConfig`.
fn build_config(cli: &Cli, summarize: bool) -> Result<ApiConfig> {
    let endpoint = cli
        .api_url
        .clone()
        .context("--api-url (or PDFCITE_API_URL) is required for this command")?;
    let token = cli
        .api_token
        .clone()
        .context("--api-token (or PDFCITE_API_TOKEN) is required for this command")?;

    ApiConfig::builder(endpoint, token)
        .model(cli.model.clone())
        .max_tokens(cli.max_tokens)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .summarize(summarize)
        .build()
        .context("Invalid configuration")
}

fn open_registry(cli: &Cli) -> Result<DocumentSearch> {
    DocumentSearch::open(&cli.db)
        .with_context(|| format!("Failed to open registry {}", cli.db.display()))
}

/// Collect question batches from stdin until `exit` or end of input.
async fn ask_interactive(
    cli: &Cli,
    client: &HttpMessagesClient,
    pdfs: &[LoadedPdf],
    config: &ApiConfig,
    show_progress: bool,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut collector = QuestionCollector::new();

    loop {
        say(
            cli.json,
            "Enter your questions about the document (type 'done' when finished, 'exit' to quit):\n",
        );
        loop {
            let prompt = format!("Question {}: ", collector.next_number());
            let Some(line) = prompt_line(&mut lines, cli.json, &prompt).await? else {
                return Ok(());
            };
            match collector.feed(&line) {
                Step::Continue(_) => continue,
                Step::Empty => break,
                Step::Exit => return Ok(()),
                Step::Ask(questions) => {
                    if let Some(query) = compose_query(&questions) {
                        run_ask(cli, client, pdfs, &query, config, show_progress).await?;
                    }
                    break;
                }
            }
        }
    }
}

/// One request for a single plain document, a batch otherwise.
async fn run_ask(
    cli: &Cli,
    client: &HttpMessagesClient,
    pdfs: &[LoadedPdf],
    query: &str,
    config: &ApiConfig,
    show_progress: bool,
) -> Result<()> {
    if let [pdf] = pdfs {
        if !config.summarize {
            match ask_document(client, pdf, query, config).await {
                Ok(response) if cli.json => print_json(&response)?,
                Ok(response) => print!("{}", format_response(&response)),
                // Non-200 responses are shown as `Error: {status} - {body}`
                // and the session continues.
                Err(e) if cli.json => eprintln!("{e}"),
                Err(e) => println!("{e}"),
            }
            return Ok(());
        }
    }

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AskProgressCallback>)
    } else {
        None
    };

    match ask_documents(client, pdfs, query, config, progress).await {
        Ok(output) if cli.json => print_json(&output)?,
        Ok(output) => print!("{}", format_ask_output(&output)),
        Err(e) if cli.json => eprintln!("{e}"),
        Err(e) => println!("{e}"),
    }
    Ok(())
}

async fn run_rank(
    cli: &Cli,
    search: &DocumentSearch,
    client: &HttpMessagesClient,
    config: &ApiConfig,
    query: &str,
) -> Result<()> {
    let ranked = search
        .llm_search(client, config, query)
        .await
        .context("Ranking failed")?;

    if cli.json {
        return print_json(&ranked);
    }
    if let SearchMethod::ApiError { status, body } = &ranked.method {
        println!("Error: {status} - {body}");
        return Ok(());
    }
    if !cli.quiet {
        match &ranked.method {
            SearchMethod::Llm => eprintln!("{}", dim("ranked by model relevance")),
            SearchMethod::KeywordFallback { reason } => {
                eprintln!("{} {}", cyan("⚠"), dim(&format!("keyword fallback: {reason}")))
            }
            SearchMethod::EmptyRegistry => eprintln!("{}", dim("registry is empty")),
            SearchMethod::ApiError { .. } => {}
        }
    }
    print_documents(cli, &ranked.documents)
}

fn print_documents(cli: &Cli, docs: &[Document]) -> Result<()> {
    if cli.json {
        return print_json(&docs);
    }
    if docs.is_empty() {
        println!("No results found");
        return Ok(());
    }
    let show = |v: Option<String>| v.unwrap_or_else(|| "None".to_string());
    for (i, doc) in docs.iter().enumerate() {
        println!("{}. {}", i + 1, doc.title);
        println!(
            "   Year: {}, Quarter: {}",
            show(doc.fiscal_year.map(|y| y.to_string())),
            show(doc.fiscal_quarter.clone())
        );
        println!("   Keywords: {}", show(doc.keywords.clone()));
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

/// Write interactive chatter to `out`, or to `err` when stdout carries JSON.
fn write_prompt<O: Write, E: Write>(
    json: bool,
    out: &mut O,
    err: &mut E,
    text: &str,
) -> io::Result<()> {
    let sink: &mut dyn Write = if json { err } else { out };
    sink.write_all(text.as_bytes())?;
    sink.flush()
}

fn say(json: bool, text: &str) {
    write_prompt(json, &mut io::stdout(), &mut io::stderr(), text).ok();
}

/// Show `prompt` and read one line; `None` at end of input.
async fn prompt_line(
    lines: &mut Lines<BufReader<Stdin>>,
    json: bool,
    prompt: &str,
) -> Result<Option<String>> {
    say(json, prompt);
    lines.next_line().await.context("Failed to read stdin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_go_to_stderr_in_json_mode() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        write_prompt(true, &mut out, &mut err, "Question 1: ").unwrap();
        assert!(out.is_empty());
        assert_eq!(err, b"Question 1: ");
    }

    #[test]
    fn prompts_go_to_stdout_otherwise() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        write_prompt(false, &mut out, &mut err, "\nEnter search query: ").unwrap();
        assert_eq!(out, b"\nEnter search query: ");
        assert!(err.is_empty());
    }
}
