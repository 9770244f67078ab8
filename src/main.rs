//! # Deep Research CLI
//!
//! Runs a recursive research session from the command line and writes the
//! final report (or a short answer) to a markdown file.
//!
//! ## Quick Start
//! ```bash
//! cargo run -- "State of WebAssembly garbage collection" --breadth 4 --depth 2
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use deep_research::agent::{ResearchAgent, ResearchModel};
use deep_research::config::{Config, LlmProvider};
use deep_research::research::{combine_feedback, DeepResearch};
use deep_research::tools::FirecrawlSearch;

// =============================================================================
// CONSTANTS
// =============================================================================
/// Clarifying questions asked before a report run
const MAX_CLARIFYING_QUESTIONS: usize = 3;

type StdinLines = Lines<BufReader<Stdin>>;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
/// What the session produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum OutputMode {
    /// Long-form markdown report with sources
    #[default]
    Report,
    /// Concise answer
    Answer,
}

impl OutputMode {
    fn default_output(self) -> &'static str {
        match self {
            OutputMode::Report => "report.md",
            OutputMode::Answer => "answer.md",
        }
    }
}

/// # Rust Concept: Derive Macros with Clap
///
/// The struct below is the whole CLI definition: clap generates parsing,
/// `--help` and error messages from the field types and `#[arg(...)]`
/// attributes. `Option<T>` fields are optional flags that fall back to the
/// environment configuration.
#[derive(Parser, Debug)]
#[command(
    name = "deep-research",
    version,
    about = "Recursive web research with an LLM: plans queries, searches, digs deeper, writes a report",
    long_about = r#"
Deep Research - iterative, breadth/depth-bounded research on any topic.

For the topic you give it, the tool:
  1. Plans up to BREADTH search queries
  2. Searches each query (Firecrawl) and extracts learnings from the pages
  3. Follows up on what it learned, DEPTH levels deep, halving breadth each level
  4. Writes a report (or a short answer) from everything it learned

PREREQUISITES:
  - An LLM: Ollama running locally (ollama serve), or LLM_PROVIDER=openai with OPENAI_API_KEY
  - Search: FIRECRAWL_KEY, or FIRECRAWL_BASE_URL pointing at a self-hosted instance

EXAMPLES:
  deep-research "Rust async runtimes in 2025"
  deep-research -b 2 -d 1 --no-feedback "What changed in HTTP/3?"
  deep-research --mode answer "Which year was the first Rust 1.0 release?"
"#
)]
struct Args {
    /// The research topic or question (prompted for if omitted)
    #[arg(value_name = "QUERY")]
    query: Option<String>,

    /// Queries planned at the top level
    #[arg(short, long, default_value_t = 4)]
    breadth: usize,

    /// Levels of follow-up research
    #[arg(short, long, default_value_t = 2)]
    depth: usize,

    #[arg(long, value_enum, default_value_t = OutputMode::Report)]
    mode: OutputMode,

    /// Output file (default: report.md or answer.md)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Skip the clarifying questions
    #[arg(long)]
    no_feedback: bool,

    /// LLM provider (overrides LLM_PROVIDER)
    #[arg(long, value_enum)]
    provider: Option<LlmProvider>,

    /// Model for the active provider (overrides OLLAMA_MODEL / OPENAI_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Branches in flight at once (overrides FIRECRAWL_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.mode.default_output()))
    }

    /// Apply command-line overrides on top of the environment.
    fn apply(&self, config: &mut Config) {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(ref model) = self.model {
            config.set_model(model.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
/// Parse arguments, load configuration, then run one research session.
///
/// Errors are logged, explained with a tip where one applies, and returned
/// so the process exits non-zero.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    init_logging(args.verbose, &config.log_level)?;

    args.apply(&mut config);
    config.validate()?;

    info!(
        provider = %config.provider,
        model = %config.model(),
        concurrency = config.concurrency,
        "Configuration loaded"
    );

    match run(&args, &config).await {
        Ok(()) => {
            info!("Research session finished");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Research failed");
            eprintln!("\nResearch failed: {:#}", e);
            print_tips(&e, &config);
            Err(e)
        }
    }
}

// =============================================================================
// RESEARCH SESSION
// =============================================================================
/// Query → clarifying questions → research → synthesis → file.
async fn run(args: &Args, config: &Config) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let query = match args.query {
        Some(ref query) => query.clone(),
        None => ask(&mut lines, "What would you like to research?").await?,
    };
    if query.trim().is_empty() {
        anyhow::bail!("No research query given");
    }

    let agent = Arc::new(ResearchAgent::new(config)?);

    let combined_query = if args.no_feedback || args.mode == OutputMode::Answer {
        query
    } else {
        gather_feedback(agent.as_ref(), &mut lines, &query).await?
    };

    let search = Arc::new(FirecrawlSearch::new(
        config.firecrawl_key.clone(),
        &config.firecrawl_base_url,
    ));
    let engine = DeepResearch::new(agent, search, config.research_settings());

    let result = engine
        .research(&combined_query, args.breadth, args.depth)
        .await?;

    let (title, body) = match args.mode {
        OutputMode::Report => (
            "RESEARCH REPORT",
            engine
                .synthesize_report(&combined_query, &result.learnings, &result.visited_urls)
                .await?,
        ),
        OutputMode::Answer => (
            "ANSWER",
            engine
                .synthesize_answer(&combined_query, &result.learnings)
                .await?,
        ),
    };

    let path = args.output_path();
    write_output(&path, &body).await?;

    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}\n", "=".repeat(60));
    println!("{}", body);
    println!("\n{}", "=".repeat(60));
    println!(
        "Learnings: {}  Sources: {}  Failed branches: {}",
        result.learnings.len(),
        result.visited_urls.len(),
        result.failed_branches
    );
    println!("Saved to {}", path.display());

    Ok(())
}

// =============================================================================
// INTERACTIVE INPUT
// =============================================================================
/// Ask the model for clarifying questions and fold the answers into the
/// research query. A failure here only costs the clarification.
async fn gather_feedback(
    model: &dyn ResearchModel,
    lines: &mut StdinLines,
    query: &str,
) -> Result<String> {
    let questions = match model
        .clarifying_questions(query, MAX_CLARIFYING_QUESTIONS)
        .await
    {
        Ok(questions) => questions,
        Err(e) => {
            warn!(error = %e, "Could not generate clarifying questions");
            return Ok(query.to_string());
        }
    };

    if questions.is_empty() {
        return Ok(query.to_string());
    }

    println!("\nTo focus the research, please answer these follow-up questions:");
    let mut answers = Vec::with_capacity(questions.len());
    for question in &questions {
        answers.push(ask(lines, &format!("\n{}\nYour answer:", question)).await?);
    }

    Ok(combine_feedback(query, &questions, &answers))
}

/// Print a prompt and read one trimmed line. End of input reads as empty.
async fn ask(lines: &mut StdinLines, prompt: &str) -> Result<String> {
    print!("{} ", prompt);
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let line = lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
        .unwrap_or_default();
    Ok(line.trim().to_string())
}

// =============================================================================
// OUTPUT AND ERROR TIPS
// =============================================================================
async fn write_output(path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Suggest a fix for the most common setup mistakes.
fn print_tips(e: &anyhow::Error, config: &Config) {
    let message = format!("{:#}", e).to_lowercase();

    if message.contains("connection refused") && config.provider == LlmProvider::Ollama {
        eprintln!("\nTip: Make sure Ollama is running:");
        eprintln!("   ollama serve");
    } else if message.contains("unauthorized") {
        eprintln!("\nTip: Check FIRECRAWL_KEY, or point FIRECRAWL_BASE_URL at a self-hosted instance.");
    } else if message.contains("model") && config.provider == LlmProvider::Ollama {
        eprintln!("\nTip: Make sure the model is installed:");
        eprintln!("   ollama pull {}", config.model());
    }
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber for structured logging.
///
/// Logs go to stderr so that stdout carries only the result. `--verbose`
/// wins over `RUST_LOG`; an unparsable filter falls back to `info`.
fn init_logging(verbose: bool, log_level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
