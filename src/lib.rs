pub mod config;
pub mod corpus;
pub mod engine;
pub mod logging;
pub mod search;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use colored::Colorize;

use config::HybridConfig;
use search::{Candidate, SearchError, SearchQuery, SearchResult};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "hyret",
    version,
    about = "Hybrid lexical + vector retrieval over a JSONL corpus"
)]
pub struct Cli {
    /// Config file (defaults to config.toml in the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Hybrid search with lexical fallback
    Search(QueryArgs),
    /// Vector-only search; fails when the semantic path is disabled
    Neural(QueryArgs),
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate man page to stdout
    Man,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Query text
    pub query: String,

    /// JSONL corpus to search
    #[arg(long)]
    pub corpus: PathBuf,

    /// Maximum number of results
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Metadata filter, exact match (repeatable)
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// Enable the semantic path for this run
    #[arg(long, conflicts_with = "no_semantic")]
    pub semantic: bool,

    /// Disable the semantic path for this run
    #[arg(long)]
    pub no_semantic: bool,

    /// Vector path budget in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryArgs {
    fn apply_to(&self, config: &mut HybridConfig) {
        if self.semantic {
            config.semantic_enabled = true;
        } else if self.no_semantic {
            config.semantic_enabled = false;
        }
        if let Some(ms) = self.timeout_ms {
            config.vector_timeout = Duration::from_millis(ms);
        }
    }

    fn query(&self) -> SearchQuery {
        SearchQuery::new(&self.query, self.limit).with_filters(self.filters.iter().cloned())
    }
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Search(args) => run_query(cli.config, args, false).await,
        Commands::Neural(args) => run_query(cli.config, args, true).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "hyret", &mut std::io::stdout());
            Ok(())
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            let mut out = std::io::stdout();
            man.render(&mut out)?;
            Ok(())
        }
    }
}

async fn run_query(config_path: Option<PathBuf>, args: QueryArgs, neural: bool) -> Result<()> {
    let mut config = HybridConfig::load(config_path.as_deref()).context("loading configuration")?;
    args.apply_to(&mut config);

    let documents = corpus::load_corpus(&args.corpus)?;
    let searcher = engine::build_local_searcher(&documents, config)?;

    let query = args.query();
    let outcome = if neural {
        searcher.search_neural(&query).await
    } else {
        searcher.search(&query).await
    };
    let result = outcome.map_err(|e| {
        let status = e.status_code();
        anyhow::Error::new(e).context(format!("search failed (status {status})"))
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if !std::io::stdout().is_terminal() {
            colored::control::set_override(false);
        }
        print!("{}", format_human(&result));
    }
    Ok(())
}

/// Plain-text rendering: one entry per candidate plus a mode footer.
pub fn format_human(result: &SearchResult) -> String {
    let mut out = String::new();

    if result.candidates.is_empty() {
        out.push_str(&format!("{}\n", "No results.".dimmed()));
    }

    for (rank, candidate) in result.candidates.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {}  {}  {}\n",
            rank + 1,
            candidate.id.bold(),
            format!("{:.3}", candidate.fused_score).cyan(),
            component_scores(candidate).dimmed()
        ));
        if !candidate.text.is_empty() {
            out.push_str(&format!("     {}\n", candidate.text.replace('\n', " ")));
        }
    }

    let mode = if result.search_mode.is_degraded() {
        result.search_mode.as_str().yellow().to_string()
    } else {
        result.search_mode.as_str().green().to_string()
    };
    out.push_str(&format!(
        "\n{} results of {} considered | mode {} | {}ms\n",
        result.candidates.len(),
        result.total_candidates,
        mode,
        result.total_latency_ms
    ));
    if let Some(reason) = &result.fallback_reason {
        out.push_str(&format!("{} {}\n", "fallback:".yellow(), reason));
    }
    out
}

fn component_scores(candidate: &Candidate) -> String {
    let fmt = |score: Option<f32>| score.map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
    format!(
        "(lexical {} | vector {} | {:?})",
        fmt(candidate.lexical_score),
        fmt(candidate.vector_score),
        candidate.source
    )
}

/// Process exit code for an error returned by [`run`].
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SearchError>() {
        Some(e) if e.status_code() == 400 => 2,
        Some(e) if e.status_code() == 503 => 3,
        _ => 1,
    }
}
