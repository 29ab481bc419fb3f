use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use vsr_core::{Config, Evaluation, Hit, IndexSummary, ProjectionKind, QueryEngine, SearchMode};

use std::collections::HashSet;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build vector-space indices over a collection and run top-K retrieval", long_about = None)]
struct Cli {
    #[command(flatten)]
    opts: IndexArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct IndexArgs {
    /// JSON config file used as the base; flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Collection file or directory
    #[arg(long, global = true)]
    collection: Option<PathBuf>,
    /// Stopword file, one word per line
    #[arg(long, global = true)]
    stopwords: Option<PathBuf>,
    /// Debug-level tracing unless RUST_LOG is set
    #[arg(long, global = true, default_value_t = false)]
    trace: bool,
    /// Record build and query timings into the evaluation report
    #[arg(long, global = true, default_value_t = false)]
    measure: bool,
    /// Mark the evaluation report for plotting
    #[arg(long, global = true, default_value_t = false)]
    plot: bool,
    /// Number of results per query
    #[arg(long, global = true)]
    results: Option<usize>,
    /// Number of tiers in the tiered index (>= 2)
    #[arg(long, global = true)]
    tiers: Option<usize>,
    /// Random projection signature length in bits
    #[arg(long, global = true)]
    dimensions: Option<usize>,
    /// Where the evaluation report is written
    #[arg(long, global = true)]
    eval_path: Option<PathBuf>,
    /// Leader sample size for the cluster index
    #[arg(long, global = true)]
    leaders: Option<usize>,
    /// Projection matrix components: gaussian or bipolar
    #[arg(long, global = true)]
    projection: Option<ProjectionKind>,
    /// RNG seed for leaders and projection matrix
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Word vectors in word2vec text format
    #[arg(long, global = true)]
    embeddings: Option<PathBuf>,
    /// Disable stemming
    #[arg(long, global = true, default_value_t = false)]
    no_stem: bool,
}

impl IndexArgs {
    fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path).with_context(|| format!("reading config {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(p) = &self.collection {
            config.collection_path = p.clone();
        }
        if self.stopwords.is_some() {
            config.stopword_path = self.stopwords.clone();
        }
        config.trace |= self.trace;
        config.measure |= self.measure;
        config.plot |= self.plot;
        config.results = self.results.unwrap_or(config.results);
        config.tiers = self.tiers.unwrap_or(config.tiers);
        config.dimensions = self.dimensions.unwrap_or(config.dimensions);
        if let Some(p) = &self.eval_path {
            config.eval_path = p.clone();
        }
        config.leaders = self.leaders.or(config.leaders);
        config.projection = self.projection.unwrap_or(config.projection);
        config.seed = self.seed.or(config.seed);
        if self.embeddings.is_some() {
            config.embedding_path = self.embeddings.clone();
        }
        config.stemming &= !self.no_stem;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build all indices and print the index summary
    Build,
    /// Run a single query
    Search {
        query: String,
        #[arg(long, default_value = "vanilla")]
        mode: SearchMode,
    },
    /// Read queries from stdin; `:mode <name>` switches mode, `:q` quits
    Repl {
        #[arg(long, default_value = "vanilla")]
        mode: SearchMode,
    },
    /// Time every query of a file under every mode and write the report
    Eval {
        /// One query per line, optionally `label<TAB>query`
        #[arg(long)]
        queries: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.opts.to_config()?;

    let default_level = if config.trace { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).init();

    config.validate()?;
    let eval = match cli.command {
        Commands::Eval { .. } => Evaluation::new(true, config.plot),
        _ => Evaluation::from_config(&config),
    };
    let engine = QueryEngine::from_config(&config, &eval)
        .with_context(|| format!("building indices over {}", config.collection_path.display()))?;

    match cli.command {
        Commands::Build => {
            println!("{}", IndexSummary::of(engine.index()?));
        }
        Commands::Search { query, mode } => {
            let (hits, _) = timed_search(&engine, &eval, &query, config.results, mode, "query")?;
            print_hits(&engine, &hits)?;
        }
        Commands::Repl { mode } => repl(&engine, &eval, config.results, mode)?,
        Commands::Eval { queries } => evaluate(&engine, &eval, &queries, config.results)?,
    }

    if eval.is_enabled() {
        eval.write(&config.eval_path)?;
    }
    Ok(())
}

fn timed_search(
    engine: &QueryEngine,
    eval: &Evaluation,
    query: &str,
    k: usize,
    mode: SearchMode,
    label: &str,
) -> Result<(Vec<Hit>, f64)> {
    let m = eval.start(mode, label);
    let hits = engine.search(query, k, mode)?;
    let seconds = m.stop();
    tracing::info!(%mode, hits = hits.len(), seconds, "search finished");
    Ok((hits, seconds))
}

fn print_hits(engine: &QueryEngine, hits: &[Hit]) -> Result<()> {
    let docs = engine.index()?.documents();
    for (rank, hit) in hits.iter().enumerate() {
        let doc = docs.get(hit.doc_id)?;
        let preview: Vec<&str> = doc.tokens.iter().take(12).map(String::as_str).collect();
        println!("{:>3}. {:<12} {:.4}  {}", rank + 1, doc.external_id, hit.score, preview.join(" "));
    }
    if hits.is_empty() {
        println!("no results");
    }
    Ok(())
}

fn repl(engine: &QueryEngine, eval: &Evaluation, k: usize, mut mode: SearchMode) -> Result<()> {
    println!("[ready] mode {mode}");
    let stdin = io::stdin();
    let mut counter = 0usize;
    loop {
        print!("query ({mode})> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line == ":q" {
            break;
        }
        if let Some(name) = line.strip_prefix(":mode") {
            match name.trim().parse::<SearchMode>() {
                Ok(m) => mode = m,
                Err(e) => eprintln!("{e}"),
            }
            continue;
        }
        counter += 1;
        let (hits, _) = timed_search(engine, eval, line, k, mode, &format!("repl-{counter}"))?;
        print_hits(engine, &hits)?;
    }
    Ok(())
}

fn evaluate(engine: &QueryEngine, eval: &Evaluation, queries: &Path, k: usize) -> Result<()> {
    let text = fs::read_to_string(queries).with_context(|| format!("reading queries {}", queries.display()))?;
    let queries: Vec<(String, String)> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(i, l)| match l.split_once('\t') {
            Some((label, q)) => (label.to_string(), q.to_string()),
            None => (format!("q{}", i + 1), l.to_string()),
        })
        .collect();

    println!("{:<8} {:>12} {:>14}", "mode", "mean secs", "overlap@k");
    for mode in SearchMode::ALL {
        let mut total = 0.0;
        let mut overlap = 0.0;
        for (label, query) in &queries {
            let (hits, seconds) = timed_search(engine, eval, query, k, mode, label)?;
            let baseline: HashSet<u32> = engine.search(query, k, SearchMode::Vanilla)?.iter().map(|h| h.doc_id).collect();
            if !baseline.is_empty() {
                let shared = hits.iter().filter(|h| baseline.contains(&h.doc_id)).count();
                overlap += shared as f64 / baseline.len() as f64;
            }
            total += seconds;
        }
        let n = queries.len().max(1) as f64;
        println!("{:<8} {:>12.6} {:>14.3}", mode.to_string(), total / n, overlap / n);
    }
    Ok(())
}
