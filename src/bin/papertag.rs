//! Papertag CLI: ingest fetched papers, inspect tags, combinations and scores.
//!
//! Usage:
//!   papertag ingest <file> [--db path]
//!   papertag classify --title <title> [--abstract <text>] [--category <code>]... [--field <name>]...
//!   papertag combos <novel|popular|paper> [--db path]

use clap::{Parser, Subcommand};
use papertag::combo::{
    ComboSummary, DEFAULT_NOVEL_MIN_FREQUENCY, DEFAULT_POPULAR_MIN_FREQUENCY, DEFAULT_QUERY_LIMIT,
};
use papertag::storage::{PaperStore, TagStore};
use papertag::{
    logging, IngestionPipeline, OpenStore, PaperId, PaperRecord, SourceTaxonomy, SqliteStore,
    TaggingConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "papertag",
    version,
    about = "Tag classification, novel combination tracking and relevance scoring for research papers"
)]
struct Cli {
    /// Path to SQLite database file
    #[arg(long, global = true, env = "PAPERTAG_DB")]
    db: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest paper records from a JSON array or JSON lines file
    Ingest {
        /// File of records; `-` reads stdin
        path: PathBuf,
    },
    /// Classify text without persisting anything
    Classify {
        #[arg(long)]
        title: String,
        #[arg(long = "abstract")]
        abstract_text: Option<String>,
        /// Source taxonomy code, e.g. cs.AI (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Source field of study (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,
    },
    /// Compute a paper's relevance score and store it
    Score {
        /// Paper id
        id: i64,
    },
    /// Query tag combinations
    Combos {
        #[command(subcommand)]
        action: ComboAction,
    },
    /// List tags by frequency
    Tags {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Recompute tag frequencies from paper-tag associations
    Recount,
}

#[derive(Subcommand)]
enum ComboAction {
    /// Combinations seen in few papers, newest first
    Novel {
        #[arg(long, default_value_t = DEFAULT_NOVEL_MIN_FREQUENCY)]
        min_frequency: u32,
        #[arg(long, default_value_t = DEFAULT_QUERY_LIMIT)]
        limit: usize,
    },
    /// Most frequent combinations
    Popular {
        #[arg(long, default_value_t = DEFAULT_POPULAR_MIN_FREQUENCY)]
        min_frequency: u32,
        #[arg(long, default_value_t = DEFAULT_QUERY_LIMIT)]
        limit: usize,
    },
    /// Novel combinations among one paper's tags
    Paper {
        /// Paper id
        id: i64,
    },
}

/// Get the default database path (~/.local/share/papertag/papertag.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    let papertag_dir = data_dir.join("papertag");
    std::fs::create_dir_all(&papertag_dir).ok();
    papertag_dir.join("papertag.db")
}

fn open_pipeline(
    db: Option<PathBuf>,
    config: &TaggingConfig,
) -> Result<IngestionPipeline<SqliteStore>, String> {
    let db_path = db.unwrap_or_else(default_db_path);
    let store =
        SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    IngestionPipeline::new(Arc::new(store), config)
        .map_err(|e| format!("Failed to load lexicon: {}", e))
}

/// Parse a JSON array of records, falling back to one record per line.
fn read_records(path: &Path) -> Result<Vec<PaperRecord>, String> {
    let raw = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin())
    } else {
        std::fs::read_to_string(path)
    }
    .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;

    if raw.trim_start().starts_with('[') {
        return serde_json::from_str(&raw).map_err(|e| format!("invalid JSON array: {}", e));
    }
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| format!("line {}: {}", n + 1, e))
        })
        .collect()
}

fn cmd_ingest(pipeline: &IngestionPipeline<SqliteStore>, path: &Path) -> i32 {
    let records = match read_records(path) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let report = pipeline.ingest_batch(records);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    }
    if report.failed > 0 {
        2
    } else {
        0
    }
}

fn cmd_classify(
    pipeline: &IngestionPipeline<SqliteStore>,
    title: &str,
    abstract_text: Option<&str>,
    categories: Vec<String>,
    fields: Vec<String>,
) -> i32 {
    let taxonomy = SourceTaxonomy { categories, fields };
    let tags = pipeline
        .classifier()
        .classify_text(title, abstract_text, &taxonomy);
    if tags.is_empty() {
        println!("No tags above the confidence threshold.");
        return 0;
    }
    println!(
        "{:<28}  {:>10}  {:>6}  {:>6}  {:>6}",
        "TAG", "CONFIDENCE", "RULE", "FREQ", "SOURCE"
    );
    println!("{}", "-".repeat(64));
    for tag in tags {
        println!(
            "{:<28}  {:>10.3}  {:>6.3}  {:>6.3}  {:>6.3}",
            tag.name, tag.confidence, tag.signals.rule, tag.signals.frequency, tag.signals.source
        );
    }
    0
}

fn cmd_score(pipeline: &IngestionPipeline<SqliteStore>, id: i64) -> i32 {
    let paper_id = PaperId::new(id);
    match pipeline.store().load_paper(paper_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            eprintln!("Error: paper {} not found", id);
            return 1;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    }
    match pipeline.score_and_save(paper_id) {
        Some(score) => {
            println!("{:.2}", score);
            0
        }
        None => {
            eprintln!("Error: scoring failed for paper {}", id);
            1
        }
    }
}

fn print_combos(combos: &[ComboSummary]) {
    if combos.is_empty() {
        println!("No combinations found.");
        return;
    }
    println!("{:>6}  {:<48}  {:>9}  {:>5}", "ID", "TAGS", "FREQUENCY", "NOVEL");
    println!("{}", "-".repeat(74));
    for combo in combos {
        println!(
            "{:>6}  {:<48}  {:>9}  {:>5}",
            combo.id.get(),
            combo.tag_names.join(" + "),
            combo.frequency,
            if combo.is_novel { "yes" } else { "no" }
        );
    }
}

fn cmd_combos(pipeline: &IngestionPipeline<SqliteStore>, action: ComboAction) -> i32 {
    let tracker = pipeline.combo_tracker();
    let result = match action {
        ComboAction::Novel {
            min_frequency,
            limit,
        } => tracker.novel_combinations(min_frequency, limit),
        ComboAction::Popular {
            min_frequency,
            limit,
        } => tracker.popular_combinations(min_frequency, limit),
        ComboAction::Paper { id } => tracker.paper_novel_combos(PaperId::new(id)),
    };
    match result {
        Ok(combos) => {
            print_combos(&combos);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_tags(pipeline: &IngestionPipeline<SqliteStore>, limit: Option<usize>) -> i32 {
    let tags = match pipeline.store().list_tags(limit) {
        Ok(tags) => tags,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if tags.is_empty() {
        println!("No tags yet.");
        return 0;
    }
    println!("{:<28}  {:>9}  {:>8}  {:<20}", "NAME", "FREQUENCY", "GROWTH", "LAST SEEN");
    println!("{}", "-".repeat(72));
    for tag in tags {
        let last_seen = tag
            .last_seen
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<28}  {:>9}  {:>8.2}  {:<20}",
            tag.name, tag.frequency, tag.growth_rate, last_seen
        );
    }
    0
}

fn cmd_recount(pipeline: &IngestionPipeline<SqliteStore>) -> i32 {
    match pipeline.registry().recount_frequencies() {
        Ok(corrected) => {
            pipeline.invalidate_cache();
            println!("Corrected {} tag frequencies", corrected);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = logging::init(logging::DEFAULT_FILTER, cli.json_logs) {
        eprintln!("Warning: logging not initialized: {}", e);
    }

    let config = match TaggingConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let pipeline = match open_pipeline(cli.db, &config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Ingest { path } => cmd_ingest(&pipeline, &path),
        Commands::Classify {
            title,
            abstract_text,
            categories,
            fields,
        } => cmd_classify(
            &pipeline,
            &title,
            abstract_text.as_deref(),
            categories,
            fields,
        ),
        Commands::Score { id } => cmd_score(&pipeline, id),
        Commands::Combos { action } => cmd_combos(&pipeline, action),
        Commands::Tags { limit } => cmd_tags(&pipeline, limit),
        Commands::Recount => cmd_recount(&pipeline),
    };
    std::process::exit(code);
}
