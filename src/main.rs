use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vault_search::index::IndexCache;
use vault_search::output;
use vault_search::utils::AppConfig;

#[derive(Parser)]
#[command(name = "vsearch")]
#[command(about = "Fuzzy file and full-text search over a notes vault")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Vault root
    #[arg(short, long, global = true, default_value = ".")]
    path: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fuzzy search file names
    Files {
        query: String,

        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Full-text search file contents
    Content {
        query: String,

        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show matching lines of one file with context
    Snippets {
        /// File path relative to the vault root
        file: String,
        query: String,
    },
    /// Re-index files changed since the last build
    Update,
    /// Rebuild the index from scratch
    Rebuild,
    /// Show index statistics
    Stats,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    let root = cli
        .path
        .canonicalize()
        .with_context(|| format!("Vault root not found: {}", cli.path.display()))?;
    let cache = IndexCache::with_search_config(config.cache_config(), config.search_config());
    let index = cache.get_or_create_index(&root.to_string_lossy(), &root);

    let mut out = output::stdout(!cli.no_color && !cli.json);

    match cli.command {
        Commands::Files { query, limit } => {
            let results = index.search_files(&query, limit);
            if cli.json {
                output::print_json(&mut out, &results)?;
            } else {
                output::print_file_results(&mut out, &results)?;
            }
        }
        Commands::Content { query, limit } => {
            let results = index.search_content(&query, limit);
            if cli.json {
                output::print_json(&mut out, &results)?;
            } else {
                output::print_content_results(&mut out, &results)?;
            }
        }
        Commands::Snippets { file, query } => {
            let snippets = index.get_snippets(&file, &query);
            if cli.json {
                output::print_json(&mut out, &snippets)?;
            } else {
                output::print_snippets(&mut out, &file, &query, &snippets)?;
            }
        }
        Commands::Update => {
            let stats = index.update_index();
            if cli.json {
                output::print_json(&mut out, &stats)?;
            } else {
                output::print_update(&mut out, &stats)?;
            }
        }
        Commands::Rebuild => {
            index.rebuild_index();
            let stats = index.stats();
            if cli.json {
                output::print_json(&mut out, &stats)?;
            } else {
                output::print_stats(&mut out, &stats)?;
            }
        }
        Commands::Stats => {
            index.ensure_index_built();
            let stats = index.stats();
            if cli.json {
                output::print_json(&mut out, &stats)?;
            } else {
                output::print_stats(&mut out, &stats)?;
                if cli.verbose {
                    output::print_cache_stats(&mut out, &cache.get_cache_stats())?;
                }
            }
        }
    }

    Ok(())
}
