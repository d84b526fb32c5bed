use clap::Parser;
use corpus2vec::ui::cli::{BackendArgs, Cli, Commands};
use corpus2vec::{
    BatchLimits, ChunkOptions, Config, EmbeddingBackend, Error, HttpBackend, IndexPipeline,
    IndexingConfig, MockBackend, RecordStore, Result, UnitStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("corpus2vec=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { base_dir } => handle_init(base_dir.as_deref()),
        Commands::Index {
            path,
            force,
            base_dir,
            strategy,
            target_tokens,
            overlap_tokens,
            min_unit_chars,
            batch_units,
            batch_chars,
            batch_tokens,
            max_concurrent,
            backend,
        } => {
            let indexing = IndexingConfig {
                chunking: ChunkOptions {
                    strategy: strategy.parse()?,
                    target_tokens,
                    overlap_tokens,
                    min_unit_chars,
                },
                batch: BatchLimits {
                    max_units: batch_units,
                    max_chars: batch_chars,
                    max_tokens: batch_tokens,
                },
                max_concurrent_requests: max_concurrent,
            };
            handle_index(&path, force, base_dir.as_deref(), indexing, &backend).await
        }
        Commands::Search {
            query,
            limit,
            base_dir,
            backend,
        } => handle_search(&query, limit, base_dir.as_deref(), &backend).await,
        Commands::Stats { base_dir } => handle_stats(base_dir.as_deref()),
    }
}

fn open_config(base_dir: Option<&str>) -> Result<Config> {
    let config = Config::new(base_dir.map(PathBuf::from))?;
    if !config.is_initialized() {
        return Err(Error::Config(
            "corpus2vec is not initialized. Run 'corpus2vec init' first.".to_string(),
        ));
    }
    Ok(config)
}

fn build_backend(args: &BackendArgs) -> Result<Arc<dyn EmbeddingBackend>> {
    match args.backend.as_str() {
        "mock" => Ok(Arc::new(MockBackend::default())),
        "http" => {
            let api_key = std::env::var(&args.api_key_env).unwrap_or_default();
            Ok(Arc::new(HttpBackend::new(
                &args.backend_url,
                &api_key,
                &args.model,
                None,
                Duration::from_secs(60),
            )?))
        }
        other => Err(Error::Config(format!(
            "unknown backend '{}' (expected 'http' or 'mock')",
            other
        ))),
    }
}

fn handle_init(base_dir: Option<&str>) -> Result<()> {
    println!("Initializing corpus2vec...");

    let base_path = base_dir
        .map(PathBuf::from)
        .or_else(|| Config::default_base_dir().ok());

    let config = Config::new(base_path)?;

    if config.is_initialized() {
        println!("corpus2vec is already initialized at: {:?}", config.base_dir);
        println!("To reinitialize, delete the directory and run 'init' again.");
        return Ok(());
    }

    config.init()?;
    println!("✓ Created configuration directory: {:?}", config.base_dir);
    println!("✓ Created unit database directory: {:?}", config.units_path.parent().unwrap());
    println!("✓ Created record database directory: {:?}", config.records_path.parent().unwrap());

    println!("\nInitialization complete!");
    println!("Next steps:");
    println!("  1. Export an API key: export CORPUS2VEC_API_KEY=...");
    println!("  2. Index your documents: corpus2vec index /path/to/documents");
    println!("  3. Search them: corpus2vec search \"a question about your notes\"");

    Ok(())
}

async fn handle_index(
    path: &str,
    force: bool,
    base_dir: Option<&str>,
    indexing: IndexingConfig,
    backend_args: &BackendArgs,
) -> Result<()> {
    println!("Indexing documents from: {}", path);

    let config = open_config(base_dir)?;
    let records = RecordStore::open(&config)?;
    let units = UnitStore::open(&config)?;
    let backend = build_backend(backend_args)?;

    let pipeline = IndexPipeline::new(records, units, backend, indexing)?;
    let report = pipeline.run(&PathBuf::from(path), force).await?;

    println!("\nIndexing complete!");
    println!("  Files scanned: {}", report.files_scanned);
    println!("  Files indexed: {}", report.files_indexed);
    if report.files_deleted > 0 {
        println!("  Files removed from index: {}", report.files_deleted);
    }
    if report.files_errored > 0 {
        println!("  Files skipped (unreadable): {}", report.files_errored);
    }
    println!(
        "  Units written: {} (in {} batches)",
        report.units_written, report.batches
    );
    if report.units_skipped > 0 {
        println!("  Units skipped (duplicate): {}", report.units_skipped);
    }
    if report.units_filtered > 0 {
        println!("  Units dropped (below minimum size): {}", report.units_filtered);
    }

    Ok(())
}

async fn handle_search(
    query: &str,
    limit: usize,
    base_dir: Option<&str>,
    backend_args: &BackendArgs,
) -> Result<()> {
    println!("Searching for: \"{}\"", query);

    let config = open_config(base_dir)?;
    let units = UnitStore::open(&config)?;
    let backend = build_backend(backend_args)?;

    let embedded = backend.embed(&[query.to_string()]).await?;
    let query_vector = embedded.into_iter().next().ok_or_else(|| {
        Error::Embedding("backend returned no vector for the query".to_string())
    })?;

    let results = units.search(&query_vector, limit)?;
    if results.is_empty() {
        println!("\nNo results found.");
        return Ok(());
    }

    println!("\nFound {} results:", results.len());
    for (i, (item, similarity)) in results.iter().enumerate() {
        println!(
            "\n{}. {} (similarity: {:.3})",
            i + 1,
            item.unit.source_path,
            similarity
        );
        println!("   Lines: {}-{}", item.unit.start_line, item.unit.end_line);
        let preview: String = item.unit.text.chars().take(150).collect();
        println!("   Preview: {}", preview.trim());
    }

    Ok(())
}

fn handle_stats(base_dir: Option<&str>) -> Result<()> {
    let config = open_config(base_dir)?;
    let records = RecordStore::open(&config)?;
    let units = UnitStore::open(&config)?;

    println!("Index statistics:");
    println!("  Files tracked: {}", records.file_records()?.len());
    println!("  Units stored: {}", units.count_units()?);
    println!("  Data directory: {:?}", config.base_dir);

    Ok(())
}
