use std::io::{stderr, stdout, BufWriter};
use std::process::exit;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use balance_reconciler::cache::PageCache;
use balance_reconciler::config::Config;
use balance_reconciler::engine::{load_ledger, warm_cache, write_accounts, BatchEngine};
use balance_reconciler::identity::PassthroughIdentity;
use balance_reconciler::reconciler::Reconciler;
use balance_reconciler::storage::{MemoryStore, SqliteStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            eprintln!("Available log levels: error, warn, info, debug, trace (default: error)");
            exit(1);
        }
    };

    setup_logging(config.log_level);

    match &config.database {
        Some(path) => {
            info!("Using SQLite store at {}", path.display());
            run(Arc::new(SqliteStore::open(path)?), &config).await
        }
        None => run(Arc::new(MemoryStore::new()), &config).await
    }
}

async fn run<S: Store>(store: Arc<S>, config: &Config) -> Result<()> {
    store.import(load_ledger(&config.ledger_path)?)?;

    let cache = Arc::new(PageCache::new(config.cache_capacity));
    warm_cache(&*store, &cache)?;

    let reconciler = Reconciler::new(store.clone(), Arc::new(PassthroughIdentity), cache.clone())
        .with_max_attempts(config.max_attempts);
    let engine = BatchEngine::new(reconciler);

    let timer = Instant::now();
    let summary = engine.run(&config.operations_path).await?;
    let duration = timer.elapsed();

    info!("Processed {} operations ({} failed) in: {duration:?}", summary.succeeded + summary.failed, summary.failed);

    let mut output = BufWriter::new(stdout().lock());
    write_accounts(&*store, &cache, &mut output)?;

    Ok(())
}

fn setup_logging(level: LevelFilter) {
    //NOTE: Because we are doing stdout redirection, we will need to utilize stderr to display logging
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}
