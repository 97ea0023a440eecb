//! Range lock demo: a reader holds bytes 100..=150 while a writer asks for
//! the overlapping 120..=170 and waits until the reader lets go.

use anyhow::Context;
use rangelock::{RangeLockConfig, RangeLockTable};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            RangeLockConfig::from_json_file(&path)
                .with_context(|| format!("loading config from {}", path.display()))?
        }
        None => RangeLockConfig::default(),
    };
    tracing::info!("Using config {:?}", config);

    let table = Arc::new(RangeLockTable::with_config(config)?);

    table.acquire_read(100, 50)?;

    let writer = {
        let table = Arc::clone(&table);
        thread::spawn(move || table.acquire_write(120, 50))
    };

    thread::sleep(Duration::from_millis(200));
    tracing::info!(
        "Writer blocked: {}, held ranges: {:?}",
        !writer.is_finished(),
        table.held_ranges()?
    );

    table.release_read(100, 50)?;
    writer
        .join()
        .map_err(|_| anyhow::anyhow!("writer thread panicked"))??;
    table.release_write(120, 50)?;

    let stats = table.stats()?;
    tracing::info!("Final stats: {}", serde_json::to_string(&stats)?);

    Ok(())
}
