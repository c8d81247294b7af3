use crate::output::print_json;
use anyhow::Result;
use chrono::Local;
use std::time::Duration;
use verdant_core::config::Config;
use verdant_core::reconciler::Reconciler;
use verdant_core::store::SqliteStore;

// ---------------------------------------------------------------------------
// run (daemon loop)
// ---------------------------------------------------------------------------

pub fn run_loop(config: &Config, interval_secs: Option<u64>) -> Result<()> {
    let interval = interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.tick_interval());

    let store = SqliteStore::open(&config.database)?;
    let reconciler = Reconciler::new(store);

    tracing::info!(
        database = %config.database.display(),
        interval_secs = interval.as_secs(),
        "reconciliation loop starting"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        tokio::select! {
            _ = reconciler.run(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
            }
        }
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// tick (single pass)
// ---------------------------------------------------------------------------

pub fn run_once(config: &Config, json: bool) -> Result<()> {
    let store = SqliteStore::open(&config.database)?;
    let reconciler = Reconciler::new(store);
    let summary = reconciler.tick(Local::now().naive_local());

    if json {
        print_json(&summary)?;
    } else {
        println!(
            "turned on: {}  extended: {}  turned off: {}  unchanged: {}  failed: {}",
            summary.turned_on,
            summary.extended,
            summary.turned_off,
            summary.unchanged,
            summary.failed
        );
    }
    Ok(())
}
