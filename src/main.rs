//! Command-line inspection harness for the ledger engine.
//!
//! Wires the ledger store against the in-process backend, optionally seeded
//! from a JSON snapshot file, then prints the windowed reports the dashboard
//! would render. Real deployments replace the backend with their remote
//! store; this binary exists to exercise the full pipeline end to end.

use bill_buddy::{
    config,
    core::{
        aggregate::Window,
        export::{self, LedgerReport},
    },
    errors::{Error, Result},
    source::{LedgerSource, RemoteEntryRecord, memory::MemoryLedger},
    store::{FeedHealth, LedgerStore},
};
use chrono::Utc;
use dotenvy::dotenv;
use std::{fs::File, io::BufReader, path::Path, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

// The scheduling model is event-driven with no parallelism inside the core,
// so a single-threaded runtime is all the binary needs.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (as early as possible)
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()?;
    info!("Successfully processed application configuration.");

    // 4. Build the in-process backend and seed it if configured
    let ledger = Arc::new(MemoryLedger::new());
    let user_id = app_config
        .user_id
        .clone()
        .unwrap_or_else(|| "local".to_string());
    if let Some(path) = &app_config.seed_path {
        let records = load_seed(path)?;
        info!(count = records.len(), path = %path.display(), "seeding ledger from file");
        ledger.seed(&user_id, records).await;
    }

    // 5. Start the store and wait for the first delivery
    let source: Arc<dyn LedgerSource> = ledger;
    let store = LedgerStore::new(source);
    store.start(Some(&user_id)).await?;

    let mut rx = store.watch();
    let view = rx
        .wait_for(|view| view.health == FeedHealth::Live)
        .await
        .map_err(|_| Error::Subscription {
            message: "feed closed before first delivery".to_string(),
        })?
        .clone();

    // 6. Render the windowed reports
    let now = Utc::now();
    println!("Ledger for {user_id}: {} entries\n", view.entries.len());
    for window in [Window::All, Window::Yearly, Window::Monthly] {
        print_report(&export::build_report(&view.entries, window, now));
    }

    store.stop().await;
    Ok(())
}

fn load_seed(path: &Path) -> Result<Vec<RemoteEntryRecord>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

fn print_report(report: &LedgerReport) {
    println!("== {} ==", report.window.label());
    println!("  income:   {:>12.2}", report.total_income);
    println!("  expenses: {:>12.2}", report.total_expenses);
    println!("  profit:   {:>12.2}", report.profit);
    for row in &report.rows {
        println!(
            "  {} | {:<7} | {:>10.2} | {} | {}",
            row.date.format("%Y-%m-%d"),
            row.kind.as_str(),
            row.amount,
            row.title,
            row.note
        );
    }
    println!();
}
