// Financial Literacy App - CLI
// seed / import / analyze against the same library the web server uses

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use finlit::{parse_batch, AnalysisBridge, AppConfig, CatalogStore, ImportPipeline, ScriptBridge};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("seed") => run_seed(&config),
        Some("import") => {
            let path = args.get(2).context("usage: finlit import <catalog.csv>")?;
            run_import(&config, Path::new(path))
        }
        Some("analyze") => {
            let path = args.get(2).context("usage: finlit analyze <transactions.csv>")?;
            run_analyze(&config, Path::new(path))
        }
        _ => {
            eprintln!("Financial Literacy App v{}", finlit::VERSION);
            eprintln!();
            eprintln!("Usage:");
            eprintln!("  finlit seed                          seed the catalog if empty");
            eprintln!("  finlit import <catalog.csv>          replace the catalog from a CSV");
            eprintln!("  finlit analyze <transactions.csv>    run the spending analysis bridge");
            Ok(())
        }
    }
}

fn run_seed(config: &AppConfig) -> Result<()> {
    let mut store = CatalogStore::open(&config.db_path)?;
    let seeded = store.seed_if_empty()?;

    if seeded > 0 {
        println!("✓ Seeded {} catalog entries", seeded);
    } else {
        println!("✓ Catalog already populated ({} entries)", store.count()?);
    }

    Ok(())
}

fn run_import(config: &AppConfig, csv_path: &Path) -> Result<()> {
    let data = fs::read(csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;

    let store = Arc::new(Mutex::new(CatalogStore::open(&config.db_path)?));
    let pipeline = ImportPipeline::new(store.clone());

    match pipeline.import(&data) {
        Ok(report) => {
            println!("✓ Imported {} products", report.inserted);
            println!("✓ Database contains {} entries", store.lock().unwrap().count()?);
            Ok(())
        }
        Err(err) => {
            eprintln!("✗ Import failed: {}", err);
            std::process::exit(1);
        }
    }
}

fn run_analyze(config: &AppConfig, csv_path: &Path) -> Result<()> {
    let data = fs::read(csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;

    let batch = match parse_batch(data.as_slice()) {
        Ok(batch) => batch,
        Err(err) => {
            eprintln!("✗ Could not parse transactions: {}", err);
            std::process::exit(1);
        }
    };

    println!("✓ Parsed {} transactions", batch.len());

    let bridge = ScriptBridge::new(&config.interpreter, &config.script_path, config.user_id);
    let annotated = bridge.analyze(batch);

    let flagged = annotated.iter().filter(|tx| tx.flagged).count();
    println!("✓ Analysis complete: {} of {} flagged", flagged, annotated.len());

    for (i, tx) in annotated.iter().enumerate() {
        if tx.flagged {
            println!(
                "  [{}] {:.2} {}: {}",
                i,
                tx.amount,
                tx.category,
                tx.advice.as_deref().unwrap_or("(no advice)")
            );
        }
    }

    Ok(())
}
