//! CLI `doctor` command: check the document store and the vector subprocess.

use anyhow::{Context, Result};

use crate::config::OracleConfig;
use crate::context::OracleContext;

pub async fn doctor(config: &OracleConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `oracle import <file>` to create it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    let context = OracleContext::open(config).context("failed to open database (may be corrupt)")?;
    let health = context.health().await.context("failed to run health check")?;

    println!("Oracle Health Report");
    println!("====================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", health.database.schema_version);
    println!("Documents:         {}", health.database.document_count);
    println!("FTS rows:          {}", health.database.fts_count);
    if health.database.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED");
        println!("  Re-import from the source files: oracle import <file>");
    }
    println!();

    match context.collection() {
        None => println!("Vector search:     disabled"),
        Some(collection) => {
            println!("Vector command:    {} {}", config.vector.command, config.vector.args.join(" "));
            match collection.client().connect().await {
                Ok(()) => {
                    let count = collection.count().await.map(|c| c.to_string());
                    println!("Vector status:     connected");
                    println!(
                        "Collection:        {} ({})",
                        collection.name(),
                        count.unwrap_or_else(|e| format!("unavailable: {e}"))
                    );
                    if let Some(semantic) = context.engine().semantic() {
                        println!("Collection info:   {}", semantic.collection_info().await);
                    }
                }
                Err(e) => println!("Vector status:     {e}"),
            }
        }
    }

    context.close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
