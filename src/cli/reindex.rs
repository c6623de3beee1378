//! CLI `reindex` command: push every stored document to the vector collection.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::OracleConfig;
use crate::context::OracleContext;
use crate::documents::store;

const BATCH_SIZE: usize = 50;

/// With `fresh`, the collection is dropped and recreated first.
pub async fn reindex(config: &OracleConfig, fresh: bool) -> Result<()> {
    let context = OracleContext::open(config)?;
    let result = run(&context, fresh).await;
    context.close().await;
    result
}

async fn run(context: &OracleContext, fresh: bool) -> Result<()> {
    let collection = context
        .collection()
        .context("vector search is disabled; enable [vector] to reindex")?;

    let docs = {
        let conn = context.index().lock()?;
        store::list_documents(&conn)?
    };
    if docs.is_empty() {
        println!("No documents to index.");
        return Ok(());
    }

    if fresh {
        if let Err(e) = collection.delete().await {
            tracing::warn!(error = %e, collection = collection.name(), "delete before reindex failed");
        }
    }
    collection
        .ensure()
        .await
        .with_context(|| format!("failed to create collection '{}'", collection.name()))?;

    println!(
        "Indexing {} documents into collection '{}'...",
        docs.len(),
        collection.name()
    );

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .context("invalid progress template")?
            .progress_chars("##-"),
    );

    let mut indexed = 0;
    for chunk in docs.chunks(BATCH_SIZE) {
        indexed += collection
            .add_documents(chunk)
            .await
            .context("failed to add documents to the vector collection")?;
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    let count = collection.count().await.unwrap_or(0);
    println!("Indexed {indexed} documents (collection now holds {count}).");
    Ok(())
}
