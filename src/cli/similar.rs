use anyhow::Result;

use crate::config::OracleConfig;
use crate::context::OracleContext;
use crate::search::engine::truncate_content;

/// Print the nearest neighbours of a document.
pub async fn similar(config: &OracleConfig, id: &str, limit: usize) -> Result<()> {
    let context = OracleContext::open(config)?;
    let outcome = context.engine().similar(id, limit).await;
    context.close().await;
    let results = outcome?;

    if results.is_empty() {
        println!("No similar documents found for {id}.");
        return Ok(());
    }

    println!("Documents similar to {id}:\n");
    for (i, hit) in results.iter().enumerate() {
        println!("  {}. [{}] {} (score: {:.4})", i + 1, hit.doc_type, hit.id, hit.score);
        println!("     {}", truncate_content(&hit.content, 120));
        println!();
    }
    Ok(())
}
