use anyhow::Result;

use crate::config::OracleConfig;
use crate::context::OracleContext;
use crate::search::engine::truncate_content;
use crate::search::SearchRequest;

/// Run a search from the terminal.
pub async fn search(
    config: &OracleConfig,
    query: &str,
    doc_type: Option<&str>,
    limit: Option<usize>,
    mode: Option<&str>,
) -> Result<()> {
    let context = OracleContext::open(config)?;
    let request = SearchRequest::from_args(
        query,
        doc_type,
        limit,
        None,
        mode,
        config.retrieval.default_limit,
    )?;
    let outcome = context.engine().search(request).await;
    context.close().await;
    let response = outcome?;

    if let Some(warning) = &response.metadata.warning {
        println!("Note: {warning}\n");
    }
    if response.results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!(
        "Found {} result(s) in {} ms (fts: {}, vector: {}, hybrid: {})\n",
        response.total,
        response.metadata.elapsed_ms,
        response.metadata.sources.lexical,
        response.metadata.sources.semantic,
        response.metadata.sources.hybrid,
    );

    for (i, hit) in response.results.iter().enumerate() {
        println!(
            "  {}. [{}] {} ({:?}, score: {:.4})",
            i + 1,
            hit.doc_type,
            hit.id,
            hit.provenance,
            hit.score,
        );
        println!("     {}", truncate_content(&hit.content, 120));
        println!();
    }

    Ok(())
}
