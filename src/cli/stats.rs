use anyhow::Result;

use crate::config::OracleConfig;
use crate::context::OracleContext;
use crate::documents::DocumentType;

/// Display knowledge base statistics in the terminal.
pub async fn stats(config: &OracleConfig) -> Result<()> {
    let context = OracleContext::open(config)?;
    let outcome = context.stats().await;
    context.close().await;
    let report = outcome?;

    println!("Oracle Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total documents:     {}", report.total_documents);
    println!();

    println!("By Type:");
    for t in DocumentType::ALL {
        let count = report.by_type.get(t.as_str()).copied().unwrap_or(0);
        println!("  {:<12} {}", t.as_str(), count);
    }
    println!();

    println!("Vector collection:");
    if report.vector.enabled {
        println!("  Name:                {}", report.vector.collection.as_deref().unwrap_or("-"));
        println!("  Documents:           {}", report.vector.count);
        if let Some(state) = report.vector.state {
            println!("  Connection:          {state}");
        }
    } else {
        println!("  disabled");
    }

    Ok(())
}
