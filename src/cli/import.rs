//! CLI `import` command: load documents from a JSON file into the store.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::config::OracleConfig;
use crate::documents::{store, Document};

/// Accepted layouts: a bare array, or an object with a `documents` array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportData {
    List(Vec<Document>),
    Wrapped { documents: Vec<Document> },
}

impl ImportData {
    fn into_documents(self) -> Vec<Document> {
        match self {
            Self::List(docs) | Self::Wrapped { documents: docs } => docs,
        }
    }
}

/// Counts reported after an import.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: u64,
    pub replaced: u64,
    pub skipped: u64,
}

/// Parse an import file's contents.
pub fn parse_import(json: &str) -> Result<Vec<Document>> {
    let data: ImportData = serde_json::from_str(json).context("failed to parse import JSON")?;
    Ok(data.into_documents())
}

/// Upsert every document. Documents with empty content are skipped; a
/// missing id is generated as `<type>_<uuid v7>`.
pub fn import_documents(conn: &mut rusqlite::Connection, docs: &[Document]) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    for doc in docs {
        if doc.content.trim().is_empty() {
            tracing::warn!(id = %doc.id, "skipping document with empty content");
            summary.skipped += 1;
            continue;
        }
        let generated;
        let doc = if doc.id.trim().is_empty() {
            generated = Document {
                id: format!("{}_{}", doc.doc_type, uuid::Uuid::now_v7()),
                ..doc.clone()
            };
            &generated
        } else {
            doc
        };
        if store::upsert_document(conn, doc)?.replaced {
            summary.replaced += 1;
        } else {
            summary.inserted += 1;
        }
    }
    Ok(summary)
}

pub fn import(config: &OracleConfig, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;
    let docs = parse_import(&json)?;

    let mut conn = crate::db::open_database(config.resolved_db_path())?;
    println!("Importing {} documents...", docs.len());
    let summary = import_documents(&mut conn, &docs)?;

    println!("Import complete:");
    println!("  Inserted: {}", summary.inserted);
    println!("  Replaced: {}", summary.replaced);
    if summary.skipped > 0 {
        println!("  Skipped:  {} (empty content)", summary.skipped);
    }
    println!("Run `oracle reindex` to update the vector collection.");
    Ok(())
}
