//! Write and read paths for the document store.
//!
//! [`upsert_document`] keeps the `documents_fts` external-content index in sync
//! with the `documents` table. [`ranked_search`] is the keyword primitive the
//! lexical leg is built on; it returns FTS5's raw `rank`, which is negative
//! with values closer to zero being better matches.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;
use std::collections::HashMap;

use crate::documents::types::{Document, DocumentType};

/// Result of an upsert.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UpsertResult {
    pub id: String,
    /// `true` if an existing row with this id was replaced.
    pub replaced: bool,
}

/// Insert a document, or replace the existing one with the same id.
pub fn upsert_document(conn: &mut Connection, doc: &Document) -> Result<UpsertResult> {
    let tx = conn.transaction()?;
    let now = chrono::Utc::now().to_rfc3339();
    let concepts = serde_json::to_string(&doc.normalized_concepts())?;

    let existing: Option<(i64, String, String)> = tx
        .query_row(
            "SELECT rowid, content, type FROM documents WHERE id = ?1",
            params![doc.id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let replaced = if let Some((rowid, old_content, old_type)) = existing {
        delete_fts(&tx, rowid, &old_content, &doc.id, &old_type)?;
        tx.execute(
            "UPDATE documents SET type = ?1, content = ?2, source_file = ?3, concepts = ?4, \
             project = ?5, updated_at = ?6 WHERE rowid = ?7",
            params![
                doc.doc_type.as_str(),
                doc.content,
                doc.source_file,
                concepts,
                doc.project,
                now,
                rowid
            ],
        )?;
        insert_fts(&tx, rowid, doc)?;
        true
    } else {
        tx.execute(
            "INSERT INTO documents (id, type, content, source_file, concepts, project, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                doc.id,
                doc.doc_type.as_str(),
                doc.content,
                doc.source_file,
                concepts,
                doc.project,
                now
            ],
        )?;
        let rowid = tx.last_insert_rowid();
        insert_fts(&tx, rowid, doc)?;
        false
    };

    tx.commit()?;
    Ok(UpsertResult {
        id: doc.id.clone(),
        replaced,
    })
}

/// Ranked FTS5 keyword search. `query` is passed to MATCH as-is.
pub fn ranked_search(
    conn: &Connection,
    query: &str,
    type_filter: Option<DocumentType>,
    limit: usize,
) -> Result<Vec<(String, f64)>> {
    let mut results = Vec::new();
    match type_filter {
        Some(doc_type) => {
            let mut stmt = conn.prepare(
                "SELECT id, rank FROM documents_fts \
                 WHERE documents_fts MATCH ?1 AND type = ?2 ORDER BY rank, id LIMIT ?3",
            )?;
            let rows = stmt.query_map(
                params![query, doc_type.as_str(), limit as i64],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )?;
            for row in rows {
                results.push(row?);
            }
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, rank FROM documents_fts \
                 WHERE documents_fts MATCH ?1 ORDER BY rank, id LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![query, limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?;
            for row in rows {
                results.push(row?);
            }
        }
    }
    Ok(results)
}

/// Batch-fetch documents by id.
pub fn fetch_documents(conn: &Connection, ids: &[&str]) -> Result<HashMap<String, Document>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT id, type, content, source_file, concepts, project \
         FROM documents WHERE id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

    let rows = stmt
        .query_map(params.as_slice(), row_to_document)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().map(|doc| (doc.id.clone(), doc)).collect())
}

/// All documents in insertion order.
pub fn list_documents(conn: &Connection) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare(
        "SELECT id, type, content, source_file, concepts, project \
         FROM documents ORDER BY rowid",
    )?;
    let docs = stmt
        .query_map([], row_to_document)?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to list documents")?;
    Ok(docs)
}

/// Document counts keyed by type label.
pub fn count_by_type(conn: &Connection) -> Result<HashMap<String, u64>> {
    let mut stmt = conn.prepare("SELECT type, COUNT(*) FROM documents GROUP BY type")?;
    let counts = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(counts)
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let doc_type: String = row.get(1)?;
    let concepts: String = row.get(4)?;
    Ok(Document {
        id: row.get(0)?,
        doc_type: DocumentType::from_label(&doc_type),
        content: row.get(2)?,
        source_file: row.get(3)?,
        concepts: serde_json::from_str(&concepts).unwrap_or_default(),
        project: row.get(5)?,
    })
}

fn insert_fts(tx: &Transaction, rowid: i64, doc: &Document) -> Result<()> {
    tx.execute(
        "INSERT INTO documents_fts (rowid, content, id, type) VALUES (?1, ?2, ?3, ?4)",
        params![rowid, doc.content, doc.id, doc.doc_type.as_str()],
    )?;
    Ok(())
}

/// External-content FTS5 tables need the old values to remove a row.
fn delete_fts(tx: &Transaction, rowid: i64, content: &str, id: &str, doc_type: &str) -> Result<()> {
    tx.execute(
        "INSERT INTO documents_fts (documents_fts, rowid, content, id, type) \
         VALUES ('delete', ?1, ?2, ?3, ?4)",
        params![rowid, content, id, doc_type],
    )?;
    Ok(())
}
