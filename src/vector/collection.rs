//! Typed wrappers over the subprocess's collection tools.
//!
//! Every verb goes through [`VectorClient::call`], so each one inherits the
//! reconnect-once policy. Responses run through [`parser::parse`] before
//! being picked apart.

use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::documents::{Document, DocumentType};
use crate::error::VectorError;
use crate::vector::{parser, ToolArgs, VectorClient};

pub const TOOL_CREATE_COLLECTION: &str = "chroma_create_collection";
pub const TOOL_ADD_DOCUMENTS: &str = "chroma_add_documents";
pub const TOOL_QUERY_DOCUMENTS: &str = "chroma_query_documents";
pub const TOOL_GET_DOCUMENTS: &str = "chroma_get_documents";
pub const TOOL_COLLECTION_COUNT: &str = "chroma_get_collection_count";
pub const TOOL_COLLECTION_INFO: &str = "chroma_get_collection_info";
pub const TOOL_DELETE_COLLECTION: &str = "chroma_delete_collection";

/// One row of a query response.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    pub distance: f64,
    pub document: Option<String>,
    pub metadata: Map<String, Value>,
}

impl QueryMatch {
    /// Rebuild a [`Document`] from what the vector index stores.
    pub fn to_document(&self) -> Document {
        let text = |key: &str| self.metadata.get(key).and_then(Value::as_str);
        Document {
            id: self.id.clone(),
            doc_type: text("type").map_or(DocumentType::Unknown, DocumentType::from_label),
            content: self.document.clone().unwrap_or_default(),
            source_file: text("source_file").unwrap_or_default().to_string(),
            concepts: text("concepts")
                .map(|c| {
                    c.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            project: text("project").map(String::from),
        }
    }
}

/// A named collection in the vector subprocess.
#[derive(Clone)]
pub struct Collection {
    client: Arc<VectorClient>,
    name: String,
}

impl Collection {
    pub fn new(client: Arc<VectorClient>, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Arc<VectorClient> {
        &self.client
    }

    fn args(&self) -> ToolArgs {
        let mut args = Map::new();
        args.insert("collection_name".into(), Value::String(self.name.clone()));
        args
    }

    /// Create the collection unless it already exists.
    pub async fn ensure(&self) -> Result<(), VectorError> {
        match self.client.call(TOOL_CREATE_COLLECTION, self.args()).await {
            Ok(_) => Ok(()),
            Err(VectorError::Tool { message, .. })
                if message.to_lowercase().contains("already exists") =>
            {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Add (or overwrite) documents. Concepts are stored comma-joined since
    /// metadata values must be scalars.
    pub async fn add_documents(&self, docs: &[Document]) -> Result<usize, VectorError> {
        if docs.is_empty() {
            return Ok(0);
        }
        let mut args = self.args();
        args.insert(
            "ids".into(),
            docs.iter().map(|d| Value::String(d.id.clone())).collect(),
        );
        args.insert(
            "documents".into(),
            docs.iter().map(|d| Value::String(d.content.clone())).collect(),
        );
        args.insert(
            "metadatas".into(),
            docs.iter()
                .map(|d| {
                    let mut meta = json!({
                        "type": d.doc_type.as_str(),
                        "source_file": d.source_file,
                        "concepts": d.normalized_concepts().join(","),
                    });
                    if let Some(project) = &d.project {
                        meta["project"] = Value::String(project.clone());
                    }
                    meta
                })
                .collect(),
        );
        self.client.call(TOOL_ADD_DOCUMENTS, args).await?;
        Ok(docs.len())
    }

    pub async fn query_by_text(
        &self,
        text: &str,
        n_results: usize,
        where_filter: Option<Value>,
    ) -> Result<Vec<QueryMatch>, VectorError> {
        let mut args = self.args();
        args.insert("query_texts".into(), json!([text]));
        args.insert("n_results".into(), json!(n_results));
        args.insert("include".into(), json!(["documents", "metadatas", "distances"]));
        if let Some(filter) = where_filter {
            args.insert("where".into(), filter);
        }
        let raw = self.client.call(TOOL_QUERY_DOCUMENTS, args).await?;
        parse_query_response(&raw)
    }

    pub async fn query_by_embedding(
        &self,
        embedding: &[f64],
        n_results: usize,
    ) -> Result<Vec<QueryMatch>, VectorError> {
        let mut args = self.args();
        args.insert("query_embeddings".into(), json!([embedding]));
        args.insert("n_results".into(), json!(n_results));
        args.insert("include".into(), json!(["documents", "metadatas", "distances"]));
        let raw = self.client.call(TOOL_QUERY_DOCUMENTS, args).await?;
        parse_query_response(&raw)
    }

    /// Stored embedding for `id`, or `None` if the id or its embedding is absent.
    pub async fn get_embedding(&self, id: &str) -> Result<Option<Vec<f64>>, VectorError> {
        let mut args = self.args();
        args.insert("ids".into(), json!([id]));
        args.insert("include".into(), json!(["embeddings", "documents", "metadatas"]));
        let raw = self.client.call(TOOL_GET_DOCUMENTS, args).await?;
        let value = parser::parse(&raw)?;

        let first = value
            .get("embeddings")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first());
        let Some(row) = first.and_then(Value::as_array) else {
            return Ok(None);
        };
        let embedding = row
            .iter()
            .map(|v| {
                v.as_f64().ok_or_else(|| VectorError::ProtocolParse {
                    message: format!("non-numeric embedding component: {v}"),
                    raw: raw.clone(),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        Ok((!embedding.is_empty()).then_some(embedding))
    }

    pub async fn count(&self) -> Result<u64, VectorError> {
        let raw = self.client.call(TOOL_COLLECTION_COUNT, self.args()).await?;
        let value = parser::parse(raw.trim())?;
        value
            .as_u64()
            .or_else(|| value.get("count").and_then(Value::as_u64))
            .ok_or_else(|| VectorError::ProtocolParse {
                message: "collection count is not a number".into(),
                raw,
            })
    }

    pub async fn info(&self) -> Result<Value, VectorError> {
        let raw = self.client.call(TOOL_COLLECTION_INFO, self.args()).await?;
        parser::parse(&raw)
    }

    pub async fn delete(&self) -> Result<(), VectorError> {
        self.client.call(TOOL_DELETE_COLLECTION, self.args()).await?;
        Ok(())
    }
}

/// Flatten the first query's row of `{ids, distances, documents, metadatas}`.
pub fn parse_query_response(raw: &str) -> Result<Vec<QueryMatch>, VectorError> {
    let value = parser::parse(raw)?;
    let protocol_err = |message: &str| VectorError::ProtocolParse {
        message: message.to_string(),
        raw: raw.to_string(),
    };

    let first_row = |key: &str| -> Vec<Value> {
        value
            .get(key)
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };

    if value.get("ids").is_none() {
        return Err(protocol_err("query response has no ids"));
    }
    let ids = first_row("ids");
    let distances = first_row("distances");
    let documents = first_row("documents");
    let metadatas = first_row("metadatas");

    if distances.len() != ids.len() {
        return Err(protocol_err("ids and distances differ in length"));
    }

    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let id = id
                .as_str()
                .ok_or_else(|| protocol_err("non-string id"))?
                .to_string();
            let distance = distances[i]
                .as_f64()
                .ok_or_else(|| protocol_err("non-numeric distance"))?;
            Ok(QueryMatch {
                id,
                distance,
                document: documents.get(i).and_then(Value::as_str).map(String::from),
                metadata: metadatas
                    .get(i)
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            })
        })
        .collect()
}
