//! Core document type definitions.
//!
//! Defines [`DocumentType`] (the knowledge categories) and [`Document`] (a full
//! record as stored and as returned in search results).

use serde::{Deserialize, Serialize};

/// Knowledge categories. Unrecognised labels map to [`DocumentType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Durable rules of thumb.
    Principle,
    /// Recurring solutions or shapes.
    Pattern,
    /// Things discovered while working.
    Learning,
    /// Retrospectives and session summaries.
    Retro,
    #[serde(other)]
    Unknown,
}

impl DocumentType {
    pub const ALL: [DocumentType; 5] = [
        Self::Principle,
        Self::Pattern,
        Self::Learning,
        Self::Retro,
        Self::Unknown,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Principle => "principle",
            Self::Pattern => "pattern",
            Self::Learning => "learning",
            Self::Retro => "retro",
            Self::Unknown => "unknown",
        }
    }

    /// Lenient parse used when reading rows and vector metadata.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "principle" => Ok(Self::Principle),
            "pattern" => Ok(Self::Pattern),
            "learning" => Ok(Self::Learning),
            "retro" => Ok(Self::Retro),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("unknown document type: {s}")),
        }
    }
}

/// Type filter accepted by search: a concrete type or `"all"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Only(DocumentType),
}

impl TypeFilter {
    pub fn as_type(&self) -> Option<DocumentType> {
        match self {
            Self::All => None,
            Self::Only(t) => Some(*t),
        }
    }
}

impl std::str::FromStr for TypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" | "" => Ok(Self::All),
            other => other.parse().map(Self::Only),
        }
    }
}

/// A knowledge document. Read-only input and output for the retrieval engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, e.g. `learning_2026-01-04_cache-invalidation`.
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub content: String,
    /// Opaque reference back into the collaborator store (usually a file path).
    pub source_file: String,
    /// Tags. Order carries no meaning.
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl Document {
    /// Concepts sorted and deduplicated, so equal tag sets compare equal.
    pub fn normalized_concepts(&self) -> Vec<String> {
        let mut concepts = self.concepts.clone();
        concepts.sort();
        concepts.dedup();
        concepts
    }
}
