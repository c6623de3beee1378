//! Hybrid retrieval: a keyword leg over the document store and a semantic leg
//! over the vector subprocess, fused into one ranked list.

pub mod engine;
pub mod fusion;
pub mod lexical;
pub mod semantic;
pub mod types;

pub use engine::SearchEngine;
pub use lexical::DocumentIndex;
pub use types::{SearchHit, SearchMode, SearchRequest, SearchResponse};
