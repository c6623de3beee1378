pub mod index;
pub mod store;
pub mod types;

pub use index::SqliteDocumentIndex;
pub use types::{Document, DocumentType, TypeFilter};
