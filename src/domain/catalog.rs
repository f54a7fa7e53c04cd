//! Catalog entities owned by the external book/voice catalog. This core only
//! reads them; all CRUD lives with the collaborator.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Pointer to the raw document bytes: a bare storage path or a
    /// fully-qualified public URL.
    pub source_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Voice {
    pub id: i64,
    /// Provider voice identifier, e.g. `es-CO-GonzaloNeural`.
    pub short_name: String,
}
