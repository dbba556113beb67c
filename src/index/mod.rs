// file: src/index/mod.rs
// description: semantic index contract and item types
// reference: internal module structure

pub mod lance;
pub mod schema;

pub use lance::LanceIndex;

use crate::error::Result;
use crate::models::IndexHit;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub company_id: String,
    pub company_name: String,
    pub page_number_pdf: u32,
    pub page_number_printed: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexItem {
    pub id: String,
    pub text: String,
    pub metadata: IndexMetadata,
}

/// Named per-company semantic index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn exists(&self, index_name: &str) -> Result<bool>;

    async fn upsert(&self, index_name: &str, items: Vec<IndexItem>) -> Result<()>;

    /// Returns at most `limit` hits for `query`, restricted to `company_id`, best first.
    async fn search(
        &self,
        index_name: &str,
        query: &str,
        company_id: &str,
        limit: usize,
    ) -> Result<Vec<IndexHit>>;

    /// Drops the index. Returns `false` when it did not exist.
    async fn delete(&self, index_name: &str) -> Result<bool>;
}
