// file: src/index/lance.rs
// description: LanceDB-backed semantic index with one table per company
// reference: https://docs.rs/lancedb

use crate::ai::AiClient;
use crate::config::IndexConfig;
use crate::error::{PipelineError, Result};
use crate::index::schema::{build_record_batch, page_schema};
use crate::index::{IndexItem, VectorIndex};
use crate::models::IndexHit;
use arrow_array::{Array, Float32Array, RecordBatch, RecordBatchIterator, StringArray, UInt32Array};
use async_trait::async_trait;
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table, connect};
use tracing::{debug, info};

#[derive(Clone)]
pub struct LanceIndex {
    connection: Connection,
    embedder: AiClient,
    embedding_dim: usize,
    batch_size: usize,
}

impl LanceIndex {
    pub async fn connect(config: &IndexConfig, embedder: AiClient) -> Result<Self> {
        info!("Connecting to LanceDB at {}", config.uri);

        let connection = connect(&config.uri)
            .execute()
            .await
            .map_err(|e| PipelineError::Indexing(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self {
            connection,
            embedder,
            embedding_dim: config.embedding_dim,
            batch_size: config.embedding_batch_size.max(1),
        })
    }

    async fn open(&self, index_name: &str) -> Result<Table> {
        self.connection
            .open_table(index_name)
            .execute()
            .await
            .map_err(|e| {
                PipelineError::Indexing(format!("Failed to open index {}: {}", index_name, e))
            })
    }

    async fn embed_items(&self, items: &[IndexItem]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(items.len());
        for chunk in items.chunks(self.batch_size) {
            let texts: Vec<String> = chunk.iter().map(|item| item.text.clone()).collect();
            let vectors = self
                .embedder
                .embed(&texts)
                .await
                .map_err(|e| PipelineError::Indexing(e.to_string()))?;
            embeddings.extend(vectors);
            debug!("Embedded {}/{} pages", embeddings.len(), items.len());
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn exists(&self, index_name: &str) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| PipelineError::Indexing(format!("Failed to list indexes: {}", e)))?;

        Ok(table_names.iter().any(|name| name == index_name))
    }

    async fn upsert(&self, index_name: &str, items: Vec<IndexItem>) -> Result<()> {
        let schema = page_schema(self.embedding_dim);
        let exists = self.exists(index_name).await?;

        if items.is_empty() {
            if !exists {
                self.connection
                    .create_empty_table(index_name, schema)
                    .execute()
                    .await
                    .map_err(|e| {
                        PipelineError::Indexing(format!("Failed to create index: {}", e))
                    })?;
                info!("Created empty index {}", index_name);
            }
            return Ok(());
        }

        let embeddings = self.embed_items(&items).await?;
        let batch = build_record_batch(schema.clone(), &items, &embeddings, self.embedding_dim)?;
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        if exists {
            let table = self.open(index_name).await?;
            table
                .delete(&id_predicate(&items))
                .await
                .map_err(|e| PipelineError::Indexing(format!("Failed to replace items: {}", e)))?;
            table
                .add(reader)
                .execute()
                .await
                .map_err(|e| PipelineError::Indexing(format!("Failed to add items: {}", e)))?;
        } else {
            self.connection
                .create_table(index_name, reader)
                .execute()
                .await
                .map_err(|e| PipelineError::Indexing(format!("Failed to create index: {}", e)))?;
        }

        info!("Indexed {} pages into {}", items.len(), index_name);
        Ok(())
    }

    async fn search(
        &self,
        index_name: &str,
        query: &str,
        company_id: &str,
        limit: usize,
    ) -> Result<Vec<IndexHit>> {
        if !self.exists(index_name).await? {
            return Err(PipelineError::Indexing(format!(
                "Index {} does not exist",
                index_name
            )));
        }

        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await
            .map_err(|e| PipelineError::Indexing(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Indexing("No query embedding returned".to_string()))?;

        let table = self.open(index_name).await?;
        let filter = format!("company_id = '{}'", escape_literal(company_id));

        let mut results = table
            .vector_search(query_embedding)
            .map_err(|e| PipelineError::Indexing(format!("Failed to create vector search: {}", e)))?
            .only_if(filter)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| PipelineError::Indexing(format!("Vector search failed: {}", e)))?;

        let mut hits = Vec::new();
        while let Some(batch) = results.next().await {
            let batch = batch.map_err(|e| {
                PipelineError::Indexing(format!("Failed to read result batch: {}", e))
            })?;
            hits.extend(hits_from_batch(&batch)?);
        }

        debug!("Search in {} returned {} hits", index_name, hits.len());
        Ok(hits)
    }

    async fn delete(&self, index_name: &str) -> Result<bool> {
        if !self.exists(index_name).await? {
            return Ok(false);
        }

        self.connection
            .drop_table(index_name)
            .await
            .map_err(|e| {
                PipelineError::Indexing(format!("Failed to drop index {}: {}", index_name, e))
            })?;
        info!("Dropped index {}", index_name);
        Ok(true)
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn id_predicate(items: &[IndexItem]) -> String {
    let ids: Vec<String> = items
        .iter()
        .map(|item| format!("'{}'", escape_literal(&item.id)))
        .collect();
    format!("id IN ({})", ids.join(", "))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PipelineError::Indexing(format!("Missing '{}' column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| PipelineError::Indexing(format!("Invalid '{}' column type", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PipelineError::Indexing(format!("Missing '{}' column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| PipelineError::Indexing(format!("Invalid '{}' column type", name)))
}

fn hits_from_batch(batch: &RecordBatch) -> Result<Vec<IndexHit>> {
    let ids = string_column(batch, "id")?;
    let company_ids = string_column(batch, "company_id")?;
    let texts = string_column(batch, "text")?;
    let pdf_pages = u32_column(batch, "page_number_pdf")?;
    let printed_pages = u32_column(batch, "page_number_printed")?;

    // LanceDB reports the distance in a synthetic column
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let hits = (0..batch.num_rows())
        .map(|i| {
            let (score, distance) = match distances {
                Some(dist) => {
                    let d = dist.value(i);
                    (1.0 / (1.0 + d), Some(d))
                }
                None => (1.0, None),
            };

            IndexHit {
                id: ids.value(i).to_string(),
                company_id: company_ids.value(i).to_string(),
                page_number_pdf: pdf_pages.value(i),
                page_number_printed: (!printed_pages.is_null(i)).then(|| printed_pages.value(i)),
                text: texts.value(i).to_string(),
                score,
                distance,
            }
        })
        .collect();

    Ok(hits)
}
