// file: src/index/schema.rs
// description: arrow schema and record batch assembly for page embeddings
// reference: https://docs.rs/arrow

use crate::error::{PipelineError, Result};
use crate::index::IndexItem;
use arrow_array::{FixedSizeListArray, Float32Array, RecordBatch, StringArray, UInt32Array};
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const EMBEDDING_COLUMN: &str = "embedding";

/// Schema of one index table: one row per document page.
pub fn page_schema(embedding_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("company_id", DataType::Utf8, false),
        Field::new("company_name", DataType::Utf8, false),
        Field::new("page_number_pdf", DataType::UInt32, false),
        Field::new("page_number_printed", DataType::UInt32, true),
        Field::new("text", DataType::Utf8, false),
        Field::new(
            EMBEDDING_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                embedding_dim as i32,
            ),
            false,
        ),
    ]))
}

pub fn build_record_batch(
    schema: Arc<Schema>,
    items: &[IndexItem],
    embeddings: &[Vec<f32>],
    embedding_dim: usize,
) -> Result<RecordBatch> {
    if items.len() != embeddings.len() {
        return Err(PipelineError::Indexing(format!(
            "{} items but {} embeddings",
            items.len(),
            embeddings.len()
        )));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != embedding_dim) {
        return Err(PipelineError::Indexing(format!(
            "Embedding has dimension {}, expected {}",
            bad.len(),
            embedding_dim
        )));
    }

    let ids: StringArray = items.iter().map(|i| Some(i.id.as_str())).collect();
    let company_ids: StringArray = items
        .iter()
        .map(|i| Some(i.metadata.company_id.as_str()))
        .collect();
    let company_names: StringArray = items
        .iter()
        .map(|i| Some(i.metadata.company_name.as_str()))
        .collect();
    let pdf_pages: UInt32Array = items
        .iter()
        .map(|i| Some(i.metadata.page_number_pdf))
        .collect();
    let printed_pages: UInt32Array = items
        .iter()
        .map(|i| i.metadata.page_number_printed)
        .collect();
    let texts: StringArray = items.iter().map(|i| Some(i.text.as_str())).collect();

    let values: Float32Array = embeddings.iter().flat_map(|e| e.iter().copied()).collect();
    let embedding_list = FixedSizeListArray::try_new(
        Arc::new(Field::new("item", DataType::Float32, true)),
        embedding_dim as i32,
        Arc::new(values),
        None,
    )
    .map_err(|e| PipelineError::Indexing(format!("Failed to create embedding array: {}", e)))?;

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(ids),
            Arc::new(company_ids),
            Arc::new(company_names),
            Arc::new(pdf_pages),
            Arc::new(printed_pages),
            Arc::new(texts),
            Arc::new(embedding_list),
        ],
    )
    .map_err(|e| PipelineError::Indexing(format!("Failed to create record batch: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexMetadata;
    use arrow_array::Array;

    fn item(page: u32, printed: Option<u32>) -> IndexItem {
        IndexItem {
            id: format!("id-{}", page),
            text: format!("page {}", page),
            metadata: IndexMetadata {
                company_id: "c1".to_string(),
                company_name: "Acme".to_string(),
                page_number_pdf: page,
                page_number_printed: printed,
            },
        }
    }

    #[test]
    fn test_schema_generation() {
        let schema = page_schema(4);
        assert_eq!(schema.fields().len(), 7);
        let embedding = schema.field_with_name(EMBEDDING_COLUMN).unwrap();
        assert!(matches!(embedding.data_type(), DataType::FixedSizeList(_, 4)));
        assert!(schema.field_with_name("page_number_printed").unwrap().is_nullable());
    }

    #[test]
    fn test_record_batch_keeps_null_printed_numbers() {
        let items = vec![item(1, None), item(2, Some(1))];
        let embeddings = vec![vec![0.0; 4], vec![1.0; 4]];
        let batch = build_record_batch(page_schema(4), &items, &embeddings, 4).unwrap();

        assert_eq!(batch.num_rows(), 2);
        let printed = batch
            .column_by_name("page_number_printed")
            .unwrap()
            .as_any()
            .downcast_ref::<UInt32Array>()
            .unwrap();
        assert!(printed.is_null(0));
        assert_eq!(printed.value(1), 1);
    }

    #[test]
    fn test_record_batch_rejects_wrong_dimension() {
        let items = vec![item(1, None)];
        let result = build_record_batch(page_schema(4), &items, &[vec![0.0; 3]], 4);
        assert!(matches!(result, Err(PipelineError::Indexing(_))));
    }
}
