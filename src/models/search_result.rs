// file: src/models/search_result.rs
// description: retrieval hits returned by the semantic index
// reference: Used for vector similarity search results

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHit {
    /// Item id (deterministic per company page)
    pub id: String,

    /// Persistent record id of the owning company
    pub company_id: String,

    /// Page number in the source file
    pub page_number_pdf: u32,

    /// Page number as printed in the document, if known
    pub page_number_printed: Option<u32>,

    pub text: String,

    /// Similarity score (higher is more similar, typically 0.0-1.0)
    pub score: f32,

    /// Optional: Distance metric (lower is more similar)
    pub distance: Option<f32>,
}

impl IndexHit {
    /// Citation label used in prompts and stored checklist rows.
    pub fn citation(&self) -> String {
        match self.page_number_printed {
            Some(printed) => format!("Page {} (PDF page {})", printed, self.page_number_pdf),
            None => format!("PDF page {}", self.page_number_pdf),
        }
    }

    pub fn format_context(&self, max_content_len: usize) -> String {
        let content_preview = if self.text.chars().count() > max_content_len {
            let truncated: String = self.text.chars().take(max_content_len).collect();
            format!("{}...", truncated)
        } else {
            self.text.clone()
        };

        format!("[{}]\n{}\n", self.citation(), content_preview)
    }
}
