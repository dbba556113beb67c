// file: src/ai/checklist.rs
// description: retrieval-augmented checklist evaluation over a company index
// reference: https://platform.openai.com/docs/guides/structured-outputs

use crate::ai::AiClient;
use crate::error::{PipelineError, Result};
use crate::index::VectorIndex;
use crate::models::{ChecklistAnswer, ChecklistDefinition, ChecklistItem, IndexHit};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const CHECKLIST_SYSTEM_PROMPT: &str = "You are an equity research analyst drafting an IPO \
investment note from a Draft Red Herring Prospectus. Answer only from the supplied excerpts. \
Reply with a JSON object with the keys \"answer\" (markdown), \"citations\" (array of the page \
labels you relied on) and \"commentary\" (one or two sentences of analyst commentary, or an \
empty string).";

/// Per-excerpt character cap inside a prompt.
const MAX_EXCERPT_CHARS: usize = 4_000;

#[async_trait]
pub trait ChecklistEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        checklist: &ChecklistDefinition,
        index_name: &str,
        company_id: &str,
    ) -> Result<Vec<ChecklistAnswer>>;
}

#[derive(Debug, Default, Deserialize)]
struct RowReply {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    citations: Vec<String>,
    #[serde(default)]
    commentary: String,
}

pub struct LlmChecklistEvaluator {
    client: AiClient,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl LlmChecklistEvaluator {
    pub fn new(client: AiClient, index: Arc<dyn VectorIndex>, top_k: usize) -> Self {
        Self {
            client,
            index,
            top_k: top_k.max(1),
        }
    }

    async fn evaluate_row(
        &self,
        item: &ChecklistItem,
        index_name: &str,
        company_id: &str,
    ) -> Result<RowReply> {
        let query = format!("{} {}", item.topic, item.prompt);
        let hits = self
            .index
            .search(index_name, query.trim(), company_id, self.top_k)
            .await?;

        let mut reply: RowReply = self
            .client
            .chat_json(CHECKLIST_SYSTEM_PROMPT, &build_row_prompt(item, &hits))
            .await?;

        if reply.citations.is_empty() {
            reply.citations = hits.iter().map(IndexHit::citation).collect();
        }
        Ok(reply)
    }
}

#[async_trait]
impl ChecklistEvaluator for LlmChecklistEvaluator {
    async fn evaluate(
        &self,
        checklist: &ChecklistDefinition,
        index_name: &str,
        company_id: &str,
    ) -> Result<Vec<ChecklistAnswer>> {
        info!(
            "Evaluating {} checklist rows of {} against {}",
            checklist.len(),
            checklist.name,
            index_name
        );

        let mut answers = Vec::with_capacity(checklist.len());
        let mut failures = 0usize;

        for (row_index, item) in checklist.rows.iter().enumerate() {
            let row_index = row_index as u32;
            let reply = match self.evaluate_row(item, index_name, company_id).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("Checklist row {} ({}) failed: {}", row_index, item.topic, e);
                    failures += 1;
                    RowReply::default()
                }
            };
            debug!("Evaluated checklist row {}", row_index);

            answers.push(ChecklistAnswer {
                row_index,
                answer: reply.answer,
                citations: reply.citations,
                commentary: reply.commentary,
            });
        }

        if !checklist.is_empty() && failures == checklist.len() {
            return Err(PipelineError::ChecklistEvaluation(format!(
                "all {} rows of {} failed",
                failures, checklist.name
            )));
        }

        Ok(answers)
    }
}

fn build_row_prompt(item: &ChecklistItem, hits: &[IndexHit]) -> String {
    let mut prompt = String::new();
    if !item.section.trim().is_empty() {
        prompt.push_str(&format!("Section: {}\n", item.section));
    }
    prompt.push_str(&format!("Topic: {}\n\nTask: {}\n\nExcerpts:\n", item.topic, item.prompt));

    if hits.is_empty() {
        prompt.push_str("(no relevant excerpts found)\n");
    }
    for hit in hits {
        prompt.push_str(&hit.format_context(MAX_EXCERPT_CHARS));
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testing::MemoryIndex;

    fn item() -> ChecklistItem {
        ChecklistItem {
            topic: "Objects of the Issue".to_string(),
            section: "Offer".to_string(),
            prompt: "Summarise the objects of the issue.".to_string(),
        }
    }

    #[test]
    fn test_row_prompt_contains_citations() {
        let hits = vec![IndexHit {
            id: "h".to_string(),
            company_id: "c1".to_string(),
            page_number_pdf: 80,
            page_number_printed: Some(78),
            text: "The net proceeds will be used for capex.".to_string(),
            score: 0.8,
            distance: Some(0.25),
        }];

        let prompt = build_row_prompt(&item(), &hits);
        assert!(prompt.starts_with("Section: Offer\n"));
        assert!(prompt.contains("Task: Summarise the objects of the issue."));
        assert!(prompt.contains("[Page 78 (PDF page 80)]"));
    }

    #[test]
    fn test_row_prompt_without_hits() {
        let prompt = build_row_prompt(&item(), &[]);
        assert!(prompt.contains("(no relevant excerpts found)"));
    }

    #[tokio::test]
    async fn test_every_row_failing_is_an_error() {
        let mut ai = Config::default_config().ai;
        ai.api_key = Some("sk-test".to_string());
        let client = AiClient::new(&ai).unwrap();

        // The index does not exist, so every retrieval fails before any request is sent.
        let evaluator = LlmChecklistEvaluator::new(client, Arc::new(MemoryIndex::default()), 3);
        let checklist = ChecklistDefinition {
            name: "ipo_notes".to_string(),
            rows: vec![item(), item()],
        };

        let result = evaluator.evaluate(&checklist, "missing", "c1").await;
        assert!(matches!(result, Err(PipelineError::ChecklistEvaluation(_))));
    }
}
