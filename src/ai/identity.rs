// file: src/ai/identity.rs
// description: extracts the issuing company's identity from leading document pages
// reference: https://platform.openai.com/docs/guides/structured-outputs

use crate::ai::AiClient;
use crate::error::Result;
use crate::extractor::patterns::CORPORATE_IDENTITY_NUMBER;
use crate::models::CandidateIdentity;
use async_trait::async_trait;
use tracing::{debug, warn};

const IDENTITY_SYSTEM_PROMPT: &str = "You read the opening pages of an Indian Draft Red Herring \
Prospectus and identify the issuing company. Reply with a JSON object with the keys \
\"name\" (full legal name), \"corporate_identity_number\" (the 21 character CIN) and \
\"website\" (company website, or null). Use null for any value not stated in the text.";

/// Longest prefix of the leading pages sent to the model.
const MAX_PROMPT_CHARS: usize = 60_000;

#[async_trait]
pub trait IdentityExtractor: Send + Sync {
    async fn extract_identity(&self, leading_text: &str) -> Result<CandidateIdentity>;
}

pub struct LlmIdentityExtractor {
    client: AiClient,
}

impl LlmIdentityExtractor {
    pub fn new(client: AiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityExtractor for LlmIdentityExtractor {
    async fn extract_identity(&self, leading_text: &str) -> Result<CandidateIdentity> {
        let text: String = leading_text.chars().take(MAX_PROMPT_CHARS).collect();
        let mut candidate: CandidateIdentity =
            self.client.chat_json(IDENTITY_SYSTEM_PROMPT, &text).await?;

        debug!("Model identified company {:?}", candidate.name);
        fill_identifier_from_text(&mut candidate, leading_text);
        Ok(candidate)
    }
}

/// Falls back to the first CIN found in the text when the model left it out.
fn fill_identifier_from_text(candidate: &mut CandidateIdentity, text: &str) {
    let missing = candidate
        .corporate_identity_number
        .as_deref()
        .is_none_or(|id| id.trim().is_empty());

    if missing && let Some(found) = CORPORATE_IDENTITY_NUMBER.find(text) {
        warn!("Identifier missing from model reply, using {} from text", found.as_str());
        candidate.corporate_identity_number = Some(found.as_str().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_identifier_from_text() {
        let mut candidate = CandidateIdentity {
            name: Some("Acme Fintech Limited".to_string()),
            corporate_identity_number: None,
            website: None,
        };
        fill_identifier_from_text(
            &mut candidate,
            "Corporate Identity Number: U72900MH2010PLC123456\nRegistered office",
        );
        assert_eq!(
            candidate.corporate_identity_number.as_deref(),
            Some("U72900MH2010PLC123456")
        );
    }

    #[test]
    fn test_model_identifier_is_kept() {
        let mut candidate = CandidateIdentity {
            name: None,
            corporate_identity_number: Some("L17110MH1973PLC019786".to_string()),
            website: None,
        };
        fill_identifier_from_text(&mut candidate, "CIN U72900MH2010PLC123456");
        assert_eq!(
            candidate.corporate_identity_number.as_deref(),
            Some("L17110MH1973PLC019786")
        );
    }

    #[test]
    fn test_no_identifier_anywhere() {
        let mut candidate = CandidateIdentity::default();
        fill_identifier_from_text(&mut candidate, "no identifiers here");
        assert!(candidate.corporate_identity_number.is_none());
    }
}
