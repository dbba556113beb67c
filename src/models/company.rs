// file: src/models/company.rs
// description: company identity records and listing summaries
// reference: internal data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical identity resolved from the leading pages of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyIdentity {
    pub name: String,
    pub corporate_identity_number: String,
    pub website: Option<String>,
}

/// Raw identity as returned by the AI extractor, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateIdentity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "unique_id", alias = "cin")]
    pub corporate_identity_number: Option<String>,
    #[serde(default, alias = "website_link")]
    pub website: Option<String>,
}

impl CandidateIdentity {
    /// Returns the validated identity, or `None` when the name or identifier is blank.
    pub fn into_identity(self) -> Option<CompanyIdentity> {
        let name = non_blank(self.name)?;
        let corporate_identity_number = non_blank(self.corporate_identity_number)?;

        Some(CompanyIdentity {
            name,
            corporate_identity_number,
            website: non_blank(self.website),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub corporate_identity_number: String,
    pub source_document: String,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn new(identity: &CompanyIdentity, source_document: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: identity.name.clone(),
            corporate_identity_number: identity.corporate_identity_number.clone(),
            source_document: source_document.into(),
            website: identity.website.clone(),
            created_at: Utc::now(),
        }
    }

    /// Semantic index namespace for this company, derived from its display name.
    pub fn index_name(&self, prefix: &str) -> String {
        index_name_for(prefix, &self.name)
    }
}

/// Upper-cases the name and replaces every character outside `[A-Za-z0-9_]` with `_`.
pub fn index_name_for(prefix: &str, company_name: &str) -> String {
    let suffix: String = company_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();

    format!("{}{}", prefix, suffix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    Processing,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub id: String,
    pub name: String,
    pub uin: String,
    pub upload_date: String,
    pub status: CompanyStatus,
    pub has_markdown: bool,
}

impl CompanySummary {
    pub fn from_company(company: &Company, has_markdown: bool) -> Self {
        Self {
            id: company.id.clone(),
            name: company.name.clone(),
            uin: company.corporate_identity_number.clone(),
            upload_date: company.created_at.format("%Y-%m-%d").to_string(),
            status: if has_markdown {
                CompanyStatus::Completed
            } else {
                CompanyStatus::Processing
            },
            has_markdown,
        }
    }
}
