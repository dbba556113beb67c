// file: src/models/report.rs
// description: synthesized markdown report, one per company
// reference: internal data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub company_id: String,
    pub company_name: String,
    pub markdown: String,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(company_id: &str, company_name: &str, markdown: String) -> Self {
        Self {
            company_id: company_id.to_string(),
            company_name: company_name.to_string(),
            markdown,
            updated_at: Utc::now(),
        }
    }
}
