// file: src/models/page.rs
// description: extracted page content and persisted page records
// reference: internal data structures

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extractor output keyed by page-number token. Non-page keys may be present.
pub type PageMap = BTreeMap<String, PageContent>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    #[serde(default, alias = "page_content")]
    pub content: String,
    /// Page number as printed in the document body, unparsed.
    #[serde(default, alias = "page_number_drhp")]
    pub page_number_printed: String,
}

impl PageContent {
    pub fn new(content: impl Into<String>, page_number_printed: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            page_number_printed: page_number_printed.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub company_id: String,
    pub page_number_pdf: u32,
    pub page_number_printed: Option<u32>,
    pub content: String,
}

impl Page {
    pub fn from_content(company_id: &str, page_number_pdf: u32, content: &PageContent) -> Self {
        Self {
            company_id: company_id.to_string(),
            page_number_pdf,
            page_number_printed: Self::parse_printed_number(&content.page_number_printed),
            content: content.content.clone(),
        }
    }

    /// Parses a printed page number, degrading to `None` for blank or non-numeric input.
    pub fn parse_printed_number(raw: &str) -> Option<u32> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        trimmed.parse().ok()
    }

    /// Returns the page number for canonical decimal keys, `None` for metadata keys.
    ///
    /// Leading zeros are rejected so each page number has exactly one key.
    pub fn parse_page_key(key: &str) -> Option<u32> {
        if key.is_empty() || key.starts_with('0') || !key.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        key.parse().ok().filter(|n| *n > 0)
    }
}

/// Iterates the page entries of a map in page order, skipping non-page keys.
pub fn numbered_pages(pages: &PageMap) -> Vec<(u32, &PageContent)> {
    let mut numbered: Vec<(u32, &PageContent)> = pages
        .iter()
        .filter_map(|(key, content)| Page::parse_page_key(key).map(|n| (n, content)))
        .collect();
    numbered.sort_by_key(|(n, _)| *n);
    numbered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printed_number_tolerates_garbage() {
        assert_eq!(Page::parse_printed_number("42"), Some(42));
        assert_eq!(Page::parse_printed_number(" 7 "), Some(7));
        assert_eq!(Page::parse_printed_number(""), None);
        assert_eq!(Page::parse_printed_number("   "), None);
        assert_eq!(Page::parse_printed_number("iv"), None);
        assert_eq!(Page::parse_printed_number("12a"), None);
        assert_eq!(Page::parse_printed_number("-3"), None);
        assert_eq!(Page::parse_printed_number("99999999999999"), None);
    }

    #[test]
    fn test_page_key_filtering() {
        assert_eq!(Page::parse_page_key("1"), Some(1));
        assert_eq!(Page::parse_page_key("0"), None);
        assert_eq!(Page::parse_page_key("metadata"), None);
        assert_eq!(Page::parse_page_key(""), None);
        assert_eq!(Page::parse_page_key("1.5"), None);
        assert_eq!(Page::parse_page_key("01"), None);
        assert_eq!(Page::parse_page_key("007"), None);
        assert_eq!(Page::parse_page_key("10"), Some(10));
    }

    #[test]
    fn test_zero_padded_key_does_not_alias_page() {
        let mut pages = PageMap::new();
        pages.insert("1".to_string(), PageContent::new("one", ""));
        pages.insert("01".to_string(), PageContent::new("padded", ""));

        let numbered = numbered_pages(&pages);
        assert_eq!(numbered.len(), 1);
        assert_eq!(numbered[0].1.content, "one");
    }

    #[test]
    fn test_numbered_pages_sorted_numerically() {
        let mut pages = PageMap::new();
        pages.insert("10".to_string(), PageContent::new("ten", ""));
        pages.insert("2".to_string(), PageContent::new("two", "ii"));
        pages.insert("metadata".to_string(), PageContent::new("meta", ""));

        let numbered = numbered_pages(&pages);
        let numbers: Vec<u32> = numbered.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![2, 10]);
    }

    #[test]
    fn test_page_content_accepts_extractor_field_names() {
        let json = r#"{"page_content": "Body", "page_number_drhp": "14"}"#;
        let content: PageContent = serde_json::from_str(json).unwrap();
        let page = Page::from_content("c1", 3, &content);
        assert_eq!(page.page_number_printed, Some(14));
        assert_eq!(page.content, "Body");
    }
}
