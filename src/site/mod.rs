//! Site-specific page parsing
//!
//! The crawl engine knows nothing about markup. It hands every fetched body
//! to a [`PageParser`], which turns a list page into detail links (or the
//! end-of-catalogue signal) and a detail page into an [`AppRecord`].

mod app_store;

pub use app_store::AppStoreParser;

use crate::record::AppRecord;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Errors raised when a detail page does not have the expected shape
///
/// These are never retried: refetching the same markup would fail the same way.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Missing element: {0}")]
    MissingElement(&'static str),

    #[error("Invalid value for {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

/// What a list page yielded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    /// Detail pages to crawl; never empty
    Links(Vec<Url>),

    /// The page index is past the end of the catalogue
    End,
}

impl ListOutcome {
    /// Builds an outcome from the links found on a page
    ///
    /// Duplicate links are dropped (first occurrence wins) and a page without
    /// any link is the end of the catalogue.
    pub fn from_links<I>(links: I) -> Self
    where
        I: IntoIterator<Item = Url>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<Url> = links
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .collect();

        if unique.is_empty() {
            Self::End
        } else {
            Self::Links(unique)
        }
    }
}

/// Extraction rules for one target site
///
/// Implementations must be pure: the same body always yields the same outcome.
pub trait PageParser: Send + Sync {
    /// Extracts detail links from a list page
    ///
    /// `page_url` is the URL the body was fetched from and is the base for
    /// relative links.
    fn parse_list(&self, body: &str, page_url: &Url) -> ListOutcome;

    /// Extracts one record from a detail page
    fn parse_detail(&self, body: &str, page_url: &Url) -> Result<AppRecord, ParseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://apps.example.com/").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_no_links_is_end() {
        assert_eq!(ListOutcome::from_links(Vec::new()), ListOutcome::End);
    }

    #[test]
    fn test_links_are_deduplicated_in_order() {
        let outcome = ListOutcome::from_links(vec![url("/b"), url("/a"), url("/b")]);
        assert_eq!(outcome, ListOutcome::Links(vec![url("/b"), url("/a")]));
    }
}
