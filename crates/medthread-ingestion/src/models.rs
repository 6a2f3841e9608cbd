//! Data models for the literature side of a request.
//! Everything here is built and dropped within one request.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const PUBMED_ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov/";
pub const PMC_ARTICLE_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc/articles/";
pub const DOI_RESOLVER_URL: &str = "https://doi.org/";

pub const NO_TITLE: &str = "No title";
pub const NO_ABSTRACT: &str = "No abstract";

/// PubMed identifier (PMID), opaque to us.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArticleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Bibliographic fields of one resolved article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRecord {
    pub id: ArticleId,
    pub title: String,
    pub abstract_text: String,
    pub url: String,
    /// Best effort: DOI link, else PMC link, else the PubMed page.
    pub full_text_url: String,
}

impl ArticleRecord {
    pub fn new(
        id: ArticleId,
        title: Option<String>,
        abstract_text: Option<String>,
        doi: Option<&str>,
        pmcid: Option<&str>,
    ) -> Self {
        let url = article_url(&id);
        let full_text_url = full_text_url(&url, doi, pmcid);
        Self {
            title: non_blank(title).unwrap_or_else(|| NO_TITLE.to_string()),
            abstract_text: non_blank(abstract_text).unwrap_or_else(|| NO_ABSTRACT.to_string()),
            url,
            full_text_url,
            id,
        }
    }
}

pub fn article_url(id: &ArticleId) -> String {
    format!("{}{}", PUBMED_ARTICLE_URL, id)
}

fn full_text_url(article_url: &str, doi: Option<&str>, pmcid: Option<&str>) -> String {
    let doi = doi.map(str::trim).filter(|d| !d.is_empty());
    let pmcid = pmcid.map(str::trim).filter(|p| !p.is_empty());
    match (doi, pmcid) {
        (Some(doi), _)     => format!("{}{}", DOI_RESOLVER_URL, doi),
        (None, Some(pmc))  => format!("{}{}/", PMC_ARTICLE_URL, pmc),
        (None, None)       => article_url.to_string(),
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}
