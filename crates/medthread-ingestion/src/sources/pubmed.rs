//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   esearch: {base}/esearch.fcgi  (JSON, ids at esearchresult.idlist)
//!   efetch:  {base}/efetch.fcgi   (XML, <PubmedArticleSet><PubmedArticle>…)

use async_trait::async_trait;
use chrono::Datelike;
use medthread_common::{MedthreadError, SandboxClient, SelectionMode};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rand::seq::SliceRandom;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};

use crate::models::{ArticleId, ArticleRecord};
use super::{LiteratureSource, LocateParams};

pub const DEFAULT_EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

pub struct PubMedClient {
    client: SandboxClient,
    esearch_url: String,
    efetch_url: String,
    api_key: Option<SecretString>,
}

impl PubMedClient {
    pub fn new(client: SandboxClient, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            client,
            esearch_url: format!("{}/esearch.fcgi", base),
            efetch_url: format!("{}/efetch.fcgi", base),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<SecretString>) -> Self {
        self.api_key = api_key;
        self
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("db", "pubmed".to_string())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.expose_secret().to_string()));
        }
        params
    }

    /// Search PubMed and return PMIDs in API order.
    /// `None` means the endpoint answered with a non-success status.
    #[instrument(skip(self))]
    async fn esearch(&self, term: &str, max: usize) -> anyhow::Result<Option<Vec<ArticleId>>> {
        let mut params = self.base_params();
        params.push(("term", term.to_string()));
        params.push(("retmode", "json".to_string()));
        params.push(("retmax", max.to_string()));
        params.push(("sort", "pub_date".to_string()));

        let resp = self.client
            .get(&self.esearch_url)?
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "PubMed esearch returned a non-success status");
            return Ok(None);
        }

        let body: serde_json::Value = resp.json().await?;
        let ids = parse_esearch_ids(&body);
        debug!(count = ids.len(), "PubMed esearch returned PMIDs");
        Ok(Some(ids))
    }

    /// Fetch PubMed XML for a list of PMIDs. `None` on a non-success status.
    #[instrument(skip(self, pmids), fields(count = pmids.len()))]
    async fn efetch(&self, pmids: &[ArticleId]) -> anyhow::Result<Option<String>> {
        let joined = pmids.iter().map(ArticleId::as_str).collect::<Vec<_>>().join(",");
        let mut params = self.base_params();
        params.push(("id", joined));
        params.push(("retmode", "xml".to_string()));

        let resp = self.client
            .get(&self.efetch_url)?
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "PubMed efetch returned a non-success status");
            return Ok(None);
        }
        Ok(Some(resp.text().await?))
    }
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    async fn locate(&self, term: &str, params: &LocateParams) -> anyhow::Result<Vec<ArticleId>> {
        let query = build_search_term(term, params.lookback_years, chrono::Utc::now().year());
        let Some(ids) = self.esearch(&query, params.max_results).await? else {
            // Indistinguishable from zero hits for the caller; the status is in the log.
            return Ok(vec![]);
        };
        Ok(select_ids(ids, params.mode, params.max_results, &mut rand::thread_rng()))
    }

    async fn resolve(&self, ids: &[ArticleId]) -> anyhow::Result<Vec<ArticleRecord>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let Some(xml) = self.efetch(ids).await? else {
            return Ok(vec![]);
        };
        let parsed = parse_pubmed_xml(&xml)?;
        if parsed.len() != ids.len() {
            warn!(requested = ids.len(), returned = parsed.len(), "efetch article count differs from request");
        }
        Ok(pair_with_ids(ids, parsed))
    }
}

/// `<term>[Title/Abstract] AND <from>:<to>[PDAT]`
pub fn build_search_term(term: &str, lookback_years: u32, current_year: i32) -> String {
    let lookback = i32::try_from(lookback_years).unwrap_or(i32::MAX);
    let start_year = current_year.saturating_sub(lookback);
    format!("{}[Title/Abstract] AND {}:{}[PDAT]", term.trim(), start_year, current_year)
}

fn parse_esearch_ids(body: &serde_json::Value) -> Vec<ArticleId> {
    body["esearchresult"]["idlist"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|v| v.as_str())
                .map(ArticleId::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Apply the selection policy to the ids esearch returned.
pub fn select_ids<R: Rng + ?Sized>(
    mut ids: Vec<ArticleId>,
    mode: SelectionMode,
    max_results: usize,
    rng: &mut R,
) -> Vec<ArticleId> {
    match mode {
        SelectionMode::All => {
            ids.truncate(max_results);
            ids
        }
        SelectionMode::RandomOne => ids.choose(rng).cloned().into_iter().collect(),
    }
}

// ── efetch XML ───────────────────────────────────────────────────────────────

/// One <PubmedArticle> as found in the document, before pairing with an id.
#[derive(Debug, Default)]
struct ParsedArticle {
    pmid: Option<String>,
    title: String,
    abstract_sections: Vec<String>,
    doi: Option<String>,
    pmcid: Option<String>,
}

impl ParsedArticle {
    fn into_record(self, id: ArticleId) -> ArticleRecord {
        let title = Some(collapse_whitespace(&self.title));
        let abstract_text = Some(
            self.abstract_sections
                .iter()
                .map(|s| collapse_whitespace(s))
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        );
        ArticleRecord::new(id, title, abstract_text, self.doi.as_deref(), self.pmcid.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Pmid,
    Title,
    Abstract,
    Doi,
    Pmc,
}

/// Parse efetch XML into one entry per <PubmedArticle>, in document order.
///
/// Any syntax error, mismatched end tag, or a document that ends with
/// unclosed elements fails the whole parse.
fn parse_pubmed_xml(xml: &str) -> Result<Vec<ParsedArticle>, MedthreadError> {
    let mut articles = Vec::new();
    let mut reader = Reader::from_str(xml);
    // Whitespace is collapsed per field, so inline markup keeps word breaks.
    reader.config_mut().trim_text(false);

    let mut current: Option<ParsedArticle> = None;
    let mut field: Option<Field> = None;
    let mut section = String::new();
    let mut in_references = false;
    let mut depth: usize = 0;
    let mut saw_root = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                saw_root = true;
                if current.is_none() {
                    if e.name().as_ref() == b"PubmedArticle" {
                        current = Some(ParsedArticle::default());
                    }
                } else if let Some(article) = current.as_mut() {
                    match e.name().as_ref() {
                        b"PMID" if article.pmid.is_none() => field = Some(Field::Pmid),
                        b"ArticleTitle"  => field = Some(Field::Title),
                        b"AbstractText"  => {
                            section.clear();
                            field = Some(Field::Abstract);
                        }
                        b"ReferenceList" => in_references = true,
                        b"ArticleId" if !in_references => field = article_id_field(e),
                        _ => {}
                    }
                }
            }
            Ok(Event::Empty(_)) => saw_root = true,
            Ok(Event::Text(ref e)) => {
                if field.is_some() {
                    let text = e
                        .unescape()
                        .map_err(|err| MedthreadError::Xml(err.to_string()))?;
                    push_text(current.as_mut(), field, &mut section, &text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if field.is_some() {
                    let text = String::from_utf8_lossy(e).into_owned();
                    push_text(current.as_mut(), field, &mut section, &text);
                }
            }
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                match e.name().as_ref() {
                    b"PMID" | b"ArticleTitle" | b"ArticleId" => field = None,
                    b"AbstractText" => {
                        field = None;
                        if let Some(article) = current.as_mut() {
                            article.abstract_sections.push(std::mem::take(&mut section));
                        }
                    }
                    b"ReferenceList" => in_references = false,
                    b"PubmedArticle" => {
                        if let Some(article) = current.take() {
                            articles.push(article);
                        }
                        field = None;
                        in_references = false;
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MedthreadError::Xml(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(MedthreadError::Xml("document has no root element".to_string()));
    }
    if depth != 0 {
        return Err(MedthreadError::Xml(format!(
            "document ended with {} unclosed element(s)",
            depth
        )));
    }
    Ok(articles)
}

fn article_id_field(e: &BytesStart<'_>) -> Option<Field> {
    let attr = e.try_get_attribute("IdType").ok().flatten()?;
    match attr.value.as_ref() {
        b"doi" => Some(Field::Doi),
        b"pmc" => Some(Field::Pmc),
        _ => None,
    }
}

fn push_text(article: Option<&mut ParsedArticle>, field: Option<Field>, section: &mut String, text: &str) {
    let (Some(article), Some(field)) = (article, field) else { return };
    match field {
        Field::Pmid     => article.pmid.get_or_insert_with(String::new).push_str(text),
        Field::Title    => article.title.push_str(text),
        Field::Abstract => section.push_str(text),
        Field::Doi      => article.doi.get_or_insert_with(String::new).push_str(text),
        Field::Pmc      => article.pmcid.get_or_insert_with(String::new).push_str(text),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pair parsed articles with the requested ids and return them in request order.
///
/// A fragment whose PMID matches an unused requested id is paired by key.
/// The remaining fragments fill the still-unused ids in ascending order,
/// keeping document order, so a merged record returned under a new PMID still
/// lands somewhere. Fragments left without a slot are dropped.
fn pair_with_ids(ids: &[ArticleId], parsed: Vec<ParsedArticle>) -> Vec<ArticleRecord> {
    let mut used = vec![false; ids.len()];
    let mut slotted: Vec<(usize, ParsedArticle)> = Vec::with_capacity(parsed.len());
    let mut leftovers = Vec::new();

    for (position, article) in parsed.into_iter().enumerate() {
        let keyed = article.pmid.as_deref().map(str::trim).and_then(|pmid| {
            ids.iter()
                .enumerate()
                .find(|(i, id)| !used[*i] && id.as_str() == pmid)
                .map(|(i, _)| i)
        });
        match keyed {
            Some(i) => {
                used[i] = true;
                slotted.push((i, article));
            }
            None => leftovers.push((position, article)),
        }
    }

    let mut free = (0..ids.len()).filter(|i| !used[*i]);
    for (position, article) in leftovers {
        match free.next() {
            Some(slot) => slotted.push((slot, article)),
            None => {
                warn!(position, pmid = ?article.pmid, "efetch article matches no requested id, dropping it");
            }
        }
    }

    slotted.sort_by_key(|(i, _)| *i);
    slotted
        .into_iter()
        .map(|(i, article)| article.into_record(ids[i].clone()))
        .collect()
}
