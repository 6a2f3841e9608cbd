//! Request pipeline: translate → locate → resolve → generate.
//!
//! Stages run strictly in sequence. Every failure is turned into either a
//! fallback value or a [`UserFacingError`] at the stage that produced it, so
//! callers only ever see a [`PipelineOutcome`].

use std::sync::Arc;

use anyhow::Context;
use medthread_common::{SandboxClient, SelectionMode};
use medthread_config::{Config, ConfigError, GEMINI_KEY_ENV_VAR};
use medthread_ingestion::models::ArticleRecord;
use medthread_ingestion::sources::pubmed::PubMedClient;
use medthread_ingestion::sources::{LiteratureSource, LocateParams};
use medthread_ingestion::translate::{
    translate_or_original, GoogleTranslator, PassthroughTranslator, QueryTranslator,
};
use medthread_llm::{GeminiBackend, GenerationSettings, ThreadGenerator, ThreadSource};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use url::Url;

/// Plain-language outcomes shown in place of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UserFacingError {
    #[error("Please enter a keyword.")]
    EmptyQuery,
    #[error("No matching articles were found.")]
    NoArticles,
    #[error("Could not retrieve article details.")]
    ArticlesUnavailable,
    #[error("The literature search service could not be reached.")]
    SearchUnavailable,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadReport {
    /// What the user typed, trimmed.
    pub query: String,
    /// What was sent to PubMed (the translation, or `query` on fallback).
    pub search_term: String,
    pub mode: SelectionMode,
    pub articles: Vec<ArticleRecord>,
    /// Generated thread, or the generation-failure message.
    pub thread: String,
}

#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Rejected(UserFacingError),
    Completed(ThreadReport),
}

pub struct ThreadPipeline {
    translator: Arc<dyn QueryTranslator>,
    source: Arc<dyn LiteratureSource>,
    generator: ThreadGenerator,
    params: LocateParams,
}

impl ThreadPipeline {
    pub fn new(
        translator: Arc<dyn QueryTranslator>,
        source: Arc<dyn LiteratureSource>,
        generator: ThreadGenerator,
        params: LocateParams,
    ) -> Self {
        Self { translator, source, generator, params }
    }

    /// Wire the production clients from a validated config.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut client = SandboxClient::new(config.timeout())?;
        // Hosts named in the config file are trusted on top of the defaults.
        for url in [
            &config.search.eutils_base_url,
            &config.translation.endpoint,
            &config.llm.gemini.base_url,
        ] {
            allow_configured_host(&mut client, url)?;
        }

        let translator: Arc<dyn QueryTranslator> = if config.translation.enabled {
            Arc::new(GoogleTranslator::new(
                client.clone(),
                config.translation.endpoint.clone(),
                config.translation.target_language.clone(),
            ))
        } else {
            Arc::new(PassthroughTranslator)
        };

        let source = PubMedClient::new(client.clone(), &config.search.eutils_base_url)
            .with_api_key(config.search.api_key.as_ref().map(copy_secret));

        let gemini = &config.llm.gemini;
        let api_key = gemini
            .api_key
            .as_ref()
            .map(copy_secret)
            .ok_or(ConfigError::MissingApiKey(GEMINI_KEY_ENV_VAR))?;
        let backend = GeminiBackend::new(client, api_key, gemini.model.clone())
            .with_base_url(gemini.base_url.clone());
        let generator = ThreadGenerator::new(
            Arc::new(backend),
            GenerationSettings {
                language: config.thread.language.clone(),
                temperature: gemini.temperature,
                max_output_tokens: gemini.max_output_tokens,
            },
        );

        let params = LocateParams {
            lookback_years: config.search.lookback_years,
            max_results: config.search.max_results,
            mode: config.search.mode,
        };

        Ok(Self::new(translator, Arc::new(source), generator, params))
    }

    #[instrument(skip(self), fields(mode = self.params.mode.as_str()))]
    pub async fn run(&self, query: &str) -> PipelineOutcome {
        let query = query.trim();
        if query.is_empty() {
            return PipelineOutcome::Rejected(UserFacingError::EmptyQuery);
        }

        let search_term = translate_or_original(self.translator.as_ref(), query).await;
        info!(%search_term, "searching literature");

        let ids = match self.source.locate(&search_term, &self.params).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "literature search failed");
                return PipelineOutcome::Rejected(UserFacingError::SearchUnavailable);
            }
        };
        if ids.is_empty() {
            info!("no articles matched");
            return PipelineOutcome::Rejected(UserFacingError::NoArticles);
        }

        let resolved = match self.params.mode {
            SelectionMode::All => self.source.resolve(&ids).await,
            SelectionMode::RandomOne => self
                .source
                .resolve_one(&ids[0])
                .await
                .map(|record| record.into_iter().collect()),
        };
        let articles = match resolved {
            Ok(articles) if !articles.is_empty() => articles,
            Ok(_) => {
                warn!(requested = ids.len(), "article fetch returned nothing");
                return PipelineOutcome::Rejected(UserFacingError::ArticlesUnavailable);
            }
            Err(e) => {
                error!(error = %e, "article fetch failed");
                return PipelineOutcome::Rejected(UserFacingError::ArticlesUnavailable);
            }
        };

        let source = match self.params.mode {
            SelectionMode::All => ThreadSource::Digest(&articles),
            SelectionMode::RandomOne => ThreadSource::Deep(&articles[0]),
        };
        let thread = self.generator.generate(query, source).await;

        PipelineOutcome::Completed(ThreadReport {
            query: query.to_string(),
            search_term,
            mode: self.params.mode,
            articles,
            thread,
        })
    }
}

fn allow_configured_host(client: &mut SandboxClient, url: &str) -> anyhow::Result<()> {
    let parsed = Url::parse(url).with_context(|| format!("invalid upstream URL in config: {url}"))?;
    if let Some(host) = parsed.host_str() {
        client.allow_domain(host);
    }
    Ok(())
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}
