//! Query translation: free text in any language → English search term.
//!
//! Translation is best effort. Whatever goes wrong, the pipeline carries on
//! with the user's original text.

use async_trait::async_trait;
use medthread_common::{MedthreadError, SandboxClient};
use tracing::{debug, instrument, warn};

/// Substring some translation services return in place of a translation.
pub const ERROR_MARKER: &str = "Error";

#[async_trait]
pub trait QueryTranslator: Send + Sync {
    async fn translate(&self, text: &str) -> anyhow::Result<String>;
}

/// Translate `query`, falling back to the query itself on any failure, an
/// empty result, or a result carrying [`ERROR_MARKER`].
pub async fn translate_or_original(translator: &dyn QueryTranslator, query: &str) -> String {
    match translator.translate(query).await {
        Ok(translated) if is_usable(&translated) => translated.trim().to_string(),
        Ok(translated) => {
            debug!(%translated, "translation unusable, keeping original query");
            query.to_string()
        }
        Err(e) => {
            warn!(error = %e, "translation failed, keeping original query");
            query.to_string()
        }
    }
}

fn is_usable(translated: &str) -> bool {
    !translated.trim().is_empty() && !translated.contains(ERROR_MARKER)
}

/// Google Translate public endpoint (`translate_a/single`, `client=gtx`).
pub struct GoogleTranslator {
    client: SandboxClient,
    endpoint: String,
    target_language: String,
}

impl GoogleTranslator {
    pub fn new(
        client: SandboxClient,
        endpoint: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            target_language: target_language.into(),
        }
    }
}

#[async_trait]
impl QueryTranslator for GoogleTranslator {
    #[instrument(skip(self), fields(target = %self.target_language))]
    async fn translate(&self, text: &str) -> anyhow::Result<String> {
        let params = [
            ("client", "gtx"),
            ("sl", "auto"),
            ("tl", self.target_language.as_str()),
            ("dt", "t"),
            ("q", text),
        ];
        let resp = self.client
            .get(&self.endpoint)?
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MedthreadError::Upstream { service: "translate", status: status.as_u16() }.into());
        }

        let body: serde_json::Value = resp.json().await?;
        Ok(parse_gtx_response(&body))
    }
}

/// Body shape: `[[["translated", "source", …], …], …]`; segments are concatenated.
fn parse_gtx_response(body: &serde_json::Value) -> String {
    body[0]
        .as_array()
        .map(|segments| {
            segments
                .iter()
                .filter_map(|seg| seg[0].as_str())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Used when translation is switched off in config.
pub struct PassthroughTranslator;

#[async_trait]
impl QueryTranslator for PassthroughTranslator {
    async fn translate(&self, text: &str) -> anyhow::Result<String> {
        Ok(text.to_string())
    }
}
