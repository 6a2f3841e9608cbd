//! Call-counting stand-ins for the translator, literature source and LLM backend.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use medthread_common::SelectionMode;
use medthread_ingestion::models::{ArticleId, ArticleRecord};
use medthread_ingestion::sources::{LiteratureSource, LocateParams};
use medthread_ingestion::translate::QueryTranslator;
use medthread_llm::backend::{LlmBackend, LlmError, LlmRequest, LlmResponse};
use medthread_llm::{GenerationSettings, ThreadGenerator};
use medthread_web::pipeline::ThreadPipeline;

pub const THREAD_TEXT: &str = "1 Anonymous: heard there is a new migraine paper";

pub struct StubTranslator {
    reply: Option<String>,
    pub calls: AtomicUsize,
}

impl StubTranslator {
    pub fn to(text: &str) -> Arc<Self> {
        Arc::new(Self { reply: Some(text.to_string()), calls: AtomicUsize::new(0) })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { reply: None, calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl QueryTranslator for StubTranslator {
    async fn translate(&self, _text: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or_else(|| anyhow::anyhow!("translate.googleapis.com unreachable"))
    }
}

pub struct StubSource {
    ids: Option<Vec<ArticleId>>,
    records: Option<Vec<ArticleRecord>>,
    pub located: Mutex<Vec<(String, LocateParams)>>,
    pub resolved: Mutex<Vec<Vec<ArticleId>>>,
}

impl StubSource {
    pub fn new(ids: Option<Vec<ArticleId>>, records: Option<Vec<ArticleRecord>>) -> Arc<Self> {
        Arc::new(Self {
            ids,
            records,
            located: Mutex::new(Vec::new()),
            resolved: Mutex::new(Vec::new()),
        })
    }

    /// Three articles, located and resolvable.
    pub fn with_articles() -> Arc<Self> {
        let records = sample_articles();
        let ids = records.iter().map(|r| r.id.clone()).collect();
        Self::new(Some(ids), Some(records))
    }

    pub fn locate_calls(&self) -> usize {
        self.located.lock().unwrap().len()
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolved.lock().unwrap().len()
    }
}

#[async_trait]
impl LiteratureSource for StubSource {
    async fn locate(&self, term: &str, params: &LocateParams) -> anyhow::Result<Vec<ArticleId>> {
        self.located.lock().unwrap().push((term.to_string(), *params));
        let ids = self.ids.clone().ok_or_else(|| anyhow::anyhow!("connection refused"))?;
        Ok(match params.mode {
            SelectionMode::All => ids.into_iter().take(params.max_results).collect(),
            SelectionMode::RandomOne => ids.into_iter().take(1).collect(),
        })
    }

    async fn resolve(&self, ids: &[ArticleId]) -> anyhow::Result<Vec<ArticleRecord>> {
        self.resolved.lock().unwrap().push(ids.to_vec());
        let records = self.records.clone().ok_or_else(|| anyhow::anyhow!("XML parse error"))?;
        Ok(ids
            .iter()
            .filter_map(|id| records.iter().find(|r| &r.id == id).cloned())
            .collect())
    }
}

pub struct StubBackend {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubBackend {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self { reply: Some(text.to_string()), prompts: Mutex::new(Vec::new()) })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { reply: None, prompts: Mutex::new(Vec::new()) })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmBackend for StubBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let prompt = req.messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");
        self.prompts.lock().unwrap().push(prompt);
        match &self.reply {
            Some(text) => Ok(LlmResponse {
                content: text.clone(),
                model: "stub-model".to_string(),
                prompt_tokens: 100,
                completion_tokens: 50,
            }),
            None => Err(LlmError::ApiError { status: 503, message: "model overloaded".to_string() }),
        }
    }

    fn model_id(&self) -> &str { "stub-model" }
}

pub fn sample_articles() -> Vec<ArticleRecord> {
    [
        ("39000001", "Migraine prevalence in adults"),
        ("39000002", "Tension-type headache and sleep"),
        ("39000003", "Cluster headache treated with oxygen"),
    ]
    .into_iter()
    .map(|(id, title)| {
        ArticleRecord::new(
            ArticleId::new(id),
            Some(title.to_string()),
            Some(format!("Abstract of {title}. n = 240, p = 0.03.")),
            None,
            None,
        )
    })
    .collect()
}

pub fn pipeline(
    translator: Arc<StubTranslator>,
    source: Arc<StubSource>,
    backend: Arc<StubBackend>,
    mode: SelectionMode,
) -> ThreadPipeline {
    let params = LocateParams { lookback_years: 5, max_results: 10, mode };
    ThreadPipeline::new(
        translator,
        source,
        ThreadGenerator::new(backend, GenerationSettings::default()),
        params,
    )
}
