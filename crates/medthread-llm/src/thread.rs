//! Thread Generator: turns resolved articles into a persona-driven forum
//! thread via one completion call.
//!
//! Two prompt variants:
//!   Digest — several articles, only their titles go into the prompt
//!   Deep   — one article with every field; persona rules go in a system message
//!
//! Failures never leave this module as errors. The caller always receives
//! displayable text: the model output, or [`GENERATION_FAILED_MESSAGE`].

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use medthread_ingestion::models::{ArticleRecord, NO_TITLE};
use tracing::{error, instrument, warn};

use crate::audit::GenerationAudit;
use crate::backend::{LlmBackend, LlmRequest, Message};

pub const GENERATION_FAILED_MESSAGE: &str =
    "Sorry, the discussion thread could not be generated. Please try again later.";

/// What the prompt is built from.
#[derive(Debug, Clone, Copy)]
pub enum ThreadSource<'a> {
    Digest(&'a [ArticleRecord]),
    Deep(&'a ArticleRecord),
}

impl ThreadSource<'_> {
    pub fn variant(&self) -> &'static str {
        match self {
            ThreadSource::Digest(_) => "digest",
            ThreadSource::Deep(_) => "deep",
        }
    }

    pub fn article_count(&self) -> usize {
        match self {
            ThreadSource::Digest(articles) => articles.len(),
            ThreadSource::Deep(_) => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Language the thread is written in; prompts themselves stay English.
    pub language: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            language: "Japanese".to_string(),
            temperature: 0.9,
            max_output_tokens: 4096,
        }
    }
}

pub struct ThreadGenerator {
    backend: Arc<dyn LlmBackend>,
    settings: GenerationSettings,
}

impl ThreadGenerator {
    pub fn new(backend: Arc<dyn LlmBackend>, settings: GenerationSettings) -> Self {
        Self { backend, settings }
    }

    #[instrument(skip(self, source), fields(variant = source.variant(), articles = source.article_count()))]
    pub async fn generate(&self, query: &str, source: ThreadSource<'_>) -> String {
        let language = &self.settings.language;
        let messages = match source {
            ThreadSource::Digest(articles) => {
                vec![Message::user(digest_prompt(query, articles, language))]
            }
            ThreadSource::Deep(article) => vec![
                Message::system(deep_instructions(language)),
                Message::user(deep_prompt(query, article, Utc::now())),
            ],
        };

        let req = LlmRequest {
            messages,
            model: None,
            max_tokens: Some(self.settings.max_output_tokens),
            temperature: Some(self.settings.temperature),
        };

        let started = Instant::now();
        match self.backend.complete(req).await {
            Ok(resp) if !resp.content.trim().is_empty() => {
                let latency_ms = started.elapsed().as_millis() as u64;
                GenerationAudit::new(source.variant(), source.article_count(), &resp, latency_ms)
                    .emit();
                resp.content.trim().to_string()
            }
            Ok(resp) => {
                warn!(model = %resp.model, "model returned no text");
                GENERATION_FAILED_MESSAGE.to_string()
            }
            Err(e) => {
                error!(error = %e, model = %self.backend.model_id(), "thread generation failed");
                GENERATION_FAILED_MESSAGE.to_string()
            }
        }
    }
}

pub fn digest_prompt(query: &str, articles: &[ArticleRecord], language: &str) -> String {
    let titles = articles
        .iter()
        .map(|a| a.title.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "[Anonymous forum thread: medical discussion]\n\
         Below is an anonymous forum thread, written in {language}, about the latest \
         medical papers on \"{query}\".\n\
         --- Retrieved paper titles ---\n\
         {titles}\n\
         --- Thread start ---\n"
    )
}

/// Role and persona rules for the deep variant, sent as the system message.
pub fn deep_instructions(language: &str) -> String {
    format!(
        "## Your role\n\
         You recreate an anonymous forum thread based on the paper you are given. Follow \
         the thread format, the flow of the discussion and each poster's voice, and produce \
         a realistic thread written entirely in {language}.\n\
         \n\
         ## Thread rules\n\
         - End the thread once the paper has been discussed from top to bottom.\n\
         - Shape the flow: question, debate, pushback, conclusion.\n\
         - The first question is always raised by an [Anon] poster.\n\
         - Keep every poster in character:\n\
         \x20   - [Doctor]: explains the paper medically, the treatment and its clinical \
         meaning; weighs the data analysis (p-values, sample size, bias).\n\
         \x20   - [Pharmacist]: adds side effects and drug interactions.\n\
         \x20   - [Nurse]: describes the situation on the ward and the patient-care angle.\n\
         \x20   - [Anon]: needles the others a little but keeps digging in to learn.\n\
         - Always cite the study's numbers (p-values, sample size, success rates).\n\
         - Mix in pushback and rebuttals so the discussion never goes flat.\n\
         - Close with \"Conclusion of this study\" and \"Open questions for future research\".\n\
         - Use the format of the sample thread. Dates and times are the time this thread \
         was generated.\n"
    )
}

/// Paper fields and the sample thread for the deep variant, sent as the user message.
///
/// The thread is themed on the paper's title; the query only stands in when
/// the record carries no title.
pub fn deep_prompt(query: &str, article: &ArticleRecord, generated_at: DateTime<Utc>) -> String {
    let theme = if article.title.trim().is_empty() || article.title == NO_TITLE {
        query
    } else {
        article.title.as_str()
    };
    let stamp = |secs: i64| {
        (generated_at + chrono::Duration::seconds(secs))
            .format("%Y/%m/%d(%a) %H:%M:%S.00")
            .to_string()
    };

    format!(
        "[Anonymous forum medical thread: latest research on {theme}]\n\
         --- Paper ---\n\
         [Title]: {title}\n\
         [URL]: {url}\n\
         [Full text]: {full_text}\n\
         [Abstract]: {abstract_text}\n\
         \n\
         --- Sample thread ---\n\
         [Good news] New study published on {theme}\n\
         \n\
         1 Anonymous {t0} ID:Jank9\n\
         Heard there's an interesting paper out\n\
         \n\
         2 Anonymous {t1} ID:RxCji\n\
         What's it about?\n\
         \n\
         3 Anonymous {t2} ID:UYT55\n\
         Got a source?\n\
         \n\
         4 Anonymous {t3} ID:Dr_Science\n\
         [Doctor] \"A recent clinical study ran an RCT on N patients with this condition.\"\n\
         \n\
         5 Anonymous {t4} ID:Pharma_Pro\n\
         [Pharmacist] \"Looks like the treatment beat standard care by a significant margin.\"\n\
         \n\
         6 Anonymous {t5} ID:Jank9\n\
         Wait, for real? Is the evidence any good?\n\
         \n\
         7 Anonymous {t6} ID:Dr_Science\n\
         [Doctor] \"p < 0.01 and the confidence interval is narrow, so the result holds up \
         statistically. The sample is still small though.\"\n\
         \n\
         8 Anonymous {t7} ID:Nurse_Care\n\
         [Nurse] \"Side effects were reported too, so patients need a proper explanation.\"\n\
         \n\
         9 Anonymous {t8} ID:Jank9\n\
         So how much does the treatment cost?\n\
         \n\
         10 Anonymous {t9} ID:Pharma_Pro\n\
         [Pharmacist] \"The data is from overseas and it isn't approved here yet. Insurance \
         coverage will take a while.\"\n\
         \n\
         11 Anonymous {t10} ID:Jank9\n\
         So does it actually work in the end?\n\
         \n\
         12 Anonymous {t11} ID:Dr_Science\n\
         [Doctor] \"In theory it looks promising, but there is no long-term data yet. We need \
         follow-up studies.\"\n\
         \n\
         13 Anonymous {t12} ID:Jank9\n\
         Hmm, wait and see then...\n\
         \n\
         14 Anonymous {t13} ID:Nurse_Care\n\
         [Nurse] \"Still, it could be a new option for patients whose current treatment \
         isn't working.\"\n",
        title = article.title,
        url = article.url,
        full_text = article.full_text_url,
        abstract_text = article.abstract_text,
        t0 = stamp(0),
        t1 = stamp(10),
        t2 = stamp(15),
        t3 = stamp(20),
        t4 = stamp(25),
        t5 = stamp(30),
        t6 = stamp(40),
        t7 = stamp(50),
        t8 = stamp(60),
        t9 = stamp(70),
        t10 = stamp(80),
        t11 = stamp(90),
        t12 = stamp(100),
        t13 = stamp(110),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LlmError, LlmResponse};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use medthread_ingestion::models::ArticleId;
    use std::sync::Mutex;

    struct StubBackend {
        reply: Result<&'static str, u16>,
        seen: Mutex<Vec<LlmRequest>>,
    }

    impl StubBackend {
        fn replying(text: &'static str) -> Arc<Self> {
            Arc::new(Self { reply: Ok(text), seen: Mutex::new(Vec::new()) })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self { reply: Err(status), seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl LlmBackend for StubBackend {
        async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push(req);
            match self.reply {
                Ok(text) => Ok(LlmResponse {
                    content: text.to_string(),
                    model: "stub".to_string(),
                    prompt_tokens: 10,
                    completion_tokens: 20,
                }),
                Err(status) => Err(LlmError::ApiError { status, message: "boom".to_string() }),
            }
        }

        fn model_id(&self) -> &str { "stub" }
    }

    fn article(id: &str, title: &str) -> ArticleRecord {
        ArticleRecord::new(
            ArticleId::new(id),
            Some(title.to_string()),
            Some("Sample size was 120; p < 0.01.".to_string()),
            Some("10.1000/ht.1"),
            None,
        )
    }

    #[test]
    fn test_digest_prompt_lists_titles_comma_joined() {
        let articles = [article("1", "Migraine A"), article("2", "Migraine B"), article("3", "Migraine C")];
        let prompt = digest_prompt("頭痛", &articles, "Japanese");
        assert!(prompt.contains("\"頭痛\""));
        assert!(prompt.contains("Migraine A, Migraine B, Migraine C"));
        assert!(prompt.contains("written in Japanese"));
    }

    #[test]
    fn test_deep_prompt_embeds_all_fields() {
        let a = article("38012345", "Cluster headache and oxygen");
        let at = Utc.with_ymd_and_hms(2025, 2, 23, 12, 0, 0).unwrap();
        let prompt = deep_prompt("headache", &a, at);

        assert!(prompt.contains("latest research on Cluster headache and oxygen]"));
        assert!(prompt.contains("[Good news] New study published on Cluster headache and oxygen"));
        assert!(prompt.contains("[Title]: Cluster headache and oxygen"));
        assert!(prompt.contains("[URL]: https://pubmed.ncbi.nlm.nih.gov/38012345"));
        assert!(prompt.contains("[Full text]: https://doi.org/10.1000/ht.1"));
        assert!(prompt.contains("[Abstract]: Sample size was 120; p < 0.01."));
        assert!(prompt.contains("1 Anonymous 2025/02/23(Sun) 12:00:00.00 ID:Jank9"));
        assert!(prompt.contains("3 Anonymous 2025/02/23(Sun) 12:00:15.00 ID:UYT55"));
        assert!(prompt.contains("14 Anonymous 2025/02/23(Sun) 12:01:50.00 ID:Nurse_Care"));
        assert!(!prompt.contains("15 Anonymous"));
    }

    #[test]
    fn test_deep_prompt_falls_back_to_query_without_title() {
        let a = ArticleRecord::new(ArticleId::new("7"), None, None, None, None);
        let at = Utc.with_ymd_and_hms(2025, 2, 23, 12, 0, 0).unwrap();
        let prompt = deep_prompt("headache", &a, at);

        assert!(prompt.contains("latest research on headache]"));
        assert!(prompt.contains("New study published on headache\n"));
        assert!(prompt.contains(&format!("[Title]: {NO_TITLE}")));
    }

    #[test]
    fn test_deep_instructions_carry_roles_and_language() {
        let rules = deep_instructions("English");
        for role in ["[Doctor]", "[Pharmacist]", "[Nurse]", "[Anon]"] {
            assert!(rules.contains(role), "missing {role}");
        }
        assert!(rules.contains("written entirely in English"));
        assert!(rules.contains("Open questions for future research"));
    }

    #[tokio::test]
    async fn test_success_returns_trimmed_text() {
        let backend = StubBackend::replying("\n  1 Anonymous ...\n");
        let generator = ThreadGenerator::new(backend.clone(), GenerationSettings::default());
        let articles = [article("1", "T1"), article("2", "T2"), article("3", "T3")];

        let text = generator.generate("headache", ThreadSource::Digest(&articles)).await;
        assert_eq!(text, "1 Anonymous ...");

        let req = &backend.seen.lock().unwrap()[0];
        assert_eq!(req.temperature, Some(0.9));
        assert_eq!(req.max_tokens, Some(4096));
        assert!(req.messages[0].content.contains("T1, T2, T3"));
    }

    #[tokio::test]
    async fn test_backend_error_becomes_failure_message() {
        let generator = ThreadGenerator::new(StubBackend::failing(500), GenerationSettings::default());
        let text = generator.generate("headache", ThreadSource::Deep(&article("1", "T"))).await;
        assert_eq!(text, GENERATION_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_blank_output_becomes_failure_message() {
        let generator = ThreadGenerator::new(StubBackend::replying("  \n "), GenerationSettings::default());
        let text = generator.generate("headache", ThreadSource::Deep(&article("1", "T"))).await;
        assert_eq!(text, GENERATION_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_deep_variant_sends_rules_as_system_message() {
        let backend = StubBackend::replying("thread");
        let settings = GenerationSettings { language: "German".to_string(), ..Default::default() };
        let generator = ThreadGenerator::new(backend.clone(), settings);

        generator.generate("Kopfschmerz", ThreadSource::Deep(&article("9", "T9"))).await;
        let req = backend.seen.lock().unwrap()[0].clone();
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        assert!(req.messages[0].content.contains("written entirely in German"));
        assert_eq!(req.messages[1].role, "user");
        assert!(req.messages[1].content.contains("latest research on T9]"));
    }

    #[tokio::test]
    async fn test_digest_variant_sends_single_user_message() {
        let backend = StubBackend::replying("thread");
        let generator = ThreadGenerator::new(backend.clone(), GenerationSettings::default());

        generator.generate("headache", ThreadSource::Digest(&[article("1", "T1")])).await;
        let req = backend.seen.lock().unwrap()[0].clone();
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, "user");
    }
}
