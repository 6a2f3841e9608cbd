//! Audit records for generation calls.
//!
//! Nothing is persisted: each entry is emitted as one structured `tracing`
//! event, so whatever subscriber is installed decides where it ends up.
//! The output itself is never logged, only its SHA-256.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::backend::LlmResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationAudit {
    pub id: Uuid,
    pub model: String,
    /// "digest" or "deep".
    pub variant: String,
    pub article_count: usize,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub output_hash: String,
    pub latency_ms: u64,
    pub called_at: chrono::DateTime<Utc>,
}

impl GenerationAudit {
    pub fn new(
        variant: &str,
        article_count: usize,
        response: &LlmResponse,
        latency_ms: u64,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(response.content.as_bytes());
        let output_hash = format!("{:x}", hasher.finalize());

        Self {
            id: Uuid::new_v4(),
            model: response.model.clone(),
            variant: variant.to_string(),
            article_count,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
            output_hash,
            latency_ms,
            called_at: Utc::now(),
        }
    }

    pub fn emit(&self) {
        tracing::info!(
            target: "medthread::audit",
            audit_id = %self.id,
            model = %self.model,
            variant = %self.variant,
            article_count = self.article_count,
            prompt_tokens = self.prompt_tokens,
            completion_tokens = self.completion_tokens,
            output_hash = %self.output_hash,
            latency_ms = self.latency_ms,
            "thread generated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_sha256_of_output() {
        let resp = LlmResponse {
            content: "abc".to_string(),
            model: "gemini-2.0-flash".to_string(),
            prompt_tokens: 12,
            completion_tokens: 3,
        };
        let audit = GenerationAudit::new("digest", 3, &resp, 250);
        assert_eq!(
            audit.output_hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(audit.prompt_tokens, 12);
        assert_eq!(audit.article_count, 3);
        audit.emit();
    }
}
