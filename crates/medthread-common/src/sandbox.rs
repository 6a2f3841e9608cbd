use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::MedthreadError;

/// Per-call timeout applied when the caller does not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An HTTP client capped to an allowlist of hosts, with a per-call timeout.
///
/// Every outbound request of a pipeline run goes through one of these, so an
/// unresponsive upstream costs at most `timeout` instead of blocking forever.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist of literature, translation
    /// and generative-text hosts.
    pub fn new(timeout: Duration) -> Result<Self, MedthreadError> {
        let domains = [
            "eutils.ncbi.nlm.nih.gov",           // PubMed E-utilities
            "translate.googleapis.com",          // Query translation
            "generativelanguage.googleapis.com", // Gemini
            "localhost",
            "127.0.0.1",
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("medthread/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MedthreadError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else { return false };
        let Some(host) = parsed.host_str() else { return false };
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, MedthreadError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, MedthreadError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    fn check(&self, url: &str) -> Result<(), MedthreadError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            Err(MedthreadError::Security(format!("domain not in allowlist for URL {}", url)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_known_hosts_and_subdomains() {
        let client = SandboxClient::new(DEFAULT_TIMEOUT).unwrap();
        assert!(client.is_allowed("https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi"));
        assert!(client.is_allowed("http://127.0.0.1:4010/esearch.fcgi"));
        assert!(client.is_allowed(
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        ));
    }

    #[test]
    fn rejects_unlisted_hosts() {
        let client = SandboxClient::new(DEFAULT_TIMEOUT).unwrap();
        assert!(!client.is_allowed("https://example.com/"));
        assert!(!client.is_allowed("https://evil-ncbi.nlm.nih.gov.example.com/"));
        assert!(!client.is_allowed("not a url"));
        assert!(matches!(
            client.get("https://example.com/"),
            Err(MedthreadError::Security(_))
        ));
    }

    #[test]
    fn allow_domain_extends_policy() {
        let mut client = SandboxClient::new(DEFAULT_TIMEOUT).unwrap();
        client.allow_domain("example.com");
        assert!(client.is_allowed("https://api.example.com/v1"));
    }
}
