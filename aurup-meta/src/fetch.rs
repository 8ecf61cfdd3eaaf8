//! Upstream document retrieval
//!
//! Repository indexes are published under numbered names
//! (`repository-12.xml`, `addons_list-3.xml`); the newest one is found by
//! probing indices downwards until a request does not answer 404.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use url::Url;

use crate::{Error, Result};

const USER_AGENT: &str = concat!("aurup/", env!("CARGO_PKG_VERSION"));

/// A URL template with `{delim}` and `{num}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    template: String,
    delim: String,
}

impl UrlPattern {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            delim: "-".to_string(),
        }
    }

    pub fn with_delim(mut self, delim: impl Into<String>) -> Self {
        self.delim = delim.into();
        self
    }

    /// URL for one index; `None` gives the unsuffixed name.
    pub fn render(&self, num: Option<u32>) -> String {
        match num {
            Some(num) => self
                .template
                .replace("{delim}", &self.delim)
                .replace("{num}", &num.to_string()),
            None => self.template.replace("{delim}", "").replace("{num}", ""),
        }
    }

    /// Candidate URLs, highest index first, the unsuffixed name last.
    pub fn candidates(&self, num_max: Option<u32>) -> Vec<String> {
        let mut urls: Vec<String> = (1..=num_max.unwrap_or(0))
            .rev()
            .map(|num| self.render(Some(num)))
            .collect();
        urls.push(self.render(None));
        urls
    }
}

/// A downloaded document and the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: Url,
    pub body: String,
}

/// Blocking HTTP client for upstream metadata.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client })
    }

    /// Fetch a document; any non-success status is an error.
    pub fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send()?.error_for_status()?;
        let url = response.url().clone();
        let body = response.text()?;
        Ok(FetchedDocument { url, body })
    }

    /// Like [`UpstreamClient::fetch`], but 404 is `None`.
    pub fn try_fetch(&self, url: &str) -> Result<Option<FetchedDocument>> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response.error_for_status()?;
        let url = response.url().clone();
        let body = response.text()?;
        Ok(Some(FetchedDocument { url, body }))
    }

    /// Open the highest-numbered document that exists.
    pub fn open_latest(&self, pattern: &UrlPattern, num_max: Option<u32>) -> Result<FetchedDocument> {
        scan_latest(pattern, num_max, |url| self.try_fetch(url))
    }
}

fn scan_latest<F>(pattern: &UrlPattern, num_max: Option<u32>, mut fetch: F) -> Result<FetchedDocument>
where
    F: FnMut(&str) -> Result<Option<FetchedDocument>>,
{
    for url in pattern.candidates(num_max) {
        if let Some(document) = fetch(&url)? {
            tracing::info!("Using {}", document.url);
            return Ok(document);
        }
    }
    Err(Error::NotFound(pattern.render(None)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> UrlPattern {
        UrlPattern::new("https://dl.example.com/repository{delim}{num}.xml")
    }

    fn document(url: &str) -> FetchedDocument {
        FetchedDocument {
            url: Url::parse(url).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn test_candidates() {
        assert_eq!(
            pattern().candidates(Some(3)),
            vec![
                "https://dl.example.com/repository-3.xml",
                "https://dl.example.com/repository-2.xml",
                "https://dl.example.com/repository-1.xml",
                "https://dl.example.com/repository.xml",
            ]
        );
        assert_eq!(
            pattern().candidates(None),
            vec!["https://dl.example.com/repository.xml"]
        );
        assert_eq!(
            pattern().with_delim("_").render(Some(2)),
            "https://dl.example.com/repository_2.xml"
        );
    }

    #[test]
    fn test_scan_skips_missing() {
        let mut tried = Vec::new();
        let found = scan_latest(&pattern(), Some(12), |url| {
            tried.push(url.to_string());
            if url.ends_with("-10.xml") {
                Ok(Some(document(url)))
            } else {
                Ok(None)
            }
        })
        .unwrap();

        assert_eq!(found.url.as_str(), "https://dl.example.com/repository-10.xml");
        assert_eq!(tried.len(), 3);
    }

    #[test]
    fn test_scan_falls_back_and_propagates() {
        let found = scan_latest(&pattern(), Some(2), |url| {
            Ok(url.ends_with("repository.xml").then(|| document(url)))
        })
        .unwrap();
        assert_eq!(found.url.as_str(), "https://dl.example.com/repository.xml");

        let missing = scan_latest(&pattern(), Some(2), |_| Ok(None)).unwrap_err();
        assert!(matches!(missing, Error::NotFound(_)));

        let failed = scan_latest(&pattern(), Some(2), |_| {
            Err(Error::schema("server error"))
        })
        .unwrap_err();
        assert!(matches!(failed, Error::SchemaViolation(_)));
    }
}
