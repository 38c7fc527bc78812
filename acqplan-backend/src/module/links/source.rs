use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{PlanError, PlanResult};

/// Retrieval of link pages and plan documents
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> PlanResult<String>;

    async fn fetch_document(&self, url: &str) -> PlanResult<Vec<u8>>;
}

pub struct HttpDocumentSource {
    client: Client,
}

impl HttpDocumentSource {
    pub fn new(timeout_secs: u64) -> PlanResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Mozilla/5.0 acqplan-backend/1.0")
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch_page(&self, url: &str) -> PlanResult<String> {
        tracing::debug!("Fetching link page {}", url);
        let text = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    async fn fetch_document(&self, url: &str) -> PlanResult<Vec<u8>> {
        tracing::debug!("Downloading plan document {}", url);
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

/// Pages and documents served from memory, keyed by URL
#[derive(Debug, Clone, Default)]
pub struct StaticDocumentSource {
    pages: HashMap<String, String>,
    documents: HashMap<String, Vec<u8>>,
}

impl StaticDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_document(mut self, url: &str, content: impl Into<Vec<u8>>) -> Self {
        self.documents.insert(url.to_string(), content.into());
        self
    }
}

#[async_trait]
impl DocumentSource for StaticDocumentSource {
    async fn fetch_page(&self, url: &str) -> PlanResult<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| PlanError::Document(format!("no page at {}", url)))
    }

    async fn fetch_document(&self, url: &str) -> PlanResult<Vec<u8>> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| PlanError::Document(format!("no document at {}", url)))
    }
}
