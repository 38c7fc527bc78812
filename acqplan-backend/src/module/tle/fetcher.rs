///! Element set retrieval
///!
///! One network attempt per satellite; on any failure the configured
///! fallback file is read instead. There is no retry.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use super::types::OrbitalElements;
use crate::config::SatelliteConfig;
use crate::error::{PlanError, PlanResult};

#[async_trait]
pub trait ElementsSource: Send + Sync {
    async fn elements(&self, satellite: &str, config: &SatelliteConfig) -> PlanResult<OrbitalElements>;
}

pub struct TleFetcher {
    client: Client,
    url_template: String,
}

impl TleFetcher {
    pub fn new(url_template: &str, timeout_secs: u64) -> PlanResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Mozilla/5.0 acqplan-backend/1.0")
            .build()?;
        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }

    fn url_for(&self, norad_id: u32) -> String {
        self.url_template.replace("{norad_id}", &norad_id.to_string())
    }

    async fn fetch_remote(&self, satellite: &str, norad_id: u32) -> PlanResult<OrbitalElements> {
        let url = self.url_for(norad_id);
        tracing::debug!("Fetching elements for {} from {}", satellite, url);
        let text = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        OrbitalElements::parse(&text, satellite)
    }

    async fn read_fallback(satellite: &str, path: &Path) -> PlanResult<OrbitalElements> {
        let text = tokio::fs::read_to_string(path).await?;
        OrbitalElements::parse(&text, satellite)
    }
}

#[async_trait]
impl ElementsSource for TleFetcher {
    async fn elements(&self, satellite: &str, config: &SatelliteConfig) -> PlanResult<OrbitalElements> {
        let remote_error = match self.fetch_remote(satellite, config.norad_id).await {
            Ok(elements) => {
                tracing::info!("Retrieved elements for {} (NORAD {})", satellite, config.norad_id);
                return Ok(elements);
            }
            Err(e) => e,
        };

        let Some(fallback) = &config.tle_fallback else {
            tracing::warn!("Element fetch for {} failed and no fallback is configured", satellite);
            return Err(remote_error);
        };

        tracing::warn!(
            "Element fetch for {} failed ({}), reading fallback {:?}",
            satellite,
            remote_error,
            fallback
        );
        Self::read_fallback(satellite, fallback).await
    }
}

/// Fixed element sets, keyed by satellite id
#[derive(Debug, Clone, Default)]
pub struct StaticElementsSource {
    sets: HashMap<String, OrbitalElements>,
}

impl StaticElementsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, satellite: &str, elements: OrbitalElements) {
        self.sets.insert(satellite.to_string(), elements);
    }
}

#[async_trait]
impl ElementsSource for StaticElementsSource {
    async fn elements(&self, satellite: &str, _config: &SatelliteConfig) -> PlanResult<OrbitalElements> {
        self.sets
            .get(satellite)
            .cloned()
            .ok_or_else(|| PlanError::config(format!("no element set for {}", satellite)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const S3A: &str = "SENTINEL-3A\n\
        1 41335U 16011A   23285.50000000  .00000042  00000+0  34567-4 0  9994\n\
        2 41335  98.6250 350.1234 0001150  90.1234 270.0000 14.26735600395002\n";

    fn unreachable_fetcher() -> TleFetcher {
        // Port 9 on localhost refuses connections
        TleFetcher::new("http://127.0.0.1:9/tle/{norad_id}", 2).unwrap()
    }

    #[test]
    fn test_url_template() {
        let fetcher = TleFetcher::new("https://example.org/gp.php?CATNR={norad_id}", 5).unwrap();
        assert_eq!(fetcher.url_for(41335), "https://example.org/gp.php?CATNR=41335");
    }

    #[tokio::test]
    async fn test_fallback_file_used_on_network_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S3A.tle");
        std::fs::write(&path, S3A).unwrap();

        let config = SatelliteConfig {
            norad_id: 41335,
            swath_width_km: Some(1270.0),
            tle_fallback: Some(path),
        };
        let elements = unreachable_fetcher().elements("S3A", &config).await.unwrap();
        assert_eq!(elements.name, "SENTINEL-3A");
    }

    #[tokio::test]
    async fn test_network_failure_without_fallback() {
        let config = SatelliteConfig {
            norad_id: 41335,
            swath_width_km: None,
            tle_fallback: None,
        };
        let result = unreachable_fetcher().elements("S3A", &config).await;
        assert!(matches!(result, Err(PlanError::Network(_))));
    }

    #[tokio::test]
    async fn test_static_source() {
        let mut source = StaticElementsSource::new();
        source.insert("S3A", OrbitalElements::parse(S3A, "S3A").unwrap());
        let config = SatelliteConfig {
            norad_id: 41335,
            swath_width_km: None,
            tle_fallback: None,
        };
        assert!(source.elements("S3A", &config).await.is_ok());
        assert!(matches!(source.elements("S3B", &config).await, Err(PlanError::Config(_))));
    }
}
