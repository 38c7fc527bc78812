///! Link page parsing
///!
///! Each satellite's plan documents are listed as anchors inside a page
///! `div` whose class is configured per satellite.

use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::types::SatelliteLink;
use crate::error::{PlanError, PlanResult};

/// Scheme and authority of a page URL, e.g. `https://host:8443`
pub fn base_url_of(page_url: &str) -> PlanResult<String> {
    let url = Url::parse(page_url).map_err(|e| PlanError::parse(page_url, e))?;
    let host = url
        .host_str()
        .ok_or_else(|| PlanError::parse(page_url, "URL has no host"))?;
    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Extracts the document links of every configured satellite.
///
/// # Arguments
/// * `link_divs` - satellite id -> class of the div listing its documents
///
/// Anchors whose name carries no readable date span are logged and skipped.
pub fn extract_links(
    html: &str,
    link_divs: &BTreeMap<String, String>,
    base_url: &str,
) -> PlanResult<BTreeMap<String, Vec<SatelliteLink>>> {
    let document = Html::parse_document(html);
    let mut result = BTreeMap::new();

    for (satellite, class) in link_divs {
        let selector = Selector::parse(&format!("div.{} a[href]", class))
            .map_err(|e| PlanError::Document(format!("selector error for '{}': {}", class, e)))?;

        let mut links = Vec::new();
        for anchor in document.select(&selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            match SatelliteLink::parse(href.trim(), base_url) {
                Ok(link) => links.push(link),
                Err(e) => warn!("Skipping link for {}: {}", satellite, e),
            }
        }
        debug!("Found {} plan links for {} in div.{}", links.len(), satellite, class);
        result.insert(satellite.clone(), links);
    }

    Ok(result)
}
