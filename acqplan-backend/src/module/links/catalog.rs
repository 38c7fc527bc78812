use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};

use super::types::SatelliteLink;

type Accepts = Box<dyn Fn(&SatelliteLink, NaiveDateTime) -> bool + Send + Sync>;

/// Named link filter evaluated against a reference date
pub struct SelectionPredicate {
    name: String,
    accepts: Accepts,
}

impl SelectionPredicate {
    pub fn new(
        name: impl Into<String>,
        accepts: impl Fn(&SatelliteLink, NaiveDateTime) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            accepts: Box::new(accepts),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accepts(&self, link: &SatelliteLink, reference: NaiveDateTime) -> bool {
        (self.accepts)(link, reference)
    }
}

impl std::fmt::Debug for SelectionPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SelectionPredicate").field(&self.name).finish()
    }
}

/// Span starts or ends at or after the reference date
pub fn starts_or_ends_after(link: &SatelliteLink, reference: NaiveDateTime) -> bool {
    link.start >= reference || link.end >= reference
}

/// Span starts at or before the reference date
pub fn starts_before(link: &SatelliteLink, reference: NaiveDateTime) -> bool {
    link.start <= reference
}

/// Span overlaps the `days` days preceding the reference date
pub fn overlaps_recent_days(days: i64) -> SelectionPredicate {
    SelectionPredicate::new(format!("overlaps_recent_{}_days", days), move |link, reference| {
        link.end >= reference - Duration::days(days) && link.start <= reference
    })
}

/// Candidate plan documents per satellite
#[derive(Debug, Default)]
pub struct LinkCatalog {
    links: BTreeMap<String, Vec<SatelliteLink>>,
    predicates: Vec<SelectionPredicate>,
}

impl LinkCatalog {
    /// Catalog with no predicates: selects nothing until one is added
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the default chain, which together selects every link
    /// up to the present
    pub fn with_default_predicates() -> Self {
        let mut catalog = Self::new();
        catalog.add_predicate(SelectionPredicate::new("starts_or_ends_after", starts_or_ends_after));
        catalog.add_predicate(SelectionPredicate::new("starts_before", starts_before));
        catalog
    }

    pub fn add_predicate(&mut self, predicate: SelectionPredicate) {
        tracing::debug!("Link selection predicate registered: {}", predicate.name());
        self.predicates.push(predicate);
    }

    pub fn predicate_names(&self) -> Vec<&str> {
        self.predicates.iter().map(|p| p.name()).collect()
    }

    /// Returns false when the satellite already holds this link
    pub fn add_link(&mut self, satellite: &str, link: SatelliteLink) -> bool {
        let links = self.links.entry(satellite.to_string()).or_default();
        if links.contains(&link) {
            return false;
        }
        links.push(link);
        true
    }

    /// Returns the number of new links
    pub fn add_links(&mut self, satellite: &str, links: impl IntoIterator<Item = SatelliteLink>) -> usize {
        links
            .into_iter()
            .filter(|link| self.add_link(satellite, link.clone()))
            .count()
    }

    pub fn satellites(&self) -> Vec<&str> {
        self.links.keys().map(String::as_str).collect()
    }

    pub fn links(&self, satellite: &str) -> &[SatelliteLink] {
        self.links.get(satellite).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Links of one satellite accepted by any predicate, newest start first
    pub fn select_satellite(&self, satellite: &str, reference: NaiveDateTime) -> Vec<SatelliteLink> {
        let mut seen = HashSet::new();
        let mut selected: Vec<SatelliteLink> = self
            .links(satellite)
            .iter()
            .filter(|link| self.predicates.iter().any(|p| p.accepts(link, reference)))
            .filter(|link| seen.insert(link.ref_url.as_str()))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.start.cmp(&a.start).then_with(|| a.ref_url.cmp(&b.ref_url)));
        selected
    }

    pub fn select(&self, reference: NaiveDateTime) -> BTreeMap<String, Vec<SatelliteLink>> {
        self.links
            .keys()
            .map(|satellite| (satellite.clone(), self.select_satellite(satellite, reference)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const BASE: &str = "https://sentinels.copernicus.eu";

    fn link(start: &str, end: &str) -> SatelliteLink {
        SatelliteLink::parse(&format!("/docs/s1a_mp_user_{}_{}", start, end), BASE).unwrap()
    }

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn test_default_chain_selects_everything_newest_first() {
        let mut catalog = LinkCatalog::with_default_predicates();
        let old = link("20260901t000000", "20260920t000000");
        let current = link("20261010t000000", "20261030t000000");
        let future = link("20261025t000000", "20261115t000000");
        catalog.add_links("S1A", vec![old.clone(), future.clone(), current.clone()]);

        let selected = catalog.select(reference());
        assert_eq!(selected["S1A"], vec![future, current, old]);
    }

    #[test]
    fn test_duplicates_ignored() {
        let mut catalog = LinkCatalog::with_default_predicates();
        let a = link("20261010t000000", "20261030t000000");
        assert!(catalog.add_link("S1A", a.clone()));
        assert!(!catalog.add_link("S1A", a.clone()));
        assert_eq!(catalog.add_links("S1A", vec![a.clone(), a]), 0);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.select(reference())["S1A"].len(), 1);
    }

    #[test]
    fn test_empty_chain_selects_nothing() {
        let mut catalog = LinkCatalog::new();
        catalog.add_link("S2A", link("20261010t000000", "20261030t000000"));
        assert!(catalog.select(reference())["S2A"].is_empty());
    }

    #[test]
    fn test_recent_days_predicate() {
        let mut catalog = LinkCatalog::new();
        catalog.add_predicate(overlaps_recent_days(15));
        let stale = link("20260901t000000", "20260920t000000");
        let recent = link("20260925t000000", "20261005t000000");
        let upcoming = link("20261101t000000", "20261120t000000");
        catalog.add_links("S2B", vec![stale, recent.clone(), upcoming]);

        assert_eq!(catalog.select_satellite("S2B", reference()), vec![recent]);
        assert_eq!(catalog.predicate_names(), vec!["overlaps_recent_15_days"]);
    }

    #[test]
    fn test_satellites_kept_apart() {
        let mut catalog = LinkCatalog::with_default_predicates();
        catalog.add_link("S2A", link("20261010t000000", "20261030t000000"));
        catalog.add_link("S2B", link("20261010t000000", "20261030t000000"));
        assert_eq!(catalog.satellites(), vec!["S2A", "S2B"]);
        assert!(catalog.links("S1A").is_empty());
    }
}
