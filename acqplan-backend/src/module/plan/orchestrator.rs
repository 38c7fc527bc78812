///! Plan orchestrator
///!
///! Drives one ingestion pass over every configured mission:
///! - document-sourced missions: link page -> catalog -> downloads, newest first
///! - orbit-sourced missions: elements -> footprints -> one fragment per day
///!
///! then annotates completeness, purges and persists each satellite store.
///! A failing unit is recorded in the run report and never aborts the pass.

use acqplan_common::{ExportDocument, Mission};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use super::export::{Coverage, build_export, coverage};
use super::orbit_builder::OrbitAcquisitionBuilder;
use super::outcome::{RunReport, UnitOutcome};
use crate::config::{MissionConfig, PlanConfig, PlanSource};
use crate::error::{PlanError, PlanResult};
use crate::module::completeness::CompletenessEngine;
use crate::module::datatakes::{DatatakeIndex, InMemoryDatatakeIndex};
use crate::module::fragments::{DayFragment, FragmentRepository, FragmentStore, MergePolicy};
use crate::module::geometry::{FootprintBuilder, OrbitPropagator, ProfileRegistry};
use crate::module::kml::{load_fragments, write_kml};
use crate::module::links::{
    DocumentSource, HttpDocumentSource, LinkCatalog, SatelliteLink, base_url_of, extract_links,
};
use crate::module::tle::{ElementsSource, TleFetcher};

pub struct PlanOrchestrator {
    config: Arc<PlanConfig>,
    documents: Arc<dyn DocumentSource>,
    elements: Arc<dyn ElementsSource>,
    index: RwLock<Arc<dyn DatatakeIndex>>,
    repository: FragmentRepository,
    profiles: ProfileRegistry,
    policy: MergePolicy,
    stores: RwLock<BTreeMap<String, FragmentStore>>,
}

impl PlanOrchestrator {
    pub fn new(
        config: Arc<PlanConfig>,
        documents: Arc<dyn DocumentSource>,
        elements: Arc<dyn ElementsSource>,
        index: Arc<dyn DatatakeIndex>,
    ) -> Self {
        let repository = FragmentRepository::new(config.fragments_dir());
        let policy = config.ingestion.merge_policy;
        Self {
            config,
            documents,
            elements,
            index: RwLock::new(index),
            repository,
            profiles: ProfileRegistry::with_defaults(),
            policy,
            stores: RwLock::new(BTreeMap::new()),
        }
    }

    /// Orchestrator over the HTTP sources, with an empty datatake index
    pub fn from_config(config: Arc<PlanConfig>) -> PlanResult<Self> {
        let timeout = config.ingestion.http_timeout_secs;
        let documents = Arc::new(HttpDocumentSource::new(timeout)?);
        let elements = Arc::new(TleFetcher::new(&config.ingestion.tle_url_template, timeout)?);
        Ok(Self::new(
            config,
            documents,
            elements,
            Arc::new(InMemoryDatatakeIndex::new()),
        ))
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    pub async fn set_index(&self, index: Arc<dyn DatatakeIndex>) {
        *self.index.write().await = index;
    }

    /// Reloads the datatake index from its JSON file, when present.
    /// Returns whether an index was loaded.
    pub async fn reload_index(&self) -> Result<bool> {
        let path = self.config.datatake_index_path();
        if !path.exists() {
            tracing::warn!("Datatake index {:?} not found, keeping current index", path);
            return Ok(false);
        }
        let index = InMemoryDatatakeIndex::load_json(&path, &self.config).await?;
        self.set_index(Arc::new(index)).await;
        Ok(true)
    }

    /// One ingestion pass over every configured mission
    pub async fn run(&self, now: DateTime<Utc>) -> RunReport {
        let start_time = Instant::now();
        let mut report = RunReport::new();

        tracing::info!("Starting acquisition plan ingestion at {}", now);

        for mission in self.config.configured_missions() {
            let Ok(mission_config) = self.config.mission(mission) else {
                continue;
            };
            let satellites = self.ready_satellites(mission, mission_config, &mut report).await;
            if satellites.is_empty() {
                continue;
            }

            match mission_config.source {
                PlanSource::Documents => {
                    self.ingest_documents(mission, mission_config, &satellites, now, &mut report)
                        .await
                }
                PlanSource::Orbit => {
                    self.ingest_orbit(mission, mission_config, &satellites, now, &mut report)
                        .await
                }
            }

            self.annotate(mission, &satellites, now, &mut report).await;
            self.purge_and_persist(mission, &satellites, now.date_naive(), &mut report)
                .await;
        }

        report.duration_seconds = start_time.elapsed().as_secs_f64();
        tracing::info!(
            "Ingestion complete: {} successful, {} skipped, {} failed in {:.2}s",
            report.successful(),
            report.skipped(),
            report.failed(),
            report.duration_seconds
        );
        report
    }

    /// Loads the stores of a mission's satellites; satellites whose snapshot
    /// cannot be read are left out of this pass
    async fn ready_satellites(
        &self,
        mission: Mission,
        mission_config: &MissionConfig,
        report: &mut RunReport,
    ) -> Vec<String> {
        let mut ready = Vec::new();
        for satellite in &mission_config.satellites {
            if !self.stores.read().await.contains_key(satellite) {
                match self
                    .repository
                    .load(satellite, self.config.ingestion.retention_days)
                    .await
                {
                    Ok(store) => {
                        self.stores
                            .write()
                            .await
                            .entry(satellite.clone())
                            .or_insert_with(|| store.with_policy(self.policy));
                    }
                    Err(e) => {
                        report.push(UnitOutcome::failed(mission, satellite, "store", format!("{:#}", e)));
                        continue;
                    }
                }
            }
            ready.push(satellite.clone());
        }
        ready
    }

    async fn ingest_documents(
        &self,
        mission: Mission,
        mission_config: &MissionConfig,
        satellites: &[String],
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) {
        let selected = match self.select_links(mission_config, now).await {
            Ok(selected) => selected,
            Err(e) => {
                for satellite in satellites {
                    report.push(UnitOutcome::failed(mission, satellite, "link page", &e));
                }
                return;
            }
        };

        let today = now.date_naive();
        let horizon = today - Duration::days(self.config.ingestion.retention_days);

        for satellite in satellites {
            let links = selected.get(satellite).map(Vec::as_slice).unwrap_or(&[]);
            if links.is_empty() {
                report.push(UnitOutcome::skipped(mission, satellite, "links", "no plan document selected"));
                continue;
            }

            let (fresh, stale): (Vec<&SatelliteLink>, Vec<&SatelliteLink>) =
                links.iter().partition(|link| link.end.date() >= horizon);
            for link in stale {
                report.push(UnitOutcome::skipped(
                    mission,
                    satellite,
                    format!("document {}", link.name()),
                    "outside retention",
                ));
            }

            // One document at a time, newest first: earlier merges win
            for link in fresh {
                let unit = format!("document {}", link.name());
                let result = match self.documents.fetch_document(&link.full_url()).await {
                    Ok(content) => load_fragments(&content, mission_config.layout, satellite),
                    Err(e) => Err(e),
                };
                match result {
                    Ok(fragments) => {
                        let added = self.merge_fragments(satellite, fragments, today).await;
                        report.push(UnitOutcome::success(mission, satellite, unit, added));
                    }
                    Err(e) => report.push(UnitOutcome::failed(mission, satellite, unit, e)),
                }
            }
        }
    }

    /// Merges parsed fragments into a loaded store, returning the events added
    async fn merge_fragments(&self, satellite: &str, fragments: Vec<DayFragment>, today: NaiveDate) -> usize {
        let mut stores = self.stores.write().await;
        let Some(store) = stores.get_mut(satellite) else {
            return 0;
        };
        fragments
            .into_iter()
            .map(|fragment| store.add_fragment_at(fragment, today).events_added())
            .sum()
    }

    /// Links of every satellite of the mission, newest first
    async fn select_links(
        &self,
        mission_config: &MissionConfig,
        now: DateTime<Utc>,
    ) -> PlanResult<BTreeMap<String, Vec<SatelliteLink>>> {
        let page_url = mission_config
            .link_page_url
            .as_deref()
            .ok_or_else(|| PlanError::config("no link page configured"))?;
        let html = self.documents.fetch_page(page_url).await?;
        let base_url = base_url_of(page_url)?;

        let mut catalog = LinkCatalog::with_default_predicates();
        for (satellite, links) in extract_links(&html, &mission_config.link_divs, &base_url)? {
            catalog.add_links(&satellite, links);
        }
        tracing::info!("Link page {} lists {} plan documents", page_url, catalog.len());
        Ok(catalog.select(now.naive_utc()))
    }

    async fn ingest_orbit(
        &self,
        mission: Mission,
        mission_config: &MissionConfig,
        satellites: &[String],
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) {
        let today = now.date_naive();
        let index = self.index.read().await.clone();

        for satellite in satellites {
            let builder = match self.orbit_builder(satellite, mission_config).await {
                Ok(builder) => builder,
                Err(e) => {
                    report.push(UnitOutcome::failed(mission, satellite, "elements", e));
                    continue;
                }
            };

            let mut built_days = 0;
            let first_day = today - Duration::days(self.config.ingestion.retention_days);
            for day in first_day.iter_days().take_while(|d| *d <= today) {
                let Some(records) = index.datatakes(day, satellite) else {
                    continue;
                };
                built_days += 1;
                let unit = format!("orbit {}", day);
                let (fragment, failures) = builder.build_day(day, records);
                if fragment.is_empty() && failures > 0 {
                    report.push(UnitOutcome::failed(
                        mission,
                        satellite,
                        unit,
                        format!("no footprint computed for {} datatakes", failures),
                    ));
                    continue;
                }
                let added = self.merge_fragments(satellite, vec![fragment], today).await;
                report.push(UnitOutcome::success(mission, satellite, unit, added));
            }

            if built_days == 0 {
                report.push(UnitOutcome::skipped(mission, satellite, "orbit", "no datatakes indexed"));
            }
        }
    }

    async fn orbit_builder(
        &self,
        satellite: &str,
        mission_config: &MissionConfig,
    ) -> PlanResult<OrbitAcquisitionBuilder> {
        let satellite_config = self.config.satellite(satellite)?;
        let swath_width_km = satellite_config
            .swath_width_km
            .ok_or_else(|| PlanError::config(format!("{} has no swath width", satellite)))?;

        let elements = self.elements.elements(satellite, satellite_config).await?;
        let propagator = OrbitPropagator::new(&elements)?;
        let profile = self
            .profiles
            .create(&self.config.ingestion.profile, swath_width_km * 1000.0)?;
        let step = Duration::seconds(self.config.ingestion.propagation_step_secs);

        Ok(OrbitAcquisitionBuilder::new(
            satellite,
            &mission_config.datatake_id_key,
            FootprintBuilder::new(propagator, profile, step),
        ))
    }

    async fn annotate(&self, mission: Mission, satellites: &[String], now: DateTime<Utc>, report: &mut RunReport) {
        let engine = match CompletenessEngine::new(mission, &self.config) {
            Ok(engine) => engine,
            Err(e) => {
                for satellite in satellites {
                    report.push(UnitOutcome::failed(mission, satellite, "completeness", &e));
                }
                return;
            }
        };

        let index = self.index.read().await.clone();
        let mut stores = self.stores.write().await;
        for satellite in satellites {
            if let Some(store) = stores.get_mut(satellite) {
                let result = engine.annotate_store(store, index.as_ref(), now);
                let emptied = store.remove_empty();
                if emptied > 0 {
                    tracing::debug!("{} days of {} left without events", emptied, satellite);
                }
                report.push(UnitOutcome::success(
                    mission,
                    satellite,
                    "completeness",
                    result.annotated + result.planned,
                ));
            }
        }
    }

    async fn purge_and_persist(
        &self,
        mission: Mission,
        satellites: &[String],
        today: NaiveDate,
        report: &mut RunReport,
    ) {
        for satellite in satellites {
            // Snapshot under the lock, write after releasing it
            let snapshot = {
                let mut stores = self.stores.write().await;
                let Some(store) = stores.get_mut(satellite) else {
                    continue;
                };
                store.purge_at(self.config.ingestion.retention_days, today);
                store.clone()
            };
            match self.repository.save(&snapshot).await {
                Ok(_) => report.push(UnitOutcome::success(mission, satellite, "persist", snapshot.event_count())),
                Err(e) => report.push(UnitOutcome::failed(mission, satellite, "persist", format!("{:#}", e))),
            }
        }
    }

    /// Purges every loaded store against the retention horizon
    pub async fn purge_all(&self, today: NaiveDate) -> Result<usize> {
        let mut removed = 0;
        let mut changed = Vec::new();
        {
            let mut stores = self.stores.write().await;
            for store in stores.values_mut() {
                let purged = store.purge_at(self.config.ingestion.retention_days, today);
                if purged > 0 {
                    changed.push(store.clone());
                }
                removed += purged;
            }
        }
        for store in &changed {
            self.repository.save(store).await?;
        }
        Ok(removed)
    }

    pub async fn export(
        &self,
        mission: Mission,
        satellite: &str,
        days: Option<(NaiveDate, NaiveDate)>,
    ) -> PlanResult<ExportDocument> {
        let stores = self.stores.read().await;
        let store = stores
            .get(satellite)
            .ok_or_else(|| PlanError::config(format!("no store loaded for {}", satellite)))?;
        Ok(build_export(mission, store, days))
    }

    /// Writes `{mission}_{satellite}.kml` for every loaded store
    pub async fn write_exports(&self) -> Result<usize> {
        let dir = self.config.exports_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .context(format!("Failed to create export directory: {:?}", dir))?;

        let documents: Vec<ExportDocument> = {
            let stores = self.stores.read().await;
            stores
                .values()
                .filter_map(|store| {
                    Mission::from_satellite(store.satellite()).map(|mission| build_export(mission, store, None))
                })
                .collect()
        };

        let mut written = 0;
        for document in &documents {
            let kml = write_kml(document)?;
            let path = dir.join(format!("{}.kml", document.name));
            tokio::fs::write(&path, kml)
                .await
                .context(format!("Failed to write export {:?}", path))?;
            written += 1;
        }
        tracing::info!("Wrote {} KML exports to {:?}", written, dir);
        Ok(written)
    }

    pub async fn coverage(&self) -> Coverage {
        let stores = self.stores.read().await;
        coverage(stores.values())
    }

    /// Copy of a satellite's store
    pub async fn store(&self, satellite: &str) -> Option<FragmentStore> {
        self.stores.read().await.get(satellite).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::datatakes::{DatatakeRecord, LevelCompleteness};
    use crate::module::geometry::S3A_TLE;
    use crate::module::links::StaticDocumentSource;
    use crate::module::tle::{OrbitalElements, StaticElementsSource};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const PAGE_URL: &str = "https://plans.test/s1/acquisition-plans";

    const PAGE: &str = r#"<html><body>
      <div class="sentinel-1a">
        <a href="/docs/S1A_MP_USER_20261008T160000_20261018T160000.kml">previous</a>
        <a href="/docs/S1A_MP_USER_20261015T160000_20261025T160000.kml">current</a>
        <a href="/docs/readme.txt">readme</a>
      </div>
    </body></html>"#;

    fn placemark(name: &str, begin: &str, end: &str, id: &str) -> String {
        format!(
            "<Placemark><name>{name}</name><TimeSpan><begin>{begin}</begin><end>{end}</end></TimeSpan>\
             <ExtendedData><Data name=\"DatatakeId\"><value>{id}</value></Data></ExtendedData></Placemark>"
        )
    }

    fn day_folders(days: &[(&str, Vec<String>)]) -> String {
        let folders: String = days
            .iter()
            .map(|(day, placemarks)| {
                format!(
                    "<Folder><name>{}</name><Folder><name>S1A</name>{}</Folder></Folder>",
                    day,
                    placemarks.concat()
                )
            })
            .collect();
        format!("<kml><Document>{}</Document></kml>", folders)
    }

    fn current_document() -> String {
        day_folders(&[
            (
                "2026-10-16",
                vec![placemark("E1", "2026-10-16T03:00:00", "2026-10-16T03:20:00", "1F")],
            ),
            (
                "2026-10-20",
                vec![placemark("E3", "2026-10-20T05:00:00", "2026-10-20T05:10:00", "2B")],
            ),
        ])
    }

    fn previous_document() -> String {
        day_folders(&[(
            "2026-10-16",
            vec![
                placemark("E1", "2026-10-16T02:00:00", "2026-10-16T02:30:00", "1F"),
                placemark("E2", "2026-10-16T08:00:00", "2026-10-16T08:10:00", "2A"),
            ],
        )])
    }

    fn record(id: &str, satellite: &str, start: DateTime<Utc>, minutes: i64) -> DatatakeRecord {
        DatatakeRecord {
            datatake_id: id.to_string(),
            satellite_unit: satellite.to_string(),
            observation_time_start: start,
            observation_time_stop: start + Duration::minutes(minutes),
            levels: LevelCompleteness {
                l0: Some(100.0),
                l1: None,
                l2: None,
            },
            products: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    fn config_for(dir: &TempDir, mission: &str) -> PlanConfig {
        let mut config = PlanConfig::default();
        config.data_dir = dir.path().to_path_buf();
        config.missions.retain(|name, _| name == mission);
        config
    }

    fn s1_orchestrator(dir: &TempDir) -> PlanOrchestrator {
        let mut config = config_for(dir, "S1");
        if let Some(s1) = config.missions.get_mut("S1") {
            s1.link_page_url = Some(PAGE_URL.to_string());
        }
        let documents = StaticDocumentSource::new()
            .with_page(PAGE_URL, PAGE)
            .with_document(
                "https://plans.test/docs/S1A_MP_USER_20261015T160000_20261025T160000.kml",
                current_document(),
            )
            .with_document(
                "https://plans.test/docs/S1A_MP_USER_20261008T160000_20261018T160000.kml",
                previous_document(),
            );
        let start = Utc.with_ymd_and_hms(2026, 10, 16, 3, 0, 0).unwrap();
        let index = InMemoryDatatakeIndex::from_records([record("S1A-31", "S1A", start, 20)]);

        PlanOrchestrator::new(
            Arc::new(config),
            Arc::new(documents),
            Arc::new(StaticElementsSource::new()),
            Arc::new(index),
        )
    }

    #[tokio::test]
    async fn test_document_mission_run() {
        let dir = TempDir::new().unwrap();
        let orchestrator = s1_orchestrator(&dir);
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();

        let report = orchestrator.run(now).await;
        assert_eq!(report.failed(), 0);
        assert!(report
            .outcomes
            .iter()
            .any(|o| o.unit.starts_with("document S1A_MP_USER_20261015") && o.is_success()));

        let store = orchestrator.store("S1A").await.unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        // The newest document is merged first and keeps its version of E1;
        // E2 is past and unknown to the index
        let fragment = store.get(day).unwrap();
        assert_eq!(fragment.event_names(), vec!["E1"]);
        let e1 = fragment.event("E1").unwrap();
        assert_eq!(e1.interval.start, Utc.with_ymd_and_hms(2026, 10, 16, 3, 0, 0).unwrap());
        assert_eq!(e1.attribute("DatatakeId"), Some("S1A-31"));
        assert_eq!(e1.style.as_deref(), Some("PUBLISHED"));

        let future = store.get(NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()).unwrap();
        assert_eq!(future.event("E3").unwrap().style.as_deref(), Some("PLANNED"));

        assert!(dir.path().join("fragments").join("fragments_S1A.json").exists());
    }

    #[tokio::test]
    async fn test_exports_written() {
        let dir = TempDir::new().unwrap();
        let orchestrator = s1_orchestrator(&dir);
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        orchestrator.run(now).await;

        let written = orchestrator.write_exports().await.unwrap();
        assert_eq!(written, 1);
        let kml = std::fs::read_to_string(dir.path().join("exports").join("S1_S1A.kml")).unwrap();
        assert!(kml.contains("<name>E1</name>"));
        assert!(kml.contains("<styleUrl>#PUBLISHED</styleUrl>"));

        let coverage = orchestrator.coverage().await;
        assert_eq!(coverage[&Mission::S1]["S1A"], vec!["2026-10-16", "2026-10-20"]);

        let export = orchestrator
            .export(Mission::S1, "S1A", Some((now.date_naive(), now.date_naive() + Duration::days(5))))
            .await
            .unwrap();
        assert_eq!(export.folders.len(), 1);
        assert!(orchestrator.export(Mission::S1, "S2A", None).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_link_page_fails_units() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir, "S1");
        let orchestrator = PlanOrchestrator::new(
            Arc::new(config),
            Arc::new(StaticDocumentSource::new()),
            Arc::new(StaticElementsSource::new()),
            Arc::new(InMemoryDatatakeIndex::new()),
        );
        let report = orchestrator
            .run(Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap())
            .await;
        assert!(report
            .for_satellite("S1A")
            .any(|o| o.unit == "link page" && o.is_failed()));
        // The store is still persisted
        assert!(report
            .for_satellite("S1A")
            .any(|o| o.unit == "persist" && o.is_success()));
    }

    #[tokio::test]
    async fn test_orbit_mission_run() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir, "S3");
        let mut elements = StaticElementsSource::new();
        elements.insert("S3A", OrbitalElements::parse(S3A_TLE, "S3A").unwrap());

        let start = Utc.with_ymd_and_hms(2023, 10, 12, 12, 0, 0).unwrap();
        let index = InMemoryDatatakeIndex::from_records([record("S3A-1", "S3A", start, 3)]);
        let orchestrator = PlanOrchestrator::new(
            Arc::new(config),
            Arc::new(StaticDocumentSource::new()),
            Arc::new(elements),
            Arc::new(index),
        );

        let report = orchestrator
            .run(Utc.with_ymd_and_hms(2023, 10, 13, 12, 0, 0).unwrap())
            .await;

        // S3B has no element set and fails alone
        assert!(report
            .for_satellite("S3B")
            .any(|o| o.unit == "elements" && o.is_failed()));
        assert!(!report.for_satellite("S3A").any(UnitOutcome::is_failed));

        let store = orchestrator.store("S3A").await.unwrap();
        let fragment = store.get(start.date_naive()).unwrap();
        let event = fragment.event("S3A-1").unwrap();
        assert_eq!(event.style.as_deref(), Some("PUBLISHED"));
        assert!(matches!(event.geometry, Some(acqplan_common::Geometry::Polygon(_))));
        assert!(dir.path().join("fragments").join("fragments_S3A.json").exists());
    }

    /// Document source that holds every download for a while and records
    /// the order and overlap of the requests
    struct SlowDocuments {
        inner: StaticDocumentSource,
        delay: std::time::Duration,
        fetched: std::sync::Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl SlowDocuments {
        fn new(inner: StaticDocumentSource, delay: std::time::Duration) -> Self {
            Self {
                inner,
                delay,
                fetched: std::sync::Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentSource for SlowDocuments {
        async fn fetch_page(&self, url: &str) -> PlanResult<String> {
            self.inner.fetch_page(url).await
        }

        async fn fetch_document(&self, url: &str) -> PlanResult<Vec<u8>> {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);
            self.fetched.lock().unwrap().push(url.to_string());
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.fetch_document(url).await
        }
    }

    #[tokio::test]
    async fn test_readers_not_blocked_by_downloads() {
        let dir = TempDir::new().unwrap();
        let mut config = config_for(&dir, "S1");
        if let Some(s1) = config.missions.get_mut("S1") {
            s1.link_page_url = Some(PAGE_URL.to_string());
        }
        let current_url = "https://plans.test/docs/S1A_MP_USER_20261015T160000_20261025T160000.kml";
        let previous_url = "https://plans.test/docs/S1A_MP_USER_20261008T160000_20261018T160000.kml";
        let inner = StaticDocumentSource::new()
            .with_page(PAGE_URL, PAGE)
            .with_document(current_url, current_document())
            .with_document(previous_url, previous_document());
        let documents = Arc::new(SlowDocuments::new(inner, std::time::Duration::from_millis(800)));
        let orchestrator = Arc::new(PlanOrchestrator::new(
            Arc::new(config),
            documents.clone(),
            Arc::new(StaticElementsSource::new()),
            Arc::new(InMemoryDatatakeIndex::new()),
        ));

        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let running = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.run(now).await }
        });

        // Reads go through while the first download is in flight
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        let read = tokio::time::timeout(std::time::Duration::from_millis(300), orchestrator.coverage()).await;
        assert!(read.is_ok(), "coverage blocked behind a download");
        let store = tokio::time::timeout(std::time::Duration::from_millis(300), orchestrator.store("S1A")).await;
        assert!(store.is_ok(), "store read blocked behind a download");

        let report = running.await.unwrap();
        assert_eq!(report.failed(), 0);

        // One download at a time, newest document first
        assert_eq!(documents.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(*documents.fetched.lock().unwrap(), vec![current_url, previous_url]);
    }

    #[tokio::test]
    async fn test_reload_index_missing_file() {
        let dir = TempDir::new().unwrap();
        let orchestrator = s1_orchestrator(&dir);
        assert!(!orchestrator.reload_index().await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_all() {
        let dir = TempDir::new().unwrap();
        let orchestrator = s1_orchestrator(&dir);
        orchestrator
            .run(Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap())
            .await;
        // 2026-10-16 falls outside 15 days of 2026-11-02
        let removed = orchestrator
            .purge_all(NaiveDate::from_ymd_opt(2026, 11, 2).unwrap())
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }
}
