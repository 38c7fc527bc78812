///! JSON snapshots of fragment stores
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::store::FragmentStore;
use super::types::DayFragment;

#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    satellite: String,
    saved_at: DateTime<Utc>,
    fragments: Vec<DayFragment>,
}

/// Persisted day-indexed geometry store, one file per satellite
#[derive(Debug, Clone)]
pub struct FragmentRepository {
    dir: PathBuf,
}

impl FragmentRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self, satellite: &str) -> PathBuf {
        self.dir.join(format!("fragments_{}.json", satellite))
    }

    /// Writes the store atomically (temp file + rename)
    pub async fn save(&self, store: &FragmentStore) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .await
            .context(format!("Failed to create fragments directory: {:?}", self.dir))?;

        let snapshot = StoreSnapshot {
            satellite: store.satellite().to_string(),
            saved_at: Utc::now(),
            fragments: store.iter().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&snapshot)
            .context("Failed to serialize fragment snapshot")?;

        let path = self.snapshot_path(store.satellite());
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .await
            .context(format!("Failed to write {:?}", tmp_path))?;
        fs::rename(&tmp_path, &path)
            .await
            .context(format!("Failed to move snapshot into place: {:?}", path))?;

        tracing::debug!(
            "Saved {} fragments of {} to {:?}",
            store.len(),
            store.satellite(),
            path
        );
        Ok(path)
    }

    /// Loads a satellite's store; a missing snapshot yields an empty store
    pub async fn load(&self, satellite: &str, max_age_days: i64) -> Result<FragmentStore> {
        let path = self.snapshot_path(satellite);
        if !path.exists() {
            tracing::info!("No fragment snapshot for {} at {:?}, starting empty", satellite, path);
            return Ok(FragmentStore::new(satellite, max_age_days));
        }

        let content = fs::read_to_string(&path)
            .await
            .context(format!("Failed to read {:?}", path))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)
            .context(format!("Failed to parse fragment snapshot {:?}", path))?;

        if snapshot.satellite != satellite {
            anyhow::bail!(
                "Snapshot {:?} belongs to {}, expected {}",
                path,
                snapshot.satellite,
                satellite
            );
        }

        let store = FragmentStore::restore(satellite, max_age_days, snapshot.fragments);
        tracing::info!(
            "Loaded {} fragments of {} saved at {}",
            store.len(),
            satellite,
            snapshot.saved_at
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::fragments::AcquisitionEvent;
    use acqplan_common::{GeoCoordinate, Geometry};
    use chrono::{NaiveDate, TimeZone};

    fn sample_store() -> FragmentStore {
        let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let event = AcquisitionEvent::new(
            "S3A-2026-10-17-0001",
            Utc.with_ymd_and_hms(2026, 10, 17, 3, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 17, 3, 40, 0).unwrap(),
        )
        .with_attribute("DatatakeId", "S3A-2026-10-17-0001")
        .with_geometry(Geometry::LineString(vec![
            GeoCoordinate::new(10.0, 20.0, 800_000.0),
            GeoCoordinate::new(11.0, 24.0, 801_000.0),
        ]));
        let mut store = FragmentStore::new("S3A", 15);
        store.add_fragment_at(DayFragment::new(day, "S3A", vec![event]), day);
        store
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let repository = FragmentRepository::new(dir.path().join("fragments"));
        let store = sample_store();

        let path = repository.save(&store).await.unwrap();
        assert!(path.ends_with("fragments_S3A.json"));

        let loaded = repository.load("S3A", 15).await.unwrap();
        assert_eq!(loaded.day_list(), store.day_list());
        let day = store.day_list()[0];
        assert_eq!(loaded.get(day).unwrap(), store.get(day).unwrap());
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repository = FragmentRepository::new(dir.path());
        let store = repository.load("S5P", 15).await.unwrap();
        assert!(store.is_empty());
        assert_eq!(store.satellite(), "S5P");
    }

    #[tokio::test]
    async fn test_snapshot_of_other_satellite_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let repository = FragmentRepository::new(dir.path());
        repository.save(&sample_store()).await.unwrap();
        std::fs::rename(
            dir.path().join("fragments_S3A.json"),
            dir.path().join("fragments_S3B.json"),
        )
        .unwrap();
        assert!(repository.load("S3B", 15).await.is_err());
    }
}
