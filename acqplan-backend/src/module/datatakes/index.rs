use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use acqplan_common::Mission;

use super::types::DatatakeRecord;
use crate::config::PlanConfig;

/// Read interface over the production datatake records
pub trait DatatakeIndex: Send + Sync {
    /// Datatake id -> record for one satellite on one day
    fn datatakes(&self, day: NaiveDate, satellite: &str) -> Option<&HashMap<String, DatatakeRecord>>;

    /// Days with at least one record, ascending
    fn days(&self) -> Vec<NaiveDate>;
}

type SatelliteTable = HashMap<String, HashMap<String, DatatakeRecord>>;

/// Index held in memory, keyed by the observation start day
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatatakeIndex {
    days: BTreeMap<NaiveDate, SatelliteTable>,
}

impl InMemoryDatatakeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = DatatakeRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        index
    }

    /// Inserts or replaces a record
    pub fn insert(&mut self, record: DatatakeRecord) {
        let day = record.observation_time_start.date_naive();
        self.days
            .entry(day)
            .or_default()
            .entry(record.satellite_unit.clone())
            .or_default()
            .insert(record.datatake_id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.days
            .values()
            .flat_map(|sats| sats.values())
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Loads a JSON array of records. Level percentages missing from a
    /// record are computed from its product rows with the mission's level ids.
    pub async fn load_json(path: &Path, config: &PlanConfig) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read datatake index {:?}", path))?;
        Self::from_json(&content, config)
    }

    pub fn from_json(content: &str, config: &PlanConfig) -> Result<Self> {
        let records: Vec<DatatakeRecord> =
            serde_json::from_str(content).context("Failed to parse datatake index")?;

        let mut index = Self::new();
        for mut record in records {
            let level_ids = Mission::from_satellite(&record.satellite_unit)
                .and_then(|mission| config.mission(mission).ok())
                .map(|mission_config| &mission_config.level_ids);
            match level_ids {
                Some(ids) => record.resolve_levels(ids),
                None => tracing::debug!(
                    "No level ids for {}, keeping stored levels of {}",
                    record.satellite_unit,
                    record.datatake_id
                ),
            }
            index.insert(record);
        }
        tracing::info!("Datatake index loaded: {} records over {} days", index.len(), index.days.len());
        Ok(index)
    }
}

impl DatatakeIndex for InMemoryDatatakeIndex {
    fn datatakes(&self, day: NaiveDate, satellite: &str) -> Option<&HashMap<String, DatatakeRecord>> {
        self.days.get(&day).and_then(|sats| sats.get(satellite))
    }

    fn days(&self) -> Vec<NaiveDate> {
        self.days.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::datatakes::LevelCompleteness;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, satellite: &str, day: u32) -> DatatakeRecord {
        DatatakeRecord {
            datatake_id: id.to_string(),
            satellite_unit: satellite.to_string(),
            observation_time_start: Utc.with_ymd_and_hms(2026, 10, day, 23, 50, 0).unwrap(),
            observation_time_stop: Utc.with_ymd_and_hms(2026, 10, day + 1, 0, 10, 0).unwrap(),
            levels: LevelCompleteness::default(),
            products: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn test_keyed_by_start_day() {
        let index = InMemoryDatatakeIndex::from_records(vec![
            record("S1A-1", "S1A", 16),
            record("S1A-2", "S1A", 17),
            record("S2B-9", "S2B", 17),
        ]);
        let d17 = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.days().len(), 2);
        assert!(index.datatakes(d17, "S1A").unwrap().contains_key("S1A-2"));
        assert!(index.datatakes(d17, "S3A").is_none());
        assert!(index.datatakes(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(), "S1A").is_none());
    }

    #[test]
    fn test_from_json_resolves_levels() {
        let json = r#"[{
            "datatake_id": "S5P-1",
            "satellite_unit": "S5P",
            "observation_time_start": "2026-10-17T01:00:00Z",
            "observation_time_stop": "2026-10-17T02:40:00Z",
            "products": [
                {"product_level": "L1B", "percentage": 50.0},
                {"product_level": "L1B", "percentage": 100.0}
            ]
        }]"#;
        let index = InMemoryDatatakeIndex::from_json(json, &PlanConfig::default()).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let record = &index.datatakes(day, "S5P").unwrap()["S5P-1"];
        assert_eq!(record.levels.l1, Some(75.0));
    }

    #[tokio::test]
    async fn test_load_json_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = InMemoryDatatakeIndex::load_json(&dir.path().join("none.json"), &PlanConfig::default()).await;
        assert!(result.is_err());
    }
}
