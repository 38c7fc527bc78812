///! Orbit-derived acquisitions
///!
///! Datatake records of orbit-sourced satellites carry no footprint. Each
///! record is turned into an acquisition whose geometry is computed from the
///! satellite's orbit over the observation window.

use acqplan_common::{Geometry, INSTANT_FORMAT};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use crate::error::PlanResult;
use crate::module::datatakes::{DatatakeRecord, ProcessingLevel};
use crate::module::fragments::{AcquisitionEvent, DayFragment};
use crate::module::geometry::FootprintBuilder;

pub const OBSERVATION_START_KEY: &str = "observation_time_start";
pub const OBSERVATION_STOP_KEY: &str = "observation_time_stop";
pub const SATELLITE_UNIT_KEY: &str = "satellite_unit";

/// A datatake with its computed footprint. Built for one event, then
/// consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct DatatakeAcquisition {
    pub datatake_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attributes: Vec<(String, String)>,
    pub footprint: Option<Geometry>,
}

impl DatatakeAcquisition {
    /// Acquisition of a record, without footprint
    pub fn from_record(record: &DatatakeRecord) -> Self {
        let mut attributes = vec![
            (
                OBSERVATION_START_KEY.to_string(),
                record.observation_time_start.format(INSTANT_FORMAT).to_string(),
            ),
            (
                OBSERVATION_STOP_KEY.to_string(),
                record.observation_time_stop.format(INSTANT_FORMAT).to_string(),
            ),
            (SATELLITE_UNIT_KEY.to_string(), record.satellite_unit.clone()),
        ];
        attributes.extend(record.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        for (level, value) in record.levels.present() {
            attributes.push((level.attribute_key().to_string(), format!("{:.2}", value)));
        }
        Self {
            datatake_id: record.datatake_id.clone(),
            start: record.observation_time_start,
            end: record.observation_time_stop,
            attributes,
            footprint: None,
        }
    }

    /// Event named by the datatake id, which is also stored under `id_key`
    pub fn into_event(self, id_key: &str) -> AcquisitionEvent {
        let mut event = AcquisitionEvent::new(&self.datatake_id, self.start, self.end)
            .with_attribute(id_key, self.datatake_id.as_str());
        for (key, value) in self.attributes {
            event.set_attribute(&key, value);
        }
        event.geometry = self.footprint;
        event
    }

    pub fn level_percentage(&self, level: ProcessingLevel) -> Option<f64> {
        self.attributes
            .iter()
            .find(|(key, _)| key == level.attribute_key())
            .and_then(|(_, value)| value.parse().ok())
    }
}

/// Builds the day fragments of one orbit-sourced satellite
pub struct OrbitAcquisitionBuilder {
    satellite: String,
    id_key: String,
    footprint: FootprintBuilder,
}

impl OrbitAcquisitionBuilder {
    pub fn new(satellite: &str, id_key: &str, footprint: FootprintBuilder) -> Self {
        Self {
            satellite: satellite.to_string(),
            id_key: id_key.to_string(),
            footprint,
        }
    }

    pub fn acquisition(&self, record: &DatatakeRecord) -> PlanResult<DatatakeAcquisition> {
        let mut acquisition = DatatakeAcquisition::from_record(record);
        acquisition.footprint = Some(
            self.footprint
                .build(record.observation_time_start, record.observation_time_stop)?,
        );
        Ok(acquisition)
    }

    /// Fragment of one day. Records whose footprint cannot be computed are
    /// logged and left out; the count of such records is returned with it.
    pub fn build_day(
        &self,
        day: NaiveDate,
        records: &HashMap<String, DatatakeRecord>,
    ) -> (DayFragment, usize) {
        let mut failures = 0;
        let mut events = Vec::with_capacity(records.len());
        let mut sorted: Vec<&DatatakeRecord> = records.values().collect();
        sorted.sort_by(|a, b| a.datatake_id.cmp(&b.datatake_id));

        for record in sorted {
            match self.acquisition(record) {
                Ok(acquisition) => events.push(acquisition.into_event(&self.id_key)),
                Err(e) => {
                    tracing::warn!(
                        "No {} footprint for {} ({}): {}",
                        self.footprint.profile_name(),
                        record.datatake_id,
                        self.satellite,
                        e
                    );
                    failures += 1;
                }
            }
        }
        (DayFragment::new(day, &self.satellite, events), failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::datatakes::LevelCompleteness;
    use crate::module::geometry::{OrbitPropagator, ProfileRegistry, S3A_TLE};
    use crate::module::tle::OrbitalElements;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    fn record(id: &str, start: DateTime<Utc>, minutes: i64) -> DatatakeRecord {
        DatatakeRecord {
            datatake_id: id.to_string(),
            satellite_unit: "S3A".to_string(),
            observation_time_start: start,
            observation_time_stop: start + Duration::minutes(minutes),
            levels: LevelCompleteness {
                l0: Some(100.0),
                l1: Some(87.5),
                l2: None,
            },
            products: Vec::new(),
            fields: BTreeMap::from([("instrument_mode".to_string(), "EO".to_string())]),
        }
    }

    fn builder() -> OrbitAcquisitionBuilder {
        let elements = OrbitalElements::parse(S3A_TLE, "S3A").unwrap();
        let propagator = OrbitPropagator::new(&elements).unwrap();
        let profile = ProfileRegistry::with_defaults().create("Polygon", 1_270_000.0).unwrap();
        let footprint = FootprintBuilder::new(propagator, profile, Duration::seconds(90));
        OrbitAcquisitionBuilder::new("S3A", "DatatakeId", footprint)
    }

    #[test]
    fn test_record_attributes() {
        let start = Utc.with_ymd_and_hms(2023, 10, 12, 12, 0, 0).unwrap();
        let acquisition = DatatakeAcquisition::from_record(&record("S3A-1", start, 3));
        assert_eq!(acquisition.level_percentage(ProcessingLevel::L1), Some(87.5));
        assert_eq!(acquisition.level_percentage(ProcessingLevel::L2), None);

        let event = acquisition.into_event("DatatakeId");
        assert_eq!(event.name, "S3A-1");
        assert_eq!(event.attribute("DatatakeId"), Some("S3A-1"));
        assert_eq!(event.attribute("observation_time_start"), Some("2023-10-12T12:00:00Z"));
        assert_eq!(event.attribute("instrument_mode"), Some("EO"));
        assert_eq!(event.attribute("L0_"), Some("100.00"));
    }

    #[test]
    fn test_build_day_polygons() {
        let start = Utc.with_ymd_and_hms(2023, 10, 12, 12, 0, 0).unwrap();
        let records = HashMap::from([
            ("S3A-2".to_string(), record("S3A-2", start + Duration::minutes(30), 3)),
            ("S3A-1".to_string(), record("S3A-1", start, 3)),
        ]);
        let (fragment, failures) = builder().build_day(start.date_naive(), &records);
        assert_eq!(failures, 0);
        assert_eq!(fragment.event_names(), vec!["S3A-1", "S3A-2"]);

        // 180 s at 90 s: 4 in-range samples, 8 polygon vertices
        let geometry = fragment.event("S3A-1").unwrap().geometry.as_ref().unwrap();
        assert!(matches!(geometry, Geometry::Polygon(_)));
        assert_eq!(geometry.len(), 8);
    }
}
