///! Export of stored fragments
///!
///! Builds the typed export tree of one satellite store, with one style per
///! completeness state and display labels for event attributes.

use acqplan_common::{
    CompletenessState, DAY_FORMAT, DayFolder, ExportDocument, ExportEvent, Mission,
    SatelliteFolder, StatusStyle,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::orbit_builder::{OBSERVATION_START_KEY, OBSERVATION_STOP_KEY, SATELLITE_UNIT_KEY};
use crate::module::fragments::{AcquisitionEvent, FragmentStore};

/// Internal attribute keys never exported
const EXCLUDED_KEYS: [&str; 5] = ["datatake_id", "L0_", "L1_", "L2_", "completeness_status"];

/// Mission -> satellite -> retained days
pub type Coverage = BTreeMap<Mission, BTreeMap<String, Vec<String>>>;

/// Display label of an attribute key, None for internal keys
pub fn export_label(key: &str) -> Option<&str> {
    if EXCLUDED_KEYS.contains(&key) {
        return None;
    }
    Some(match key {
        OBSERVATION_START_KEY => "ObservationTimeStart",
        OBSERVATION_STOP_KEY => "ObservationTimeStop",
        SATELLITE_UNIT_KEY => "SatelliteUnit",
        "instrument_mode" => "InstrumentMode",
        "absolute_orbit" => "OrbitAbsolute",
        other => other,
    })
}

/// KML colour (bbggrr) of a state
fn state_color(state: CompletenessState) -> &'static str {
    match state {
        CompletenessState::Planned | CompletenessState::Processing => "a0908c",
        CompletenessState::Acquired | CompletenessState::Published => "1ba40a",
        CompletenessState::Delayed | CompletenessState::Partial => "00ffff",
        CompletenessState::Lost => "0000ff",
    }
}

/// One style per completeness state; orbit-derived swaths are not filled
pub fn status_styles(mission: Mission) -> Vec<StatusStyle> {
    let fill = !matches!(mission, Mission::S3 | Mission::S5);
    CompletenessState::ALL
        .into_iter()
        .map(|state| StatusStyle {
            id: state.as_str().to_string(),
            line_color: format!("FF{}", state_color(state)),
            line_width: 2,
            poly_color: format!("40{}", state_color(state)),
            fill,
        })
        .collect()
}

pub fn export_event(event: &AcquisitionEvent) -> ExportEvent {
    let attributes = event
        .attributes
        .iter()
        .filter_map(|attr| export_label(&attr.name).map(|label| (label.to_string(), attr.value.clone())))
        .collect();
    ExportEvent {
        name: event.name.clone(),
        begin: event.interval.start,
        end: event.interval.end,
        attributes,
        style: event.style.clone(),
        geometry: event.geometry.clone(),
    }
}

/// Export document `{mission}_{satellite}` over the stored days within
/// `days` (inclusive), or over every stored day
pub fn build_export(
    mission: Mission,
    store: &FragmentStore,
    days: Option<(NaiveDate, NaiveDate)>,
) -> ExportDocument {
    let mut document = ExportDocument::new(format!("{}_{}", mission, store.satellite()));
    document.styles = status_styles(mission);

    for fragment in store.iter() {
        if let Some((first, last)) = days {
            if fragment.day < first || fragment.day > last {
                continue;
            }
        }
        document.folders.push(DayFolder {
            day: fragment.day.format(DAY_FORMAT).to_string(),
            satellites: vec![SatelliteFolder {
                name: store.satellite().to_string(),
                events: fragment.events().iter().map(export_event).collect(),
            }],
        });
    }

    tracing::debug!(
        "Export {}: {} days, {} events",
        document.name,
        document.folders.len(),
        document.event_count()
    );
    document
}

/// Retained days per mission and satellite
pub fn coverage<'a>(stores: impl IntoIterator<Item = &'a FragmentStore>) -> Coverage {
    let mut result = Coverage::new();
    for store in stores {
        let Some(mission) = Mission::from_satellite(store.satellite()) else {
            tracing::warn!("Store {} belongs to no known mission", store.satellite());
            continue;
        };
        let days = store
            .day_list()
            .into_iter()
            .map(|day| day.format(DAY_FORMAT).to_string())
            .collect();
        result
            .entry(mission)
            .or_default()
            .insert(store.satellite().to_string(), days);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::fragments::DayFragment;
    use chrono::{TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn store() -> FragmentStore {
        let mut store = FragmentStore::new("S3A", 15);
        for offset in [2, 1, 0] {
            let day = today() - chrono::Duration::days(offset);
            let start = Utc.from_utc_datetime(&day.and_hms_opt(10, 0, 0).unwrap());
            let mut event = AcquisitionEvent::new(format!("S3A-{}", offset), start, start + chrono::Duration::minutes(3))
                .with_attribute("DatatakeId", format!("S3A-{}", offset))
                .with_attribute("observation_time_start", "2026-10-16T10:00:00Z")
                .with_attribute("absolute_orbit", "41000")
                .with_attribute("L0_", "100.00")
                .with_attribute("datatake_id", "raw");
            event.set_style("PUBLISHED");
            store.add_fragment_at(DayFragment::new(day, "S3A", vec![event]), today());
        }
        store
    }

    #[test]
    fn test_labels() {
        assert_eq!(export_label("satellite_unit"), Some("SatelliteUnit"));
        assert_eq!(export_label("absolute_orbit"), Some("OrbitAbsolute"));
        assert_eq!(export_label("Acquisition Status"), Some("Acquisition Status"));
        assert_eq!(export_label("L1_"), None);
        assert_eq!(export_label("completeness_status"), None);
    }

    #[test]
    fn test_styles() {
        let styles = status_styles(Mission::S1);
        assert_eq!(styles.len(), 7);
        let lost = styles.iter().find(|s| s.id == "LOST").unwrap();
        assert_eq!(lost.line_color, "FF0000ff");
        assert_eq!(lost.poly_color, "400000ff");
        assert_eq!(lost.line_width, 2);
        assert!(lost.fill);
        assert!(status_styles(Mission::S5).iter().all(|s| !s.fill));
    }

    #[test]
    fn test_build_export_range() {
        let store = store();
        let full = build_export(Mission::S3, &store, None);
        assert_eq!(full.name, "S3_S3A");
        assert_eq!(full.folders.len(), 3);
        assert_eq!(full.folders[0].day, "2026-10-16");

        let last = build_export(Mission::S3, &store, Some((today(), today())));
        assert_eq!(last.folders.len(), 1);
        let event = &last.folders[0].satellites[0].events[0];
        assert_eq!(event.name, "S3A-0");
        assert_eq!(event.style.as_deref(), Some("PUBLISHED"));
        assert_eq!(
            event.attributes,
            vec![
                ("DatatakeId".to_string(), "S3A-0".to_string()),
                ("ObservationTimeStart".to_string(), "2026-10-16T10:00:00Z".to_string()),
                ("OrbitAbsolute".to_string(), "41000".to_string()),
            ]
        );
    }

    #[test]
    fn test_coverage() {
        let s3a = store();
        let s1a = FragmentStore::new("S1A", 15);
        let stray = FragmentStore::new("L8", 15);
        let coverage = coverage([&s3a, &s1a, &stray]);
        assert_eq!(coverage.len(), 2);
        assert_eq!(coverage[&Mission::S3]["S3A"], vec!["2026-10-16", "2026-10-17", "2026-10-18"]);
        assert!(coverage[&Mission::S1]["S1A"].is_empty());
    }
}
