///! Plan document layouts
///!
///! `day_folders`: Document -> Folder(day) -> Folder(satellite) -> Placemarks.
///! `mode_folders`: Document -> Folder(satellite) -> Folder(mode) -> Placemarks,
///! regrouped here by day.

use acqplan_common::DAY_FORMAT;
use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::reader::{parse_kml, parse_kml_time};
use super::types::{KmlFolder, KmlPlacemark};
use crate::config::DocumentLayout;
use crate::error::{PlanError, PlanResult};
use crate::module::fragments::{AcquisitionEvent, DayFragment};

/// Converts a placemark to an event. The placemark name is the identity
/// key; a nameless placemark takes its begin time as name.
pub fn placemark_event(placemark: &KmlPlacemark) -> PlanResult<AcquisitionEvent> {
    let (Some(begin), Some(end)) = (&placemark.begin, &placemark.end) else {
        return Err(PlanError::Document(format!(
            "placemark '{}' has no TimeSpan",
            placemark.name
        )));
    };
    let start = parse_kml_time(begin)?;
    let end = parse_kml_time(end)?;
    let name = if placemark.name.is_empty() {
        begin.clone()
    } else {
        placemark.name.clone()
    };

    let mut event = AcquisitionEvent::new(name, start, end);
    for (key, value) in &placemark.data {
        event.set_attribute(key, value.as_str());
    }
    if let Some(style) = &placemark.style_url {
        event.set_style(style.as_str());
    }
    event.geometry = placemark.geometry.clone();
    Ok(event)
}

/// Loads a downloaded plan document into day fragments of one satellite
pub fn load_fragments(
    content: &[u8],
    layout: DocumentLayout,
    satellite: &str,
) -> PlanResult<Vec<DayFragment>> {
    let root = parse_kml(content)?;
    let fragments = match layout {
        DocumentLayout::DayFolders => day_folder_fragments(&root, satellite),
        DocumentLayout::ModeFolders => mode_folder_fragments(&root, satellite),
    };
    tracing::debug!(
        "Loaded {} day fragments for {} ({} events)",
        fragments.len(),
        satellite,
        fragments.iter().map(DayFragment::event_count).sum::<usize>()
    );
    Ok(fragments)
}

fn folder_events(folder: &KmlFolder, satellite: &str) -> Vec<AcquisitionEvent> {
    folder
        .all_placemarks()
        .into_iter()
        .filter_map(|pm| match placemark_event(pm) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("Skipping placemark of {} in folder '{}': {}", satellite, folder.name, e);
                None
            }
        })
        .collect()
}

fn day_folder_fragments(root: &KmlFolder, satellite: &str) -> Vec<DayFragment> {
    let mut fragments = Vec::new();
    for folder in &root.folders {
        let day_key = folder.name.get(..10).unwrap_or(&folder.name);
        let day = match NaiveDate::parse_from_str(day_key, DAY_FORMAT) {
            Ok(day) => day,
            Err(e) => {
                tracing::error!("Folder '{}' of {} is not a day folder: {}", folder.name, satellite, e);
                continue;
            }
        };
        fragments.push(DayFragment::new(day, satellite, folder_events(folder, satellite)));
    }
    fragments
}

fn mode_folder_fragments(root: &KmlFolder, satellite: &str) -> Vec<DayFragment> {
    let mut days: BTreeMap<NaiveDate, Vec<AcquisitionEvent>> = BTreeMap::new();
    for sat_folder in &root.folders {
        tracing::debug!(
            "Reading {} mode folders of '{}'",
            sat_folder.folders.len(),
            sat_folder.name
        );
        for event in folder_events(sat_folder, satellite) {
            let begin_day = event.interval.start.date_naive();
            let end_day = event.interval.end.date_naive();
            // The index is keyed by start day, so on a past end day this copy is dropped as unknown
            if end_day != begin_day {
                days.entry(end_day).or_default().push(event.clone());
            }
            days.entry(begin_day).or_default().push(event);
        }
    }
    days.into_iter()
        .map(|(day, events)| DayFragment::new(day, satellite, events))
        .collect()
}
