///! Completeness annotation of stored fragments
///!
///! Every event is resolved against the datatake index by its normalized
///! id. Found events get both track labels and a style tag; unknown events
///! are PLANNED on future days and dropped on past days.

use acqplan_common::{Mission, Track};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use super::engine::{evaluate, CompletenessThresholds};
use super::ids::DatatakeIdCodec;
use super::types::CompletenessStatus;
use crate::config::PlanConfig;
use crate::error::PlanResult;
use crate::module::datatakes::{DatatakeIndex, DatatakeRecord};
use crate::module::fragments::{AcquisitionEvent, DayFragment, FragmentStore};

/// Counts of one annotation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    pub annotated: usize,
    pub planned: usize,
    pub dropped: usize,
}

impl AnnotationReport {
    pub fn absorb(&mut self, other: AnnotationReport) {
        self.annotated += other.annotated;
        self.planned += other.planned;
        self.dropped += other.dropped;
    }
}

pub struct CompletenessEngine {
    mission: Mission,
    codec: DatatakeIdCodec,
    thresholds: CompletenessThresholds,
    time_threshold_hours: f64,
}

impl CompletenessEngine {
    pub fn new(mission: Mission, config: &PlanConfig) -> PlanResult<Self> {
        let codec = DatatakeIdCodec::for_mission(mission, config)?;
        let mission_config = config.mission(mission)?;
        Ok(Self {
            mission,
            codec,
            thresholds: CompletenessThresholds::from(&config.completeness),
            time_threshold_hours: mission_config.time_threshold_hours,
        })
    }

    pub fn mission(&self) -> Mission {
        self.mission
    }

    /// Annotates every fragment of a satellite store
    pub fn annotate_store(
        &self,
        store: &mut FragmentStore,
        index: &dyn DatatakeIndex,
        now: DateTime<Utc>,
    ) -> AnnotationReport {
        let mut report = AnnotationReport::default();
        let satellite = store.satellite().to_string();
        for fragment in store.iter_mut() {
            let datatakes = index.datatakes(fragment.day, &satellite);
            if datatakes.is_none() {
                tracing::debug!("No datatakes indexed for {} on {}", satellite, fragment.day);
            }
            report.absorb(self.annotate_fragment(fragment, datatakes, now));
        }
        tracing::info!(
            "{} completeness for {}: {} annotated, {} planned, {} dropped",
            self.mission,
            satellite,
            report.annotated,
            report.planned,
            report.dropped
        );
        report
    }

    pub fn annotate_fragment(
        &self,
        fragment: &mut DayFragment,
        datatakes: Option<&HashMap<String, DatatakeRecord>>,
        now: DateTime<Utc>,
    ) -> AnnotationReport {
        let mut report = AnnotationReport::default();
        let is_future = fragment.is_future(now.date_naive());
        let satellite = fragment.satellite.clone();
        let day = fragment.day;
        let mut to_drop = HashSet::new();

        for event in fragment.events_mut() {
            let record = self
                .resolve_id(event, &satellite)
                .and_then(|id| datatakes.and_then(|table| table.get(&id)));

            match record {
                Some(record) => {
                    let status = evaluate(
                        &record.levels,
                        record.observation_time_stop,
                        now,
                        self.time_threshold_hours,
                        &self.thresholds,
                    );
                    apply_status(event, &status);
                    report.annotated += 1;
                }
                None if is_future => {
                    apply_status(event, &CompletenessStatus::planned());
                    report.planned += 1;
                }
                None => {
                    tracing::warn!(
                        "Event {} of {} on {}: no datatake found in index, dropping",
                        event.name,
                        satellite,
                        day
                    );
                    to_drop.insert(event.name.clone());
                }
            }
        }

        report.dropped = fragment.retain_events(|e| !to_drop.contains(&e.name));
        report
    }

    /// Normalizes the event's id attribute in place and returns it
    fn resolve_id(&self, event: &mut AcquisitionEvent, satellite: &str) -> Option<String> {
        let raw = event.attribute(self.codec.id_key())?.to_string();
        match self.codec.normalize(&raw, satellite) {
            Ok(id) => {
                if id != raw {
                    tracing::trace!("Datatake id {} normalized to {}", raw, id);
                    event.set_attribute(self.codec.id_key(), id.as_str());
                }
                Some(id)
            }
            Err(e) => {
                tracing::warn!("Event {}: unreadable datatake id: {}", event.name, e);
                None
            }
        }
    }
}

fn apply_status(event: &mut AcquisitionEvent, status: &CompletenessStatus) {
    for track in [Track::Acquisition, Track::Publication] {
        event.set_attribute(track.label(), status.track(track).label());
    }
    event.set_style(status.publication.state.as_str());
}
