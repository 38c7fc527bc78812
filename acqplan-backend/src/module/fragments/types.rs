use acqplan_common::{Geometry, INSTANT_FORMAT};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Named value carried by an event (plan document extended data)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub name: String,
    pub value: String,
}

/// One acquisition inside a day fragment. Identity is the name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionEvent {
    pub name: String,
    pub interval: TimeInterval,
    /// In document order
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
    /// Style tag, the publication state name once annotated
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

impl AcquisitionEvent {
    pub fn new(name: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            interval: TimeInterval::new(start, end),
            attributes: Vec::new(),
            style: None,
            geometry: None,
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Updates the attribute in place, or appends it
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(EventAttribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn set_style(&mut self, style: impl Into<String>) {
        self.style = Some(style.into());
    }

    pub fn start_str(&self) -> String {
        self.interval.start.format(INSTANT_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.interval.end.format(INSTANT_FORMAT).to_string()
    }
}

/// Events of one satellite for one day.
///
/// Events are unique by name and kept sorted by interval end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayFragment {
    pub day: NaiveDate,
    pub satellite: String,
    pub(super) events: Vec<AcquisitionEvent>,
}

impl DayFragment {
    /// Builds a fragment; later duplicates of a name are dropped
    pub fn new(day: NaiveDate, satellite: impl Into<String>, events: Vec<AcquisitionEvent>) -> Self {
        let mut fragment = Self {
            day,
            satellite: satellite.into(),
            events: Vec::with_capacity(events.len()),
        };
        for event in events {
            if !fragment.contains(&event.name) {
                fragment.events.push(event);
            }
        }
        fragment.sort_events();
        fragment
    }

    pub fn events(&self) -> &[AcquisitionEvent] {
        &self.events
    }

    pub fn events_mut(&mut self) -> impl Iterator<Item = &mut AcquisitionEvent> {
        self.events.iter_mut()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.name == name)
    }

    pub fn event(&self, name: &str) -> Option<&AcquisitionEvent> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Appends the events of `other` whose name is not present yet.
    /// Returns the number of events added.
    pub fn merge_from(&mut self, other: DayFragment) -> usize {
        let mut added = 0;
        for event in other.events {
            if self.contains(&event.name) {
                tracing::trace!("Event {} already present for {}", event.name, self.day);
                continue;
            }
            self.events.push(event);
            added += 1;
        }
        if added > 0 {
            self.sort_events();
        }
        added
    }

    /// Stable sort by interval end
    pub fn sort_events(&mut self) {
        self.events.sort_by_key(|e| e.interval.end);
    }

    /// Keeps the events matching `keep`, returns how many were removed
    pub fn retain_events<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&AcquisitionEvent) -> bool,
    {
        let before = self.events.len();
        self.events.retain(keep);
        before - self.events.len()
    }

    /// Earliest start to latest end of the contained events
    pub fn coverage_interval(&self) -> Option<TimeInterval> {
        let start = self.events.iter().map(|e| e.interval.start).min()?;
        let end = self.events.iter().map(|e| e.interval.end).max()?;
        Some(TimeInterval::new(start, end))
    }

    /// True when the day lies strictly after `today`
    pub fn is_future(&self, today: NaiveDate) -> bool {
        self.day > today
    }

    pub fn event_names(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.name.as_str()).collect()
    }
}
