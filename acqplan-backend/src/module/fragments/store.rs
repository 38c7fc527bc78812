use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use acqplan_common::DAY_FORMAT;

use super::types::DayFragment;
use crate::error::{PlanError, PlanResult};

/// Conflict rule applied when a fragment arrives for a day already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// First-write-wins: only events with an unseen name are appended.
    /// Callers feed newest sources first to make the newest plan win.
    #[default]
    KeepExisting,
    /// Stored events overlapping the incoming coverage interval are dropped
    /// before the incoming events are appended.
    ReplaceOverlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Day older than the retention horizon
    Discarded,
    Inserted { events: usize },
    Merged { added: usize, replaced: usize },
}

impl AddOutcome {
    /// Events that entered the store
    pub fn events_added(&self) -> usize {
        match self {
            AddOutcome::Discarded => 0,
            AddOutcome::Inserted { events } => *events,
            AddOutcome::Merged { added, .. } => *added,
        }
    }
}

/// Day -> fragment map for one satellite
#[derive(Debug, Clone)]
pub struct FragmentStore {
    satellite: String,
    max_age_days: i64,
    policy: MergePolicy,
    fragments: BTreeMap<NaiveDate, DayFragment>,
}

impl FragmentStore {
    pub fn new(satellite: impl Into<String>, max_age_days: i64) -> Self {
        Self {
            satellite: satellite.into(),
            max_age_days,
            policy: MergePolicy::default(),
            fragments: BTreeMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Rebuilds a store from persisted fragments, re-applying the merge rule
    pub fn restore(
        satellite: impl Into<String>,
        max_age_days: i64,
        fragments: impl IntoIterator<Item = DayFragment>,
    ) -> Self {
        let mut store = Self::new(satellite, max_age_days);
        for fragment in fragments {
            match store.fragments.get_mut(&fragment.day) {
                Some(existing) => {
                    existing.merge_from(fragment);
                }
                None => {
                    store.fragments.insert(fragment.day, fragment);
                }
            }
        }
        store
    }

    pub fn satellite(&self) -> &str {
        &self.satellite
    }

    pub fn max_age_days(&self) -> i64 {
        self.max_age_days
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub fn earliest_retained_day(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(self.max_age_days)
    }

    pub fn add_fragment(&mut self, fragment: DayFragment) -> AddOutcome {
        self.add_fragment_at(fragment, Utc::now().date_naive())
    }

    pub fn add_fragment_at(&mut self, mut fragment: DayFragment, today: NaiveDate) -> AddOutcome {
        let earliest = self.earliest_retained_day(today);
        if fragment.day < earliest {
            tracing::debug!(
                "Discarding {} fragment for {}: older than {}",
                self.satellite,
                fragment.day,
                earliest
            );
            return AddOutcome::Discarded;
        }
        if fragment.satellite != self.satellite {
            tracing::warn!(
                "Fragment for {} labelled {} added to store of {}",
                fragment.day,
                fragment.satellite,
                self.satellite
            );
            fragment.satellite = self.satellite.clone();
        }

        let Some(existing) = self.fragments.get_mut(&fragment.day) else {
            fragment.sort_events();
            let events = fragment.event_count();
            tracing::debug!("Inserted {} fragment for {} ({} events)", self.satellite, fragment.day, events);
            self.fragments.insert(fragment.day, fragment);
            return AddOutcome::Inserted { events };
        };

        let replaced = match (self.policy, fragment.coverage_interval()) {
            (MergePolicy::ReplaceOverlap, Some(coverage)) => {
                existing.retain_events(|e| !e.interval.overlaps(&coverage))
            }
            _ => 0,
        };
        let added = existing.merge_from(fragment);
        if replaced > 0 {
            existing.sort_events();
        }
        tracing::debug!(
            "Merged {} fragment for {}: {} added, {} replaced",
            self.satellite,
            existing.day,
            added,
            replaced
        );
        AddOutcome::Merged { added, replaced }
    }

    /// Removes fragments older than today - `days`
    pub fn purge(&mut self, days: i64) -> usize {
        self.purge_at(days, Utc::now().date_naive())
    }

    /// Removes fragments older than the retention horizon
    pub fn purge_expired(&mut self) -> usize {
        self.purge(self.max_age_days)
    }

    pub fn purge_at(&mut self, days: i64, today: NaiveDate) -> usize {
        let oldest = today - Duration::days(days);
        let kept = self.fragments.split_off(&oldest);
        let removed = std::mem::replace(&mut self.fragments, kept).len();
        if removed > 0 {
            tracing::info!(
                "Purged {} fragments of {} older than {}",
                removed,
                self.satellite,
                oldest.format(DAY_FORMAT)
            );
        }
        removed
    }

    pub fn get(&self, day: NaiveDate) -> PlanResult<&DayFragment> {
        self.fragments
            .get(&day)
            .ok_or_else(|| PlanError::NotFound(format!("{} {}", self.satellite, day.format(DAY_FORMAT))))
    }

    pub fn get_mut(&mut self, day: NaiveDate) -> PlanResult<&mut DayFragment> {
        let satellite = &self.satellite;
        self.fragments
            .get_mut(&day)
            .ok_or_else(|| PlanError::NotFound(format!("{} {}", satellite, day.format(DAY_FORMAT))))
    }

    /// Stored days, ascending
    pub fn day_list(&self) -> Vec<NaiveDate> {
        self.fragments.keys().copied().collect()
    }

    /// First and last stored day
    pub fn days_interval(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.fragments.keys().next()?;
        let last = self.fragments.keys().next_back()?;
        Some((*first, *last))
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.fragments.values().map(DayFragment::event_count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DayFragment> {
        self.fragments.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DayFragment> {
        self.fragments.values_mut()
    }

    /// Drops fragments left without events, returns how many
    pub fn remove_empty(&mut self) -> usize {
        let before = self.fragments.len();
        self.fragments.retain(|_, f| !f.is_empty());
        before - self.fragments.len()
    }
}
