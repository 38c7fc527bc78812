use acqplan_common::Mission;
use serde::Serialize;

/// Result of one unit of ingestion work
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Success { events: usize },
    Skipped { reason: String },
    Failed { error: String },
}

/// One satellite-level step of a run: a link page, a document, a day of
/// orbit footprints, an annotation or a persist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitOutcome {
    pub mission: Mission,
    pub satellite: String,
    pub unit: String,
    #[serde(flatten)]
    pub status: UnitStatus,
}

impl UnitOutcome {
    pub fn success(mission: Mission, satellite: &str, unit: impl Into<String>, events: usize) -> Self {
        Self::with_status(mission, satellite, unit, UnitStatus::Success { events })
    }

    pub fn skipped(mission: Mission, satellite: &str, unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with_status(mission, satellite, unit, UnitStatus::Skipped { reason: reason.into() })
    }

    pub fn failed(
        mission: Mission,
        satellite: &str,
        unit: impl Into<String>,
        error: impl std::fmt::Display,
    ) -> Self {
        Self::with_status(mission, satellite, unit, UnitStatus::Failed { error: error.to_string() })
    }

    fn with_status(mission: Mission, satellite: &str, unit: impl Into<String>, status: UnitStatus) -> Self {
        Self {
            mission,
            satellite: satellite.to_string(),
            unit: unit.into(),
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, UnitStatus::Success { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, UnitStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<UnitOutcome>,
    pub duration_seconds: f64,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: UnitOutcome) {
        match &outcome.status {
            UnitStatus::Success { events } => tracing::debug!(
                "{}/{} {}: {} events",
                outcome.mission,
                outcome.satellite,
                outcome.unit,
                events
            ),
            UnitStatus::Skipped { reason } => tracing::info!(
                "{}/{} {} skipped: {}",
                outcome.mission,
                outcome.satellite,
                outcome.unit,
                reason
            ),
            UnitStatus::Failed { error } => tracing::error!(
                "{}/{} {} failed: {}",
                outcome.mission,
                outcome.satellite,
                outcome.unit,
                error
            ),
        }
        self.outcomes.push(outcome);
    }

    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.successful() - self.failed()
    }

    pub fn for_satellite<'a>(&'a self, satellite: &'a str) -> impl Iterator<Item = &'a UnitOutcome> + 'a {
        self.outcomes.iter().filter(move |o| o.satellite == satellite)
    }
}
