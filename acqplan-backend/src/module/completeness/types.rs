use acqplan_common::{CompletenessState, Track};
use serde::{Deserialize, Serialize};

/// State and percentage of one track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackStatus {
    pub state: CompletenessState,
    pub percentage: f64,
}

impl TrackStatus {
    pub fn new(state: CompletenessState, percentage: f64) -> Self {
        Self { state, percentage }
    }

    pub fn planned() -> Self {
        Self::new(CompletenessState::Planned, 0.0)
    }

    /// "<STATE> (<pp.pp>%)"
    pub fn label(&self) -> String {
        format!("{} ({:.2}%)", self.state, self.percentage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletenessStatus {
    #[serde(rename = "ACQ")]
    pub acquisition: TrackStatus,
    #[serde(rename = "PUB")]
    pub publication: TrackStatus,
}

impl CompletenessStatus {
    pub fn planned() -> Self {
        Self {
            acquisition: TrackStatus::planned(),
            publication: TrackStatus::planned(),
        }
    }

    pub fn track(&self, track: Track) -> &TrackStatus {
        match track {
            Track::Acquisition => &self.acquisition,
            Track::Publication => &self.publication,
        }
    }
}
