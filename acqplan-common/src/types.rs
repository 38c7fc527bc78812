use serde::{Deserialize, Serialize};

/// Calendar key format used for day folders and fragment days
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Instant format used for event intervals
pub const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Copernicus mission family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mission {
    S1,
    S2,
    S3,
    S5,
}

impl Mission {
    pub const ALL: [Mission; 4] = [Mission::S1, Mission::S2, Mission::S3, Mission::S5];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mission::S1 => "S1",
            Mission::S2 => "S2",
            Mission::S3 => "S3",
            Mission::S5 => "S5",
        }
    }

    /// Mission of a satellite unit id, e.g. "S3A" -> S3
    pub fn from_satellite(satellite: &str) -> Option<Self> {
        satellite.get(..2).and_then(|prefix| prefix.parse().ok())
    }
}

impl std::fmt::Display for Mission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Mission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "S1" => Ok(Mission::S1),
            "S2" => Ok(Mission::S2),
            "S3" => Ok(Mission::S3),
            "S5" | "S5P" => Ok(Mission::S5),
            _ => Err(format!("Unknown mission: {}", s)),
        }
    }
}

/// Completeness track: acquisition or publication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Track {
    #[serde(rename = "ACQ")]
    Acquisition,
    #[serde(rename = "PUB")]
    Publication,
}

impl Track {
    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Acquisition => "ACQ",
            Track::Publication => "PUB",
        }
    }

    /// Attribute label carrying the formatted status of this track
    pub fn label(&self) -> &'static str {
        match self {
            Track::Acquisition => "Acquisition Status",
            Track::Publication => "Publication Status",
        }
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of a completeness track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompletenessState {
    Planned,
    Processing,
    Acquired,
    Published,
    Delayed,
    Partial,
    Lost,
}

impl CompletenessState {
    pub const ALL: [CompletenessState; 7] = [
        CompletenessState::Planned,
        CompletenessState::Processing,
        CompletenessState::Acquired,
        CompletenessState::Published,
        CompletenessState::Delayed,
        CompletenessState::Partial,
        CompletenessState::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompletenessState::Planned => "PLANNED",
            CompletenessState::Processing => "PROCESSING",
            CompletenessState::Acquired => "ACQUIRED",
            CompletenessState::Published => "PUBLISHED",
            CompletenessState::Delayed => "DELAYED",
            CompletenessState::Partial => "PARTIAL",
            CompletenessState::Lost => "LOST",
        }
    }
}

impl std::fmt::Display for CompletenessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CompletenessState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompletenessState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown completeness state: {}", s))
    }
}
