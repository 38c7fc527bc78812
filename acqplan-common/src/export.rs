///! Typed export tree
///!
///! Document -> DayFolder -> SatelliteFolder -> Event. Serialization to a
///! concrete markup happens in the backend, this tree is the contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic position: degrees, altitude in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub alt: f64,
}

impl GeoCoordinate {
    pub fn new(lon: f64, lat: f64, alt: f64) -> Self {
        Self { lon, lat, alt }
    }
}

/// Footprint of an acquisition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// Open polyline following the ground track
    LineString(Vec<GeoCoordinate>),
    /// Outer ring of a swath polygon (not repeated first vertex)
    Polygon(Vec<GeoCoordinate>),
}

impl Geometry {
    pub fn coordinates(&self) -> &[GeoCoordinate] {
        match self {
            Geometry::LineString(points) | Geometry::Polygon(points) => points,
        }
    }

    pub fn len(&self) -> usize {
        self.coordinates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates().is_empty()
    }
}

/// Rendering style bound to a completeness state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusStyle {
    pub id: String,
    /// aabbggrr
    pub line_color: String,
    pub line_width: u32,
    /// aabbggrr
    pub poly_color: String,
    pub fill: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEvent {
    pub name: String,
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Display label -> value, in insertion order
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteFolder {
    pub name: String,
    pub events: Vec<ExportEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayFolder {
    /// Day key, `%Y-%m-%d`
    pub day: String,
    pub satellites: Vec<SatelliteFolder>,
}

impl DayFolder {
    pub fn event_count(&self) -> usize {
        self.satellites.iter().map(|s| s.events.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub name: String,
    #[serde(default)]
    pub styles: Vec<StatusStyle>,
    pub folders: Vec<DayFolder>,
}

impl ExportDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            styles: Vec::new(),
            folders: Vec::new(),
        }
    }

    pub fn event_count(&self) -> usize {
        self.folders.iter().map(DayFolder::event_count).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
