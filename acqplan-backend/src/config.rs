use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use acqplan_common::Mission;

use crate::error::{PlanError, PlanResult};
use crate::module::fragments::MergePolicy;

/// Where a mission's acquisition plans come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// Plan documents published on a link page
    Documents,
    /// Footprints computed from orbital elements and the datatake index
    Orbit,
}

/// Folder layout of a mission's plan documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentLayout {
    /// Document -> Folder(day) -> Folder(satellite) -> Placemarks
    DayFolders,
    /// Document -> Folder(satellite) -> Folder(mode) -> Placemarks
    ModeFolders,
}

/// Decoding applied to a raw datatake id read from a plan document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdDecoding {
    Identity,
    /// Hexadecimal id, rendered in decimal
    Hex,
}

/// Product-level markers: a product key containing any marker of a level
/// contributes to that level's completeness
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelIds {
    #[serde(default)]
    pub l0: Vec<String>,
    #[serde(default)]
    pub l1: Vec<String>,
    #[serde(default)]
    pub l2: Vec<String>,
}

impl LevelIds {
    fn from_markers(l0: &[&str], l1: &[&str], l2: &[&str]) -> Self {
        let owned = |markers: &[&str]| markers.iter().map(|m| m.to_string()).collect();
        Self {
            l0: owned(l0),
            l1: owned(l1),
            l2: owned(l2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConfig {
    pub satellites: Vec<String>,

    pub source: PlanSource,

    /// Attribute carrying the datatake id in plan documents
    pub datatake_id_key: String,

    #[serde(default = "default_id_decoding")]
    pub id_decoding: IdDecoding,

    /// Hours after sensing stop before a datatake is expected complete
    pub time_threshold_hours: f64,

    #[serde(default = "default_layout")]
    pub layout: DocumentLayout,

    #[serde(default)]
    pub link_page_url: Option<String>,

    /// Satellite id -> class of the page div listing its documents
    #[serde(default)]
    pub link_divs: BTreeMap<String, String>,

    #[serde(default)]
    pub level_ids: LevelIds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteConfig {
    pub norad_id: u32,

    #[serde(default)]
    pub swath_width_km: Option<f64>,

    /// Element set read when the network source fails
    #[serde(default)]
    pub tle_fallback: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    #[serde(default = "default_propagation_step_secs")]
    pub propagation_step_secs: i64,

    /// Footprint profile name, see `ProfileRegistry`
    #[serde(default = "default_profile")]
    pub profile: String,

    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    #[serde(default = "default_true")]
    pub perform_initial_run: bool,

    /// `{norad_id}` is replaced by the catalog number
    #[serde(default = "default_tle_url_template")]
    pub tle_url_template: String,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub merge_policy: MergePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessConfig {
    #[serde(default = "default_completeness_threshold")]
    pub completeness_threshold: f64,

    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: f64,

    /// Multiplier of the mission time threshold bounding the DELAYED window
    #[serde(default = "default_delay_factor")]
    pub delay_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub completeness: CompletenessConfig,

    #[serde(default = "default_missions")]
    pub missions: BTreeMap<String, MissionConfig>,

    #[serde(default = "default_satellites")]
    pub satellites: BTreeMap<String, SatelliteConfig>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_retention_days() -> i64 {
    15
}

fn default_propagation_step_secs() -> i64 {
    90
}

fn default_profile() -> String {
    "Polygon".to_string()
}

fn default_interval_minutes() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_tle_url_template() -> String {
    "https://celestrak.org/NORAD/elements/gp.php?CATNR={norad_id}&FORMAT=TLE".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_completeness_threshold() -> f64 {
    90.0
}

fn default_failure_threshold() -> f64 {
    10.0
}

fn default_delay_factor() -> f64 {
    1.2
}

fn default_id_decoding() -> IdDecoding {
    IdDecoding::Identity
}

fn default_layout() -> DocumentLayout {
    DocumentLayout::DayFolders
}

fn default_missions() -> BTreeMap<String, MissionConfig> {
    let mut missions = BTreeMap::new();
    missions.insert(
        "S1".to_string(),
        MissionConfig {
            satellites: vec!["S1A".to_string()],
            source: PlanSource::Documents,
            datatake_id_key: "DatatakeId".to_string(),
            id_decoding: IdDecoding::Hex,
            time_threshold_hours: 8.0,
            layout: DocumentLayout::DayFolders,
            link_page_url: Some(
                "https://sentinels.copernicus.eu/web/sentinel/copernicus/sentinel-1/acquisition-plans"
                    .to_string(),
            ),
            link_divs: BTreeMap::from([("S1A".to_string(), "sentinel-1a".to_string())]),
            level_ids: LevelIds::from_markers(
                &["_0C_", "_0S_", "_0A_", "_0N_"],
                &["_1A_", "_1S_"],
                &["_2A_", "_2S_"],
            ),
        },
    );
    missions.insert(
        "S2".to_string(),
        MissionConfig {
            satellites: vec!["S2A".to_string(), "S2B".to_string()],
            source: PlanSource::Documents,
            datatake_id_key: "ID".to_string(),
            id_decoding: IdDecoding::Identity,
            time_threshold_hours: 10.0,
            layout: DocumentLayout::ModeFolders,
            link_page_url: Some(
                "https://sentinels.copernicus.eu/web/sentinel/copernicus/sentinel-2/acquisition-plans"
                    .to_string(),
            ),
            link_divs: BTreeMap::from([
                ("S2A".to_string(), "sentinel-2a".to_string()),
                ("S2B".to_string(), "sentinel-2b".to_string()),
            ]),
            level_ids: LevelIds::from_markers(&["L0_"], &["L1B_", "L1C_"], &["L2A_", "_2S_"]),
        },
    );
    missions.insert(
        "S3".to_string(),
        MissionConfig {
            satellites: vec!["S3A".to_string(), "S3B".to_string()],
            source: PlanSource::Orbit,
            datatake_id_key: "DatatakeId".to_string(),
            id_decoding: IdDecoding::Identity,
            time_threshold_hours: 696.0,
            layout: DocumentLayout::DayFolders,
            link_page_url: None,
            link_divs: BTreeMap::new(),
            level_ids: LevelIds::from_markers(&["L0_"], &["L1_"], &["L2_"]),
        },
    );
    missions.insert(
        "S5".to_string(),
        MissionConfig {
            satellites: vec!["S5P".to_string()],
            source: PlanSource::Orbit,
            datatake_id_key: "DatatakeId".to_string(),
            id_decoding: IdDecoding::Identity,
            time_threshold_hours: 48.0,
            layout: DocumentLayout::DayFolders,
            link_page_url: None,
            link_divs: BTreeMap::new(),
            level_ids: LevelIds::from_markers(&["L0_"], &["L1B"], &["L2_"]),
        },
    );
    missions
}

fn default_satellites() -> BTreeMap<String, SatelliteConfig> {
    let entry = |norad_id: u32, swath_width_km: Option<f64>, fallback: Option<&str>| SatelliteConfig {
        norad_id,
        swath_width_km,
        tle_fallback: fallback.map(PathBuf::from),
    };
    BTreeMap::from([
        ("S1A".to_string(), entry(39634, None, None)),
        ("S2A".to_string(), entry(40697, None, None)),
        ("S2B".to_string(), entry(42063, None, None)),
        ("S3A".to_string(), entry(41335, Some(1270.0), Some("data/tle/S3A_20231012.tle"))),
        ("S3B".to_string(), entry(43437, Some(1270.0), Some("data/tle/S3B_20231017.tle"))),
        ("S5P".to_string(), entry(42969, Some(2600.0), Some("data/tle/S5P_20231017.tle"))),
    ])
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            propagation_step_secs: default_propagation_step_secs(),
            profile: default_profile(),
            interval_minutes: default_interval_minutes(),
            perform_initial_run: true,
            tle_url_template: default_tle_url_template(),
            http_timeout_secs: default_http_timeout_secs(),
            merge_policy: MergePolicy::default(),
        }
    }
}

impl Default for CompletenessConfig {
    fn default() -> Self {
        Self {
            completeness_threshold: default_completeness_threshold(),
            failure_threshold: default_failure_threshold(),
            delay_factor: default_delay_factor(),
        }
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            data_dir: default_data_dir(),
            ingestion: IngestionConfig::default(),
            completeness: CompletenessConfig::default(),
            missions: default_missions(),
            satellites: default_satellites(),
        }
    }
}

impl PlanConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file {}", path))?;
        let config: PlanConfig = toml::from_str(&content)
            .context(format!("Failed to parse config file {}", path))?;
        config
            .validate()
            .context(format!("Invalid configuration in {}", path))?;
        Ok(config)
    }

    /// Cross-checks missions against satellites
    pub fn validate(&self) -> PlanResult<()> {
        for (name, mission) in &self.missions {
            name.parse::<Mission>().map_err(PlanError::Config)?;
            for satellite in &mission.satellites {
                let sat = self.satellite(satellite)?;
                if mission.source == PlanSource::Orbit && sat.swath_width_km.is_none() {
                    return Err(PlanError::config(format!(
                        "orbit-sourced satellite {} has no swath width",
                        satellite
                    )));
                }
            }
            if mission.source == PlanSource::Documents && mission.link_page_url.is_none() {
                return Err(PlanError::config(format!(
                    "document-sourced mission {} has no link page",
                    name
                )));
            }
        }
        if self.ingestion.propagation_step_secs <= 0 {
            return Err(PlanError::config("propagation step must be positive"));
        }
        Ok(())
    }

    pub fn mission(&self, mission: Mission) -> PlanResult<&MissionConfig> {
        self.missions
            .get(mission.as_str())
            .ok_or_else(|| PlanError::config(format!("mission {} is not configured", mission)))
    }

    pub fn satellite(&self, satellite: &str) -> PlanResult<&SatelliteConfig> {
        self.satellites
            .get(satellite)
            .ok_or_else(|| PlanError::config(format!("satellite {} is not configured", satellite)))
    }

    /// Configured missions, in mission order
    pub fn configured_missions(&self) -> Vec<Mission> {
        Mission::ALL
            .into_iter()
            .filter(|m| self.missions.contains_key(m.as_str()))
            .collect()
    }

    pub fn fragments_dir(&self) -> PathBuf {
        self.data_dir.join("fragments")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    /// JSON export of the datatake index, refreshed by the production side
    pub fn datatake_index_path(&self) -> PathBuf {
        self.data_dir.join("datatakes.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file_errors_name_the_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");
        let missing = missing.to_str().unwrap();
        let err = PlanConfig::from_file(missing).unwrap_err();
        assert!(format!("{:#}", err).contains(missing));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "log_level = [").unwrap();
        let broken = broken.to_str().unwrap();
        let err = PlanConfig::from_file(broken).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
        assert!(format!("{:#}", err).contains(broken));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = PlanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.configured_missions(), Mission::ALL.to_vec());
        assert_eq!(config.mission(Mission::S3).unwrap().time_threshold_hours, 696.0);
        assert_eq!(config.satellite("S5P").unwrap().swath_width_km, Some(2600.0));
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: PlanConfig = toml::from_str("").unwrap();
        assert_eq!(config.ingestion.retention_days, 15);
        assert_eq!(config.ingestion.propagation_step_secs, 90);
        assert_eq!(config.completeness.completeness_threshold, 90.0);
        assert_eq!(config.mission(Mission::S1).unwrap().id_decoding, IdDecoding::Hex);
    }

    #[test]
    fn test_partial_override() {
        let text = r#"
            log_level = "debug"

            [ingestion]
            retention_days = 3
            profile = "Line"

            [missions.S5]
            satellites = ["S5P"]
            source = "orbit"
            datatake_id_key = "DatatakeId"
            time_threshold_hours = 48
        "#;
        let config: PlanConfig = toml::from_str(text).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.ingestion.retention_days, 3);
        assert_eq!(config.ingestion.propagation_step_secs, 90);
        assert_eq!(config.configured_missions(), vec![Mission::S5]);
        assert!(matches!(config.mission(Mission::S1), Err(PlanError::Config(_))));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shipped_config() {
        let config: PlanConfig = toml::from_str(include_str!("../../config.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.ingestion.merge_policy, MergePolicy::KeepExisting);
        assert_eq!(config.exports_dir(), PathBuf::from("data/exports"));
        assert_eq!(config.configured_missions(), Mission::ALL.to_vec());
    }

    #[test]
    fn test_unknown_satellite_is_config_error() {
        let config = PlanConfig::default();
        assert!(matches!(config.satellite("S9Z"), Err(PlanError::Config(_))));
    }
}
