use acqplan_common::Mission;

use crate::config::{IdDecoding, PlanConfig};
use crate::error::{PlanError, PlanResult};

/// Maps datatake ids found in plan documents to index keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatatakeIdCodec {
    id_key: String,
    decoding: IdDecoding,
}

impl DatatakeIdCodec {
    pub fn new(id_key: impl Into<String>, decoding: IdDecoding) -> Self {
        Self {
            id_key: id_key.into(),
            decoding,
        }
    }

    /// Fails with a configuration error for an unconfigured mission
    pub fn for_mission(mission: Mission, config: &PlanConfig) -> PlanResult<Self> {
        let mission_config = config.mission(mission).map_err(|_| {
            PlanError::config(format!(
                "no datatake id attribute configured for mission {}",
                mission
            ))
        })?;
        Ok(Self::new(&mission_config.datatake_id_key, mission_config.id_decoding))
    }

    /// Attribute carrying the id on events
    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    pub fn decode(&self, raw: &str) -> PlanResult<String> {
        let raw = raw.trim();
        match self.decoding {
            IdDecoding::Identity => Ok(raw.to_string()),
            IdDecoding::Hex => u128::from_str_radix(raw.trim_start_matches("0x"), 16)
                .map(|value| value.to_string())
                .map_err(|e| PlanError::parse(raw, e)),
        }
    }

    /// Index key for a raw id: ids already carrying the satellite prefix are
    /// kept, others are decoded and prefixed with "<satellite>-".
    pub fn normalize(&self, raw: &str, satellite: &str) -> PlanResult<String> {
        let raw = raw.trim();
        if raw.starts_with(satellite) {
            return Ok(raw.to_string());
        }
        Ok(format!("{}-{}", satellite, self.decode(raw)?))
    }
}
