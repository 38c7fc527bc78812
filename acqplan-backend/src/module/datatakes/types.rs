use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::LevelIds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingLevel {
    L0,
    L1,
    L2,
}

impl ProcessingLevel {
    /// Attribute key carrying the level percentage on events
    pub fn attribute_key(&self) -> &'static str {
        match self {
            ProcessingLevel::L0 => "L0_",
            ProcessingLevel::L1 => "L1_",
            ProcessingLevel::L2 => "L2_",
        }
    }

    /// Level of a product, by the first level whose marker it contains
    pub fn classify(product_level: &str, ids: &LevelIds) -> Option<Self> {
        let matches = |markers: &[String]| markers.iter().any(|m| product_level.contains(m.as_str()));
        if matches(&ids.l0) {
            Some(ProcessingLevel::L0)
        } else if matches(&ids.l1) {
            Some(ProcessingLevel::L1)
        } else if matches(&ids.l2) {
            Some(ProcessingLevel::L2)
        } else {
            None
        }
    }
}

/// Completion of one product type of a datatake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCompleteness {
    pub product_level: String,
    #[serde(default)]
    pub percentage: Option<f64>,
}

/// Per-level completion percentages (0-100), any may be absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelCompleteness {
    #[serde(rename = "L0_", default, skip_serializing_if = "Option::is_none")]
    pub l0: Option<f64>,
    #[serde(rename = "L1_", default, skip_serializing_if = "Option::is_none")]
    pub l1: Option<f64>,
    #[serde(rename = "L2_", default, skip_serializing_if = "Option::is_none")]
    pub l2: Option<f64>,
}

impl LevelCompleteness {
    /// Averages product percentages per level. Products without a
    /// percentage or matching no level are ignored.
    pub fn from_products(products: &[ProductCompleteness], ids: &LevelIds) -> Self {
        let mut sums = [(0.0_f64, 0_u32); 3];
        for product in products {
            let Some(percentage) = product.percentage else {
                continue;
            };
            let slot = match ProcessingLevel::classify(&product.product_level, ids) {
                Some(ProcessingLevel::L0) => 0,
                Some(ProcessingLevel::L1) => 1,
                Some(ProcessingLevel::L2) => 2,
                None => continue,
            };
            sums[slot].0 += percentage;
            sums[slot].1 += 1;
        }
        let average = |(sum, count): (f64, u32)| (count > 0).then(|| sum / f64::from(count));
        Self {
            l0: average(sums[0]),
            l1: average(sums[1]),
            l2: average(sums[2]),
        }
    }

    pub fn get(&self, level: ProcessingLevel) -> Option<f64> {
        match level {
            ProcessingLevel::L0 => self.l0,
            ProcessingLevel::L1 => self.l1,
            ProcessingLevel::L2 => self.l2,
        }
    }

    /// Present levels in L0, L1, L2 order
    pub fn present(&self) -> Vec<(ProcessingLevel, f64)> {
        [ProcessingLevel::L0, ProcessingLevel::L1, ProcessingLevel::L2]
            .into_iter()
            .filter_map(|level| self.get(level).map(|value| (level, value)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.l0.is_none() && self.l1.is_none() && self.l2.is_none()
    }
}

/// One upstream production record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatatakeRecord {
    pub datatake_id: String,
    pub satellite_unit: String,
    pub observation_time_start: DateTime<Utc>,
    pub observation_time_stop: DateTime<Utc>,
    #[serde(default)]
    pub levels: LevelCompleteness,
    /// Raw product rows; folded into `levels` when those are absent
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<ProductCompleteness>,
    /// Mission attributes (instrument_mode, absolute_orbit, ...)
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl DatatakeRecord {
    pub fn resolve_levels(&mut self, ids: &LevelIds) {
        if self.levels.is_empty() && !self.products.is_empty() {
            self.levels = LevelCompleteness::from_products(&self.products, ids);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s5_ids() -> LevelIds {
        LevelIds {
            l0: vec!["L0_".to_string()],
            l1: vec!["L1B".to_string()],
            l2: vec!["L2_".to_string()],
        }
    }

    fn product(level: &str, percentage: Option<f64>) -> ProductCompleteness {
        ProductCompleteness {
            product_level: level.to_string(),
            percentage,
        }
    }

    #[test]
    fn test_level_averages() {
        let products = vec![
            product("L0_", Some(100.0)),
            product("L1B", Some(80.0)),
            product("L1B", Some(60.0)),
            product("L1B", None),
            product("AUX", Some(1.0)),
        ];
        let levels = LevelCompleteness::from_products(&products, &s5_ids());
        assert_eq!(levels.l0, Some(100.0));
        assert_eq!(levels.l1, Some(70.0));
        assert_eq!(levels.l2, None);
        assert_eq!(levels.present().len(), 2);
    }

    #[test]
    fn test_classify_first_matching_level() {
        let ids = LevelIds {
            l0: vec!["_0C_".to_string(), "_0S_".to_string()],
            l1: vec!["_1S_".to_string()],
            l2: vec!["_2S_".to_string()],
        };
        assert_eq!(ProcessingLevel::classify("IW_RAW__0S_", &ids), Some(ProcessingLevel::L0));
        assert_eq!(ProcessingLevel::classify("IW_SLC__1S_", &ids), Some(ProcessingLevel::L1));
        assert_eq!(ProcessingLevel::classify("AUX_POEORB", &ids), None);
    }

    #[test]
    fn test_record_json() {
        let json = r#"{
            "datatake_id": "S5P-30912",
            "satellite_unit": "S5P",
            "observation_time_start": "2026-10-17T01:00:00Z",
            "observation_time_stop": "2026-10-17T02:40:00Z",
            "products": [{"product_level": "L0_", "percentage": 100.0}],
            "fields": {"absolute_orbit": "30912"}
        }"#;
        let mut record: DatatakeRecord = serde_json::from_str(json).unwrap();
        assert!(record.levels.is_empty());
        record.resolve_levels(&s5_ids());
        assert_eq!(record.levels.l0, Some(100.0));
        assert_eq!(record.fields["absolute_orbit"], "30912");
    }
}
