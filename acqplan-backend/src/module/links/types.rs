use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::error::{PlanError, PlanResult};

const NAME_DATE_FORMAT: &str = "%Y%m%dT%H%M%S";

/// A plan document published for one satellite.
///
/// The validity span is read from the last two `_`-separated tokens of the
/// document name. Identity is the reference URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteLink {
    pub ref_url: String,
    pub base_url: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl SatelliteLink {
    pub fn parse(ref_url: &str, base_url: &str) -> PlanResult<Self> {
        if ref_url.starts_with("http") {
            tracing::warn!("Link {} is absolute, base {} will be ignored", ref_url, base_url);
        }
        let (start, end) = Self::parse_span(ref_url)?;
        Ok(Self {
            ref_url: ref_url.to_string(),
            base_url: base_url.to_string(),
            start,
            end,
        })
    }

    fn parse_span(ref_url: &str) -> PlanResult<(NaiveDateTime, NaiveDateTime)> {
        let path = ref_url.split(['?', '#']).next().unwrap_or(ref_url);
        let basename = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
        let stem = match basename.rsplit_once('.') {
            Some((stem, _extension)) => stem,
            None => basename,
        };

        let tokens: Vec<&str> = stem.split('_').collect();
        let [.., start_token, end_token] = tokens.as_slice() else {
            return Err(PlanError::parse(ref_url, "document name lacks two date tokens"));
        };

        let parse_token = |token: &str| {
            NaiveDateTime::parse_from_str(&token.to_uppercase(), NAME_DATE_FORMAT)
                .map_err(|e| PlanError::parse(ref_url, format!("bad date token '{}': {}", token, e)))
        };
        Ok((parse_token(start_token)?, parse_token(end_token)?))
    }

    /// Absolute URL of the document
    pub fn full_url(&self) -> String {
        if self.ref_url.starts_with("http") {
            return self.ref_url.clone();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.ref_url.trim_start_matches('/')
        )
    }

    /// Document name without directories
    pub fn name(&self) -> &str {
        self.ref_url.trim_end_matches('/').rsplit('/').next().unwrap_or(&self.ref_url)
    }
}

impl PartialEq for SatelliteLink {
    fn eq(&self, other: &Self) -> bool {
        self.ref_url == other.ref_url
    }
}

impl Eq for SatelliteLink {}

impl Hash for SatelliteLink {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ref_url.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const BASE: &str = "https://sentinels.copernicus.eu";

    fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_lowercase_tokens() {
        let link = SatelliteLink::parse(
            "/documents/d/sentinel/s1a_mp_user_20230526t174000_20230615t194000",
            BASE,
        )
        .unwrap();
        assert_eq!(link.start, datetime(2023, 5, 26, 17, 40, 0));
        assert_eq!(link.end, datetime(2023, 6, 15, 19, 40, 0));
        assert_eq!(
            link.full_url(),
            "https://sentinels.copernicus.eu/documents/d/sentinel/s1a_mp_user_20230526t174000_20230615t194000"
        );
        assert_eq!(link.name(), "s1a_mp_user_20230526t174000_20230615t194000");
    }

    #[test]
    fn test_parse_with_extension() {
        let link = SatelliteLink::parse(
            "/docs/S2B_MP_ACQ__KML_20261015T120000_20261102T150000.kml",
            BASE,
        )
        .unwrap();
        assert_eq!(link.start, datetime(2026, 10, 15, 12, 0, 0));
        assert_eq!(link.end, datetime(2026, 11, 2, 15, 0, 0));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            SatelliteLink::parse("/docs/plan_20230526t174000", BASE),
            Err(PlanError::Parse { .. })
        ));
        assert!(matches!(
            SatelliteLink::parse("/docs/s1a_mp_2023-05-26_20230615t194000", BASE),
            Err(PlanError::Parse { .. })
        ));
    }

    #[test]
    fn test_identity_is_reference_url() {
        let a = SatelliteLink::parse("/d/x_20230101t000000_20230102t000000", BASE).unwrap();
        let b = SatelliteLink::parse("/d/x_20230101t000000_20230102t000000", "https://mirror.example").unwrap();
        assert_eq!(a, b);
        let set: std::collections::HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_absolute_reference_kept() {
        let link = SatelliteLink::parse("https://host/d/x_20230101t000000_20230102t000000", BASE).unwrap();
        assert_eq!(link.full_url(), "https://host/d/x_20230101t000000_20230102t000000");
    }
}
