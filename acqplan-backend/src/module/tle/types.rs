use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};

/// One element set, used for exactly one propagation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrbitalElements {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

impl OrbitalElements {
    /// Parses a two- or three-line element set. Blank lines are ignored;
    /// without a title line the satellite id is used as the name.
    pub fn parse(text: &str, satellite: &str) -> PlanResult<Self> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty())
            .collect();

        let (name, line1, line2) = match lines.as_slice() {
            [l1, l2] => (satellite.to_string(), *l1, *l2),
            [title, l1, l2, ..] => (title.trim().trim_start_matches("0 ").to_string(), *l1, *l2),
            _ => {
                return Err(PlanError::parse(
                    satellite,
                    format!("expected 2 or 3 element lines, found {}", lines.len()),
                ))
            }
        };

        if !line1.starts_with("1 ") || !line2.starts_with("2 ") {
            return Err(PlanError::parse(satellite, "element lines must start with '1 ' and '2 '"));
        }

        let elements = Self {
            name,
            line1: line1.trim().to_string(),
            line2: line2.trim().to_string(),
        };
        // Reject sets SGP4 cannot read before they reach a propagation run
        elements.to_sgp4()?;
        Ok(elements)
    }

    pub fn to_sgp4(&self) -> PlanResult<sgp4::Elements> {
        sgp4::Elements::from_tle(
            Some(self.name.clone()),
            self.line1.as_bytes(),
            self.line2.as_bytes(),
        )
        .map_err(|e| PlanError::parse(&self.name, e))
    }

    /// Catalog number from line 1
    pub fn norad_id(&self) -> Option<u32> {
        self.line1.get(2..7).and_then(|s| s.trim().parse().ok())
    }

    pub fn epoch(&self) -> PlanResult<NaiveDateTime> {
        Ok(self.to_sgp4()?.datetime)
    }
}

impl std::fmt::Display for OrbitalElements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", self.line1)?;
        write!(f, "{}", self.line2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const LINE1: &str = "1 41335U 16011A   23285.50000000  .00000042  00000+0  34567-4 0  9994";
    const LINE2: &str = "2 41335  98.6250 350.1234 0001150  90.1234 270.0000 14.26735600395002";

    #[test]
    fn test_parse_three_lines() {
        let text = format!("SENTINEL-3A\n{}\n{}\n", LINE1, LINE2);
        let elements = OrbitalElements::parse(&text, "S3A").unwrap();
        assert_eq!(elements.name, "SENTINEL-3A");
        assert_eq!(elements.norad_id(), Some(41335));

        let epoch = elements.epoch().unwrap();
        assert_eq!((epoch.year(), epoch.month(), epoch.day()), (2023, 10, 12));
        assert_eq!(epoch.hour(), 12);
    }

    #[test]
    fn test_parse_two_lines_uses_satellite_id() {
        let text = format!("\n{}\r\n{}\r\n", LINE1, LINE2);
        let elements = OrbitalElements::parse(&text, "S3A").unwrap();
        assert_eq!(elements.name, "S3A");
        assert_eq!(elements.line2, LINE2);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            OrbitalElements::parse("<html>rate limited</html>", "S3A"),
            Err(PlanError::Parse { .. })
        ));
        let swapped = format!("{}\n{}", LINE2, LINE1);
        assert!(OrbitalElements::parse(&swapped, "S3A").is_err());
    }
}
