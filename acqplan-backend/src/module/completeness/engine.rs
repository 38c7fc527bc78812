use acqplan_common::CompletenessState;
use chrono::{DateTime, Utc};

use super::types::{CompletenessStatus, TrackStatus};
use crate::config::CompletenessConfig;
use crate::module::datatakes::LevelCompleteness;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletenessThresholds {
    /// Percentage above which a track counts as complete
    pub completeness: f64,
    /// Percentage below which a track counts as lost
    pub failure: f64,
    pub delay_factor: f64,
}

impl Default for CompletenessThresholds {
    fn default() -> Self {
        Self {
            completeness: 90.0,
            failure: 10.0,
            delay_factor: 1.2,
        }
    }
}

impl From<&CompletenessConfig> for CompletenessThresholds {
    fn from(config: &CompletenessConfig) -> Self {
        Self {
            completeness: config.completeness_threshold,
            failure: config.failure_threshold,
            delay_factor: config.delay_factor,
        }
    }
}

/// Evaluates the ACQ and PUB tracks of a datatake.
///
/// # Arguments
/// * `levels` - per-level completion percentages
/// * `sensing_stop` - end of the observation
/// * `now` - evaluation instant
/// * `time_threshold_hours` - mission delay after which data is expected
pub fn evaluate(
    levels: &LevelCompleteness,
    sensing_stop: DateTime<Utc>,
    now: DateTime<Utc>,
    time_threshold_hours: f64,
    thresholds: &CompletenessThresholds,
) -> CompletenessStatus {
    if now <= sensing_stop {
        return CompletenessStatus::planned();
    }

    let present = levels.present();
    let mut acq = present.first().map(|(_, value)| *value).unwrap_or(0.0);
    let publication = if present.is_empty() {
        0.0
    } else {
        present.iter().map(|(_, value)| value).sum::<f64>() / present.len() as f64
    };
    // Publication cannot exceed acquisition
    if acq < publication {
        acq = publication;
    }

    let elapsed_hours = (now - sensing_stop).num_milliseconds() as f64 / 3_600_000.0;

    if elapsed_hours < time_threshold_hours {
        let acq_state = if acq > thresholds.completeness {
            CompletenessState::Acquired
        } else {
            CompletenessState::Processing
        };
        let pub_state = if publication > thresholds.completeness {
            CompletenessState::Published
        } else {
            CompletenessState::Processing
        };
        return CompletenessStatus {
            acquisition: TrackStatus::new(acq_state, acq),
            publication: TrackStatus::new(pub_state, publication),
        };
    }

    if elapsed_hours < time_threshold_hours * thresholds.delay_factor
        && publication < thresholds.completeness
    {
        let acq_state = if acq > thresholds.completeness {
            CompletenessState::Acquired
        } else {
            CompletenessState::Delayed
        };
        return CompletenessStatus {
            acquisition: TrackStatus::new(acq_state, acq),
            publication: TrackStatus::new(CompletenessState::Delayed, publication),
        };
    }

    let settle = |percentage: f64, complete: CompletenessState| {
        if percentage >= thresholds.completeness {
            complete
        } else if percentage >= thresholds.failure {
            CompletenessState::Partial
        } else {
            CompletenessState::Lost
        }
    };
    CompletenessStatus {
        acquisition: TrackStatus::new(settle(acq, CompletenessState::Acquired), acq),
        publication: TrackStatus::new(settle(publication, CompletenessState::Published), publication),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const T_HOURS: f64 = 10.0;

    fn stop() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 6, 0, 0).unwrap()
    }

    fn levels(l0: Option<f64>, l1: Option<f64>, l2: Option<f64>) -> LevelCompleteness {
        LevelCompleteness { l0, l1, l2 }
    }

    fn states(status: &CompletenessStatus) -> (CompletenessState, CompletenessState) {
        (status.acquisition.state, status.publication.state)
    }

    fn run(levels: &LevelCompleteness, elapsed: Duration) -> CompletenessStatus {
        evaluate(levels, stop(), stop() + elapsed, T_HOURS, &CompletenessThresholds::default())
    }

    #[test]
    fn test_planned_before_sensing_stop() {
        let status = run(&levels(Some(100.0), None, None), Duration::seconds(-1));
        assert_eq!(status, CompletenessStatus::planned());
        // Boundary: now == stop is still planned
        assert_eq!(run(&levels(Some(100.0), None, None), Duration::zero()), CompletenessStatus::planned());
    }

    #[test]
    fn test_complete_within_threshold() {
        let status = run(&levels(Some(95.0), None, None), Duration::hours(5));
        assert_eq!(states(&status), (CompletenessState::Acquired, CompletenessState::Published));
        assert_eq!(status.acquisition.percentage, 95.0);
    }

    #[test]
    fn test_processing_within_threshold() {
        let status = run(&levels(Some(90.0), Some(40.0), None), Duration::hours(2));
        // Exactly 90 is not above the threshold
        assert_eq!(states(&status), (CompletenessState::Processing, CompletenessState::Processing));
        assert_eq!(status.publication.percentage, 65.0);
    }

    #[test]
    fn test_delayed_window() {
        let status = run(&levels(Some(50.0), None, None), Duration::hours(11));
        assert_eq!(states(&status), (CompletenessState::Delayed, CompletenessState::Delayed));

        let status = run(&levels(Some(100.0), Some(60.0), Some(60.0)), Duration::hours(11));
        assert_eq!(states(&status), (CompletenessState::Acquired, CompletenessState::Delayed));
    }

    #[test]
    fn test_settled_states() {
        let lost = run(&levels(Some(5.0), None, None), Duration::hours(30));
        assert_eq!(states(&lost), (CompletenessState::Lost, CompletenessState::Lost));

        let partial = run(&levels(Some(50.0), None, None), Duration::hours(30));
        assert_eq!(states(&partial), (CompletenessState::Partial, CompletenessState::Partial));

        let done = run(&levels(Some(90.0), Some(90.0), None), Duration::hours(30));
        assert_eq!(states(&done), (CompletenessState::Acquired, CompletenessState::Published));

        let boundary = run(&levels(Some(10.0), None, None), Duration::hours(30));
        assert_eq!(boundary.acquisition.state, CompletenessState::Partial);
    }

    #[test]
    fn test_complete_publication_skips_delay() {
        let status = run(&levels(Some(95.0), Some(95.0), None), Duration::hours(11));
        assert_eq!(states(&status), (CompletenessState::Acquired, CompletenessState::Published));
    }

    #[test]
    fn test_no_levels_is_zero() {
        let status = run(&LevelCompleteness::default(), Duration::hours(30));
        assert_eq!(status.acquisition.percentage, 0.0);
        assert_eq!(states(&status), (CompletenessState::Lost, CompletenessState::Lost));
    }

    #[test]
    fn test_acquisition_raised_to_publication() {
        let status = run(&levels(Some(20.0), Some(100.0), Some(100.0)), Duration::hours(30));
        let expected = (20.0 + 100.0 + 100.0) / 3.0;
        assert!((status.publication.percentage - expected).abs() < 1e-9);
        assert_eq!(status.acquisition.percentage, status.publication.percentage);
    }
}
