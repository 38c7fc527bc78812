///! Error types shared by the ingestion core

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no fragment stored for day {0}")]
    NotFound(String),

    #[error("failed to parse '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid interval: end {end} precedes start {start}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("orbit propagation failed: {0}")]
    Propagation(String),

    #[error("malformed plan document: {0}")]
    Document(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlanError {
    pub fn parse(input: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        PlanError::Parse {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        PlanError::Config(message.into())
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
