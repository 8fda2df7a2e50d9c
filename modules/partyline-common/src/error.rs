use thiserror::Error;

use crate::types::Pillar;

#[derive(Error, Debug)]
pub enum PartylineError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// A snapshot that broke one of its structural invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotViolation {
    #[error("{pillar} score {score} is outside 0..=100")]
    ScoreOutOfRange { pillar: Pillar, score: u8 },

    #[error("snapshot holds {0} issues, more than the cap")]
    TooManyIssues(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown pillar: {0}")]
pub struct UnknownPillar(pub String);
