//! Survey baseline builder.
//!
//! Turns a one-time questionnaire plus the oracle's analysis of it into a
//! user's first snapshot. The oracle output is untrusted: every axis is
//! checked and every score is clamped here.

use std::collections::{BTreeMap, HashSet};

use partyline_common::{
    Issue, Pillar, PillarScore, Pillars, Snapshot, SurveyAnswer, INCOMPLETE_RATIONALE, MAX_ISSUES,
    MAX_SCORE, MIN_SCORE, NEUTRAL_SCORE,
};
use tracing::{debug, warn};

use crate::normalize::normalize_title;

/// One axis as the oracle reported it. `score` is `None` when the oracle
/// omitted it or returned something that was not a number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PillarReading {
    pub score: Option<f64>,
    pub rationale: Option<String>,
}

impl PillarReading {
    pub fn new(score: f64, rationale: impl Into<String>) -> Self {
        Self {
            score: Some(score),
            rationale: Some(rationale.into()),
        }
    }
}

/// The oracle's analysis of a questionnaire, after boundary parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineAnalysis {
    pub pillars: BTreeMap<Pillar, PillarReading>,
    pub issues: Vec<Issue>,
}

/// Build the first snapshot for a user.
///
/// Missing or non-numeric axes become `{score: 50, rationale: "incomplete"}`.
/// Present scores are rounded and clamped to 0..=100. Seed issues with an
/// empty title or a repeated normalized title are skipped, and the list is
/// held to the same cap merges use.
pub fn build_baseline(answers: &[SurveyAnswer], analysis: &BaselineAnalysis) -> Snapshot {
    debug!(answers = answers.len(), "Building survey baseline");

    let pillars = Pillars::from_fn(|pillar| repair_reading(pillar, analysis.pillars.get(&pillar)));

    let mut seen = HashSet::new();
    let mut issues = Vec::new();
    for issue in &analysis.issues {
        let key = normalize_title(&issue.title);
        if issue.title.trim().is_empty() || !seen.insert(key) {
            continue;
        }
        issues.push(issue.clone());
    }
    if issues.len() > MAX_ISSUES {
        warn!(seeded = issues.len(), "Baseline seeded more issues than the cap");
        issues.truncate(MAX_ISSUES);
    }

    Snapshot { pillars, issues }
}

fn repair_reading(pillar: Pillar, reading: Option<&PillarReading>) -> PillarScore {
    let Some(score) = reading.and_then(|r| r.score).filter(|s| s.is_finite()) else {
        warn!(%pillar, "Baseline axis missing or non-numeric, defaulting to neutral");
        return PillarScore::new(NEUTRAL_SCORE, INCOMPLETE_RATIONALE);
    };

    let clamped = clamp_score(score);
    if f64::from(clamped) != score.round() {
        warn!(%pillar, score, clamped, "Baseline score out of range, clamped");
    }
    let rationale = reading
        .and_then(|r| r.rationale.clone())
        .unwrap_or_default();
    PillarScore::new(clamped, rationale)
}

/// Round and clamp an untrusted score into 0..=100.
pub(crate) fn clamp_score(score: f64) -> u8 {
    score
        .round()
        .clamp(f64::from(MIN_SCORE), f64::from(MAX_SCORE)) as u8
}
