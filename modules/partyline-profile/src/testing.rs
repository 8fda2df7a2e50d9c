// Test helpers for the profile core and its services.
//
// - ScriptedOracle (SummaryOracle): returns a fixed reply or a fixed error
// - snapshot / member / message builders with terse signatures

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use partyline_common::{ActivityMessage, Issue, Pillar, PillarScore, Snapshot};

use crate::aggregate::SummaryPrompt;
use crate::traits::SummaryOracle;

// ---------------------------------------------------------------------------
// ScriptedOracle
// ---------------------------------------------------------------------------

pub struct ScriptedOracle {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    /// Always answers with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fails, as an unavailable oracle would.
    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SummaryOracle for ScriptedOracle {
    async fn summarize(&self, _prompt: &SummaryPrompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => bail!("oracle unavailable"),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Fixed reference time for deterministic tests.
pub fn test_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_792_411_200, 0).unwrap_or_default()
}

/// Snapshot with the given scores in `Pillar::ALL` order and titled issues.
pub fn snapshot(scores: [u8; 5], issues: &[&str]) -> Snapshot {
    let mut s = Snapshot::scaffold();
    for (pillar, score) in Pillar::ALL.into_iter().zip(scores) {
        *s.pillars.get_mut(pillar) = PillarScore::new(score, "fixture");
    }
    s.issues = issues
        .iter()
        .map(|t| Issue::new(*t, format!("{t} matters")))
        .collect();
    s
}

/// A member with a fresh id.
pub fn member(scores: [u8; 5], issues: &[&str]) -> (Uuid, Snapshot) {
    (Uuid::new_v4(), snapshot(scores, issues))
}

/// A chat message `days_ago` days before `test_now()`.
pub fn message(user_id: Uuid, content: &str, topics: &[&str], days_ago: i64) -> ActivityMessage {
    ActivityMessage {
        user_id,
        content: content.to_string(),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        created_at: test_now() - Duration::days(days_ago),
    }
}
