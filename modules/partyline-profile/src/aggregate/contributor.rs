//! Top-contributor ranking over a trailing activity window.
//!
//! Score per user:
//!   1.0 × politically relevant messages
//! + 0.5 × distinct topics tagged on those messages
//! + 0.2 × profile-update events
//! + 0.5 × nonzero pillar adjustments across those events
//! + 0.3 × issue operations across those events

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use partyline_common::{
    ActivityLog, ProfileDirectory, TopContributor, MAX_CONTRIBUTOR_EXAMPLES, MAX_EXCERPT_CHARS,
};
use uuid::Uuid;

const RELEVANT_MESSAGE_WEIGHT: f64 = 1.0;
const DISTINCT_TOPIC_WEIGHT: f64 = 0.5;
const UPDATE_EVENT_WEIGHT: f64 = 0.2;
const NONZERO_DELTA_WEIGHT: f64 = 0.5;
const ISSUE_OP_WEIGHT: f64 = 0.3;

/// UK political vocabulary used when the classifier attached no topic.
/// Matched as case-insensitive substrings.
pub const POLITICAL_KEYWORDS: &[&str] = &[
    "parliament",
    "westminster",
    "government",
    "prime minister",
    "chancellor",
    "labour",
    "tory government",
    "the tories",
    "conservative",
    "lib dem",
    "liberal democrat",
    "reform uk",
    "snp",
    "plaid cymru",
    "green party",
    "election",
    "manifesto",
    "referendum",
    "brexit",
    "nhs",
    "cost of living",
    "inflation",
    "housing",
    "immigration",
    "asylum",
    "universal credit",
    "benefits",
    "austerity",
    "council tax",
    "income tax",
    "budget",
    "net zero",
    "climate",
    "devolution",
    "house of lords",
    "policy",
    "strike",
    "trade union",
];

/// The trailing window activity is scored over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    pub now: DateTime<Utc>,
    pub days: i64,
}

impl ActivityWindow {
    pub fn new(now: DateTime<Utc>, days: i64) -> Self {
        Self { now, days }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.now - Duration::days(self.days)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start() && at <= self.now
    }
}

/// Per-user tally behind a contributor score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContributorScore {
    pub user_id: Uuid,
    pub relevant_messages: u32,
    pub distinct_topics: u32,
    pub update_events: u32,
    pub nonzero_deltas: u32,
    pub issue_ops: u32,
    pub score: f64,
}

#[derive(Default)]
struct Tally {
    relevant_messages: u32,
    topics: BTreeSet<String>,
    update_events: u32,
    nonzero_deltas: u32,
    issue_ops: u32,
    excerpts: Vec<(DateTime<Utc>, String)>,
}

impl Tally {
    fn score(&self) -> f64 {
        RELEVANT_MESSAGE_WEIGHT * f64::from(self.relevant_messages)
            + DISTINCT_TOPIC_WEIGHT * self.topics.len() as f64
            + UPDATE_EVENT_WEIGHT * f64::from(self.update_events)
            + NONZERO_DELTA_WEIGHT * f64::from(self.nonzero_deltas)
            + ISSUE_OP_WEIGHT * f64::from(self.issue_ops)
    }
}

/// A message counts as political when the classifier tagged it, or when its
/// text contains one of the keywords.
pub fn is_politically_relevant(content: &str, topics: &[String]) -> bool {
    if topics.iter().any(|t| !t.trim().is_empty()) {
        return true;
    }
    let lowered = content.to_lowercase();
    POLITICAL_KEYWORDS.iter().any(|k| lowered.contains(k))
}

fn tally(activity: &ActivityLog, window: ActivityWindow) -> BTreeMap<Uuid, Tally> {
    let mut tallies: BTreeMap<Uuid, Tally> = BTreeMap::new();

    for msg in &activity.messages {
        if !window.contains(msg.created_at) || !is_politically_relevant(&msg.content, &msg.topics) {
            continue;
        }
        let t = tallies.entry(msg.user_id).or_default();
        t.relevant_messages += 1;
        for topic in &msg.topics {
            let topic = topic.trim().to_lowercase();
            if !topic.is_empty() {
                t.topics.insert(topic);
            }
        }
        t.excerpts.push((msg.created_at, msg.content.clone()));
    }

    for event in &activity.updates {
        if !window.contains(event.created_at) {
            continue;
        }
        let t = tallies.entry(event.user_id).or_default();
        t.update_events += 1;
        t.nonzero_deltas += event.delta.nonzero_pillar_count() as u32;
        t.issue_ops += event.delta.top_issues_delta.len() as u32;
    }

    tallies
}

/// Score every user with activity in the window, highest first. Ties break
/// by user id so the ranking is reproducible.
pub fn rank_contributors(activity: &ActivityLog, window: ActivityWindow) -> Vec<ContributorScore> {
    rank_tallies(&tally(activity, window))
}

fn rank_tallies(tallies: &BTreeMap<Uuid, Tally>) -> Vec<ContributorScore> {
    let mut ranked: Vec<ContributorScore> = tallies
        .iter()
        .map(|(user_id, t)| ContributorScore {
            user_id: *user_id,
            relevant_messages: t.relevant_messages,
            distinct_topics: t.topics.len() as u32,
            update_events: t.update_events,
            nonzero_deltas: t.nonzero_deltas,
            issue_ops: t.issue_ops,
            score: t.score(),
        })
        .filter(|c| c.score > 0.0)
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.user_id.cmp(&b.user_id)));
    ranked
}

/// Pick the single highest-scoring user, with up to three recent excerpts.
/// Returns the no-activity sentinel when nobody qualifies.
pub fn top_contributor(
    activity: &ActivityLog,
    window: ActivityWindow,
    profiles: Option<&ProfileDirectory>,
) -> TopContributor {
    let mut tallies = tally(activity, window);
    let Some(best) = rank_tallies(&tallies).into_iter().next() else {
        return TopContributor::none();
    };

    let mut excerpts = tallies
        .remove(&best.user_id)
        .map(|t| t.excerpts)
        .unwrap_or_default();
    excerpts.sort_by(|a, b| b.0.cmp(&a.0));

    let examples = excerpts
        .into_iter()
        .take(MAX_CONTRIBUTOR_EXAMPLES)
        .map(|(_, text)| excerpt(&text))
        .collect();

    let label = profiles
        .and_then(|p| p.display_name(&best.user_id))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Member {}", short_id(&best.user_id)));

    TopContributor {
        user_id: Some(best.user_id),
        label,
        score: best.score,
        examples,
    }
}

fn excerpt(text: &str) -> String {
    text.trim().chars().take(MAX_EXCERPT_CHARS).collect()
}

fn short_id(id: &Uuid) -> String {
    id.simple().to_string().chars().take(8).collect()
}
