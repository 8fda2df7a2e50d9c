use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SnapshotViolation, UnknownPillar};
use crate::limits::{
    COMPASS_GRID_SIZE, DEFAULT_RATIONALE, MAX_ISSUES, MAX_SCORE, NEUTRAL_SCORE,
    NO_RECENT_ACTIVITY,
};

// --- Pillars ---

/// One of the five fixed ideological axes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    Economy,
    Social,
    Environment,
    Governance,
    Foreign,
}

impl Pillar {
    pub const ALL: [Pillar; 5] = [
        Pillar::Economy,
        Pillar::Social,
        Pillar::Environment,
        Pillar::Governance,
        Pillar::Foreign,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pillar::Economy => "economy",
            Pillar::Social => "social",
            Pillar::Environment => "environment",
            Pillar::Governance => "governance",
            Pillar::Foreign => "foreign",
        }
    }

    /// Descriptions of the low (0) and high (100) ends of the axis.
    pub fn poles(&self) -> (&'static str, &'static str) {
        match self {
            Pillar::Economy => ("state-led", "market-led"),
            Pillar::Social => ("progressive", "traditional"),
            Pillar::Environment => ("growth-first", "green-first"),
            Pillar::Governance => ("libertarian", "authoritarian"),
            Pillar::Foreign => ("internationalist", "sovereigntist"),
        }
    }
}

impl std::fmt::Display for Pillar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Pillar {
    type Err = UnknownPillar;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "economy" => Ok(Pillar::Economy),
            "social" => Ok(Pillar::Social),
            "environment" => Ok(Pillar::Environment),
            "governance" => Ok(Pillar::Governance),
            "foreign" => Ok(Pillar::Foreign),
            _ => Err(UnknownPillar(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PillarScore {
    /// 0-100, always clamped on write.
    pub score: u8,
    /// Explanatory prose. Never parsed.
    #[serde(default)]
    pub rationale: String,
}

impl PillarScore {
    pub fn new(score: u8, rationale: impl Into<String>) -> Self {
        Self {
            score: score.min(MAX_SCORE),
            rationale: rationale.into(),
        }
    }

    /// Neutral score used when no prior snapshot exists.
    pub fn neutral() -> Self {
        Self::new(NEUTRAL_SCORE, DEFAULT_RATIONALE)
    }
}

/// The complete set of five pillar scores. Every axis is always present; an
/// axis missing from stored JSON reads back as neutral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Pillars {
    #[serde(default = "PillarScore::neutral")]
    pub economy: PillarScore,
    #[serde(default = "PillarScore::neutral")]
    pub social: PillarScore,
    #[serde(default = "PillarScore::neutral")]
    pub environment: PillarScore,
    #[serde(default = "PillarScore::neutral")]
    pub governance: PillarScore,
    #[serde(default = "PillarScore::neutral")]
    pub foreign: PillarScore,
}

impl Pillars {
    pub fn from_fn(mut f: impl FnMut(Pillar) -> PillarScore) -> Self {
        Self {
            economy: f(Pillar::Economy),
            social: f(Pillar::Social),
            environment: f(Pillar::Environment),
            governance: f(Pillar::Governance),
            foreign: f(Pillar::Foreign),
        }
    }

    pub fn get(&self, pillar: Pillar) -> &PillarScore {
        match pillar {
            Pillar::Economy => &self.economy,
            Pillar::Social => &self.social,
            Pillar::Environment => &self.environment,
            Pillar::Governance => &self.governance,
            Pillar::Foreign => &self.foreign,
        }
    }

    pub fn get_mut(&mut self, pillar: Pillar) -> &mut PillarScore {
        match pillar {
            Pillar::Economy => &mut self.economy,
            Pillar::Social => &mut self.social,
            Pillar::Environment => &mut self.environment,
            Pillar::Governance => &mut self.governance,
            Pillar::Foreign => &mut self.foreign,
        }
    }

    pub fn score(&self, pillar: Pillar) -> u8 {
        self.get(pillar).score
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pillar, &PillarScore)> {
        Pillar::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}

impl Default for Pillars {
    fn default() -> Self {
        Self::from_fn(|_| PillarScore::neutral())
    }
}

// --- Issues & Snapshots ---

/// A political topic a user cares about. Identity is the normalized title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Issue {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentions: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quotes: Vec<String>,
}

impl Issue {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            mentions: None,
            quotes: Vec::new(),
        }
    }
}

/// One user's current political profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Snapshot {
    #[serde(default)]
    pub pillars: Pillars,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl Snapshot {
    /// All five axes neutral, no issues.
    pub fn scaffold() -> Self {
        Self::default()
    }

    /// Check the structural invariants: every score within 0..=100 and at most
    /// `MAX_ISSUES` issues. Meant for tests and assertions; the components that
    /// produce snapshots make violations unreachable.
    pub fn validate(&self) -> Result<(), SnapshotViolation> {
        for (pillar, ps) in self.pillars.iter() {
            if ps.score > MAX_SCORE {
                return Err(SnapshotViolation::ScoreOutOfRange {
                    pillar,
                    score: ps.score,
                });
            }
        }
        if self.issues.len() > MAX_ISSUES {
            return Err(SnapshotViolation::TooManyIssues(self.issues.len()));
        }
        Ok(())
    }
}

// --- Deltas ---

/// A single issue instruction inside a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum IssueOp {
    Add {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    Update {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    Remove {
        title: String,
    },
}

impl IssueOp {
    pub fn add(title: impl Into<String>, summary: impl Into<String>) -> Self {
        IssueOp::Add {
            title: title.into(),
            summary: Some(summary.into()),
        }
    }

    pub fn update(title: impl Into<String>, summary: impl Into<String>) -> Self {
        IssueOp::Update {
            title: title.into(),
            summary: Some(summary.into()),
        }
    }

    pub fn remove(title: impl Into<String>) -> Self {
        IssueOp::Remove {
            title: title.into(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            IssueOp::Add { title, .. } | IssueOp::Update { title, .. } | IssueOp::Remove { title } => {
                title
            }
        }
    }
}

/// Bounded instruction for mutating a snapshot. Applied exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    #[serde(default, alias = "pillars_delta")]
    pub pillars_delta: BTreeMap<Pillar, i32>,
    #[serde(default, alias = "top_issues_delta")]
    pub top_issues_delta: Vec<IssueOp>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.pillars_delta.values().all(|d| *d == 0) && self.top_issues_delta.is_empty()
    }

    pub fn nonzero_pillar_count(&self) -> usize {
        self.pillars_delta.values().filter(|d| **d != 0).count()
    }
}

// --- Compass ---

/// 2-D projection of a snapshot. Both coordinates lie in [-100, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompassPoint {
    pub x: i32,
    pub y: i32,
}

/// 10x10 histogram of compass points over [-100,100]², indexed `bins[x][y]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompassHistogram {
    pub bins: [[u32; COMPASS_GRID_SIZE]; COMPASS_GRID_SIZE],
    /// Points actually binned.
    pub total: u32,
}

impl Default for CompassHistogram {
    fn default() -> Self {
        Self {
            bins: [[0; COMPASS_GRID_SIZE]; COMPASS_GRID_SIZE],
            total: 0,
        }
    }
}

// --- Activity ---

/// A chat message as reported by the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActivityMessage {
    pub user_id: Uuid,
    pub content: String,
    /// Topic tags from the external classifier. Non-empty means politically relevant.
    #[serde(default)]
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit record of one applied delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProfileUpdateEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delta: Delta,
    pub created_at: DateTime<Utc>,
}

/// Recent activity supplied to the aggregate builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActivityLog {
    #[serde(default)]
    pub messages: Vec<ActivityMessage>,
    #[serde(default)]
    pub updates: Vec<ProfileUpdateEvent>,
}

/// One questionnaire response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SurveyAnswer {
    pub question_id: String,
    pub question: String,
    pub answer: String,
}

/// Known-active member profiles, keyed by user id, with optional display names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileDirectory(HashMap<Uuid, Option<String>>);

impl ProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user_id: Uuid, display_name: Option<String>) {
        self.0.insert(user_id, display_name);
    }

    pub fn contains(&self, user_id: &Uuid) -> bool {
        self.0.contains_key(user_id)
    }

    pub fn display_name(&self, user_id: &Uuid) -> Option<&str> {
        self.0.get(user_id).and_then(|n| n.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Uuid, Option<String>)> for ProfileDirectory {
    fn from_iter<I: IntoIterator<Item = (Uuid, Option<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// --- Aggregate ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AggregateIssue {
    /// Title of the first-seen issue in the group.
    pub title: String,
    /// Distinct members mentioning the issue.
    pub count: u32,
    /// Sum of each contributing issue's mention count.
    pub mentions: u32,
    pub quotes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TopContributor {
    /// `None` for the no-activity sentinel.
    pub user_id: Option<Uuid>,
    pub label: String,
    pub score: f64,
    pub examples: Vec<String>,
}

impl TopContributor {
    /// Sentinel reported when nobody has qualifying activity.
    pub fn none() -> Self {
        Self {
            user_id: None,
            label: NO_RECENT_ACTIVITY.to_string(),
            score: 0.0,
            examples: Vec::new(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Party-wide rollup of every active member's snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Aggregate {
    pub member_count: u32,
    pub pillar_means: BTreeMap<Pillar, f64>,
    pub top_issues: Vec<AggregateIssue>,
    pub compass_distribution: CompassHistogram,
    pub party_summary: String,
    pub top_contributor: TopContributor,
    pub computed_at: DateTime<Utc>,
}

/// Result of an aggregation pass. An empty population is its own state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AggregateOutcome {
    NoData,
    Built(Box<Aggregate>),
}

impl AggregateOutcome {
    pub fn aggregate(&self) -> Option<&Aggregate> {
        match self {
            AggregateOutcome::NoData => None,
            AggregateOutcome::Built(agg) => Some(agg),
        }
    }
}
