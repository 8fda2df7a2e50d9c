/// Lowest score any pillar can hold.
pub const MIN_SCORE: u8 = 0;

/// Highest score any pillar can hold.
pub const MAX_SCORE: u8 = 100;

/// Score assigned when there is no evidence either way.
pub const NEUTRAL_SCORE: u8 = 50;

/// Largest magnitude an oracle-supplied pillar adjustment may carry.
pub const MAX_PILLAR_DELTA: i32 = 10;

/// Hard ceiling on issues retained in a snapshot.
pub const MAX_ISSUES: usize = 10;

/// Seed issues accepted from a baseline analysis (the oracle is asked for 3-5).
pub const MAX_SEED_ISSUES: usize = 5;

/// Issue summaries written by delta application are cut to this many characters.
pub const MAX_SUMMARY_CHARS: usize = 140;

/// Rationale given to axes synthesized with no prior snapshot.
pub const DEFAULT_RATIONALE: &str = "default starting point";

/// Rationale given to axes the oracle omitted or scored with a non-number.
pub const INCOMPLETE_RATIONALE: &str = "incomplete";

// --- Aggregate ---

/// Issues reported in the party-wide ranking.
pub const MAX_AGGREGATE_ISSUES: usize = 10;

/// Representative quotes kept per aggregated issue.
pub const MAX_ISSUE_QUOTES: usize = 3;

/// Compass points considered when binning the distribution (deterministic prefix).
pub const MAX_COMPASS_POINTS: usize = 500;

/// Cells per side of the compass histogram.
pub const COMPASS_GRID_SIZE: usize = 10;

/// Trailing window for top-contributor scoring.
pub const ACTIVITY_WINDOW_DAYS: i64 = 14;

/// Example excerpts reported for the top contributor.
pub const MAX_CONTRIBUTOR_EXAMPLES: usize = 3;

/// Characters kept per contributor excerpt.
pub const MAX_EXCERPT_CHARS: usize = 100;

/// Label reported when nobody has qualifying activity in the window.
pub const NO_RECENT_ACTIVITY: &str = "no recent activity";
