//! Aggregate builder.
//!
//! Rolls every active member's snapshot into one party-wide view:
//! 1. Filter to members that are both snapshot holders and active profiles
//! 2. Mean score per pillar (50 when there are no members)
//! 3. Issues grouped by normalized title, ranked by mentions
//! 4. Compass histogram over the first 500 members
//! 5. Top contributor over the trailing activity window
//! 6. Summary prompt input and deterministic fallback prose
//!
//! The whole aggregate is recomputed every pass; nothing is incremental.

pub mod contributor;
pub mod issues;
pub mod summary;

use std::collections::BTreeMap;

use partyline_common::{
    ActivityLog, Aggregate, AggregateOutcome, Pillar, ProfileDirectory, Snapshot, NEUTRAL_SCORE,
};
use tracing::info;
use uuid::Uuid;

use crate::compass;

pub use contributor::{
    is_politically_relevant, rank_contributors, top_contributor, ActivityWindow, ContributorScore,
};
pub use issues::rank_issues;
pub use summary::{fallback_summary, pillar_descriptor, SummaryPrompt};

/// Snapshot holders that count as members. Without a directory every
/// snapshot holder is treated as active.
pub fn active_members<'a>(
    snapshots: &'a [(Uuid, Snapshot)],
    profiles: Option<&ProfileDirectory>,
) -> Vec<(Uuid, &'a Snapshot)> {
    snapshots
        .iter()
        .filter(|(id, _)| profiles.map_or(true, |p| p.contains(id)))
        .map(|(id, s)| (*id, s))
        .collect()
}

/// Mean score per pillar. An empty population averages to neutral rather than
/// dividing by zero.
pub fn pillar_means(members: &[(Uuid, &Snapshot)]) -> BTreeMap<Pillar, f64> {
    Pillar::ALL
        .into_iter()
        .map(|pillar| {
            let mean = if members.is_empty() {
                f64::from(NEUTRAL_SCORE)
            } else {
                let total: f64 = members
                    .iter()
                    .map(|(_, s)| f64::from(s.pillars.score(pillar)))
                    .sum();
                total / members.len() as f64
            };
            (pillar, mean)
        })
        .collect()
}

/// Build the party aggregate. Returns `NoData` when there are no snapshots at
/// all; a population with snapshots but no active members still builds.
pub fn build_aggregate(
    snapshots: &[(Uuid, Snapshot)],
    activity: &ActivityLog,
    window: ActivityWindow,
    profiles: Option<&ProfileDirectory>,
) -> AggregateOutcome {
    if snapshots.is_empty() {
        info!("No snapshots to aggregate");
        return AggregateOutcome::NoData;
    }

    let members = active_members(snapshots, profiles);
    let pillar_means = pillar_means(&members);
    let top_issues = rank_issues(members.iter().copied());
    let compass_distribution = compass::histogram(members.iter().map(|(_, s)| compass::project(s)));
    let top_contributor = top_contributor(activity, window, profiles);
    let member_count = members.len() as u32;
    let party_summary = fallback_summary(member_count, &pillar_means, &top_issues);

    info!(
        snapshots = snapshots.len(),
        members = member_count,
        issues = top_issues.len(),
        compass_points = compass_distribution.total,
        top_contributor = top_contributor.label.as_str(),
        "Aggregate built"
    );

    AggregateOutcome::Built(Box::new(Aggregate {
        member_count,
        pillar_means,
        top_issues,
        compass_distribution,
        party_summary,
        top_contributor,
        computed_at: window.now,
    }))
}
