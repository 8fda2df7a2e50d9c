//! Snapshot merge engine.
//!
//! Folds one bounded delta into a prior snapshot. Pure and deterministic: the
//! same (prior, delta) always yields the same snapshot.

use partyline_common::{
    Delta, Issue, IssueOp, Pillar, Snapshot, MAX_ISSUES, MAX_SCORE, MAX_SUMMARY_CHARS, MIN_SCORE,
};
use tracing::debug;

use crate::normalize::normalize_title;

/// Apply `delta` to `prior`, or to a neutral scaffold when there is no prior.
///
/// Pillar adjustments are summed first and clamped after, so an out-of-range
/// adjustment still saturates at the boundary. Issue ops run in order and the
/// list is then cut to the first `MAX_ISSUES` entries.
pub fn merge(prior: Option<&Snapshot>, delta: &Delta) -> Snapshot {
    let mut next = prior.cloned().unwrap_or_else(Snapshot::scaffold);

    for pillar in Pillar::ALL {
        let adjustment = delta.pillars_delta.get(&pillar).copied().unwrap_or(0);
        let slot = next.pillars.get_mut(pillar);
        slot.score = apply_adjustment(slot.score, adjustment);
    }

    for op in &delta.top_issues_delta {
        apply_issue_op(&mut next.issues, op);
    }

    if next.issues.len() > MAX_ISSUES {
        debug!(
            dropped = next.issues.len() - MAX_ISSUES,
            "Truncating issue list to cap"
        );
        next.issues.truncate(MAX_ISSUES);
    }

    next
}

/// Saturating add of an adjustment onto a 0-100 score.
pub(crate) fn apply_adjustment(score: u8, adjustment: i32) -> u8 {
    let sum = i64::from(score) + i64::from(adjustment);
    sum.clamp(i64::from(MIN_SCORE), i64::from(MAX_SCORE)) as u8
}

fn apply_issue_op(issues: &mut Vec<Issue>, op: &IssueOp) {
    match op {
        IssueOp::Add { title, summary } => add_issue(issues, title, summary.as_deref()),
        IssueOp::Update { title, summary } => {
            let key = normalize_title(title);
            match position_of(issues, &key) {
                Some(idx) => {
                    let existing = &mut issues[idx];
                    existing.title = title.clone();
                    if let Some(summary) = usable_summary(summary.as_deref()) {
                        existing.summary = summary;
                    }
                }
                None => add_issue(issues, title, summary.as_deref()),
            }
        }
        IssueOp::Remove { title } => {
            if let Some(idx) = position_of(issues, &normalize_title(title)) {
                issues.remove(idx);
            }
        }
    }
}

/// Append a new issue unless one with the same normalized title exists.
/// An add without a summary carries no content and is dropped.
fn add_issue(issues: &mut Vec<Issue>, title: &str, summary: Option<&str>) {
    if position_of(issues, &normalize_title(title)).is_some() {
        return;
    }
    let Some(summary) = usable_summary(summary) else {
        debug!(title, "Dropping issue add without summary");
        return;
    };
    issues.push(Issue::new(title, summary));
}

fn position_of(issues: &[Issue], key: &str) -> Option<usize> {
    issues.iter().position(|i| normalize_title(&i.title) == key)
}

fn usable_summary(summary: Option<&str>) -> Option<String> {
    let trimmed = summary?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_SUMMARY_CHARS).collect())
}
