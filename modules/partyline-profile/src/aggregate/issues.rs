//! Party-wide issue ranking.
//!
//! Groups every member's issues by normalized title, counts distinct members
//! and total mentions, keeps a few verbatim quotes, and ranks by mentions.

use std::collections::{HashMap, HashSet};

use partyline_common::{AggregateIssue, Snapshot, MAX_AGGREGATE_ISSUES, MAX_ISSUE_QUOTES};
use uuid::Uuid;

use crate::normalize::normalize_title;

struct IssueGroup {
    title: String,
    members: HashSet<Uuid>,
    mentions: u32,
    quotes: Vec<String>,
}

/// Rank the issues of `members` and keep the top `MAX_AGGREGATE_ISSUES`.
///
/// Sorting is by `mentions` descending and stable, so groups with equal
/// mentions keep first-seen order.
pub fn rank_issues<'a>(members: impl IntoIterator<Item = (Uuid, &'a Snapshot)>) -> Vec<AggregateIssue> {
    let mut groups: Vec<IssueGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (user_id, snapshot) in members {
        for issue in &snapshot.issues {
            let key = normalize_title(&issue.title);
            let idx = *index.entry(key).or_insert_with(|| {
                groups.push(IssueGroup {
                    title: issue.title.clone(),
                    members: HashSet::new(),
                    mentions: 0,
                    quotes: Vec::new(),
                });
                groups.len() - 1
            });

            let group = &mut groups[idx];
            group.members.insert(user_id);
            group.mentions = group.mentions.saturating_add(issue.mentions.unwrap_or(1));

            let candidates: Vec<&str> = if issue.quotes.is_empty() {
                vec![issue.summary.as_str()]
            } else {
                issue.quotes.iter().map(String::as_str).collect()
            };
            for quote in candidates {
                let quote = quote.trim();
                if group.quotes.len() >= MAX_ISSUE_QUOTES {
                    break;
                }
                if !quote.is_empty() && !group.quotes.iter().any(|q| q == quote) {
                    group.quotes.push(quote.to_string());
                }
            }
        }
    }

    groups.sort_by(|a, b| b.mentions.cmp(&a.mentions));

    groups
        .into_iter()
        .take(MAX_AGGREGATE_ISSUES)
        .map(|g| AggregateIssue {
            title: g.title,
            count: g.members.len() as u32,
            mentions: g.mentions,
            quotes: g.quotes,
        })
        .collect()
}
