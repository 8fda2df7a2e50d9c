//! Party-summary prompt input and deterministic fallback.
//!
//! The prose itself comes from the oracle. This module only formats what the
//! oracle is shown and provides the sentence used when it is unavailable.

use std::collections::BTreeMap;

use partyline_common::{AggregateIssue, Pillar};
use serde::{Deserialize, Serialize};

/// Everything the oracle needs to write a party summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryPrompt {
    pub member_count: u32,
    pub pillar_lines: Vec<String>,
    pub issue_lines: Vec<String>,
}

impl SummaryPrompt {
    pub fn new(member_count: u32, means: &BTreeMap<Pillar, f64>, issues: &[AggregateIssue]) -> Self {
        Self {
            member_count,
            pillar_lines: Pillar::ALL
                .iter()
                .map(|p| pillar_descriptor(*p, mean_of(means, *p)))
                .collect(),
            issue_lines: issues.iter().map(issue_line).collect(),
        }
    }

    /// Plain-text rendering handed to the oracle.
    pub fn render(&self) -> String {
        let mut out = format!("Members: {}\n\nPillar averages:\n", self.member_count);
        for line in &self.pillar_lines {
            out.push_str("- ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("\nTop issues:\n");
        if self.issue_lines.is_empty() {
            out.push_str("- (none yet)\n");
        }
        for line in &self.issue_lines {
            out.push_str("- ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

fn mean_of(means: &BTreeMap<Pillar, f64>, pillar: Pillar) -> f64 {
    means.get(&pillar).copied().unwrap_or(50.0)
}

/// Where a mean sits between the axis poles, in words.
pub fn lean(pillar: Pillar, mean: f64) -> String {
    let (low, high) = pillar.poles();
    match mean {
        m if m < 20.0 => format!("strongly {low}"),
        m if m < 40.0 => format!("leans {low}"),
        m if m <= 60.0 => "balanced".to_string(),
        m if m <= 80.0 => format!("leans {high}"),
        _ => format!("strongly {high}"),
    }
}

/// e.g. `economy: 62/100 (leans market-led)`
pub fn pillar_descriptor(pillar: Pillar, mean: f64) -> String {
    format!("{pillar}: {:.0}/100 ({})", mean, lean(pillar, mean))
}

fn issue_line(issue: &AggregateIssue) -> String {
    let mut line = format!(
        "{} ({} members, {} mentions)",
        issue.title, issue.count, issue.mentions
    );
    if !issue.quotes.is_empty() {
        let quoted: Vec<String> = issue.quotes.iter().map(|q| format!("\"{q}\"")).collect();
        line.push_str(": ");
        line.push_str(&quoted.join("; "));
    }
    line
}

/// Templated summary used when the oracle is unavailable.
pub fn fallback_summary(
    member_count: u32,
    means: &BTreeMap<Pillar, f64>,
    issues: &[AggregateIssue],
) -> String {
    let leanings: Vec<String> = Pillar::ALL
        .iter()
        .map(|p| format!("{p} {}", lean(*p, mean_of(means, *p))))
        .collect();
    let noun = if member_count == 1 { "member" } else { "members" };

    let mut summary = format!(
        "Across {member_count} {noun}: {}.",
        leanings.join(", ")
    );
    let titles: Vec<&str> = issues.iter().take(3).map(|i| i.title.as_str()).collect();
    match titles.as_slice() {
        [] => summary.push_str(" No shared issues have emerged yet."),
        [only] => summary.push_str(&format!(" The top concern is {only}.")),
        [rest @ .., last] => {
            summary.push_str(&format!(" Top concerns are {} and {last}.", rest.join(", ")))
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn means(values: [f64; 5]) -> BTreeMap<Pillar, f64> {
        Pillar::ALL.into_iter().zip(values).collect()
    }

    fn issue(title: &str, quotes: &[&str]) -> AggregateIssue {
        AggregateIssue {
            title: title.to_string(),
            count: 2,
            mentions: 3,
            quotes: quotes.iter().map(|q| q.to_string()).collect(),
        }
    }

    #[test]
    fn lean_bands() {
        assert_eq!(lean(Pillar::Economy, 10.0), "strongly state-led");
        assert_eq!(lean(Pillar::Economy, 35.0), "leans state-led");
        assert_eq!(lean(Pillar::Economy, 50.0), "balanced");
        assert_eq!(lean(Pillar::Economy, 62.0), "leans market-led");
        assert_eq!(lean(Pillar::Governance, 95.0), "strongly authoritarian");
    }

    #[test]
    fn descriptor_rounds_mean() {
        assert_eq!(
            pillar_descriptor(Pillar::Economy, 61.6),
            "economy: 62/100 (leans market-led)"
        );
    }

    #[test]
    fn prompt_lists_pillars_and_quoted_issues() {
        let prompt = SummaryPrompt::new(
            4,
            &means([50.0; 5]),
            &[issue("Housing", &["rent", "no homes"])],
        );
        assert_eq!(prompt.pillar_lines.len(), 5);
        assert_eq!(
            prompt.issue_lines,
            vec!["Housing (2 members, 3 mentions): \"rent\"; \"no homes\""]
        );
        let text = prompt.render();
        assert!(text.starts_with("Members: 4"));
        assert!(text.contains("- social: 50/100 (balanced)"));
    }

    #[test]
    fn render_marks_empty_issue_list() {
        let prompt = SummaryPrompt::new(1, &means([50.0; 5]), &[]);
        assert!(prompt.render().contains("(none yet)"));
    }

    #[test]
    fn fallback_is_deterministic_and_names_top_three() {
        let issues = vec![
            issue("Housing", &[]),
            issue("NHS", &[]),
            issue("Energy", &[]),
            issue("Transport", &[]),
        ];
        let m = means([70.0, 30.0, 50.0, 50.0, 85.0]);
        let a = fallback_summary(12, &m, &issues);
        assert_eq!(a, fallback_summary(12, &m, &issues));
        assert!(a.starts_with("Across 12 members: economy leans market-led, social leans progressive"));
        assert!(a.ends_with("Top concerns are Housing, NHS and Energy."));
        assert!(!a.contains("Transport"));
    }

    #[test]
    fn fallback_handles_no_issues_and_single_member() {
        let s = fallback_summary(1, &means([50.0; 5]), &[]);
        assert!(s.starts_with("Across 1 member: economy balanced"));
        assert!(s.ends_with("No shared issues have emerged yet."));

        let one = fallback_summary(3, &means([50.0; 5]), &[issue("Housing", &[])]);
        assert!(one.ends_with("The top concern is Housing."));
    }
}
