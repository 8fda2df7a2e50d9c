//! Oracle boundary: parse-or-repair for untrusted analysis payloads.
//!
//! The oracle is asked for JSON matching `delta_schema()` / `baseline_schema()`
//! but nothing it returns is trusted. Every numeric field is re-validated and
//! clamped, unknown shapes are dropped, and malformed payloads degrade to
//! empty/neutral values. Nothing here returns an error: each repair is logged
//! and handed back to the caller as a `Repair`.

use std::collections::BTreeMap;

use partyline_common::{
    Delta, Issue, IssueOp, Pillar, SurveyAnswer, MAX_PILLAR_DELTA, MAX_SEED_ISSUES,
};
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::baseline::{BaselineAnalysis, PillarReading};

// ---------------------------------------------------------------------------
// Repairs
// ---------------------------------------------------------------------------

/// One correction applied to an oracle payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Repair {
    /// The payload was not a JSON object. Defaults were used.
    Unparseable(String),
    /// An axis name that is not one of the five pillars.
    UnknownPillar(String),
    /// An axis value that was not a number.
    NonNumeric(Pillar),
    /// A numeric string was accepted as a number.
    CoercedString(Pillar),
    /// An adjustment outside ±10 was clamped.
    ClampedAdjustment { pillar: Pillar, from: f64, to: i32 },
    /// An issue op missing a recognised `op` or a non-empty `title`.
    MalformedIssueOp(String),
    /// Seed issues beyond the per-baseline cap were dropped.
    ExtraSeedIssues(usize),
    /// A declared confidence outside [0, 1] was clamped.
    ClampedConfidence(f64),
}

impl std::fmt::Display for Repair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Repair::Unparseable(reason) => write!(f, "unparseable payload: {reason}"),
            Repair::UnknownPillar(name) => write!(f, "unknown pillar {name:?} ignored"),
            Repair::NonNumeric(p) => write!(f, "{p} value was not numeric"),
            Repair::CoercedString(p) => write!(f, "{p} value coerced from string"),
            Repair::ClampedAdjustment { pillar, from, to } => {
                write!(f, "{pillar} adjustment {from} clamped to {to}")
            }
            Repair::MalformedIssueOp(detail) => write!(f, "malformed issue op dropped: {detail}"),
            Repair::ExtraSeedIssues(n) => write!(f, "{n} extra seed issues dropped"),
            Repair::ClampedConfidence(c) => write!(f, "confidence {c} clamped"),
        }
    }
}

fn record(repairs: &mut Vec<Repair>, repair: Repair) {
    warn!(repair = %repair, "Repaired oracle payload");
    repairs.push(repair);
}

// ---------------------------------------------------------------------------
// Delta payloads
// ---------------------------------------------------------------------------

/// A sanitized delta plus what the oracle declared about it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDelta {
    pub delta: Delta,
    /// Declared confidence, clamped to [0, 1].
    pub confidence: Option<f64>,
    /// Declared validity. Recorded, never trusted.
    pub declared_valid: Option<bool>,
    pub repairs: Vec<Repair>,
}

/// Parse an oracle delta payload. Total: malformed input yields an empty delta.
pub fn parse_delta(raw: &str) -> ParsedDelta {
    let mut parsed = ParsedDelta::default();
    let Some(obj) = parse_object(raw, &mut parsed.repairs) else {
        return parsed;
    };

    if let Some(Value::Object(pillars)) = field(&obj, &["pillarsDelta", "pillars_delta"]) {
        for (name, value) in pillars {
            let Ok(pillar) = name.parse::<Pillar>() else {
                record(&mut parsed.repairs, Repair::UnknownPillar(name.clone()));
                continue;
            };
            let Some(number) = numeric(pillar, value, &mut parsed.repairs) else {
                continue;
            };
            let adjustment = clamp_adjustment(pillar, number, &mut parsed.repairs);
            parsed.delta.pillars_delta.insert(pillar, adjustment);
        }
    }

    if let Some(Value::Array(ops)) = field(&obj, &["topIssuesDelta", "top_issues_delta"]) {
        for op in ops {
            match issue_op(op) {
                Ok(op) => parsed.delta.top_issues_delta.push(op),
                Err(detail) => record(&mut parsed.repairs, Repair::MalformedIssueOp(detail)),
            }
        }
    }

    parsed.confidence = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| {
            if !(0.0..=1.0).contains(&c) {
                record(&mut parsed.repairs, Repair::ClampedConfidence(c));
            }
            c.clamp(0.0, 1.0)
        });
    parsed.declared_valid = obj.get("valid").and_then(Value::as_bool);

    parsed
}

fn clamp_adjustment(pillar: Pillar, number: f64, repairs: &mut Vec<Repair>) -> i32 {
    let limit = f64::from(MAX_PILLAR_DELTA);
    let clamped = number.round().clamp(-limit, limit) as i32;
    if number.round() != f64::from(clamped) {
        record(
            repairs,
            Repair::ClampedAdjustment {
                pillar,
                from: number,
                to: clamped,
            },
        );
    }
    clamped
}

fn issue_op(value: &Value) -> Result<IssueOp, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("expected object, got {value}"))?;
    let kind = field(obj, &["op", "action"])
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .ok_or_else(|| "missing op".to_string())?;
    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| format!("{kind} without title"))?
        .to_string();
    let summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_string);

    match kind.as_str() {
        "add" => Ok(IssueOp::Add { title, summary }),
        "update" => Ok(IssueOp::Update { title, summary }),
        "remove" => Ok(IssueOp::Remove { title }),
        other => Err(format!("unknown op {other:?}")),
    }
}

// ---------------------------------------------------------------------------
// Baseline payloads
// ---------------------------------------------------------------------------

/// A sanitized baseline analysis. Pillar scores are left unclamped here; the
/// baseline builder owns clamping and defaulting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBaseline {
    pub analysis: BaselineAnalysis,
    pub repairs: Vec<Repair>,
}

/// Parse an oracle baseline payload. Total: malformed input yields an empty
/// analysis, which the builder turns into all-neutral "incomplete" axes.
pub fn parse_baseline(raw: &str) -> ParsedBaseline {
    let mut parsed = ParsedBaseline::default();
    let Some(obj) = parse_object(raw, &mut parsed.repairs) else {
        return parsed;
    };

    if let Some(Value::Object(pillars)) = obj.get("pillars") {
        for (name, value) in pillars {
            let Ok(pillar) = name.parse::<Pillar>() else {
                record(&mut parsed.repairs, Repair::UnknownPillar(name.clone()));
                continue;
            };
            let reading = match value {
                Value::Object(entry) => PillarReading {
                    score: entry
                        .get("score")
                        .and_then(|s| numeric(pillar, s, &mut parsed.repairs)),
                    rationale: entry
                        .get("rationale")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                },
                other => PillarReading {
                    score: numeric(pillar, other, &mut parsed.repairs),
                    rationale: None,
                },
            };
            parsed.analysis.pillars.insert(pillar, reading);
        }
    }

    if let Some(Value::Array(issues)) = field(&obj, &["issues", "topIssues", "top_issues"]) {
        let mut seeds: Vec<Issue> = issues.iter().filter_map(seed_issue).collect();
        if seeds.len() > MAX_SEED_ISSUES {
            record(
                &mut parsed.repairs,
                Repair::ExtraSeedIssues(seeds.len() - MAX_SEED_ISSUES),
            );
            seeds.truncate(MAX_SEED_ISSUES);
        }
        parsed.analysis.issues = seeds;
    }

    parsed
}

fn seed_issue(value: &Value) -> Option<Issue> {
    let obj = value.as_object()?;
    let title = obj.get("title")?.as_str()?.trim();
    if title.is_empty() {
        return None;
    }
    let mut issue = Issue::new(
        title,
        obj.get("summary").and_then(Value::as_str).unwrap_or_default(),
    );
    if let Some(Value::Array(quotes)) = obj.get("quotes") {
        issue.quotes = quotes
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
    issue.mentions = obj
        .get("mentions")
        .and_then(Value::as_u64)
        .map(|m| m.min(u64::from(u32::MAX)) as u32);
    Some(issue)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Strip markdown code fences the oracle sometimes wraps JSON in.
pub fn strip_code_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

fn parse_object(raw: &str, repairs: &mut Vec<Repair>) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(strip_code_fences(raw)) {
        Ok(Value::Object(obj)) => Some(obj),
        Ok(other) => {
            record(repairs, Repair::Unparseable(format!("expected object, got {other}")));
            None
        }
        Err(e) => {
            record(repairs, Repair::Unparseable(e.to_string()));
            None
        }
    }
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|n| obj.get(*n))
}

fn numeric(pillar: Pillar, value: &Value, repairs: &mut Vec<Repair>) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => {
                record(repairs, Repair::CoercedString(pillar));
                Some(f)
            }
            _ => {
                record(repairs, Repair::NonNumeric(pillar));
                None
            }
        },
        _ => {
            record(repairs, Repair::NonNumeric(pillar));
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt input and response schemas
// ---------------------------------------------------------------------------

/// Format questionnaire answers as oracle input.
pub fn survey_prompt(answers: &[SurveyAnswer]) -> String {
    answers
        .iter()
        .enumerate()
        .map(|(i, a)| format!("{}. [{}] {}\n   Answer: {}", i + 1, a.question_id, a.question, a.answer.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One axis in the baseline response the oracle is asked for.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BaselinePillarResponse {
    /// 0-100
    pub score: f64,
    pub rationale: String,
}

/// One seed issue in the baseline response.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SeedIssueResponse {
    pub title: String,
    /// At most 140 characters
    pub summary: String,
}

/// Baseline analysis shape requested from the oracle.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BaselineResponse {
    pub pillars: BTreeMap<Pillar, BaselinePillarResponse>,
    /// Three to five issues
    pub issues: Vec<SeedIssueResponse>,
}

/// JSON Schema for structured delta output.
pub fn delta_schema() -> RootSchema {
    schemars::schema_for!(Delta)
}

/// JSON Schema for structured baseline output.
pub fn baseline_schema() -> RootSchema {
    schemars::schema_for!(BaselineResponse)
}
