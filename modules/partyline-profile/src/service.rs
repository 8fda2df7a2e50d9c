//! Orchestration around the pure profile core.
//!
//! `ProfileService` serializes merges per user (read prior → merge → write)
//! so concurrent analyses for one user never lose updates. `AggregateService`
//! runs a cooldown-gated full rebuild and overwrites the stored aggregate.
//! Wall-clock time is only read here, never inside the merge math.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use partyline_common::{
    ActivityLog, Aggregate, AggregateOutcome, Delta, ProfileDirectory, ProfileUpdateEvent, Snapshot,
    SurveyAnswer, ACTIVITY_WINDOW_DAYS,
};

use crate::aggregate::{build_aggregate, ActivityWindow, SummaryPrompt};
use crate::baseline::build_baseline;
use crate::merge::merge;
use crate::oracle::{parse_baseline, parse_delta, Repair};
use crate::traits::{ProfileStore, RefreshGate, SummaryOracle};

/// Cooldown key for aggregate rebuilds.
pub const AGGREGATE_REFRESH_KEY: &str = "aggregate";

// ---------------------------------------------------------------------------
// ProfileService
// ---------------------------------------------------------------------------

/// What one merge produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub snapshot: Snapshot,
    /// True when there was no prior snapshot.
    pub created: bool,
    pub repairs: Vec<Repair>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BaselineOutcome {
    Created {
        snapshot: Snapshot,
        repairs: Vec<Repair>,
    },
    /// The user already has a snapshot; it was left untouched.
    AlreadyExists(Snapshot),
}

pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    user_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Run `work` while holding the user's merge lock. The lock entry is
    /// dropped from the map once no other caller holds or awaits it.
    async fn with_user_lock<T, F, Fut>(&self, user_id: Uuid, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let lock = {
            let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(user_id).or_default().clone()
        };

        let result = {
            let _guard = lock.lock().await;
            work().await
        };

        let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map plus ours: nobody else is queued.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&user_id);
        }
        result
    }

    /// Parse an untrusted oracle payload and fold it into the user's snapshot.
    pub async fn apply_analysis(&self, user_id: Uuid, raw: &str) -> Result<MergeReport> {
        let parsed = parse_delta(raw);
        if !parsed.repairs.is_empty() {
            warn!(%user_id, repairs = parsed.repairs.len(), "Oracle delta needed repair");
        }
        let (snapshot, created) = self.merge_locked(user_id, &parsed.delta).await?;
        Ok(MergeReport {
            snapshot,
            created,
            repairs: parsed.repairs,
            confidence: parsed.confidence,
        })
    }

    /// Fold an already-typed delta into the user's snapshot.
    pub async fn apply_delta(&self, user_id: Uuid, delta: &Delta) -> Result<Snapshot> {
        Ok(self.merge_locked(user_id, delta).await?.0)
    }

    async fn merge_locked(&self, user_id: Uuid, delta: &Delta) -> Result<(Snapshot, bool)> {
        self.with_user_lock(user_id, || self.merge_unlocked(user_id, delta))
            .await
    }

    async fn merge_unlocked(&self, user_id: Uuid, delta: &Delta) -> Result<(Snapshot, bool)> {
        let prior = self.store.snapshot(user_id).await?;
        let created = prior.is_none();
        let next = merge(prior.as_ref(), delta);
        if let Err(violation) = next.validate() {
            error!(%user_id, %violation, "Merged snapshot violates invariants");
        }

        self.store.put_snapshot(user_id, &next).await?;

        // Snapshot is written, so the delta is applied. Audit failures only warn.
        if delta.is_empty() {
            debug!(%user_id, "Empty delta, no audit event recorded");
        } else if let Err(e) = self
            .store
            .record_update(&ProfileUpdateEvent {
                id: Uuid::new_v4(),
                user_id,
                delta: delta.clone(),
                created_at: Utc::now(),
            })
            .await
        {
            warn!(%user_id, error = %e, "Failed to record profile update event");
        }

        info!(
            %user_id,
            created,
            pillar_changes = delta.nonzero_pillar_count(),
            issue_ops = delta.top_issues_delta.len(),
            issues = next.issues.len(),
            "Snapshot merged"
        );
        Ok((next, created))
    }

    /// Create the user's first snapshot from their questionnaire. A user who
    /// already has a snapshot keeps it.
    pub async fn create_baseline(
        &self,
        user_id: Uuid,
        answers: &[SurveyAnswer],
        raw: &str,
    ) -> Result<BaselineOutcome> {
        self.with_user_lock(user_id, || self.baseline_unlocked(user_id, answers, raw))
            .await
    }

    async fn baseline_unlocked(
        &self,
        user_id: Uuid,
        answers: &[SurveyAnswer],
        raw: &str,
    ) -> Result<BaselineOutcome> {
        if let Some(existing) = self.store.snapshot(user_id).await? {
            info!(%user_id, "Baseline skipped, snapshot already exists");
            return Ok(BaselineOutcome::AlreadyExists(existing));
        }

        let parsed = parse_baseline(raw);
        let snapshot = build_baseline(answers, &parsed.analysis);
        if let Err(violation) = snapshot.validate() {
            error!(%user_id, %violation, "Baseline snapshot violates invariants");
        }
        self.store.put_snapshot(user_id, &snapshot).await?;

        info!(
            %user_id,
            issues = snapshot.issues.len(),
            repairs = parsed.repairs.len(),
            "Baseline snapshot created"
        );
        Ok(BaselineOutcome::Created {
            snapshot,
            repairs: parsed.repairs,
        })
    }
}

// ---------------------------------------------------------------------------
// AggregateService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Refreshed(Box<Aggregate>),
    /// No snapshots exist. The stored aggregate was left alone.
    NoData,
    /// A rebuild ran too recently.
    CoolingDown { retry_after: Duration },
}

#[derive(Clone, TypedBuilder)]
pub struct AggregateService {
    store: Arc<dyn ProfileStore>,
    gate: Arc<dyn RefreshGate>,
    #[builder(default)]
    oracle: Option<Arc<dyn SummaryOracle>>,
    #[builder(default = ACTIVITY_WINDOW_DAYS)]
    window_days: i64,
}

impl AggregateService {
    /// Rebuild and persist the party aggregate, unless the cooldown is active.
    ///
    /// A pass that fails while loading its inputs gives the cooldown slot
    /// back. Failures after the oracle call keep it.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<RefreshOutcome> {
        if let Err(retry_after) = self.gate.try_acquire(AGGREGATE_REFRESH_KEY, now).await {
            info!(retry_after_secs = retry_after.num_seconds(), "Aggregate refresh cooling down");
            return Ok(RefreshOutcome::CoolingDown { retry_after });
        }

        let window = ActivityWindow::new(now, self.window_days);
        let (snapshots, profiles, activity) = match self.load_inputs(window).await {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!(error = %e, "Aggregate inputs unavailable, releasing cooldown");
                self.gate.release(AGGREGATE_REFRESH_KEY).await;
                return Err(e);
            }
        };

        let mut aggregate = match build_aggregate(&snapshots, &activity, window, profiles.as_ref()) {
            AggregateOutcome::NoData => return Ok(RefreshOutcome::NoData),
            AggregateOutcome::Built(aggregate) => aggregate,
        };

        if let Some(summary) = self.oracle_summary(&aggregate).await {
            aggregate.party_summary = summary;
        }

        self.store.put_aggregate(&aggregate).await?;
        info!(members = aggregate.member_count, "Aggregate refreshed");
        Ok(RefreshOutcome::Refreshed(aggregate))
    }

    async fn load_inputs(
        &self,
        window: ActivityWindow,
    ) -> Result<(Vec<(Uuid, Snapshot)>, Option<ProfileDirectory>, ActivityLog)> {
        let snapshots = self.store.all_snapshots().await?;
        let profiles = match self.store.active_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!(error = %e, "Active profiles unavailable, treating all snapshot holders as active");
                None
            }
        };
        let activity = ActivityLog {
            messages: self.store.messages_since(window.start()).await?,
            updates: self.store.updates_since(window.start()).await?,
        };
        Ok((snapshots, profiles, activity))
    }

    /// Oracle prose for the summary, or `None` to keep the templated fallback.
    async fn oracle_summary(&self, aggregate: &Aggregate) -> Option<String> {
        let oracle = self.oracle.as_ref()?;
        let prompt = SummaryPrompt::new(
            aggregate.member_count,
            &aggregate.pillar_means,
            &aggregate.top_issues,
        );
        match oracle.summarize(&prompt).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                warn!("Summary oracle returned empty text, using fallback");
                None
            }
            Err(e) => {
                warn!(error = %e, "Summary oracle failed, using fallback");
                None
            }
        }
    }
}
