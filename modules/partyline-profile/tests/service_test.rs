//! Service-level tests: per-user merge serialization, baseline creation, and
//! cooldown-gated aggregate refresh against the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use partyline_common::{
    ActivityLog, ActivityMessage, Aggregate, Delta, IssueOp, Pillar, ProfileDirectory,
    ProfileUpdateEvent, Snapshot, SurveyAnswer,
};
use partyline_profile::testing::{member, message, snapshot, test_now, ScriptedOracle};
use partyline_profile::{
    build_aggregate, ActivityWindow, AggregateService, BaselineOutcome, Cooldown, MemoryStore,
    ProfileService, ProfileStore, RefreshOutcome,
};

fn add_delta(title: &str) -> Delta {
    Delta {
        pillars_delta: [(Pillar::Economy, 1)].into_iter().collect(),
        top_issues_delta: vec![IssueOp::add(title, format!("{title} summary"))],
    }
}

fn refreshed(outcome: RefreshOutcome) -> Box<Aggregate> {
    match outcome {
        RefreshOutcome::Refreshed(aggregate) => aggregate,
        other => panic!("expected a refreshed aggregate, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// ProfileService
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_merges_for_one_user_are_not_lost() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(ProfileService::new(store.clone()));
    let user = Uuid::new_v4();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move { service.apply_delta(user, &add_delta(&format!("Topic {i}"))).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = store.snapshot(user).await.unwrap().unwrap();
    assert_eq!(stored.pillars.score(Pillar::Economy), 58);
    assert_eq!(stored.issues.len(), 8);
    assert_eq!(store.update_count(), 8);
}

#[tokio::test]
async fn apply_analysis_repairs_and_records_audit_event() {
    let store = Arc::new(MemoryStore::new());
    let service = ProfileService::new(store.clone());
    let user = Uuid::new_v4();

    let report = service
        .apply_analysis(
            user,
            r#"{"pillarsDelta": {"economy": "7", "governance": -40}, "topIssuesDelta": [], "confidence": 0.8}"#,
        )
        .await
        .unwrap();

    assert!(report.created);
    assert_eq!(report.confidence, Some(0.8));
    assert_eq!(report.repairs.len(), 2);
    assert_eq!(report.snapshot.pillars.score(Pillar::Economy), 57);
    assert_eq!(report.snapshot.pillars.score(Pillar::Governance), 40);

    let events = store.updates_since(Utc::now() - Duration::minutes(1)).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].user_id, user);
    assert_eq!(events[0].delta.pillars_delta.get(&Pillar::Governance), Some(&-10));
}

#[tokio::test]
async fn second_analysis_builds_on_first() {
    let store = Arc::new(MemoryStore::new());
    let service = ProfileService::new(store.clone());
    let user = Uuid::new_v4();

    service.apply_delta(user, &add_delta("Housing")).await.unwrap();
    let report = service
        .apply_analysis(user, r#"{"pillarsDelta": {}, "topIssuesDelta": [{"op": "remove", "title": "housing"}]}"#)
        .await
        .unwrap();

    assert!(!report.created);
    assert!(report.snapshot.issues.is_empty());
    assert_eq!(report.snapshot.pillars.score(Pillar::Economy), 51);
}

#[tokio::test]
async fn baseline_is_created_once() {
    let store = Arc::new(MemoryStore::new());
    let service = ProfileService::new(store.clone());
    let user = Uuid::new_v4();
    let answers = vec![SurveyAnswer {
        question_id: "q1".into(),
        question: "Should rail be nationalised?".into(),
        answer: "Yes".into(),
    }];
    let analysis = r#"{
        "pillars": {"economy": {"score": 20, "rationale": "favours public ownership"}, "social": 140},
        "issues": [{"title": "Rail", "summary": "Wants public rail"}]
    }"#;

    let first = service.create_baseline(user, &answers, analysis).await.unwrap();
    let BaselineOutcome::Created { snapshot, .. } = first else {
        panic!("expected a new baseline");
    };
    assert_eq!(snapshot.pillars.score(Pillar::Economy), 20);
    assert_eq!(snapshot.pillars.score(Pillar::Social), 100);
    assert_eq!(snapshot.pillars.get(Pillar::Foreign).rationale, "incomplete");
    assert_eq!(snapshot.issues.len(), 1);

    let second = service.create_baseline(user, &answers, "{}").await.unwrap();
    assert_eq!(second, BaselineOutcome::AlreadyExists(snapshot.clone()));
    assert_eq!(store.snapshot(user).await.unwrap(), Some(snapshot));
}

// ---------------------------------------------------------------------------
// AggregateService
// ---------------------------------------------------------------------------

fn service_for(store: Arc<MemoryStore>, oracle: Option<Arc<ScriptedOracle>>) -> AggregateService {
    let builder = AggregateService::builder()
        .store(store)
        .gate(Arc::new(Cooldown::from_secs(300)));
    match oracle {
        Some(oracle) => builder
            .oracle(Some(oracle as Arc<dyn partyline_profile::SummaryOracle>))
            .build(),
        None => builder.build(),
    }
}

#[tokio::test]
async fn refresh_without_snapshots_keeps_stored_aggregate() {
    let window = ActivityWindow::new(test_now() - Duration::days(1), 14);
    let prior = build_aggregate(&[member([70; 5], &["Housing"])], &ActivityLog::default(), window, None)
        .aggregate()
        .cloned()
        .unwrap();

    let store = Arc::new(MemoryStore::new());
    store.put_aggregate(&prior).await.unwrap();
    let service = service_for(store.clone(), None);

    assert_eq!(service.refresh(test_now()).await.unwrap(), RefreshOutcome::NoData);
    assert_eq!(store.aggregate().await.unwrap(), Some(prior));
}

#[tokio::test]
async fn refresh_is_gated_by_cooldown() {
    let store = Arc::new(MemoryStore::new().with_snapshots([member([50; 5], &["Housing"])]));
    let service = service_for(store, None);

    refreshed(service.refresh(test_now()).await.unwrap());
    let again = service.refresh(test_now() + Duration::seconds(100)).await.unwrap();
    assert_eq!(
        again,
        RefreshOutcome::CoolingDown {
            retry_after: Duration::seconds(200)
        }
    );
    refreshed(service.refresh(test_now() + Duration::seconds(300)).await.unwrap());
}

#[tokio::test]
async fn refresh_filters_to_active_profiles_and_persists() {
    let (alice, alice_snap) = member([80, 50, 50, 20, 50], &["Housing"]);
    let (bob, bob_snap) = member([20, 50, 50, 80, 50], &["housing!", "Energy Bills"]);
    let (gone, gone_snap) = member([0; 5], &["Defence"]);

    let mut profiles = ProfileDirectory::new();
    profiles.insert(alice, Some("Alice".into()));
    profiles.insert(bob, None);

    let store = Arc::new(
        MemoryStore::new()
            .with_snapshots([(alice, alice_snap), (bob, bob_snap), (gone, gone_snap)])
            .with_profiles(profiles)
            .with_messages([
                message(alice, "The budget and NHS waiting lists", &["healthcare"], 1),
                message(alice, "Council tax again", &[], 2),
                message(bob, "what's for lunch", &[], 1),
            ]),
    );
    let service = service_for(store.clone(), None);

    let aggregate = refreshed(service.refresh(test_now()).await.unwrap());
    assert_eq!(aggregate.member_count, 2);
    assert_eq!(aggregate.pillar_means[&Pillar::Economy], 50.0);
    assert_eq!(aggregate.top_issues[0].title, "Housing");
    assert_eq!(aggregate.top_issues[0].count, 2);
    assert!(aggregate.top_issues.iter().all(|i| i.title != "Defence"));
    assert_eq!(aggregate.compass_distribution.total, 2);
    assert_eq!(aggregate.top_contributor.user_id, Some(alice));
    assert_eq!(aggregate.top_contributor.label, "Alice");
    assert!(aggregate.party_summary.starts_with("Across 2 members"));

    assert_eq!(store.aggregate().await.unwrap(), Some(*aggregate));
}

#[tokio::test]
async fn oracle_summary_replaces_fallback() {
    let store = Arc::new(MemoryStore::new().with_snapshots([member([50; 5], &["Housing"])]));
    let oracle = Arc::new(ScriptedOracle::replying("  A broad-church party worried about housing. "));
    let service = service_for(store, Some(oracle.clone()));

    let aggregate = refreshed(service.refresh(test_now()).await.unwrap());
    assert_eq!(aggregate.party_summary, "A broad-church party worried about housing.");
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn failing_or_empty_oracle_falls_back() {
    for oracle in [ScriptedOracle::failing(), ScriptedOracle::replying("   ")] {
        let store = Arc::new(MemoryStore::new().with_snapshots([member([50; 5], &["Housing"])]));
        let service = service_for(store, Some(Arc::new(oracle)));

        let aggregate = refreshed(service.refresh(test_now()).await.unwrap());
        assert!(aggregate.party_summary.starts_with("Across 1 member"));
    }
}

#[tokio::test]
async fn quiet_window_reports_sentinel_contributor() {
    let (id, snap) = member([50; 5], &[]);
    let stale = message(id, "Brexit and the NHS", &["politics"], 30);
    let store = Arc::new(MemoryStore::new().with_snapshots([(id, snap)]).with_messages([stale]));
    let service = service_for(store, None);

    let aggregate = refreshed(service.refresh(test_now()).await.unwrap());
    assert!(aggregate.top_contributor.is_none());
    assert_eq!(aggregate.top_contributor.label, "no recent activity");
    assert_eq!(aggregate.top_contributor.score, 0.0);
}

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

/// Delegates to a `MemoryStore`, failing chosen calls a set number of times.
#[derive(Default)]
struct FaultyStore {
    inner: MemoryStore,
    profiles_down: bool,
    audit_failures: AtomicUsize,
    listing_failures: AtomicUsize,
}

impl FaultyStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    fn profiles_down(mut self) -> Self {
        self.profiles_down = true;
        self
    }

    fn fail_audit(self, times: usize) -> Self {
        self.audit_failures.store(times, Ordering::SeqCst);
        self
    }

    fn fail_listing(self, times: usize) -> Self {
        self.listing_failures.store(times, Ordering::SeqCst);
        self
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl ProfileStore for FaultyStore {
    async fn snapshot(&self, user_id: Uuid) -> Result<Option<Snapshot>> {
        self.inner.snapshot(user_id).await
    }
    async fn put_snapshot(&self, user_id: Uuid, snapshot: &Snapshot) -> Result<()> {
        self.inner.put_snapshot(user_id, snapshot).await
    }
    async fn all_snapshots(&self) -> Result<Vec<(Uuid, Snapshot)>> {
        if take_failure(&self.listing_failures) {
            bail!("snapshot listing timed out");
        }
        self.inner.all_snapshots().await
    }
    async fn active_profiles(&self) -> Result<Option<ProfileDirectory>> {
        if self.profiles_down {
            bail!("profiles table unreachable");
        }
        self.inner.active_profiles().await
    }
    async fn put_aggregate(&self, aggregate: &Aggregate) -> Result<()> {
        self.inner.put_aggregate(aggregate).await
    }
    async fn aggregate(&self) -> Result<Option<Aggregate>> {
        self.inner.aggregate().await
    }
    async fn record_update(&self, event: &ProfileUpdateEvent) -> Result<()> {
        if take_failure(&self.audit_failures) {
            bail!("audit log write rejected");
        }
        self.inner.record_update(event).await
    }
    async fn updates_since(&self, since: DateTime<Utc>) -> Result<Vec<ProfileUpdateEvent>> {
        self.inner.updates_since(since).await
    }
    async fn messages_since(&self, since: DateTime<Utc>) -> Result<Vec<ActivityMessage>> {
        self.inner.messages_since(since).await
    }
}

#[tokio::test]
async fn failed_audit_write_does_not_fail_the_merge() {
    let store = Arc::new(FaultyStore::new(MemoryStore::new()).fail_audit(1));
    let service = ProfileService::new(store.clone());
    let user = Uuid::new_v4();
    let delta = Delta {
        pillars_delta: [(Pillar::Economy, 10)].into_iter().collect(),
        top_issues_delta: vec![],
    };

    let merged = service.apply_delta(user, &delta).await.unwrap();
    assert_eq!(merged.pillars.score(Pillar::Economy), 60);

    let stored = store.snapshot(user).await.unwrap().unwrap();
    assert_eq!(stored.pillars.score(Pillar::Economy), 60);
    assert_eq!(store.inner.update_count(), 0);

    service.apply_delta(user, &delta).await.unwrap();
    assert_eq!(store.inner.update_count(), 1);
}

#[tokio::test]
async fn unparseable_analysis_records_no_audit_event() {
    let store = Arc::new(MemoryStore::new());
    let service = ProfileService::new(store.clone());
    let user = Uuid::new_v4();

    let report = service.apply_analysis(user, "no JSON here").await.unwrap();

    assert!(report.created);
    assert_eq!(report.snapshot, Snapshot::scaffold());
    assert_eq!(store.update_count(), 0);
}

#[tokio::test]
async fn failed_input_load_does_not_hold_the_cooldown() {
    let inner = MemoryStore::new().with_snapshots([member([50; 5], &["Housing"])]);
    let store = Arc::new(FaultyStore::new(inner).fail_listing(1));
    let service = AggregateService::builder()
        .store(store.clone())
        .gate(Arc::new(Cooldown::from_secs(300)))
        .build();

    assert!(service.refresh(test_now()).await.is_err());
    assert!(store.aggregate().await.unwrap().is_none());

    refreshed(service.refresh(test_now() + Duration::seconds(1)).await.unwrap());
    assert!(store.aggregate().await.unwrap().is_some());

    let again = service.refresh(test_now() + Duration::seconds(2)).await.unwrap();
    assert!(matches!(again, RefreshOutcome::CoolingDown { .. }));
}

#[tokio::test]
async fn unavailable_profiles_count_every_snapshot_holder() {
    let inner = MemoryStore::new().with_snapshots([
        member([40; 5], &[]),
        member([60; 5], &[]),
        (Uuid::new_v4(), snapshot([50; 5], &[])),
    ]);
    let service = AggregateService::builder()
        .store(Arc::new(FaultyStore::new(inner).profiles_down()))
        .gate(Arc::new(Cooldown::from_secs(0)))
        .build();

    let aggregate = refreshed(service.refresh(test_now()).await.unwrap());
    assert_eq!(aggregate.member_count, 3);
    assert_eq!(aggregate.pillar_means[&Pillar::Social], 50.0);
}
