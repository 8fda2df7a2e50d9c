// Trait abstractions for the collaborators around the profile core.
//
// ProfileStore: persistence for snapshots, the aggregate and the activity log.
// SummaryOracle: external LLM that writes party-summary prose.
// RefreshGate: keyed cooldown that rate-limits aggregate rebuilds.
//
// The core itself never touches these; services read before and write after
// calling the pure functions.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use partyline_common::{
    ActivityMessage, Aggregate, ProfileDirectory, ProfileUpdateEvent, Snapshot,
};

use crate::aggregate::SummaryPrompt;

// ---------------------------------------------------------------------------
// ProfileStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ProfileStore: Send + Sync {
    // --- Snapshots ---

    /// The user's current snapshot, if any.
    async fn snapshot(&self, user_id: Uuid) -> Result<Option<Snapshot>>;

    /// Replace the user's snapshot verbatim.
    async fn put_snapshot(&self, user_id: Uuid, snapshot: &Snapshot) -> Result<()>;

    /// Every snapshot, in storage iteration order.
    async fn all_snapshots(&self) -> Result<Vec<(Uuid, Snapshot)>>;

    /// Known-active member profiles. `Ok(None)` means the list is unavailable.
    async fn active_profiles(&self) -> Result<Option<ProfileDirectory>>;

    // --- Aggregate ---

    /// Overwrite the single current aggregate.
    async fn put_aggregate(&self, aggregate: &Aggregate) -> Result<()>;

    async fn aggregate(&self) -> Result<Option<Aggregate>>;

    // --- Activity log ---

    /// Append an audit record for an applied delta.
    async fn record_update(&self, event: &ProfileUpdateEvent) -> Result<()>;

    /// Profile-update events created at or after `since`.
    async fn updates_since(&self, since: DateTime<Utc>) -> Result<Vec<ProfileUpdateEvent>>;

    /// Chat messages created at or after `since`.
    async fn messages_since(&self, since: DateTime<Utc>) -> Result<Vec<ActivityMessage>>;
}

// ---------------------------------------------------------------------------
// SummaryOracle
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SummaryOracle: Send + Sync {
    /// Short natural-language synthesis of the prompt input.
    async fn summarize(&self, prompt: &SummaryPrompt) -> Result<String>;
}

// ---------------------------------------------------------------------------
// RefreshGate
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RefreshGate: Send + Sync {
    /// Claim the slot for `key` at `now`. `Err(remaining)` when the key is
    /// still cooling down.
    async fn try_acquire(&self, key: &str, now: DateTime<Utc>) -> std::result::Result<(), Duration>;

    /// Give back a slot claimed by a pass that failed before doing any
    /// rate-limited work, so the next attempt is not held off.
    async fn release(&self, key: &str);
}
