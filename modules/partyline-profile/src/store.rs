//! In-memory `ProfileStore`.
//!
//! Snapshots keep insertion order so `all_snapshots` is deterministic, which
//! matters for the compass point cap.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use partyline_common::{
    ActivityMessage, Aggregate, ProfileDirectory, ProfileUpdateEvent, Snapshot,
};

use crate::traits::ProfileStore;

#[derive(Default)]
struct State {
    snapshots: Vec<(Uuid, Snapshot)>,
    profiles: Option<ProfileDirectory>,
    aggregate: Option<Aggregate>,
    updates: Vec<ProfileUpdateEvent>,
    messages: Vec<ActivityMessage>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed snapshots, preserving the given order.
    pub fn with_snapshots(self, snapshots: impl IntoIterator<Item = (Uuid, Snapshot)>) -> Self {
        {
            let mut state = self.lock();
            for (id, snapshot) in snapshots {
                upsert(&mut state.snapshots, id, snapshot);
            }
        }
        self
    }

    pub fn with_profiles(self, profiles: ProfileDirectory) -> Self {
        self.lock().profiles = Some(profiles);
        self
    }

    pub fn with_messages(self, messages: impl IntoIterator<Item = ActivityMessage>) -> Self {
        self.lock().messages.extend(messages);
        self
    }

    pub fn with_updates(self, updates: impl IntoIterator<Item = ProfileUpdateEvent>) -> Self {
        self.lock().updates.extend(updates);
        self
    }

    pub fn push_message(&self, message: ActivityMessage) {
        self.lock().messages.push(message);
    }

    pub fn update_count(&self) -> usize {
        self.lock().updates.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn upsert(snapshots: &mut Vec<(Uuid, Snapshot)>, user_id: Uuid, snapshot: Snapshot) {
    match snapshots.iter_mut().find(|(id, _)| *id == user_id) {
        Some((_, existing)) => *existing = snapshot,
        None => snapshots.push((user_id, snapshot)),
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn snapshot(&self, user_id: Uuid) -> Result<Option<Snapshot>> {
        Ok(self
            .lock()
            .snapshots
            .iter()
            .find(|(id, _)| *id == user_id)
            .map(|(_, s)| s.clone()))
    }

    async fn put_snapshot(&self, user_id: Uuid, snapshot: &Snapshot) -> Result<()> {
        upsert(&mut self.lock().snapshots, user_id, snapshot.clone());
        Ok(())
    }

    async fn all_snapshots(&self) -> Result<Vec<(Uuid, Snapshot)>> {
        Ok(self.lock().snapshots.clone())
    }

    async fn active_profiles(&self) -> Result<Option<ProfileDirectory>> {
        Ok(self.lock().profiles.clone())
    }

    async fn put_aggregate(&self, aggregate: &Aggregate) -> Result<()> {
        self.lock().aggregate = Some(aggregate.clone());
        Ok(())
    }

    async fn aggregate(&self) -> Result<Option<Aggregate>> {
        Ok(self.lock().aggregate.clone())
    }

    async fn record_update(&self, event: &ProfileUpdateEvent) -> Result<()> {
        self.lock().updates.push(event.clone());
        Ok(())
    }

    async fn updates_since(&self, since: DateTime<Utc>) -> Result<Vec<ProfileUpdateEvent>> {
        Ok(self
            .lock()
            .updates
            .iter()
            .filter(|e| e.created_at >= since)
            .cloned()
            .collect())
    }

    async fn messages_since(&self, since: DateTime<Utc>) -> Result<Vec<ActivityMessage>> {
        Ok(self
            .lock()
            .messages
            .iter()
            .filter(|m| m.created_at >= since)
            .cloned()
            .collect())
    }
}
