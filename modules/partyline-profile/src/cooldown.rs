use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::traits::RefreshGate;

/// In-process keyed cooldown. A key may be acquired once per `period`.
pub struct Cooldown {
    period: Duration,
    last: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_secs(secs: i64) -> Self {
        Self::new(Duration::seconds(secs))
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl RefreshGate for Cooldown {
    async fn try_acquire(&self, key: &str, now: DateTime<Utc>) -> Result<(), Duration> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(prev) = last.get(key) {
            let ready_at = *prev + self.period;
            if now < ready_at {
                let remaining = ready_at - now;
                debug!(key, remaining_secs = remaining.num_seconds(), "Cooldown active");
                return Err(remaining);
            }
        }
        last.insert(key.to_string(), now);
        Ok(())
    }

    async fn release(&self, key: &str) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if last.remove(key).is_some() {
            debug!(key, "Cooldown released");
        }
    }
}
