//! In-process advising session registry.
//!
//! Sessions are volatile: a process restart clears them all, and nothing here
//! coordinates across processes. DashMap gives lock-free access across
//! unrelated sessions; each slot carries its own async mutex that serializes
//! steps within one session, so a later step can never observe a
//! half-committed earlier one.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Default session time-to-live: 30 minutes.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Erasmus mobility period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Fall,
    Spring,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Fall => "fall",
            Period::Spring => "spring",
        }
    }

    /// Italian label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Period::Fall => "autunnale (Fall)",
            Period::Spring => "primaverile (Spring)",
        }
    }
}

#[derive(Error, Debug)]
#[error("unknown period '{0}' (expected 'fall' or 'spring')")]
pub struct UnknownPeriod(String);

impl FromStr for Period {
    type Err = UnknownPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fall" => Ok(Period::Fall),
            "spring" => Ok(Period::Spring),
            other => Err(UnknownPeriod(other.to_string())),
        }
    }
}

/// How far a session has advanced through the workflow.
///
/// Stages only move forward; re-running an earlier step is allowed but never
/// regresses the recorded stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    ProgramIdentified,
    DepartmentsListed,
    DestinationsListed,
    ExamsAnalyzed,
}

/// Per-student context threaded across the advising steps.
#[derive(Debug, Clone)]
pub struct AdvisingSession {
    pub id: String,
    /// Set when the session is created, immutable thereafter.
    pub home_university: String,
    /// Absent until the destinations step commits.
    pub period: Option<Period>,
    pub stage: Stage,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl AdvisingSession {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Record a later stage; earlier stages are never restored.
    pub fn advance(&mut self, stage: Stage) {
        if stage > self.stage {
            self.stage = stage;
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session invalid or expired, rerun step 1")]
    Invalid,
}

/// Concurrent session store keyed by session id.
#[derive(Debug)]
pub struct SessionStore {
    slots: DashMap<String, Arc<Mutex<AdvisingSession>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            ttl,
        }
    }

    /// Create a session for a home university and return its id.
    pub fn create(&self, home_university: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let now = Instant::now();
        let session = AdvisingSession {
            id: id.clone(),
            home_university: home_university.to_string(),
            period: None,
            stage: Stage::ProgramIdentified,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.slots.insert(id.clone(), Arc::new(Mutex::new(session)));
        tracing::debug!(session = %id, university = home_university, "session created");
        id
    }

    /// Lock a session for the duration of a step.
    ///
    /// Holding the guard is what guarantees at-most-one in-flight step per
    /// session. Expired sessions are removed on access and surface
    /// [`SessionError::Invalid`], same as unknown ids.
    pub async fn lock(&self, id: &str) -> Result<OwnedMutexGuard<AdvisingSession>, SessionError> {
        let slot = self
            .slots
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::Invalid)?;
        let guard = slot.lock_owned().await;
        if guard.is_expired() {
            drop(guard);
            self.slots.remove(id);
            tracing::debug!(session = %id, "session expired on access");
            return Err(SessionError::Invalid);
        }
        Ok(guard)
    }

    /// Drop every expired session. Returns how many were removed.
    ///
    /// Slots with a step currently in flight are left alone; the next
    /// [`lock`](Self::lock) on them performs the expiry check anyway.
    pub fn purge_expired(&self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| match slot.try_lock() {
            Ok(session) => !session.is_expired(),
            Err(_) => true,
        });
        before - self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
