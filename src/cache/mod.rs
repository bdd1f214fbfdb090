//! Process-wide snapshot of the operator listing.
//!
//! The listing has no query parameters, so there is exactly one entry. A miss
//! runs a full walk behind `refresh`, which keeps at most one walk in flight.
//! Callers that queue behind it share that walk's outcome once they get the
//! lock: the snapshot it stored, or the error it failed with.

use crate::config::CacheConfig;
use crate::models::OperatorRecord;
use crate::scraper::OperatorSource;
use crate::scraper::error::ScrapeError;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub operators: Arc<Vec<OperatorRecord>>,
    pub fetched_at: DateTime<Utc>,
}

/// Result of `get_operators`; `cached` is false only for the caller whose walk produced it.
#[derive(Debug, Clone)]
pub struct CachedOperators {
    pub operators: Arc<Vec<OperatorRecord>>,
    pub fetched_at: DateTime<Utc>,
    pub cached: bool,
}

pub struct OperatorCache {
    source: Arc<dyn OperatorSource>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    walk_timeout: Duration,
    entry: RwLock<Option<CacheEntry>>,
    /// Error of the most recent walk, `None` if it succeeded.
    refresh: Mutex<Option<ScrapeError>>,
    walks_finished: AtomicU64,
}

impl OperatorCache {
    pub fn new(source: Arc<dyn OperatorSource>, ttl: Duration, walk_timeout: Duration) -> Self {
        Self {
            source,
            clock: Arc::new(SystemClock),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            walk_timeout,
            entry: RwLock::new(None),
            refresh: Mutex::new(None),
            walks_finished: AtomicU64::new(0),
        }
    }

    pub fn from_config(source: Arc<dyn OperatorSource>, config: &CacheConfig) -> Self {
        Self::new(
            source,
            Duration::from_secs(config.ttl_secs),
            Duration::from_secs(config.walk_timeout_secs),
        )
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn fresh(&self) -> Option<CachedOperators> {
        let entry = self.entry.read().await;
        let entry = entry.as_ref()?;
        let age = self.clock.now() - entry.fetched_at;
        (age < self.ttl).then(|| CachedOperators {
            operators: Arc::clone(&entry.operators),
            fetched_at: entry.fetched_at,
            cached: true,
        })
    }

    /// Cached listing while it is younger than the TTL, otherwise a fresh walk.
    ///
    /// A failed walk is returned as-is and leaves any previous entry in place.
    /// Callers that were already waiting when it failed get the same error
    /// instead of starting walks of their own.
    pub async fn get_operators(&self) -> Result<CachedOperators, ScrapeError> {
        if let Some(hit) = self.fresh().await {
            debug!(
                "Operator cache hit ({} operators, fetched {})",
                hit.operators.len(),
                hit.fetched_at.format("%H:%M:%S")
            );
            return Ok(hit);
        }

        let seen = self.walks_finished.load(Ordering::Acquire);
        let mut last_failure = self.refresh.lock().await;
        if let Some(hit) = self.fresh().await {
            debug!("Operator cache filled by concurrent walk");
            return Ok(hit);
        }
        if self.walks_finished.load(Ordering::Acquire) != seen {
            if let Some(e) = last_failure.as_ref() {
                debug!("Concurrent walk failed, sharing its error");
                return Err(e.clone());
            }
        }

        info!("Operator cache miss, walking remote listing");
        let outcome = match tokio::time::timeout(self.walk_timeout, self.source.fetch_operators()).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::Timeout(self.walk_timeout)),
        };
        self.walks_finished.fetch_add(1, Ordering::Release);

        let operators = match outcome {
            Ok(operators) => {
                *last_failure = None;
                operators
            }
            Err(e) => {
                warn!("Walk failed, cache left untouched: {}", e);
                *last_failure = Some(e.clone());
                return Err(e);
            }
        };

        let entry = CacheEntry {
            operators: Arc::new(operators),
            fetched_at: self.clock.now(),
        };
        *self.entry.write().await = Some(entry.clone());
        info!("Operator cache refreshed with {} operators", entry.operators.len());

        Ok(CachedOperators {
            operators: entry.operators,
            fetched_at: entry.fetched_at,
            cached: false,
        })
    }

    /// Current entry regardless of age.
    #[cfg(test)]
    pub async fn peek(&self) -> Option<CacheEntry> {
        self.entry.read().await.clone()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
