//! Correlation cache bridging a user turn's classification and its reply.
//!
//! `CorrelationCache` is a concurrent map from user turn id to the label the
//! classifier assigned it, backed by `DashMap`. An entry exists while a user
//! turn has been classified but its reply has not been processed. `take`
//! is a single `DashMap::remove`, so reading and evicting an entry cannot
//! be split by a concurrent reply: at most one reply ever pairs with a
//! given user turn.
//!
//! Entries are never returned by reference. No `DashMap` guard is held
//! after a method returns, and none is held across `.await`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use recall_types::classification::ClassificationId;
use recall_types::config::CacheConfig;
use recall_types::pairing::PairingState;
use recall_types::turn::TurnId;
use tracing::{debug, info, warn};

/// Default age after which an unpaired user turn is abandoned.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Default upper bound on unpaired user turns held at once.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Lifetime bounds for cached user turns.
///
/// `None` disables a bound. [`EvictionPolicy::unbounded`] keeps entries for
/// the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    pub ttl: Option<Duration>,
    pub max_entries: Option<usize>,
}

impl EvictionPolicy {
    /// Keep every entry until it is consumed.
    pub fn unbounded() -> Self {
        Self {
            ttl: None,
            max_entries: None,
        }
    }

    /// Build a policy from configuration, where `0` disables a bound.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            ttl: (config.ttl_secs > 0).then(|| Duration::from_secs(config.ttl_secs)),
            max_entries: (config.max_entries > 0).then_some(config.max_entries),
        }
    }

    fn is_expired(&self, cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(cached_at) > ttl,
            Err(_) => false,
        }
    }
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            ttl: Some(DEFAULT_TTL),
            max_entries: Some(DEFAULT_MAX_ENTRIES),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CorrelationEntry {
    classification_id: ClassificationId,
    cached_at: DateTime<Utc>,
}

impl CorrelationEntry {
    fn state(self) -> PairingState {
        PairingState::Cached {
            classification_id: self.classification_id,
            cached_at: self.cached_at,
        }
    }
}

/// Shared store of classified user turns awaiting their reply.
///
/// Cloning produces a handle to the same underlying map (backed by `Arc`).
#[derive(Debug, Clone)]
pub struct CorrelationCache {
    inner: Arc<DashMap<TurnId, CorrelationEntry>>,
    policy: EvictionPolicy,
}

impl CorrelationCache {
    /// Create an empty cache with the given eviction policy.
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Record a classified user turn. Last write wins.
    ///
    /// Returns the `Cached` state the turn is now in. When the policy caps
    /// the entry count, the oldest other entries are evicted after the
    /// insert until the cache is back within `max_entries`. Concurrent
    /// puts may overshoot the cap briefly, but each put trims before it
    /// returns.
    pub fn put(&self, turn_id: TurnId, classification_id: ClassificationId) -> PairingState {
        self.put_at(turn_id, classification_id, Utc::now())
    }

    pub(crate) fn put_at(
        &self,
        turn_id: TurnId,
        classification_id: ClassificationId,
        now: DateTime<Utc>,
    ) -> PairingState {
        let entry = CorrelationEntry {
            classification_id,
            cached_at: now,
        };
        if self.inner.insert(turn_id.clone(), entry).is_some() {
            debug!(turn_id = %turn_id, "Overwrote cached user turn");
        }

        if let Some(max_entries) = self.policy.max_entries {
            while self.inner.len() > max_entries {
                if !self.evict_oldest(&turn_id) {
                    break;
                }
            }
        }
        entry.state()
    }

    /// Atomically remove the user turn `turn_id` and pair it with `reply_turn_id`.
    ///
    /// Returns the `Paired` state, or `None` when the turn was never cached,
    /// was already consumed, or had outlived the TTL.
    pub fn take(&self, turn_id: &TurnId, reply_turn_id: &TurnId) -> Option<PairingState> {
        self.take_at(turn_id, reply_turn_id, Utc::now())
    }

    pub(crate) fn take_at(
        &self,
        turn_id: &TurnId,
        reply_turn_id: &TurnId,
        now: DateTime<Utc>,
    ) -> Option<PairingState> {
        let (_, entry) = self.inner.remove(turn_id)?;

        if self.policy.is_expired(entry.cached_at, now) {
            info!(
                turn_id = %turn_id,
                reply_turn_id = %reply_turn_id,
                cached_at = %entry.cached_at,
                "Cached user turn expired before its reply arrived"
            );
            return None;
        }

        match entry.state().pair(reply_turn_id.clone()) {
            Ok(paired) => Some(paired),
            Err(err) => {
                warn!(turn_id = %turn_id, error = %err, "Failed to pair cached user turn");
                None
            }
        }
    }

    /// Remove every entry older than the TTL, returning them as `Abandoned`.
    ///
    /// No-op when the policy has no TTL.
    pub fn sweep_expired(&self) -> Vec<(TurnId, PairingState)> {
        self.sweep_expired_at(Utc::now())
    }

    pub(crate) fn sweep_expired_at(&self, now: DateTime<Utc>) -> Vec<(TurnId, PairingState)> {
        if self.policy.ttl.is_none() {
            return Vec::new();
        }

        let expired: Vec<TurnId> = self
            .inner
            .iter()
            .filter(|r| self.policy.is_expired(r.value().cached_at, now))
            .map(|r| r.key().clone())
            .collect();

        let mut abandoned = Vec::with_capacity(expired.len());
        for turn_id in expired {
            // A reply may have consumed the entry, or a fresh put replaced
            // it, between the scan and this removal.
            let removed = self
                .inner
                .remove_if(&turn_id, |_, entry| {
                    self.policy.is_expired(entry.cached_at, now)
                });
            if let Some((turn_id, entry)) = removed {
                if let Ok(state) = entry.state().abandon() {
                    abandoned.push((turn_id, state));
                }
            }
        }
        abandoned
    }

    /// Evict the oldest entry other than `keep`.
    ///
    /// Returns `false` when there is nothing left to evict.
    fn evict_oldest(&self, keep: &TurnId) -> bool {
        let oldest = self
            .inner
            .iter()
            .filter(|r| r.key() != keep)
            .min_by_key(|r| r.value().cached_at)
            .map(|r| (r.key().clone(), r.value().cached_at));

        let Some((turn_id, cached_at)) = oldest else {
            return false;
        };
        // Lost races (taken or overwritten meanwhile) fall through to the
        // caller, which re-checks the length.
        if self
            .inner
            .remove_if(&turn_id, |_, entry| entry.cached_at == cached_at)
            .is_some()
        {
            info!(
                turn_id = %turn_id,
                cached_at = %cached_at,
                "Correlation cache full, abandoned oldest unpaired user turn"
            );
        }
        true
    }

    /// Current state of a cached user turn, without consuming it.
    pub fn peek(&self, turn_id: &TurnId) -> Option<PairingState> {
        self.inner.get(turn_id).map(|r| r.value().state())
    }

    pub fn contains(&self, turn_id: &TurnId) -> bool {
        self.inner.contains_key(turn_id)
    }

    /// Number of user turns awaiting a reply.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for CorrelationCache {
    fn default() -> Self {
        Self::new(EvictionPolicy::default())
    }
}
