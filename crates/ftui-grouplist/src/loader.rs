#![forbid(unsafe_code)]

//! Stabilization-delayed detail loading for materialized item rows.
//!
//! The loader never sleeps or spawns. The host reports which item rows are
//! mounted ([`LazyItemLoader::sync_mounted`]) and the current time
//! ([`LazyItemLoader::poll`]); the loader answers with fetches that are due.
//! Every fetch carries a fresh [`FetchTicket`] so completions that arrive
//! after an unmount, a re-mount, or out of order are recognized as stale.
//!
//! # Invariants
//!
//! 1. At most one pending timer and at most one in-flight fetch per key.
//! 2. A key that leaves the mounted set loses its pending timer before
//!    `sync_mounted` returns.
//! 3. A completion is applied only when its ticket is the key's current
//!    in-flight ticket and the key is mounted.

use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use web_time::Instant;

use crate::config::LoaderConfig;
use crate::detail::{FetchError, ItemDetail};
use crate::model::ItemKey;

/// Identity of one issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FetchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fetch the host should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub key: ItemKey,
}

/// What a renderer should show for an item's detail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetailState<'a> {
    /// Waiting out the stabilization delay, or never scheduled.
    Pending,
    /// A fetch is in flight and nothing is cached yet.
    Loading,
    Loaded(&'a ItemDetail),
    /// The item no longer resolves on the server.
    Empty,
    /// The last fetch failed; `previous` is the last good detail, if any.
    Unavailable { previous: Option<&'a ItemDetail> },
}

impl DetailState<'_> {
    /// Detail to display, including a stale one kept across an error.
    #[must_use]
    pub fn detail(&self) -> Option<&ItemDetail> {
        match *self {
            Self::Loaded(detail) => Some(detail),
            Self::Unavailable { previous } => previous,
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum CacheEntry {
    Loaded(ItemDetail),
    Empty,
    Failed { previous: Option<ItemDetail> },
}

/// Result of one [`LazyItemLoader::sync_mounted`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MountDiff {
    /// Keys that got a new timer.
    pub scheduled: usize,
    /// Pending timers dropped because their key unmounted.
    pub cancelled: usize,
}

/// Per-item fetch scheduler and detail cache.
#[derive(Debug)]
pub struct LazyItemLoader {
    config: LoaderConfig,
    mounted: FxHashSet<ItemKey>,
    timers: FxHashMap<ItemKey, Instant>,
    in_flight: FxHashMap<ItemKey, FetchTicket>,
    tickets: FxHashMap<FetchTicket, ItemKey>,
    cache: FxHashMap<ItemKey, CacheEntry>,
    next_ticket: u64,
}

impl LazyItemLoader {
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            mounted: FxHashSet::default(),
            timers: FxHashMap::default(),
            in_flight: FxHashMap::default(),
            tickets: FxHashMap::default(),
            cache: FxHashMap::default(),
            next_ticket: 1,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Replace the mounted set.
    ///
    /// Newly mounted keys are scheduled at `now + stabilization_delay` unless
    /// a timer or fetch already exists for them or their cached detail is
    /// reusable. Keys no longer mounted lose their timer immediately. Their
    /// in-flight fetches keep running and are discarded on completion.
    pub fn sync_mounted(
        &mut self,
        keys: impl IntoIterator<Item = ItemKey>,
        now: Instant,
    ) -> MountDiff {
        let next: FxHashSet<ItemKey> = keys.into_iter().collect();
        let mut diff = MountDiff::default();

        for key in self.mounted.difference(&next) {
            if self.timers.remove(key).is_some() {
                tracing::debug!(item = %key, "cancelled pending detail fetch");
                diff.cancelled += 1;
            }
        }

        let deadline = now + self.config.stabilization_delay;
        for key in next.difference(&self.mounted) {
            if self.should_schedule(key) {
                tracing::trace!(item = %key, "scheduled detail fetch");
                self.timers.insert(key.clone(), deadline);
                diff.scheduled += 1;
            }
        }

        self.mounted = next;
        diff
    }

    fn should_schedule(&self, key: &ItemKey) -> bool {
        if self.timers.contains_key(key) || self.in_flight.contains_key(key) {
            return false;
        }
        match self.cache.get(key) {
            None | Some(CacheEntry::Failed { .. }) => true,
            Some(CacheEntry::Loaded(_) | CacheEntry::Empty) => self.config.refetch_loaded,
        }
    }

    /// Turn every timer due at `now` into an in-flight fetch.
    ///
    /// Requests are ordered by deadline, then key, so a batch is
    /// deterministic.
    pub fn poll(&mut self, now: Instant) -> Vec<FetchRequest> {
        let mut due: Vec<(Instant, ItemKey)> = self
            .timers
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (*deadline, key.clone()))
            .collect();
        if due.is_empty() {
            return Vec::new();
        }
        due.sort();

        due.into_iter()
            .map(|(_, key)| {
                self.timers.remove(&key);
                let ticket = FetchTicket(self.next_ticket);
                self.next_ticket += 1;
                self.in_flight.insert(key.clone(), ticket);
                self.tickets.insert(ticket, key.clone());
                tracing::debug!(item = %key, ticket = %ticket, "issuing detail fetch");
                FetchRequest { ticket, key }
            })
            .collect()
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().min().copied()
    }

    /// Apply a fetch result. Returns whether it was applied.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<ItemDetail, FetchError>,
    ) -> bool {
        let Some(key) = self.tickets.remove(&ticket) else {
            tracing::trace!(ticket = %ticket, "discarding completion for unknown ticket");
            return false;
        };
        if self.in_flight.get(&key) == Some(&ticket) {
            self.in_flight.remove(&key);
        } else {
            tracing::trace!(item = %key, ticket = %ticket, "discarding superseded completion");
            return false;
        }
        if !self.mounted.contains(&key) {
            tracing::debug!(
                item = %key,
                ticket = %ticket,
                "discarding completion for unmounted item"
            );
            return false;
        }

        let entry = match result {
            Ok(mut detail) => {
                detail.recent_runs.set_capacity(self.config.recent_run_limit);
                CacheEntry::Loaded(detail)
            }
            Err(FetchError::NotFound) => {
                tracing::debug!(item = %key, "item not found, caching empty detail");
                CacheEntry::Empty
            }
            Err(FetchError::Transport(msg)) => {
                tracing::warn!(item = %key, error = %msg, "detail fetch failed");
                let previous = match self.cache.remove(&key) {
                    Some(CacheEntry::Loaded(detail)) => Some(detail),
                    Some(CacheEntry::Failed { previous }) => previous,
                    Some(CacheEntry::Empty) | None => None,
                };
                CacheEntry::Failed { previous }
            }
        };
        self.cache.insert(key, entry);
        true
    }

    /// Drop every trace of keys rejected by `live`: cache entries, timers,
    /// in-flight tickets, and mount state.
    pub fn retain(&mut self, mut live: impl FnMut(&ItemKey) -> bool) {
        let before = self.cache.len();
        self.cache.retain(|key, _| live(key));
        self.timers.retain(|key, _| live(key));
        self.in_flight.retain(|key, _| live(key));
        self.tickets.retain(|_, key| live(key));
        self.mounted.retain(|key| live(key));
        let evicted = before - self.cache.len();
        if evicted > 0 {
            tracing::debug!(evicted, "evicted details for vanished items");
        }
    }

    /// Render-facing state of `key`.
    #[must_use]
    pub fn state(&self, key: &ItemKey) -> DetailState<'_> {
        match self.cache.get(key) {
            Some(CacheEntry::Loaded(detail)) => DetailState::Loaded(detail),
            // The last good detail stays visible while a retry is in flight.
            Some(CacheEntry::Failed {
                previous: Some(detail),
            }) => DetailState::Unavailable {
                previous: Some(detail),
            },
            _ if self.in_flight.contains_key(key) => DetailState::Loading,
            Some(CacheEntry::Empty) => DetailState::Empty,
            Some(CacheEntry::Failed { previous: None }) => {
                DetailState::Unavailable { previous: None }
            }
            None => DetailState::Pending,
        }
    }

    /// Cached detail for `key`, if loaded.
    #[must_use]
    pub fn detail(&self, key: &ItemKey) -> Option<&ItemDetail> {
        match self.cache.get(key) {
            Some(CacheEntry::Loaded(detail)) => Some(detail),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_mounted(&self, key: &ItemKey) -> bool {
        self.mounted.contains(key)
    }

    #[must_use]
    pub fn is_scheduled(&self, key: &ItemKey) -> bool {
        self.timers.contains_key(key)
    }

    #[must_use]
    pub fn is_in_flight(&self, key: &ItemKey) -> bool {
        self.in_flight.contains_key(key)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}
