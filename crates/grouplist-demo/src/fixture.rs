#![forbid(unsafe_code)]

//! Demo data: JSON fixtures, synthetic groups, and a simulated fetcher.

use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use ftui_grouplist::detail::DEFAULT_RECENT_RUNS;
use ftui_grouplist::{
    DetailFetcher, FetchError, Group, GroupAddress, ItemDetail, ItemKey, ItemKind, RecentRuns,
    RunStatus, RunSummary, Tag,
};
use rustc_hash::{FxHashMap, FxHasher};
use serde::Deserialize;
use web_time::Duration;

/// Item names ending with this resolve as not found.
pub const RETIRED_SUFFIX: &str = "-retired";

const LOCATIONS: [&str; 3] = ["prod", "staging", "dev"];
const AREAS: [&str; 6] = ["analytics", "billing", "ingest", "ml", "reporting", "search"];

/// Groups plus optional canned details keyed by `name@location/item`.
#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    pub groups: Vec<Group>,
    #[serde(default)]
    pub details: FxHashMap<String, ItemDetail>,
}

#[derive(Debug)]
pub enum FixtureError {
    Io(io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "fixture unreadable: {err}"),
            Self::Parse(err) => write!(f, "fixture invalid: {err}"),
        }
    }
}

impl std::error::Error for FixtureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<FixtureError> for io::Error {
    fn from(err: FixtureError) -> Self {
        match err {
            FixtureError::Io(err) => err,
            FixtureError::Parse(err) => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let text = fs::read_to_string(path).map_err(FixtureError::Io)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, FixtureError> {
        serde_json::from_str(text).map_err(FixtureError::Parse)
    }
}

fn mix(seed: u64, parts: impl Hash) -> u64 {
    let mut hasher = FxHasher::default();
    seed.hash(&mut hasher);
    parts.hash(&mut hasher);
    hasher.finish()
}

/// Deterministic synthetic groups with `0..=max_items` items each.
#[must_use]
pub fn synthetic_groups(count: usize, max_items: usize, seed: u64) -> Vec<Group> {
    (0..count)
        .map(|g| {
            let h = mix(seed, ("group", g));
            let area = AREAS[(h % AREAS.len() as u64) as usize];
            let location = LOCATIONS[((h >> 8) % LOCATIONS.len() as u64) as usize];
            let items = ((h >> 16) % (max_items as u64 + 1)) as usize;
            let mut group = Group::new(GroupAddress::new(format!("{area}_{g:03}"), location));
            for i in 0..items {
                let kind = if i % 4 == 3 {
                    ItemKind::Secondary
                } else {
                    ItemKind::Primary
                };
                let name = if (h >> 24).wrapping_add(i as u64) % 17 == 0 {
                    format!("{area}_job_{i}{RETIRED_SUFFIX}")
                } else {
                    format!("{area}_job_{i}")
                };
                group = group.with_item(kind, name);
            }
            group
        })
        .collect()
}

/// Fetcher that sleeps for a fixed latency and fabricates plausible detail.
#[derive(Debug)]
pub struct SimulatedFetcher {
    latency: Duration,
    fail_every: u64,
    seed: u64,
    calls: AtomicU64,
    canned: FxHashMap<String, ItemDetail>,
}

impl SimulatedFetcher {
    #[must_use]
    pub fn new(latency: Duration, seed: u64) -> Self {
        Self {
            latency,
            fail_every: 0,
            seed,
            calls: AtomicU64::new(0),
            canned: FxHashMap::default(),
        }
    }

    /// Fail every `n`th call with a transport error (0 disables).
    #[must_use]
    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = n;
        self
    }

    /// Serve these details verbatim, keyed by `name@location/item`.
    #[must_use]
    pub fn with_canned(mut self, canned: FxHashMap<String, ItemDetail>) -> Self {
        self.canned = canned;
        self
    }

    /// Calls made so far.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn synthesize(&self, key: &ItemKey) -> ItemDetail {
        let h = mix(self.seed, (&key.group.name, &key.group.location, &key.name));
        let base = 1_700_000_000.0 + (h % 86_400) as f64;
        let runs = (0..(h % 6)).map(|i| {
            let status = match mix(h, i) % 10 {
                0 => RunStatus::Failure,
                1 => RunStatus::Canceled,
                2 if i == 0 => RunStatus::Started,
                _ => RunStatus::Success,
            };
            let started = base - (i as f64) * 3_600.0;
            RunSummary {
                id: format!("{:08x}", mix(h, ("run", i)) as u32),
                status,
                started_at: Some(started),
                ended_at: status
                    .is_terminal()
                    .then(|| started + 30.0 + (mix(h, ("dur", i)) % 600) as f64),
            }
        });
        let tag = |prefix: &str, bit: u64| -> Option<Tag> {
            let present = (h >> bit) & 1 == 1;
            present.then(|| Tag {
                name: format!("{prefix}_{}", key.name),
                running: (h >> (bit + 1)) & 1 == 1,
            })
        };
        ItemDetail {
            description: Some(format!("{} in {}", key.name, key.group)),
            schedule_tags: tag("daily", 40).into_iter().collect(),
            sensor_tags: tag("on_upstream", 44).into_iter().collect(),
            recent_runs: RecentRuns::from_newest_first(runs, DEFAULT_RECENT_RUNS),
        }
    }
}

impl DetailFetcher for SimulatedFetcher {
    fn fetch_detail(
        &self,
        group: &GroupAddress,
        item_name: &str,
    ) -> Result<ItemDetail, FetchError> {
        std::thread::sleep(self.latency);
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if self.fail_every > 0 && call % self.fail_every == 0 {
            return Err(FetchError::Transport(format!("simulated timeout on call {call}")));
        }
        if item_name.ends_with(RETIRED_SUFFIX) {
            return Err(FetchError::NotFound);
        }
        let key = ItemKey::new(group.clone(), item_name);
        if let Some(detail) = self.canned.get(&key.to_string()) {
            return Ok(detail.clone());
        }
        Ok(self.synthesize(&key))
    }
}
