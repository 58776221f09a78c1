#![forbid(unsafe_code)]

//! Per-item detail data and the fetch interface that produces it.
//!
//! The recent-run feed is a single bounded list stored most-recent-first.
//! Renderers derive their views from it: [`RecentRuns::status_strip`] walks
//! it chronologically, [`RecentRuns::last_run`] picks the newest entry.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::GroupAddress;

/// Default capacity of the recent-run feed.
pub const DEFAULT_RECENT_RUNS: usize = 5;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Queued,
    NotStarted,
    Starting,
    Started,
    Success,
    Failure,
    Canceling,
    Canceled,
}

impl RunStatus {
    /// Whether the run has finished (successfully or not).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Canceled)
    }

    /// One-character glyph for compact status strips.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Queued | Self::NotStarted => '·',
            Self::Starting | Self::Started => '▶',
            Self::Success => '✓',
            Self::Failure => '✗',
            Self::Canceling | Self::Canceled => '⊘',
        }
    }
}

/// Summary of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub status: RunStatus,
    /// Start time, seconds since the Unix epoch.
    #[serde(default)]
    pub started_at: Option<f64>,
    /// End time, seconds since the Unix epoch.
    #[serde(default)]
    pub ended_at: Option<f64>,
}

impl RunSummary {
    /// Wall-clock duration in seconds, if the run has both endpoints.
    #[must_use]
    pub fn duration_secs(&self) -> Option<f64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) if end >= start => Some(end - start),
            _ => None,
        }
    }
}

/// Aggregate status counts over the recent-run feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatusHistory {
    pub succeeded: usize,
    pub failed: usize,
    pub canceled: usize,
    pub in_progress: usize,
}

impl RunStatusHistory {
    /// Number of runs counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.canceled + self.in_progress
    }
}

/// Bounded, most-recent-first feed of run summaries.
///
/// Pushing past capacity evicts the oldest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<RunSummary>", into = "Vec<RunSummary>")]
pub struct RecentRuns {
    /// Front is the most recent run.
    runs: VecDeque<RunSummary>,
    capacity: usize,
}

impl Default for RecentRuns {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_RUNS)
    }
}

impl RecentRuns {
    /// Create an empty feed. A capacity of zero is bumped to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            runs: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Build from runs ordered most-recent-first, keeping at most `capacity`.
    #[must_use]
    pub fn from_newest_first(runs: impl IntoIterator<Item = RunSummary>, capacity: usize) -> Self {
        let mut feed = Self::new(capacity);
        feed.runs.extend(runs.into_iter().take(feed.capacity));
        feed
    }

    /// Record a new most-recent run, evicting the oldest when full.
    pub fn push_latest(&mut self, run: RunSummary) {
        if self.runs.len() >= self.capacity {
            self.runs.pop_back();
        }
        self.runs.push_front(run);
    }

    /// Change the capacity, dropping the oldest runs if it shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.runs.truncate(self.capacity);
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Runs, most recent first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &RunSummary> {
        self.runs.iter()
    }

    /// Runs in chronological order (oldest first), for status strips.
    pub fn status_strip(&self) -> impl Iterator<Item = &RunSummary> {
        self.runs.iter().rev()
    }

    /// The most recent run.
    #[must_use]
    pub fn last_run(&self) -> Option<&RunSummary> {
        self.runs.front()
    }

    /// Aggregate status counts.
    #[must_use]
    pub fn status_history(&self) -> RunStatusHistory {
        self.runs
            .iter()
            .fold(RunStatusHistory::default(), |mut acc, run| {
                match run.status {
                    RunStatus::Success => acc.succeeded += 1,
                    RunStatus::Failure => acc.failed += 1,
                    RunStatus::Canceled => acc.canceled += 1,
                    _ => acc.in_progress += 1,
                }
                acc
            })
    }
}

impl From<Vec<RunSummary>> for RecentRuns {
    fn from(runs: Vec<RunSummary>) -> Self {
        Self::from_newest_first(runs, DEFAULT_RECENT_RUNS)
    }
}

impl From<RecentRuns> for Vec<RunSummary> {
    fn from(feed: RecentRuns) -> Self {
        feed.runs.into()
    }
}

/// A schedule or sensor attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    /// Whether the schedule/sensor is currently running.
    #[serde(default)]
    pub running: bool,
}

/// Lazily fetched detail for one item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDetail {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub schedule_tags: Vec<Tag>,
    #[serde(default)]
    pub sensor_tags: Vec<Tag>,
    #[serde(default)]
    pub recent_runs: RecentRuns,
}

impl ItemDetail {
    /// Whether the detail carries any data at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.schedule_tags.is_empty()
            && self.sensor_tags.is_empty()
            && self.recent_runs.is_empty()
    }
}

/// Failure of a detail fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The item no longer resolves on the server.
    NotFound,
    /// Network or protocol failure.
    Transport(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "item not found"),
            Self::Transport(msg) => write!(f, "fetch failed: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Transport that resolves an item's detail.
///
/// Called off the engine thread by [`Driver`](crate::Driver); implementations
/// may block.
pub trait DetailFetcher: Send + Sync {
    fn fetch_detail(&self, group: &GroupAddress, item_name: &str)
    -> Result<ItemDetail, FetchError>;
}

impl<F> DetailFetcher for F
where
    F: Fn(&GroupAddress, &str) -> Result<ItemDetail, FetchError> + Send + Sync,
{
    fn fetch_detail(
        &self,
        group: &GroupAddress,
        item_name: &str,
    ) -> Result<ItemDetail, FetchError> {
        self(group, item_name)
    }
}
