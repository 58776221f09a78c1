#![forbid(unsafe_code)]

//! Engine configuration.

use web_time::Duration;

use crate::model::Row;
use crate::window::Overscan;

/// Default namespace for persisted expansion state.
pub const DEFAULT_NAMESPACE: &str = "grouplist.expanded";

/// Fixed pixel height per row kind.
///
/// Heights of zero are bumped to one so every row occupies a distinct span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHeights {
    /// Height of a group header row.
    pub header: u32,
    /// Height of an item row.
    pub item: u32,
}

impl Default for RowHeights {
    fn default() -> Self {
        Self {
            header: 32,
            item: 64,
        }
    }
}

impl RowHeights {
    #[must_use]
    pub fn new(header: u32, item: u32) -> Self {
        Self {
            header: header.max(1),
            item: item.max(1),
        }
    }

    /// Height of a header row (never zero).
    #[inline]
    #[must_use]
    pub fn header(&self) -> u64 {
        u64::from(self.header.max(1))
    }

    /// Height of an item row (never zero).
    #[inline]
    #[must_use]
    pub fn item(&self) -> u64 {
        u64::from(self.item.max(1))
    }

    /// Height of a given row.
    #[must_use]
    pub fn height_of(&self, row: &Row) -> u64 {
        match row {
            Row::Header { .. } => self.header(),
            Row::Item { .. } => self.item(),
        }
    }
}

/// Lazy loader tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// How long an item row must stay materialized before its fetch is issued.
    pub stabilization_delay: Duration,
    /// Re-fetch details that are already loaded when their row is re-mounted.
    pub refetch_loaded: bool,
    /// Capacity of each item's recent-run feed.
    pub recent_run_limit: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            stabilization_delay: Duration::from_millis(300),
            refetch_loaded: false,
            recent_run_limit: crate::detail::DEFAULT_RECENT_RUNS,
        }
    }
}

/// Configuration for [`GroupListEngine`](crate::GroupListEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub row_heights: RowHeights,
    pub overscan: Overscan,
    pub loader: LoaderConfig,
    /// Namespace passed to the expansion backend.
    pub namespace: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            row_heights: RowHeights::default(),
            overscan: Overscan::Pixels(0),
            loader: LoaderConfig::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Set the per-kind row heights.
    #[must_use]
    pub fn with_row_heights(mut self, header: u32, item: u32) -> Self {
        self.row_heights = RowHeights::new(header, item);
        self
    }

    /// Set the overscan margin.
    #[must_use]
    pub fn with_overscan(mut self, overscan: Overscan) -> Self {
        self.overscan = overscan;
        self
    }

    /// Set the stabilization delay before a detail fetch is issued.
    #[must_use]
    pub fn with_stabilization_delay(mut self, delay: Duration) -> Self {
        self.loader.stabilization_delay = delay;
        self
    }

    /// Re-fetch already loaded details on re-mount.
    #[must_use]
    pub fn with_refetch_loaded(mut self, refetch: bool) -> Self {
        self.loader.refetch_loaded = refetch;
        self
    }

    /// Set the recent-run feed capacity.
    #[must_use]
    pub fn with_recent_run_limit(mut self, limit: usize) -> Self {
        self.loader.recent_run_limit = limit.max(1);
        self
    }

    /// Set the expansion store namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupAddress, ItemKind};

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.row_heights, RowHeights::new(32, 64));
        assert_eq!(config.loader.stabilization_delay, Duration::from_millis(300));
        assert_eq!(config.loader.recent_run_limit, 5);
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn zero_heights_are_bumped() {
        let heights = RowHeights::new(0, 0);
        assert_eq!(heights.header(), 1);
        assert_eq!(heights.item(), 1);
    }

    #[test]
    fn height_of_dispatches_on_row_kind() {
        let heights = RowHeights::new(20, 40);
        let group = GroupAddress::new("g", "l");
        let header = Row::Header {
            group: group.clone(),
            item_count: 3,
        };
        let item = Row::Item {
            group,
            kind: ItemKind::Secondary,
            name: "x".into(),
        };
        assert_eq!(heights.height_of(&header), 20);
        assert_eq!(heights.height_of(&item), 40);
    }

    #[test]
    fn builder_chain() {
        let config = EngineConfig::default()
            .with_row_heights(10, 30)
            .with_overscan(Overscan::Rows(2))
            .with_stabilization_delay(Duration::from_millis(50))
            .with_refetch_loaded(true)
            .with_recent_run_limit(0)
            .with_namespace("ns");
        assert_eq!(config.row_heights.item, 30);
        assert_eq!(config.overscan, Overscan::Rows(2));
        assert!(config.loader.refetch_loaded);
        assert_eq!(config.loader.recent_run_limit, 1);
        assert_eq!(config.namespace, "ns");
    }
}
