#![forbid(unsafe_code)]

//! Visible-window computation over a [`RowLayout`].
//!
//! The window is the contiguous run of rows intersecting
//! `[scroll - overscan, scroll + viewport + overscan)`. Two O(log G) lookups
//! locate its ends; offsets are then accumulated row by row from the first
//! row's offset, so adjacent entries can never overlap or leave a seam.

use std::ops::Range;

use crate::layout::{RowLayout, RowPosition};
use crate::model::{Group, Row};

/// Extra margin materialized around the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overscan {
    /// Extend the viewport by this many pixels on both sides.
    Pixels(u32),
    /// Extend the window by this many rows on both sides.
    Rows(usize),
}

impl Default for Overscan {
    fn default() -> Self {
        Self::Pixels(0)
    }
}

/// One materialized row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEntry {
    /// Index in the flattened sequence.
    pub index: usize,
    /// Absolute start pixel.
    pub offset: u64,
    /// Height in pixels.
    pub size: u64,
    /// Where the row lives in the hierarchy.
    pub position: RowPosition,
}

impl WindowEntry {
    /// One past the last pixel of the row.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// The rows to materialize for one scroll position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleWindow {
    entries: Vec<WindowEntry>,
    total_height: u64,
    scroll_offset: u64,
}

impl VisibleWindow {
    /// A window with no rows.
    #[must_use]
    pub fn empty(total_height: u64) -> Self {
        Self {
            entries: Vec::new(),
            total_height,
            scroll_offset: 0,
        }
    }

    /// Materialized rows in index order.
    #[must_use]
    pub fn entries(&self) -> &[WindowEntry] {
        &self.entries
    }

    /// Range of materialized row indices.
    #[must_use]
    pub fn indices(&self) -> Range<usize> {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => first.index..last.index + 1,
            _ => 0..0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether row `index` is materialized.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.indices().contains(&index)
    }

    fn entry(&self, index: usize) -> Option<&WindowEntry> {
        let first = self.entries.first()?.index;
        self.entries.get(index.checked_sub(first)?)
    }

    /// Start pixel of materialized row `index`.
    #[must_use]
    pub fn offset_of(&self, index: usize) -> Option<u64> {
        self.entry(index).map(|e| e.offset)
    }

    /// Height of materialized row `index`.
    #[must_use]
    pub fn size_of(&self, index: usize) -> Option<u64> {
        self.entry(index).map(|e| e.size)
    }

    /// Total scrollable height of the whole list.
    #[must_use]
    pub fn total_height(&self) -> u64 {
        self.total_height
    }

    /// Scroll offset the window was computed for, after clamping.
    #[must_use]
    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    /// Resolve the materialized rows against the group snapshot.
    pub fn rows<'a>(
        &'a self,
        layout: &'a RowLayout,
        groups: &'a [Group],
    ) -> impl Iterator<Item = (&'a WindowEntry, Row)> + 'a {
        self.entries
            .iter()
            .filter_map(move |entry| layout.resolve(groups, entry.position).map(|row| (entry, row)))
    }
}

/// Compute the rows to materialize for a scroll position.
///
/// - An empty layout or a zero viewport yields an empty window.
/// - A `scroll_offset` at or past the total height is clamped to the start
///   of the last row.
/// - Row overscan is clamped to `[0, len)`.
#[must_use]
pub fn compute_window(
    layout: &RowLayout,
    scroll_offset: u64,
    viewport_height: u64,
    overscan: Overscan,
) -> VisibleWindow {
    let _span = tracing::trace_span!(
        "compute_window",
        rows = layout.len(),
        scroll = scroll_offset,
        viewport = viewport_height
    )
    .entered();

    let total = layout.total_height();
    if layout.is_empty() || viewport_height == 0 {
        return VisibleWindow::empty(total);
    }
    let last_row = layout.len() - 1;
    let scroll = if scroll_offset >= total {
        layout.offset_of_row(last_row)
    } else {
        scroll_offset
    };

    let (pixel_margin, row_margin) = match overscan {
        Overscan::Pixels(px) => (u64::from(px), 0),
        Overscan::Rows(n) => (0, n),
    };
    let start_px = scroll.saturating_sub(pixel_margin);
    let end_px = scroll
        .saturating_add(viewport_height)
        .saturating_add(pixel_margin)
        .min(total);

    // scroll < total and viewport > 0, so end_px > start_px.
    let first = layout.row_at_offset(start_px).saturating_sub(row_margin);
    let last = layout
        .row_at_offset(end_px - 1)
        .saturating_add(row_margin)
        .min(last_row);

    let mut offset = layout.offset_of_row(first);
    let entries = layout
        .positions_from(first)
        .take(last - first + 1)
        .enumerate()
        .map(|(i, position)| {
            let size = layout.height_at(position);
            let entry = WindowEntry {
                index: first + i,
                offset,
                size,
                position,
            };
            offset += size;
            entry
        })
        .collect();

    VisibleWindow {
        entries,
        total_height: total,
        scroll_offset: scroll,
    }
}
