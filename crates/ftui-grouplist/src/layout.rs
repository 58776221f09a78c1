#![forbid(unsafe_code)]

//! Prefix-sum row index over the flattened group list.
//!
//! [`RowLayout`] never materializes the flattened sequence. It keeps two
//! Fenwick trees indexed by group: one holding each group's row count
//! (`1 + items` when expanded, `1` otherwise) and one holding each group's
//! pixel height. Inside a group the mapping is arithmetic because every row
//! kind has a fixed height.
//!
//! # Operations
//!
//! | Operation        | Time     |
//! |------------------|----------|
//! | `build`          | O(G)     |
//! | `set_expanded`   | O(log G) |
//! | `position_of`    | O(log G) |
//! | `offset_of_row`  | O(log G) |
//! | `row_at_offset`  | O(log G) |
//! | `total_height`   | O(1)     |
//!
//! # Invariants
//!
//! 1. `rows.get(g) == 1 + expanded[g] * item_counts[g]`.
//! 2. `pixels.get(g) == header + expanded[g] * item_counts[g] * item`.
//! 3. `offset_of_row(i + 1) == offset_of_row(i) + height_of_row(i)`.

use crate::config::RowHeights;
use crate::fenwick::FenwickTree;
use crate::model::{Group, GroupAddress, Row};

/// Location of a flattened row within the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPosition {
    /// Index of the owning group in the input list.
    pub group: usize,
    /// Item index within the group, `None` for the header row.
    pub item: Option<usize>,
}

impl RowPosition {
    #[must_use]
    pub fn is_header(&self) -> bool {
        self.item.is_none()
    }
}

/// Incrementally maintained row/pixel index for a grouped list.
#[derive(Debug, Clone, Default)]
pub struct RowLayout {
    heights: RowHeights,
    item_counts: Vec<usize>,
    expanded: Vec<bool>,
    rows: FenwickTree,
    pixels: FenwickTree,
    total_rows: usize,
    total_height: u64,
}

impl RowLayout {
    /// Create an empty layout.
    #[must_use]
    pub fn new(heights: RowHeights) -> Self {
        Self {
            heights,
            ..Self::default()
        }
    }

    /// Build a layout for `groups`. O(G): item lists are only measured.
    #[must_use]
    pub fn build(
        groups: &[Group],
        heights: RowHeights,
        is_expanded: impl Fn(&GroupAddress) -> bool,
    ) -> Self {
        let mut layout = Self::new(heights);
        layout.rebuild(groups, is_expanded);
        layout
    }

    /// Replace the layout with one for a new group snapshot.
    pub fn rebuild(&mut self, groups: &[Group], is_expanded: impl Fn(&GroupAddress) -> bool) {
        self.item_counts = groups.iter().map(Group::len).collect();
        self.expanded = groups.iter().map(|g| is_expanded(&g.address)).collect();
        let row_counts: Vec<u64> = (0..groups.len()).map(|g| self.group_rows(g)).collect();
        let pixel_heights: Vec<u64> = (0..groups.len()).map(|g| self.group_pixels(g)).collect();
        self.rows = FenwickTree::from_values(&row_counts);
        self.pixels = FenwickTree::from_values(&pixel_heights);
        self.refresh_totals();
    }

    /// Expand or collapse one group, patching both prefix trees in place.
    ///
    /// Returns `true` if the state changed.
    pub fn set_expanded(&mut self, group: usize, expanded: bool) -> bool {
        let Some(slot) = self.expanded.get_mut(group) else {
            return false;
        };
        if *slot == expanded {
            return false;
        }
        *slot = expanded;
        let rows = self.group_rows(group);
        let pixels = self.group_pixels(group);
        self.rows.set(group, rows);
        self.pixels.set(group, pixels);
        self.refresh_totals();
        true
    }

    fn refresh_totals(&mut self) {
        self.total_rows = usize::try_from(self.rows.total()).unwrap_or(usize::MAX);
        self.total_height = self.pixels.total();
    }

    fn group_rows(&self, group: usize) -> u64 {
        if self.expanded[group] {
            1 + self.item_counts[group] as u64
        } else {
            1
        }
    }

    fn group_pixels(&self, group: usize) -> u64 {
        if self.expanded[group] {
            self.heights.header() + self.item_counts[group] as u64 * self.heights.item()
        } else {
            self.heights.header()
        }
    }

    /// Row heights in use.
    #[must_use]
    pub fn heights(&self) -> RowHeights {
        self.heights
    }

    /// Number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.item_counts.len()
    }

    /// Whether group `group` is currently expanded.
    #[must_use]
    pub fn is_expanded(&self, group: usize) -> bool {
        self.expanded.get(group).copied().unwrap_or(false)
    }

    /// Number of items in group `group`, expanded or not.
    #[must_use]
    pub fn item_count(&self, group: usize) -> usize {
        self.item_counts.get(group).copied().unwrap_or(0)
    }

    /// Number of flattened rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.total_rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    /// Sum of all row heights.
    #[must_use]
    pub fn total_height(&self) -> u64 {
        self.total_height
    }

    /// Flattened index of a group's header row.
    #[must_use]
    pub fn header_row(&self, group: usize) -> usize {
        self.rows.prefix_before(group.min(self.group_count())) as usize
    }

    /// Pixel offset of a group's header row.
    #[must_use]
    pub fn group_offset(&self, group: usize) -> u64 {
        self.pixels.prefix_before(group.min(self.group_count()))
    }

    /// Hierarchical position of flattened row `row`.
    #[must_use]
    pub fn position_of(&self, row: usize) -> Option<RowPosition> {
        if row >= self.total_rows {
            return None;
        }
        let group = self.rows.find_prefix(row as u64).map_or(0, |i| i + 1);
        let local = row - self.header_row(group);
        Some(RowPosition {
            group,
            item: local.checked_sub(1),
        })
    }

    /// Flattened index of a hierarchical position.
    #[must_use]
    pub fn row_index(&self, position: RowPosition) -> usize {
        self.header_row(position.group) + position.item.map_or(0, |i| i + 1)
    }

    /// Height of a row at `position`.
    #[must_use]
    pub fn height_at(&self, position: RowPosition) -> u64 {
        if position.is_header() {
            self.heights.header()
        } else {
            self.heights.item()
        }
    }

    /// Height of flattened row `row` (0 when out of range).
    #[must_use]
    pub fn height_of_row(&self, row: usize) -> u64 {
        self.position_of(row).map_or(0, |p| self.height_at(p))
    }

    /// Pixel offset of the start of flattened row `row`.
    ///
    /// Returns `total_height` for `row >= len`.
    #[must_use]
    pub fn offset_of_row(&self, row: usize) -> u64 {
        match self.position_of(row) {
            None => self.total_height,
            Some(position) => self.offset_at(position),
        }
    }

    /// Pixel offset of a hierarchical position.
    #[must_use]
    pub fn offset_at(&self, position: RowPosition) -> u64 {
        let base = self.group_offset(position.group);
        match position.item {
            None => base,
            Some(i) => base + self.heights.header() + i as u64 * self.heights.item(),
        }
    }

    /// Flattened index of the row covering pixel `offset`.
    ///
    /// Row `i` covers `[offset_of_row(i), offset_of_row(i + 1))`. Returns
    /// `len` when `offset` is at or beyond the total height.
    #[must_use]
    pub fn row_at_offset(&self, offset: u64) -> usize {
        if offset >= self.total_height {
            return self.total_rows;
        }
        let group = self.pixels.find_prefix(offset).map_or(0, |i| i + 1);
        let local = offset - self.group_offset(group);
        let header = self.heights.header();
        let item = if local < header || !self.is_expanded(group) {
            None
        } else {
            let idx = ((local - header) / self.heights.item()) as usize;
            Some(idx.min(self.item_count(group).saturating_sub(1)))
        };
        self.row_index(RowPosition { group, item })
    }

    /// Materialize the row at `position` from the group snapshot the layout
    /// was built from.
    #[must_use]
    pub fn resolve(&self, groups: &[Group], position: RowPosition) -> Option<Row> {
        let group = groups.get(position.group)?;
        match position.item {
            None => Some(Row::header(group)),
            Some(i) => group.items.get(i).map(Row::item),
        }
    }

    /// Walk positions starting at flattened row `start`, in order.
    pub fn positions_from(&self, start: usize) -> Positions<'_> {
        Positions {
            layout: self,
            next: self.position_of(start),
        }
    }
}

/// Iterator over consecutive row positions; see [`RowLayout::positions_from`].
#[derive(Debug, Clone)]
pub struct Positions<'a> {
    layout: &'a RowLayout,
    next: Option<RowPosition>,
}

impl Iterator for Positions<'_> {
    type Item = RowPosition;

    fn next(&mut self) -> Option<RowPosition> {
        let current = self.next?;
        let items_shown = if self.layout.is_expanded(current.group) {
            self.layout.item_count(current.group)
        } else {
            0
        };
        let following_item = current.item.map_or(0, |i| i + 1);
        self.next = if following_item < items_shown {
            Some(RowPosition {
                group: current.group,
                item: Some(following_item),
            })
        } else if current.group + 1 < self.layout.group_count() {
            Some(RowPosition {
                group: current.group + 1,
                item: None,
            })
        } else {
            None
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use crate::model::ItemKind;

    fn groups(sizes: &[usize]) -> Vec<Group> {
        sizes
            .iter()
            .enumerate()
            .map(|(g, &n)| {
                Group::new(GroupAddress::new(format!("g{g}"), "loc"))
                    .with_items(ItemKind::Primary, (0..n).map(|i| format!("item{i}")))
            })
            .collect()
    }

    fn assert_matches_flatten(layout: &RowLayout, groups: &[Group], expanded: &[bool]) {
        let rows = flatten(groups, |addr| {
            groups
                .iter()
                .position(|g| &g.address == addr)
                .is_some_and(|i| expanded[i])
        });
        assert_eq!(layout.len(), rows.len());
        let mut offset = 0;
        for (i, row) in rows.iter().enumerate() {
            let position = layout.position_of(i).expect("in range");
            assert_eq!(layout.resolve(groups, position).as_ref(), Some(row), "row {i}");
            assert_eq!(layout.offset_of_row(i), offset, "offset of row {i}");
            assert_eq!(layout.row_at_offset(offset), i, "row at offset {offset}");
            offset += layout.heights().height_of(row);
        }
        assert_eq!(layout.total_height(), offset);
    }

    #[test]
    fn empty_layout() {
        let layout = RowLayout::new(RowHeights::default());
        assert!(layout.is_empty());
        assert_eq!(layout.total_height(), 0);
        assert_eq!(layout.position_of(0), None);
        assert_eq!(layout.row_at_offset(0), 0);
        assert_eq!(layout.positions_from(0).count(), 0);
    }

    #[test]
    fn build_matches_flatten() {
        let groups = groups(&[2, 0, 3, 1]);
        let expanded = [true, true, false, true];
        let layout = RowLayout::build(&groups, RowHeights::new(32, 64), |addr| {
            let i = groups.iter().position(|g| &g.address == addr).unwrap_or(0);
            expanded[i]
        });
        assert_matches_flatten(&layout, &groups, &expanded);
    }

    #[test]
    fn toggle_patches_incrementally() {
        let groups = groups(&[3, 2, 4]);
        let mut expanded = [false, false, false];
        let mut layout = RowLayout::build(&groups, RowHeights::new(10, 25), |_| false);
        assert_eq!(layout.len(), 3);
        assert_eq!(layout.total_height(), 30);

        assert!(layout.set_expanded(1, true));
        expanded[1] = true;
        assert_matches_flatten(&layout, &groups, &expanded);

        assert!(layout.set_expanded(0, true));
        expanded[0] = true;
        assert_matches_flatten(&layout, &groups, &expanded);

        assert!(!layout.set_expanded(0, true));
        assert!(!layout.set_expanded(99, true));

        assert!(layout.set_expanded(1, false));
        expanded[1] = false;
        assert_matches_flatten(&layout, &groups, &expanded);
    }

    #[test]
    fn row_at_offset_inside_rows_and_past_end() {
        // Heights: header 10, item 20; rows: H(0..10) I(10..30) I(30..50) H(50..60)
        let groups = groups(&[2, 5]);
        let layout = RowLayout::build(&groups, RowHeights::new(10, 20), |addr| addr.name == "g0");
        assert_eq!(layout.row_at_offset(9), 0);
        assert_eq!(layout.row_at_offset(10), 1);
        assert_eq!(layout.row_at_offset(29), 1);
        assert_eq!(layout.row_at_offset(30), 2);
        assert_eq!(layout.row_at_offset(55), 3);
        assert_eq!(layout.row_at_offset(60), 4);
        assert_eq!(layout.row_at_offset(u64::MAX), 4);
    }

    #[test]
    fn positions_walk_skips_collapsed_items() {
        let groups = groups(&[2, 3, 1]);
        let layout = RowLayout::build(&groups, RowHeights::default(), |addr| addr.name != "g1");
        let walked: Vec<RowPosition> = layout.positions_from(1).collect();
        assert_eq!(
            walked,
            vec![
                RowPosition { group: 0, item: Some(0) },
                RowPosition { group: 0, item: Some(1) },
                RowPosition { group: 1, item: None },
                RowPosition { group: 2, item: None },
                RowPosition { group: 2, item: Some(0) },
            ]
        );
    }

    #[test]
    fn header_row_and_group_offset() {
        let groups = groups(&[2, 3]);
        let layout = RowLayout::build(&groups, RowHeights::new(32, 64), |_| true);
        assert_eq!(layout.header_row(1), 3);
        assert_eq!(layout.group_offset(1), 32 + 2 * 64);
        assert_eq!(layout.header_row(5), layout.len());
    }
}
