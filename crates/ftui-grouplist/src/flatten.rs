#![forbid(unsafe_code)]

//! Flattening of the group/item hierarchy into a linear row sequence.
//!
//! # Invariants
//!
//! 1. Groups appear in input order, each as exactly one header row.
//! 2. An expanded group's items follow its header in input order.
//! 3. Items of collapsed groups are never visited, so the cost is linear in
//!    the number of emitted rows.

use crate::model::{Group, GroupAddress, Row};

/// Flatten `groups` into rows, expanding the groups for which `is_expanded`
/// returns true.
#[must_use]
pub fn flatten(groups: &[Group], is_expanded: impl Fn(&GroupAddress) -> bool) -> Vec<Row> {
    let mut rows = Vec::with_capacity(groups.len());
    for group in groups {
        rows.push(Row::header(group));
        if is_expanded(&group.address) {
            rows.extend(group.items.iter().map(Row::item));
        }
    }
    rows
}

/// Number of rows [`flatten`] would emit, without materializing them.
#[must_use]
pub fn flattened_len(groups: &[Group], is_expanded: impl Fn(&GroupAddress) -> bool) -> usize {
    groups
        .iter()
        .map(|group| {
            if is_expanded(&group.address) {
                1 + group.items.len()
            } else {
                1
            }
        })
        .sum()
}
