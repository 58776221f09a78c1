#![forbid(unsafe_code)]

//! Rendering contract between the engine and the host.
//!
//! The engine calls [`Renderer::begin`] once per frame, then one
//! `render_*` call per materialized row in index order, then
//! [`Renderer::finish`]. Rows outside the window are never passed.

use crate::engine::Msg;
use crate::loader::DetailState;
use crate::model::{GroupAddress, ItemKey, ItemKind};

/// A group header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderView<'a> {
    /// Index in the flattened sequence.
    pub index: usize,
    pub address: &'a GroupAddress,
    pub item_count: usize,
    pub expanded: bool,
}

impl HeaderView<'_> {
    /// Message that flips this group's expansion when fed back to the engine.
    #[must_use]
    pub fn toggle_msg(&self) -> Msg {
        Msg::Toggle(self.address.clone())
    }

    /// Navigation target of the group.
    #[must_use]
    pub fn path(&self) -> String {
        crate::navigation::group_path(self.address)
    }
}

/// An item row.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView<'a> {
    /// Index in the flattened sequence.
    pub index: usize,
    pub key: &'a ItemKey,
    pub kind: ItemKind,
    pub detail: DetailState<'a>,
    /// Navigation target of the item.
    pub path: String,
}

impl ItemView<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.key.name
    }
}

/// Host-side row painter.
///
/// `offset` is the row's absolute start pixel and `height` its size; the host
/// positions the row at `offset - scroll` inside a scroll area of
/// `total_height` pixels.
pub trait Renderer {
    /// Start of a frame.
    fn begin(&mut self, total_height: u64) {
        let _ = total_height;
    }

    fn render_header(&mut self, offset: u64, height: u64, header: &HeaderView<'_>);

    fn render_item(&mut self, offset: u64, height: u64, item: &ItemView<'_>);

    /// End of a frame.
    fn finish(&mut self) {}
}
