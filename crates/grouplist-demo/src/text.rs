#![forbid(unsafe_code)]

//! Plain-text [`Renderer`] that prints one line per materialized row.

use std::fmt::Write as _;

use ftui_grouplist::{DetailState, HeaderView, ItemDetail, ItemView, Renderer};

/// Accumulates one frame as text.
#[derive(Debug, Default)]
pub struct TextRenderer {
    scroll: u64,
    out: String,
    rows: usize,
}

impl TextRenderer {
    /// Renderer for a frame scrolled to `scroll`.
    #[must_use]
    pub fn new(scroll: u64) -> Self {
        Self {
            scroll,
            ..Self::default()
        }
    }

    /// Rows painted in the frame.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.out
    }
}

fn strip(detail: &ItemDetail) -> String {
    detail.recent_runs.status_strip().map(|run| run.status.glyph()).collect()
}

fn describe(detail: &ItemDetail) -> String {
    let mut text = strip(detail);
    if let Some(last) = detail.recent_runs.last_run() {
        let _ = write!(text, " last {:?}", last.status);
        if let Some(secs) = last.duration_secs() {
            let _ = write!(text, " {secs:.0}s");
        }
    }
    let tags = detail.schedule_tags.len() + detail.sensor_tags.len();
    if tags > 0 {
        let _ = write!(text, " tags:{tags}");
    }
    text
}

fn detail_cell(state: &DetailState<'_>) -> String {
    match state {
        DetailState::Pending => "…".to_string(),
        DetailState::Loading => "loading".to_string(),
        DetailState::Loaded(detail) => describe(detail),
        DetailState::Empty => "(not found)".to_string(),
        DetailState::Unavailable { previous: Some(detail) } => {
            format!("{} (stale: unavailable)", describe(detail))
        }
        DetailState::Unavailable { previous: None } => "unavailable".to_string(),
    }
}

impl Renderer for TextRenderer {
    fn begin(&mut self, total_height: u64) {
        let _ = writeln!(
            self.out,
            "── scroll {}/{} ──",
            self.scroll, total_height
        );
    }

    fn render_header(&mut self, offset: u64, _height: u64, header: &HeaderView<'_>) {
        let marker = if header.expanded { '▾' } else { '▸' };
        let _ = writeln!(
            self.out,
            "{offset:>7} {marker} {} ({})",
            header.address, header.item_count
        );
        self.rows += 1;
    }

    fn render_item(&mut self, offset: u64, _height: u64, item: &ItemView<'_>) {
        let _ = writeln!(
            self.out,
            "{offset:>7}   {:<28} {:<9} {}",
            item.name(),
            item.kind.label(),
            detail_cell(&item.detail)
        );
        self.rows += 1;
    }

    fn finish(&mut self) {
        let _ = writeln!(self.out, "── {} rows ──", self.rows);
    }
}
