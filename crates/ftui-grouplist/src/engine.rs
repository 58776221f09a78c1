#![forbid(unsafe_code)]

//! The grouped list engine.
//!
//! [`GroupListEngine`] follows the Elm architecture: every input is a
//! [`Msg`], every side effect is returned as a [`Cmd`] for the host to run.
//! The engine itself never sleeps, spawns, or performs I/O beyond the
//! injected expansion backend.
//!
//! # Update cycle
//!
//! Each state-changing message patches the layout, recomputes the visible
//! window, and resyncs the loader's mounted set with the item rows in that
//! window. The returned command carries a [`Cmd::Tick`] wake-up hint whenever
//! a fetch timer is pending; the host answers with [`Msg::Tick`] once the
//! hinted duration has elapsed.

use rustc_hash::{FxHashMap, FxHashSet};
use web_time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::detail::{FetchError, ItemDetail};
use crate::expansion::{ExpansionBackend, ExpansionState};
use crate::flatten::flatten;
use crate::layout::RowLayout;
use crate::loader::{DetailState, FetchRequest, FetchTicket, LazyItemLoader};
use crate::model::{Group, GroupAddress, ItemKey, Row};
use crate::navigation::item_path;
use crate::render::{HeaderView, ItemView, Renderer};
use crate::window::{VisibleWindow, WindowEntry, compute_window};

/// Input events.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Replace the group snapshot. Addresses must be unique; later
    /// duplicates are dropped.
    SetGroups(Vec<Group>),
    /// Scroll to an absolute pixel offset.
    Scroll(u64),
    /// Scroll by a signed pixel delta.
    ScrollBy(i64),
    /// Viewport height changed.
    Resize(u64),
    /// Flip a group's expansion.
    Toggle(GroupAddress),
    /// Time has advanced; issue due fetches.
    Tick(Instant),
    /// A fetch issued via [`Cmd::Fetch`] finished.
    FetchCompleted {
        ticket: FetchTicket,
        result: Result<ItemDetail, FetchError>,
    },
}

impl Msg {
    /// Variant name, for spans.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetGroups(_) => "SetGroups",
            Self::Scroll(_) => "Scroll",
            Self::ScrollBy(_) => "ScrollBy",
            Self::Resize(_) => "Resize",
            Self::Toggle(_) => "Toggle",
            Self::Tick(_) => "Tick",
            Self::FetchCompleted { .. } => "FetchCompleted",
        }
    }
}

/// Side effects requested by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cmd {
    /// No operation.
    #[default]
    None,
    /// Several commands.
    Batch(Vec<Cmd>),
    /// Fetch an item's detail and answer with [`Msg::FetchCompleted`].
    Fetch(FetchRequest),
    /// Send [`Msg::Tick`] after this long.
    Tick(Duration),
}

impl Cmd {
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::None
    }

    /// Combine commands, collapsing empty and singleton batches.
    #[must_use]
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|cmd| !cmd.is_none()).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or_default(),
            _ => Self::Batch(cmds),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Every fetch request in this command, in order.
    #[must_use]
    pub fn fetches(&self) -> Vec<&FetchRequest> {
        let mut out = Vec::new();
        self.collect_fetches(&mut out);
        out
    }

    fn collect_fetches<'a>(&'a self, out: &mut Vec<&'a FetchRequest>) {
        match self {
            Self::Fetch(request) => out.push(request),
            Self::Batch(cmds) => cmds.iter().for_each(|cmd| cmd.collect_fetches(out)),
            Self::None | Self::Tick(_) => {}
        }
    }

    /// Shortest wake-up hint in this command.
    #[must_use]
    pub fn tick_after(&self) -> Option<Duration> {
        match self {
            Self::Tick(after) => Some(*after),
            Self::Batch(cmds) => cmds.iter().filter_map(Self::tick_after).min(),
            Self::None | Self::Fetch(_) => None,
        }
    }
}

/// Virtualized, collapsible, grouped list.
#[derive(Debug)]
pub struct GroupListEngine {
    config: EngineConfig,
    groups: Vec<Group>,
    group_index: FxHashMap<GroupAddress, usize>,
    expansion: ExpansionState,
    layout: RowLayout,
    window: VisibleWindow,
    loader: LazyItemLoader,
    scroll: u64,
    viewport: u64,
}

impl GroupListEngine {
    /// Create an engine with no groups and a zero-height viewport.
    ///
    /// The expanded set is loaded from `backend` under
    /// [`EngineConfig::namespace`] here, once.
    #[must_use]
    pub fn new(config: EngineConfig, backend: Box<dyn ExpansionBackend>) -> Self {
        let expansion = ExpansionState::load(backend, config.namespace.clone());
        let layout = RowLayout::new(config.row_heights);
        let loader = LazyItemLoader::new(config.loader.clone());
        Self {
            config,
            groups: Vec::new(),
            group_index: FxHashMap::default(),
            expansion,
            layout,
            window: VisibleWindow::default(),
            loader,
            scroll: 0,
            viewport: 0,
        }
    }

    /// Handle a message at the current time.
    pub fn update(&mut self, msg: Msg) -> Cmd {
        self.update_at(msg, Instant::now())
    }

    /// Handle a message at an explicit time.
    ///
    /// [`Msg::Tick`] carries its own time and ignores `now`.
    pub fn update_at(&mut self, msg: Msg, now: Instant) -> Cmd {
        let _span = tracing::debug_span!("grouplist.update", msg = msg.name()).entered();
        match msg {
            Msg::SetGroups(groups) => self.set_groups(groups),
            Msg::Scroll(offset) => self.scroll = offset,
            Msg::ScrollBy(delta) => {
                self.scroll = if delta < 0 {
                    self.scroll.saturating_sub(delta.unsigned_abs())
                } else {
                    self.scroll.saturating_add(delta.unsigned_abs())
                };
            }
            Msg::Resize(height) => self.viewport = height,
            Msg::Toggle(address) => {
                if !self.toggle(&address) {
                    return Cmd::None;
                }
            }
            Msg::Tick(at) => return self.poll(at),
            Msg::FetchCompleted { ticket, result } => {
                self.loader.complete(ticket, result);
                return Cmd::None;
            }
        }
        self.refresh(now)
    }

    fn set_groups(&mut self, groups: Vec<Group>) {
        let received = groups.len();
        let mut seen = FxHashSet::default();
        self.groups = groups
            .into_iter()
            .filter(|group| seen.insert(group.address.clone()))
            .collect();
        if self.groups.len() < received {
            tracing::warn!(
                dropped = received - self.groups.len(),
                "duplicate group addresses in snapshot"
            );
        }
        self.group_index = self
            .groups
            .iter()
            .enumerate()
            .map(|(i, group)| (group.address.clone(), i))
            .collect();
        let expansion = &self.expansion;
        self.layout
            .rebuild(&self.groups, |address| expansion.is_expanded(address));

        let live: FxHashSet<ItemKey> = self
            .groups
            .iter()
            .flat_map(|group| group.items.iter().map(|item| item.key()))
            .collect();
        self.loader.retain(|key| live.contains(key));
        tracing::debug!(
            groups = self.groups.len(),
            rows = self.layout.len(),
            "group snapshot replaced"
        );
    }

    fn toggle(&mut self, address: &GroupAddress) -> bool {
        let Some(&group) = self.group_index.get(address) else {
            tracing::debug!(group = %address, "toggle ignored for unknown group");
            return false;
        };
        let expanded = self.expansion.toggle(address);
        self.layout.set_expanded(group, expanded);
        tracing::debug!(group = %address, expanded, "group toggled");
        true
    }

    fn poll(&mut self, now: Instant) -> Cmd {
        let mut cmds: Vec<Cmd> = self.loader.poll(now).into_iter().map(Cmd::Fetch).collect();
        cmds.push(self.wake_hint(now));
        Cmd::batch(cmds)
    }

    fn wake_hint(&self, now: Instant) -> Cmd {
        match self.loader.next_deadline() {
            Some(deadline) => Cmd::Tick(deadline.saturating_duration_since(now)),
            None => Cmd::None,
        }
    }

    /// Clamp the scroll offset, recompute the window, and resync the loader.
    fn refresh(&mut self, now: Instant) -> Cmd {
        self.scroll = self.scroll.min(self.max_scroll());
        self.window = compute_window(
            &self.layout,
            self.scroll,
            self.viewport,
            self.config.overscan,
        );

        let groups = &self.groups;
        let mounted = self.window.entries().iter().filter_map(|entry| {
            let item = entry.position.item?;
            groups
                .get(entry.position.group)
                .and_then(|group| group.items.get(item))
                .map(|item| item.key())
        });
        let diff = self.loader.sync_mounted(mounted, now);
        if diff.scheduled > 0 || diff.cancelled > 0 {
            tracing::trace!(
                scheduled = diff.scheduled,
                cancelled = diff.cancelled,
                "mounted items changed"
            );
        }
        self.wake_hint(now)
    }

    /// Largest meaningful scroll offset.
    #[must_use]
    pub fn max_scroll(&self) -> u64 {
        self.layout.total_height().saturating_sub(self.viewport)
    }

    /// Scroll so `address`'s header is at the top (clamped).
    pub fn scroll_to_group(&mut self, address: &GroupAddress) -> Cmd {
        self.scroll_to_group_at(address, Instant::now())
    }

    /// [`Self::scroll_to_group`] at an explicit time.
    pub fn scroll_to_group_at(&mut self, address: &GroupAddress, now: Instant) -> Cmd {
        match self.group_offset(address) {
            Some(offset) => self.update_at(Msg::Scroll(offset), now),
            None => Cmd::None,
        }
    }

    /// Start pixel of a group's header.
    #[must_use]
    pub fn group_offset(&self, address: &GroupAddress) -> Option<u64> {
        self.group_index
            .get(address)
            .map(|&group| self.layout.group_offset(group))
    }

    /// Paint the current window.
    pub fn view<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        renderer.begin(self.layout.total_height());
        for entry in self.window.entries() {
            let Some(group) = self.groups.get(entry.position.group) else {
                continue;
            };
            match entry.position.item {
                None => renderer.render_header(
                    entry.offset,
                    entry.size,
                    &HeaderView {
                        index: entry.index,
                        address: &group.address,
                        item_count: group.items.len(),
                        expanded: self.layout.is_expanded(entry.position.group),
                    },
                ),
                Some(i) => {
                    let Some(item) = group.items.get(i) else {
                        continue;
                    };
                    let key = item.key();
                    renderer.render_item(
                        entry.offset,
                        entry.size,
                        &ItemView {
                            index: entry.index,
                            key: &key,
                            kind: item.kind,
                            detail: self.loader.state(&key),
                            path: item_path(&group.address, &item.name),
                        },
                    );
                }
            }
        }
        renderer.finish();
    }

    /// Materialized rows of the current window.
    pub fn rows(&self) -> impl Iterator<Item = (&WindowEntry, Row)> + '_ {
        self.window.rows(&self.layout, &self.groups)
    }

    /// The whole flattened sequence, including rows outside the window.
    #[must_use]
    pub fn flattened(&self) -> Vec<Row> {
        flatten(&self.groups, |address| self.expansion.is_expanded(address))
    }

    #[must_use]
    pub fn window(&self) -> &VisibleWindow {
        &self.window
    }

    #[must_use]
    pub fn total_height(&self) -> u64 {
        self.layout.total_height()
    }

    #[must_use]
    pub fn scroll_offset(&self) -> u64 {
        self.scroll
    }

    #[must_use]
    pub fn viewport_height(&self) -> u64 {
        self.viewport
    }

    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    #[must_use]
    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    #[must_use]
    pub fn loader(&self) -> &LazyItemLoader {
        &self.loader
    }

    #[must_use]
    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn is_expanded(&self, address: &GroupAddress) -> bool {
        self.expansion.is_expanded(address)
    }

    /// Render-facing detail state of an item.
    #[must_use]
    pub fn detail_state(&self, key: &ItemKey) -> DetailState<'_> {
        self.loader.state(key)
    }
}
