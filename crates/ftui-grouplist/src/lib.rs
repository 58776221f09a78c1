#![forbid(unsafe_code)]

//! Virtualized grouped list engine for FrankenTUI hosts.
//!
//! Renders a large two-level list (groups containing items) inside a
//! fixed-height viewport by materializing only the rows that intersect the
//! viewport plus an overscan margin. Item rows lazily fetch their detail data
//! after a short stabilization delay so that fast scrolling does not turn into
//! a request storm.
//!
//! # Pipeline
//!
//! ```text
//! groups + ExpansionState ─► RowLayout (prefix sums) ─► compute_window ─► Renderer
//!                                                            │
//!                                                            └─► LazyItemLoader ─► Cmd::Fetch
//! ```
//!
//! # Core Types
//!
//! - [`GroupListEngine`] - Elm-style model: feed it [`Msg`]s, execute the [`Cmd`]s it returns
//! - [`RowLayout`] - Fenwick-backed row index, patched in O(log G) on expand/collapse
//! - [`VisibleWindow`] - the materialized rows with stable offsets and sizes
//! - [`LazyItemLoader`] - debounced, cancellable, idempotent detail fetching
//! - [`ExpansionState`] - expanded-group set backed by an injected [`ExpansionBackend`]
//!
//! # Example
//!
//! ```ignore
//! use ftui_grouplist::{EngineConfig, GroupListEngine, MemoryBackend, Msg};
//!
//! let mut engine = GroupListEngine::new(EngineConfig::default(), Box::new(MemoryBackend::new()));
//! engine.update(Msg::SetGroups(groups));
//! engine.update(Msg::Resize(480));
//! let cmd = engine.update(Msg::Tick(web_time::Instant::now()));
//! ```

pub mod config;
pub mod detail;
pub mod engine;
pub mod expansion;
pub mod fenwick;
pub mod flatten;
pub mod layout;
pub mod loader;
pub mod model;
pub mod navigation;
pub mod render;
pub mod runtime;
pub mod window;

pub use config::{EngineConfig, LoaderConfig, RowHeights};
pub use detail::{
    DetailFetcher, FetchError, ItemDetail, RecentRuns, RunStatus, RunStatusHistory, RunSummary,
    Tag,
};
pub use engine::{Cmd, GroupListEngine, Msg};
pub use expansion::{ExpansionBackend, ExpansionState, FileBackend, MemoryBackend, StoreError};
pub use flatten::{flatten, flattened_len};
pub use layout::{RowLayout, RowPosition};
pub use loader::{DetailState, FetchRequest, FetchTicket, LazyItemLoader, MountDiff};
pub use model::{Group, GroupAddress, Item, ItemKey, ItemKind, Row};
pub use navigation::{group_path, item_path};
pub use render::{HeaderView, ItemView, Renderer};
pub use runtime::Driver;
pub use window::{Overscan, VisibleWindow, WindowEntry, compute_window};
