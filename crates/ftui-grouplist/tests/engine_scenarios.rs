//! Scenario tests for the engine's update cycle under a deterministic clock.
//!
//! Every test drives [`GroupListEngine::update_at`] with explicit instants, so
//! stabilization delays are exercised without sleeping.

use ftui_grouplist::{
    Cmd, DetailState, EngineConfig, FetchError, FileBackend, Group, GroupAddress, GroupListEngine,
    HeaderView, ItemDetail, ItemKey, ItemKind, ItemView, MemoryBackend, Msg, Overscan, Renderer,
};
use tracing::Level;
use web_time::{Duration, Instant};

const DELAY: Duration = Duration::from_millis(300);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init();
}

fn addr(g: usize) -> GroupAddress {
    GroupAddress::new(format!("group{g}"), "loc")
}

fn key(g: usize, item: &str) -> ItemKey {
    ItemKey::new(addr(g), item)
}

/// 40 groups of 3 items; every row is 10px.
fn groups() -> Vec<Group> {
    (0..40)
        .map(|g| Group::new(addr(g)).with_items(ItemKind::Primary, ["a", "b", "c"]))
        .collect()
}

/// Engine with group 0 expanded and a 50px viewport at the top, so the
/// three items of group 0 are mounted at `t0`.
fn mounted_engine(t0: Instant) -> GroupListEngine {
    init_tracing();
    let config = EngineConfig::default().with_row_heights(10, 10);
    let backend = MemoryBackend::new().with_set(&config.namespace, ["group0@loc"]);
    let mut engine = GroupListEngine::new(config, Box::new(backend));
    engine.update_at(Msg::SetGroups(groups()), t0);
    engine.update_at(Msg::Resize(50), t0);
    engine
}

fn fetched_names(cmd: &Cmd) -> Vec<String> {
    cmd.fetches().iter().map(|r| r.key.name.clone()).collect()
}

fn detail(text: &str) -> ItemDetail {
    ItemDetail {
        description: Some(text.into()),
        ..ItemDetail::default()
    }
}

// ── Scheduling ──────────────────────────────────────────────────────────

#[test]
fn items_fetch_once_after_delay() {
    let t0 = Instant::now();
    let mut engine = mounted_engine(t0);
    assert_eq!(engine.loader().pending_count(), 3);

    assert!(engine.update_at(Msg::Tick(t0 + DELAY / 2), t0).fetches().is_empty());
    let cmd = engine.update_at(Msg::Tick(t0 + DELAY), t0);
    assert_eq!(fetched_names(&cmd), ["a", "b", "c"]);
    assert!(engine.update_at(Msg::Tick(t0 + DELAY * 4), t0).fetches().is_empty());
}

#[test]
fn unmount_before_delay_never_fetches() {
    let t0 = Instant::now();
    let mut engine = mounted_engine(t0);
    engine.update_at(Msg::Scroll(200), t0 + Duration::from_millis(100));
    assert_eq!(engine.loader().pending_count(), 0);

    let cmd = engine.update_at(Msg::Tick(t0 + Duration::from_secs(5)), t0);
    assert!(cmd.fetches().is_empty());
    assert_eq!(engine.detail_state(&key(0, "a")), DetailState::Pending);
}

#[test]
fn repeated_mount_events_schedule_one_fetch() {
    let t0 = Instant::now();
    let mut engine = mounted_engine(t0);
    // Still mounted after each of these.
    engine.update_at(Msg::ScrollBy(5), t0 + Duration::from_millis(50));
    engine.update_at(Msg::Resize(55), t0 + Duration::from_millis(80));
    engine.update_at(Msg::ScrollBy(-5), t0 + Duration::from_millis(120));
    assert_eq!(engine.loader().pending_count(), 3);

    let cmd = engine.update_at(Msg::Tick(t0 + DELAY), t0);
    assert_eq!(cmd.fetches().len(), 3);
    let again = engine.update_at(Msg::Tick(t0 + DELAY * 2), t0);
    assert!(again.fetches().is_empty());
}

#[test]
fn remount_restarts_the_delay() {
    let t0 = Instant::now();
    let mut engine = mounted_engine(t0);
    engine.update_at(Msg::Scroll(200), t0 + Duration::from_millis(100));
    let cmd = engine.update_at(Msg::Scroll(0), t0 + Duration::from_millis(200));
    assert_eq!(cmd.tick_after(), Some(DELAY));

    assert!(engine.update_at(Msg::Tick(t0 + DELAY), t0).fetches().is_empty());
    let cmd = engine.update_at(Msg::Tick(t0 + Duration::from_millis(500)), t0);
    assert_eq!(cmd.fetches().len(), 3);
}

#[test]
fn collapse_cancels_pending_timers_synchronously() {
    let t0 = Instant::now();
    let mut engine = mounted_engine(t0);
    let cmd = engine.update_at(Msg::Toggle(addr(0)), t0 + Duration::from_millis(10));
    assert_eq!(engine.loader().pending_count(), 0);
    assert_eq!(cmd.tick_after(), None);
    assert!(engine.update_at(Msg::Tick(t0 + DELAY), t0).fetches().is_empty());
}

// ── Completion ──────────────────────────────────────────────────────────

#[test]
fn completions_apply_in_any_order() {
    let t0 = Instant::now();
    let mut engine = mounted_engine(t0);
    let cmd = engine.update_at(Msg::Tick(t0 + DELAY), t0);
    let requests: Vec<_> = cmd.fetches().into_iter().cloned().collect();

    for request in requests.iter().rev() {
        engine.update_at(
            Msg::FetchCompleted {
                ticket: request.ticket,
                result: Ok(detail(&request.key.name)),
            },
            t0 + DELAY,
        );
    }
    for name in ["a", "b", "c"] {
        let state = engine.detail_state(&key(0, name));
        assert_eq!(
            state.detail().and_then(|d| d.description.as_deref()),
            Some(name)
        );
    }
}

#[test]
fn completion_after_scrolling_away_is_discarded() {
    let t0 = Instant::now();
    let mut engine = mounted_engine(t0);
    let cmd = engine.update_at(Msg::Tick(t0 + DELAY), t0);
    let request = cmd.fetches()[0].clone();

    engine.update_at(Msg::Scroll(200), t0 + DELAY);
    engine.update_at(
        Msg::FetchCompleted {
            ticket: request.ticket,
            result: Ok(detail("late")),
        },
        t0 + DELAY,
    );
    assert_eq!(engine.detail_state(&request.key), DetailState::Pending);

    // Coming back schedules a fresh fetch.
    let cmd = engine.update_at(Msg::Scroll(0), t0 + DELAY * 2);
    assert_eq!(cmd.tick_after(), Some(DELAY));
}

#[test]
fn not_found_shows_empty() {
    let t0 = Instant::now();
    let mut engine = mounted_engine(t0);
    let cmd = engine.update_at(Msg::Tick(t0 + DELAY), t0);
    let request = cmd.fetches()[0].clone();
    engine.update_at(
        Msg::FetchCompleted {
            ticket: request.ticket,
            result: Err(FetchError::NotFound),
        },
        t0 + DELAY,
    );
    assert_eq!(engine.detail_state(&request.key), DetailState::Empty);
}

#[test]
fn transport_error_keeps_previous_detail() {
    init_tracing();
    let t0 = Instant::now();
    let config = EngineConfig::default()
        .with_row_heights(10, 10)
        .with_refetch_loaded(true);
    let backend = MemoryBackend::new().with_set(&config.namespace, ["group0@loc"]);
    let mut engine = GroupListEngine::new(config, Box::new(backend));
    engine.update_at(Msg::SetGroups(groups()), t0);
    engine.update_at(Msg::Resize(20), t0);

    let first = engine.update_at(Msg::Tick(t0 + DELAY), t0).fetches()[0].clone();
    assert_eq!(first.key, key(0, "a"));
    engine.update_at(
        Msg::FetchCompleted {
            ticket: first.ticket,
            result: Ok(detail("v1")),
        },
        t0 + DELAY,
    );

    engine.update_at(Msg::Scroll(200), t0 + DELAY);
    engine.update_at(Msg::Scroll(0), t0 + DELAY);
    let second = engine.update_at(Msg::Tick(t0 + DELAY * 2), t0).fetches()[0].clone();
    engine.update_at(
        Msg::FetchCompleted {
            ticket: second.ticket,
            result: Err(FetchError::Transport("connection reset".into())),
        },
        t0 + DELAY * 2,
    );

    let state = engine.detail_state(&key(0, "a"));
    assert!(matches!(state, DetailState::Unavailable { .. }));
    assert_eq!(state.detail().and_then(|d| d.description.as_deref()), Some("v1"));
    // Other rows are unaffected.
    assert_eq!(engine.detail_state(&key(1, "a")), DetailState::Pending);
}

// ── Layout scenarios ────────────────────────────────────────────────────

#[test]
fn viewport_500_header_32_item_64() {
    init_tracing();
    let config = EngineConfig::default()
        .with_row_heights(32, 64)
        .with_overscan(Overscan::Pixels(0));
    let backend = MemoryBackend::new().with_set(&config.namespace, ["jobs@loc"]);
    let mut engine = GroupListEngine::new(config, Box::new(backend));
    let group = Group::new(GroupAddress::new("jobs", "loc"))
        .with_items(ItemKind::Primary, (0..10).map(|i| format!("job{i}")));
    let t0 = Instant::now();
    engine.update_at(Msg::SetGroups(vec![group]), t0);
    engine.update_at(Msg::Resize(500), t0);

    let window = engine.window();
    assert_eq!(window.indices(), 0..9);
    assert_eq!(window.offset_of(8), Some(32 + 7 * 64));
    assert_eq!(engine.total_height(), 32 + 10 * 64);
}

#[test]
fn renderer_only_sees_window_rows() {
    #[derive(Default)]
    struct Collect {
        total: u64,
        offsets: Vec<u64>,
        finished: bool,
    }
    impl Renderer for Collect {
        fn begin(&mut self, total_height: u64) {
            self.total = total_height;
        }
        fn render_header(&mut self, offset: u64, _: u64, _: &HeaderView<'_>) {
            self.offsets.push(offset);
        }
        fn render_item(&mut self, offset: u64, _: u64, item: &ItemView<'_>) {
            assert!(item.path.starts_with("/locations/group"));
            self.offsets.push(offset);
        }
        fn finish(&mut self) {
            self.finished = true;
        }
    }

    let t0 = Instant::now();
    let mut engine = mounted_engine(t0);
    engine.update_at(Msg::Scroll(135), t0);
    let mut collect = Collect::default();
    engine.view(&mut collect);
    assert!(collect.finished);
    assert_eq!(collect.total, 40 * 10 + 3 * 10);
    assert_eq!(collect.offsets, [130, 140, 150, 160, 170, 180]);
}

#[test]
fn expansion_survives_engine_restart() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let t0 = Instant::now();
    {
        let mut engine = GroupListEngine::new(
            EngineConfig::default(),
            Box::new(FileBackend::new(dir.path())),
        );
        engine.update_at(Msg::SetGroups(groups()), t0);
        engine.update_at(Msg::Toggle(addr(3)), t0);
        engine.update_at(Msg::Toggle(addr(7)), t0);
        engine.update_at(Msg::Toggle(addr(3)), t0);
    }
    let mut engine = GroupListEngine::new(
        EngineConfig::default(),
        Box::new(FileBackend::new(dir.path())),
    );
    engine.update_at(Msg::SetGroups(groups()), t0);
    assert!(engine.is_expanded(&addr(7)));
    assert!(!engine.is_expanded(&addr(3)));
    assert_eq!(engine.layout().len(), 40 + 3);
}
