#![forbid(unsafe_code)]

mod cli;
mod fixture;
mod logging;
mod text;

use std::io::{self, Write};
use std::sync::Arc;

use ftui_grouplist::{
    Driver, EngineConfig, ExpansionBackend, FileBackend, GroupListEngine, MemoryBackend, Msg,
    Overscan,
};
use rustc_hash::FxHashMap;
use web_time::{Duration, Instant};

use crate::cli::Opts;
use crate::fixture::{Fixture, SimulatedFetcher, synthetic_groups};
use crate::logging::{LogFormat, init_logging};
use crate::text::TextRenderer;

/// Granularity of the pump loop between scripted steps.
const PUMP_INTERVAL: Duration = Duration::from_millis(10);

fn main() -> io::Result<()> {
    let opts = Opts::parse();
    if let Err(err) = init_logging(LogFormat::from_json_flag(opts.log_json)) {
        eprintln!("logging disabled: {err}");
    }
    let stdout = io::stdout();
    run(&opts, &mut stdout.lock())
}

fn run(opts: &Opts, out: &mut impl Write) -> io::Result<()> {
    let (groups, canned) = match &opts.fixture {
        Some(path) => {
            let fixture = Fixture::load(path)?;
            (fixture.groups, fixture.details)
        }
        None => (
            synthetic_groups(opts.groups, opts.items, opts.seed),
            FxHashMap::default(),
        ),
    };

    let config = EngineConfig::default()
        .with_row_heights(opts.header_height, opts.item_height)
        .with_overscan(Overscan::Pixels(opts.overscan))
        .with_stabilization_delay(Duration::from_millis(opts.delay_ms));
    let backend: Box<dyn ExpansionBackend> = match &opts.state_dir {
        Some(dir) => Box::new(FileBackend::new(dir)),
        None => Box::new(MemoryBackend::new()),
    };
    let fetcher = Arc::new(
        SimulatedFetcher::new(Duration::from_millis(opts.latency_ms), opts.seed)
            .with_fail_every(opts.fail_every)
            .with_canned(canned),
    );
    let mut driver = Driver::new(GroupListEngine::new(config, backend), fetcher.clone());

    let to_expand: Vec<_> = groups
        .iter()
        .take(opts.expand)
        .map(|group| group.address.clone())
        .collect();
    tracing::info!(groups = groups.len(), viewport = opts.viewport, "starting session");
    driver.send(Msg::Resize(opts.viewport));
    driver.send(Msg::SetGroups(groups));
    for address in to_expand {
        if !driver.engine().is_expanded(&address) {
            driver.send(Msg::Toggle(address));
        }
    }
    frame(&driver, out)?;

    let step_px = i64::try_from(opts.step_px).unwrap_or(i64::MAX);
    for step in 1..=opts.steps {
        pump_for(&mut driver, Duration::from_millis(opts.step_ms));
        driver.send(Msg::ScrollBy(step_px));
        tracing::debug!(step, scroll = driver.engine().scroll_offset(), "scripted scroll");
        frame(&driver, out)?;
    }

    let settled = driver.wait_idle(Duration::from_secs(10));
    frame(&driver, out)?;
    tracing::info!(
        fetches = fetcher.calls(),
        cached = driver.engine().loader().cached_count(),
        settled,
        "session finished"
    );
    Ok(())
}

/// Apply completions and due ticks for `duration` without blocking on
/// anything else.
fn pump_for(driver: &mut Driver, duration: Duration) {
    let until = Instant::now() + duration;
    loop {
        let now = Instant::now();
        driver.pump_at(now);
        if now >= until {
            break;
        }
        std::thread::sleep(PUMP_INTERVAL.min(until.saturating_duration_since(now)));
    }
}

fn frame(driver: &Driver, out: &mut impl Write) -> io::Result<()> {
    let engine = driver.engine();
    let mut renderer = TextRenderer::new(engine.scroll_offset());
    engine.view(&mut renderer);
    out.write_all(renderer.into_string().as_bytes())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_opts() -> Opts {
        Opts {
            groups: 30,
            items: 6,
            viewport: 300,
            delay_ms: 5,
            latency_ms: 1,
            steps: 3,
            step_px: 200,
            step_ms: 20,
            ..Opts::default()
        }
    }

    #[test]
    fn scripted_session_prints_every_frame() {
        let mut out = Vec::new();
        run(&quick_opts(), &mut out).expect("session runs");
        let text = String::from_utf8(out).expect("utf-8");
        // Initial frame, one per step, final settled frame.
        assert_eq!(text.matches("── scroll ").count(), 1 + 3 + 1);
        assert!(text.contains('▾'));
    }

    #[test]
    fn state_dir_persists_expansion() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = Opts {
            state_dir: Some(dir.path().to_path_buf()),
            steps: 0,
            ..quick_opts()
        };
        run(&opts, &mut Vec::new()).expect("session runs");
        let stored = std::fs::read_to_string(
            FileBackend::new(dir.path()).path_for(&EngineConfig::default().namespace),
        )
        .expect("state written");
        assert!(stored.contains("\"version\": 1"));
    }

    #[test]
    fn fixture_session() {
        let opts = Opts {
            fixture: Some(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/sample.json").into()),
            steps: 1,
            ..quick_opts()
        };
        let mut out = Vec::new();
        run(&opts, &mut out).expect("session runs");
        let text = String::from_utf8(out).expect("utf-8");
        assert!(text.contains("nightly_rollup"));
    }
}
