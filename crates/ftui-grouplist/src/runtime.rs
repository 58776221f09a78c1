#![forbid(unsafe_code)]

//! Threaded command executor for [`GroupListEngine`].
//!
//! [`Driver`] owns the engine, runs every [`Cmd::Fetch`] on its own thread,
//! and routes completions back through an mpsc channel so that all engine
//! mutation stays on the driver's thread. [`Cmd::Tick`] hints are turned into
//! a deadline that [`Driver::pump_at`] and [`Driver::wait_idle`] honor.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;

use web_time::{Duration, Instant};

use crate::detail::DetailFetcher;
use crate::engine::{Cmd, GroupListEngine, Msg};

/// Runs an engine against a [`DetailFetcher`].
pub struct Driver {
    engine: GroupListEngine,
    fetcher: Arc<dyn DetailFetcher>,
    sender: Sender<Msg>,
    receiver: Receiver<Msg>,
    handles: Vec<JoinHandle<()>>,
    next_tick: Option<Instant>,
    outstanding: usize,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("engine", &self.engine)
            .field("next_tick", &self.next_tick)
            .field("outstanding", &self.outstanding)
            .finish_non_exhaustive()
    }
}

impl Driver {
    #[must_use]
    pub fn new(engine: GroupListEngine, fetcher: Arc<dyn DetailFetcher>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            engine,
            fetcher,
            sender,
            receiver,
            handles: Vec::new(),
            next_tick: None,
            outstanding: 0,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &GroupListEngine {
        &self.engine
    }

    /// Consume the driver. Fetches still running are detached and their
    /// results dropped.
    #[must_use]
    pub fn into_engine(self) -> GroupListEngine {
        self.engine
    }

    /// Fetches issued but not yet applied.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// When the engine next wants a [`Msg::Tick`].
    #[must_use]
    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Feed a message to the engine and execute the resulting command.
    pub fn send(&mut self, msg: Msg) {
        self.send_at(msg, Instant::now());
    }

    /// [`Self::send`] at an explicit time.
    pub fn send_at(&mut self, msg: Msg, now: Instant) {
        let cmd = self.engine.update_at(msg, now);
        self.execute(cmd, now);
    }

    fn execute(&mut self, cmd: Cmd, now: Instant) {
        match cmd {
            Cmd::None => {}
            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    self.execute(cmd, now);
                }
            }
            Cmd::Tick(after) => self.next_tick = Some(now + after),
            Cmd::Fetch(request) => {
                let fetcher = Arc::clone(&self.fetcher);
                let sender = self.sender.clone();
                tracing::trace!(item = %request.key, ticket = %request.ticket, "spawning fetch");
                let handle = std::thread::spawn(move || {
                    let result = fetcher.fetch_detail(&request.key.group, &request.key.name);
                    let _ = sender.send(Msg::FetchCompleted {
                        ticket: request.ticket,
                        result,
                    });
                });
                self.handles.push(handle);
                self.outstanding += 1;
            }
        }
    }

    fn apply_completion(&mut self, msg: Msg, now: Instant) {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.send_at(msg, now);
    }

    /// Apply finished fetches and fire a due tick without blocking.
    ///
    /// Returns the number of messages processed.
    pub fn pump_at(&mut self, now: Instant) -> usize {
        let mut processed = 0;
        while let Ok(msg) = self.receiver.try_recv() {
            self.apply_completion(msg, now);
            processed += 1;
        }
        if self.next_tick.is_some_and(|at| at <= now) {
            self.next_tick = None;
            self.send_at(Msg::Tick(now), now);
            processed += 1;
        }
        self.reap_finished();
        processed
    }

    /// Block until no fetch is outstanding and no tick is pending, or until
    /// `timeout` elapses. Returns whether the driver went idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            self.pump_at(now);
            if self.outstanding == 0 && self.next_tick.is_none() {
                return true;
            }
            if now >= deadline {
                return false;
            }
            let wake = self.next_tick.map_or(deadline, |tick| tick.min(deadline));
            match self
                .receiver
                .recv_timeout(wake.saturating_duration_since(now))
            {
                Ok(msg) => self.apply_completion(msg, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
                // The driver holds a sender, so this never happens.
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    fn reap_finished(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        let mut remaining = Vec::with_capacity(self.handles.len());
        for handle in self.handles.drain(..) {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                remaining.push(handle);
            }
        }
        self.handles = remaining;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::detail::{FetchError, ItemDetail};
    use crate::expansion::MemoryBackend;
    use crate::loader::DetailState;
    use crate::model::{Group, GroupAddress, ItemKey, ItemKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine() -> GroupListEngine {
        let config = EngineConfig::default()
            .with_row_heights(10, 10)
            .with_stabilization_delay(Duration::from_millis(5))
            .with_namespace("driver-test");
        let backend = MemoryBackend::new().with_set("driver-test", ["A@loc"]);
        GroupListEngine::new(config, Box::new(backend))
    }

    fn groups() -> Vec<Group> {
        vec![
            Group::new(GroupAddress::new("A", "loc"))
                .with_items(ItemKind::Primary, ["ok", "missing", "flaky"]),
        ]
    }

    #[test]
    fn fetches_run_off_thread_and_complete() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetcher = move |_: &GroupAddress, name: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            match name {
                "missing" => Err(FetchError::NotFound),
                "flaky" => Err(FetchError::Transport("reset".into())),
                _ => Ok(ItemDetail {
                    description: Some(format!("{name} detail")),
                    ..ItemDetail::default()
                }),
            }
        };

        let mut driver = Driver::new(engine(), Arc::new(fetcher));
        driver.send(Msg::SetGroups(groups()));
        driver.send(Msg::Resize(100));
        assert!(driver.next_tick().is_some());
        assert!(driver.wait_idle(Duration::from_secs(5)));

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(driver.outstanding(), 0);
        let engine = driver.into_engine();
        let group = GroupAddress::new("A", "loc");
        assert!(matches!(
            engine.detail_state(&ItemKey::new(group.clone(), "ok")),
            DetailState::Loaded(_)
        ));
        assert_eq!(
            engine.detail_state(&ItemKey::new(group.clone(), "missing")),
            DetailState::Empty
        );
        assert_eq!(
            engine.detail_state(&ItemKey::new(group, "flaky")),
            DetailState::Unavailable { previous: None }
        );
    }

    #[test]
    fn pump_before_deadline_does_nothing() {
        let fetcher = |_: &GroupAddress, _: &str| -> Result<ItemDetail, FetchError> {
            Ok(ItemDetail::default())
        };
        let mut driver = Driver::new(engine(), Arc::new(fetcher));
        let t0 = Instant::now();
        driver.send_at(Msg::SetGroups(groups()), t0);
        driver.send_at(Msg::Resize(100), t0);
        assert_eq!(driver.pump_at(t0), 0);
        assert_eq!(driver.outstanding(), 0);

        assert_eq!(driver.pump_at(t0 + Duration::from_millis(5)), 1);
        assert_eq!(driver.outstanding(), 3);
        assert!(driver.wait_idle(Duration::from_secs(5)));
    }
}
