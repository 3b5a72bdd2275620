//! Background threads driving the periodic systems.

use std::{
    fmt,
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{Context, Result};
use crossbeam_channel::{select, Sender};
use tracing::{debug, info, warn};

/// Counts of tick commands applied and skipped during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Commands the world accepted.
    pub applied: usize,
    /// Commands rejected because the world moved on since they were computed.
    pub skipped: usize,
}

/// Handle to one running ticker thread.
pub(crate) struct Ticker {
    name: &'static str,
    shutdown: Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawns a thread that calls `run` every `period` until stopped.
    pub(crate) fn spawn<F>(name: &'static str, period: Duration, mut run: F) -> Result<Self>
    where
        F: FnMut() -> TickSummary + Send + 'static,
    {
        let (shutdown, stop) = crossbeam_channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name(format!("turfcash-{name}"))
            .spawn(move || {
                let ticks = crossbeam_channel::tick(period);
                info!(target: "turfcash::session", ticker = name, ?period, "ticker.started");
                loop {
                    select! {
                        recv(ticks) -> _ => {
                            let summary = run();
                            debug!(
                                target: "turfcash::session",
                                ticker = name,
                                applied = summary.applied,
                                skipped = summary.skipped,
                                "tick.finished"
                            );
                        }
                        recv(stop) -> _ => break,
                    }
                }
                info!(target: "turfcash::session", ticker = name, "ticker.stopped");
            })
            .with_context(|| format!("failed to spawn the {name} ticker thread"))?;
        Ok(Self {
            name,
            shutdown,
            handle,
        })
    }

    /// Signals the thread to stop and waits for it to exit.
    pub(crate) fn stop(self) {
        let _ = self.shutdown.send(());
        if self.handle.join().is_err() {
            warn!(target: "turfcash::session", ticker = self.name, "ticker.panicked");
        }
    }
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticker").field("name", &self.name).finish()
    }
}
