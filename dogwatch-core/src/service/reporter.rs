//! Self-reporting loop with failure-triggered circuit breaking
//!
//! Every interval the loop reads a [`RuntimeSnapshot`](crate::runtime::RuntimeSnapshot)
//! and sends its seven gauges. Per tick:
//!
//! ```text
//! all sends ok        -> consecutive_failures = 0
//! any send failed     -> consecutive_failures += 1, log last error
//! failures >= limit   -> enabled = false, loop exits (terminal)
//! ```
//!
//! The breaker never closes again: a tripped service stays a no-op for good.
//! Besides the breaker, the loop exits on a shutdown signal or when it finds
//! the service disabled.

use std::future::Future;
use std::io;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, select, Receiver, Sender};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, warn, Instrument};

use super::ReportingService;
use crate::tags::NO_TAGS;

/// Result of a single reporting cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Service was disabled; nothing collected or sent
    Skipped,
    /// Every gauge was sent; failure counter reset
    Healthy,
    /// At least one gauge failed; counter is below the limit
    Failed { consecutive: u32 },
    /// Counter reached the limit; service is now disabled
    Tripped,
}

/// Why a reporting loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The breaker tripped
    Tripped,
    /// The service was already disabled
    Disabled,
    /// Shutdown was requested
    Cancelled,
}

impl ReportingService {
    /// Run one reporting cycle and apply the breaker
    pub fn tick(&self, component: &str) -> TickOutcome {
        if !self.is_enabled() {
            return TickOutcome::Skipped;
        }

        let snapshot = self.stats.read();
        let Some(err) = self.emit_snapshot(component, &snapshot, &NO_TAGS) else {
            self.consecutive_failures.store(0, Ordering::Release);
            return TickOutcome::Healthy;
        };

        // One increment per tick, however many gauges failed
        let consecutive = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        self.logger.tick_failed(&err, consecutive, self.failure_limit);

        // Clones share the counter but not the limit, so it may already be past ours
        if consecutive >= self.failure_limit {
            if self
                .enabled
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.logger.tripped(&err, self.failure_limit);
            }
            return TickOutcome::Tripped;
        }

        TickOutcome::Failed { consecutive }
    }

    /// Report forever on the calling thread; returns only once disabled
    pub fn run(&self, component: &str, label: &str) -> RunExit {
        self.run_until(component, label, &channel::never())
    }

    /// Report on the calling thread until disabled or `shutdown` fires
    ///
    /// `shutdown` fires on a message or when every sender is dropped. The
    /// first tick happens one interval after the call.
    pub fn run_until(&self, component: &str, label: &str, shutdown: &Receiver<()>) -> RunExit {
        let span = info_span!("runtime_reporter", component, label);
        let _enter = span.enter();

        if !self.is_enabled() {
            debug!("Service disabled, reporter not started");
            return RunExit::Disabled;
        }

        info!(
            "Runtime reporter started (interval {:?}, failure limit {})",
            self.interval, self.failure_limit
        );

        let ticker = channel::tick(self.interval);
        loop {
            select! {
                recv(ticker) -> _ => {
                    if let Some(exit) = self.exit_after(self.tick(component)) {
                        return exit;
                    }
                }
                recv(shutdown) -> _ => {
                    info!("Runtime reporter cancelled");
                    return RunExit::Cancelled;
                }
            }
        }
    }

    /// Run [`run_until`](Self::run_until) on a dedicated thread
    pub fn spawn(&self, component: &str, label: &str) -> io::Result<ReporterHandle> {
        let (stop, stop_rx) = channel::bounded(1);
        let service = self.clone();
        let component = component.to_string();
        let label = label.to_string();

        let thread = thread::Builder::new()
            .name("dogwatch-reporter".into())
            .spawn(move || service.run_until(&component, &label, &stop_rx))?;

        Ok(ReporterHandle { stop, thread })
    }

    /// Async flavour of [`run_until`](Self::run_until) for tokio hosts
    ///
    /// Returns `RunExit::Cancelled` as soon as `shutdown` completes.
    pub async fn run_async<F>(&self, component: &str, label: &str, shutdown: F) -> RunExit
    where
        F: Future<Output = ()>,
    {
        let span = info_span!("runtime_reporter", component, label);

        async move {
            if !self.is_enabled() {
                debug!("Service disabled, reporter not started");
                return RunExit::Disabled;
            }

            info!(
                "Runtime reporter started (interval {:?}, failure limit {})",
                self.interval, self.failure_limit
            );

            let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Some(exit) = self.exit_after(self.tick(component)) {
                            return exit;
                        }
                    }
                    _ = &mut shutdown => {
                        info!("Runtime reporter cancelled");
                        return RunExit::Cancelled;
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    fn exit_after(&self, outcome: TickOutcome) -> Option<RunExit> {
        match outcome {
            TickOutcome::Healthy | TickOutcome::Failed { .. } => None,
            TickOutcome::Tripped => {
                warn!("Runtime reporter stopped: too many consecutive failures");
                Some(RunExit::Tripped)
            }
            TickOutcome::Skipped => {
                info!("Runtime reporter stopped: service disabled");
                Some(RunExit::Disabled)
            }
        }
    }
}

/// Handle to a reporter thread started by [`ReportingService::spawn`]
#[derive(Debug)]
pub struct ReporterHandle {
    stop: Sender<()>,
    thread: JoinHandle<RunExit>,
}

impl ReporterHandle {
    /// Ask the loop to stop and wait for it
    pub fn stop(self) -> thread::Result<RunExit> {
        let Self { stop, thread } = self;
        // Full means a stop is already queued
        let _ = stop.try_send(());
        drop(stop);
        thread.join()
    }

    /// Wait for the loop to exit on its own
    pub fn join(self) -> thread::Result<RunExit> {
        let Self { stop, thread } = self;
        let exit = thread.join();
        drop(stop);
        exit
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}
