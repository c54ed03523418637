// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Background task scheduling.
//!
//! Periodic maintenance work (reachability sweeps, data collection) is
//! expressed as [`ScheduledTask`] implementations and driven by the
//! [`Scheduler`], which runs each task on its own tokio interval loop.
//!
//! A failing pass is logged and the loop keeps going; one bad sweep never
//! takes the scheduler down. Shutdown is signalled through a watch
//! channel so a loop that is mid-pass still observes it on the next
//! select.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::IntegrationResult;

// =============================================================================
// ScheduledTask Trait
// =============================================================================

/// A unit of periodic background work.
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    /// Short stable name, used in logs.
    fn name(&self) -> &str;

    /// Runs one pass. Errors are logged by the scheduler and do not
    /// stop the loop.
    async fn run(&self) -> IntegrationResult<()>;
}

// =============================================================================
// Scheduler
// =============================================================================

/// Drives registered tasks on their configured intervals.
///
/// Each task gets its own spawned loop; slow passes of one task never
/// delay another. The first tick of a tokio interval fires immediately,
/// so every task runs once right after [`Scheduler::start`].
pub struct Scheduler {
    tasks: Vec<(Arc<dyn ScheduledTask>, Duration)>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            tasks: Vec::new(),
            shutdown_tx,
            shutdown_rx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Registers a task to run every `interval`.
    ///
    /// Zero intervals are clamped to one second; a zero-period tokio
    /// interval would spin.
    pub fn register(&mut self, task: Arc<dyn ScheduledTask>, interval: Duration) {
        let interval = interval.max(Duration::from_secs(1));
        self.tasks.push((task, interval));
    }

    /// Returns the number of registered tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Spawns one interval loop per registered task.
    pub fn start(&self) {
        let mut handles = self.handles.lock();

        for (task, interval) in &self.tasks {
            let task = Arc::clone(task);
            let period = *interval;
            let mut shutdown = self.shutdown_rx.clone();

            handles.push(tokio::spawn(async move {
                info!(
                    task = task.name(),
                    interval_secs = period.as_secs(),
                    "Scheduled task started"
                );

                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            let started = std::time::Instant::now();
                            match task.run().await {
                                Ok(()) => {
                                    debug!(
                                        task = task.name(),
                                        elapsed_ms = started.elapsed().as_millis() as u64,
                                        "Scheduled task pass completed"
                                    );
                                }
                                Err(error) => {
                                    warn!(
                                        task = task.name(),
                                        error = %error,
                                        "Scheduled task pass failed"
                                    );
                                }
                            }
                        }
                        _ = shutdown.changed() => {
                            break;
                        }
                    }
                }

                info!(task = task.name(), "Scheduled task stopped");
            }));
        }

        info!(tasks = self.tasks.len(), "Scheduler started");
    }

    /// Signals all task loops to stop and waits for them to finish.
    pub async fn shutdown(&self) {
        // Send is infallible here: self holds a receiver.
        let _ = self.shutdown_tx.send(true);

        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.handles.lock();
            guard.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }

        info!("Scheduler stopped");
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    struct CountingTask {
        runs: AtomicU64,
    }

    #[async_trait]
    impl ScheduledTask for CountingTask {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self) -> IntegrationResult<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingTask {
        ran: AtomicBool,
    }

    #[async_trait]
    impl ScheduledTask for FailingTask {
        fn name(&self) -> &str {
            "failing"
        }

        async fn run(&self) -> IntegrationResult<()> {
            self.ran.store(true, Ordering::SeqCst);
            Err(crate::error::IntegrationError::internal("simulated"))
        }
    }

    #[tokio::test]
    async fn test_task_runs_immediately_on_start() {
        let task = Arc::new(CountingTask {
            runs: AtomicU64::new(0),
        });
        let mut scheduler = Scheduler::new();
        scheduler.register(task.clone(), Duration::from_secs(60));
        scheduler.start();

        // First interval tick fires at once.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(task.runs.load(Ordering::SeqCst), 1);

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_failing_task_does_not_stop_scheduler() {
        let failing = Arc::new(FailingTask {
            ran: AtomicBool::new(false),
        });
        let counting = Arc::new(CountingTask {
            runs: AtomicU64::new(0),
        });

        let mut scheduler = Scheduler::new();
        scheduler.register(failing.clone(), Duration::from_secs(60));
        scheduler.register(counting.clone(), Duration::from_secs(60));
        assert_eq!(scheduler.task_count(), 2);

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(failing.ran.load(Ordering::SeqCst));
        assert_eq!(counting.runs.load(Ordering::SeqCst), 1);

        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_loops() {
        let task = Arc::new(CountingTask {
            runs: AtomicU64::new(0),
        });
        let mut scheduler = Scheduler::new();
        scheduler.register(task.clone(), Duration::from_millis(10));
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.shutdown().await;
        let after_shutdown = task.runs.load(Ordering::SeqCst);
        assert!(after_shutdown >= 1);

        // No further passes once stopped.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(task.runs.load(Ordering::SeqCst), after_shutdown);
    }
}
