use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::api::AppState;

/// Background planner and executor loops. Both stop when [`Workers::shutdown`] is called.
pub struct Workers {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WorkerKind {
    Planner,
    Executor,
}

impl WorkerKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Executor => "executor",
        }
    }
}

impl Workers {
    pub fn spawn(state: &AppState) -> Self {
        let (shutdown, signal) = watch::channel(false);
        let mut handles = Vec::new();

        for (kind, interval_secs) in [
            (WorkerKind::Planner, state.config.planner.interval_secs),
            (WorkerKind::Executor, state.config.executor.interval_secs),
        ] {
            if interval_secs == 0 {
                info!(
                    event_name = "system.worker.disabled",
                    worker = kind.as_str(),
                    "worker disabled by zero interval"
                );
                continue;
            }
            handles.push(tokio::spawn(run_loop(
                kind,
                state.clone(),
                Duration::from_secs(interval_secs),
                signal.clone(),
            )));
        }

        Self { shutdown, handles }
    }

    pub fn running(&self) -> usize {
        self.handles.len()
    }

    /// Signals every loop and waits for in-flight ticks to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(join_error) = handle.await {
                error!(
                    event_name = "system.worker.join_failed",
                    error = %join_error,
                    "worker task ended abnormally"
                );
            }
        }
    }
}

async fn run_loop(
    kind: WorkerKind,
    state: AppState,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        event_name = "system.worker.started",
        worker = kind.as_str(),
        interval_secs = period.as_secs(),
        "worker started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => tick(kind, &state).await,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(event_name = "system.worker.stopped", worker = kind.as_str(), "worker stopped");
}

async fn tick(kind: WorkerKind, state: &AppState) {
    let now = Utc::now();
    let store = state.store.as_ref();

    let outcome = match kind {
        WorkerKind::Planner => state.planner(None).plan_actions(store, now).await.map(|report| {
            info!(
                event_name = "system.worker.planner_tick",
                run_id = %report.run_id,
                considered = report.considered,
                planned = report.planned_actions,
                quarantined = report.quarantined,
                stale = report.stale,
                "planner tick finished"
            );
        }),
        WorkerKind::Executor => state.executor(None).execute_due(store, now).await.map(|report| {
            info!(
                event_name = "system.worker.executor_tick",
                run_id = %report.run_id,
                executed = report.executed,
                failed = report.failed,
                deferred = report.deferred,
                interrupted = report.interrupted,
                "executor tick finished"
            );
        }),
    };

    if let Err(tick_error) = outcome {
        error!(
            event_name = "system.worker.tick_failed",
            worker = kind.as_str(),
            error = %tick_error,
            "worker tick failed"
        );
    }
}
