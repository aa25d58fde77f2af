use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

/// Work fired by the [`Scheduler`] on every tick.
#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    async fn run(&self);
}

/// Fires a job on a fixed cadence, at most one run at a time. The first tick
/// fires immediately.
pub struct Scheduler {
    job: Arc<dyn ScheduledJob>,
    period: Duration,
    running: Arc<Mutex<()>>,
}

impl Scheduler {
    /// `period` must be non-zero: [`Scheduler::run_until_stopped`] panics
    /// otherwise, as `tokio::time::interval` does.
    pub fn new(job: Arc<dyn ScheduledJob>, period: Duration) -> Self {
        Self {
            job,
            period,
            running: Arc::new(Mutex::new(())),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks until `shutdown` resolves, then waits for the run in progress.
    pub async fn run_until_stopped<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(period_secs = self.period.as_secs(), "Scheduler started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    self.fire();
                }
            }
        }

        tracing::info!("Scheduler stopping, waiting for the running tick to finish");
        let _idle = self.running.lock().await;
    }

    /// Starts a run unless the previous one is still going.
    fn fire(&self) {
        let guard = match self.running.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("Previous tick is still running, skipping this one");
                return;
            }
        };
        let job = self.job.clone();

        tokio::spawn(async move {
            job.run().await;
            drop(guard);
        });
    }
}
