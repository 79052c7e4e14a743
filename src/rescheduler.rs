//! Idle-driven re-arming of a pipeline: once a cycle has drained its work queue the pipeline
//! sleeps for a fixed delay and starts over from its entry point, until shutdown is signalled.

use std::time::Duration;
use tokio::sync::watch;

pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Rearm,
    Shutdown,
}

#[derive(Debug)]
pub struct Rescheduler {
    delay: Duration,
    phase: Phase,
    rearmed: u64,
}

/// Resolves once `true` has been sent on `shutdown`, or once its sender is gone.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

impl Rescheduler {
    pub fn new(delay: Duration) -> Self {
        Rescheduler {
            delay,
            phase: Phase::Running,
            rearmed: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of times the pipeline was re-armed after going idle.
    pub fn rearmed(&self) -> u64 {
        self.rearmed
    }

    /// Enter the idle phase and wait out the delay. Shutdown interrupts the wait.
    pub async fn idle(&mut self, shutdown: &mut watch::Receiver<bool>) -> Wake {
        self.phase = Phase::Idle;
        log::debug!("work queue drained, re-arming in {:?}", self.delay);

        tokio::select! {
            _ = shutdown_requested(shutdown) => Wake::Shutdown,
            _ = tokio::time::sleep(self.delay) => {
                self.phase = Phase::Running;
                self.rearmed += 1;
                log::info!("starting a crawl again (re-arm #{})", self.rearmed);
                Wake::Rearm
            }
        }
    }
}

impl Default for Rescheduler {
    fn default() -> Self {
        Rescheduler::new(DEFAULT_IDLE_DELAY)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn rearms_after_delay() {
        let (_tx, mut rx) = watch::channel(false);
        let mut rescheduler = Rescheduler::new(Duration::from_millis(20));
        let start = Instant::now();

        assert_eq!(Wake::Rearm, rescheduler.idle(&mut rx).await);
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(Phase::Running, rescheduler.phase());
        assert_eq!(1, rescheduler.rearmed());
    }

    #[tokio::test]
    async fn shutdown_interrupts_idle_wait() {
        let (tx, mut rx) = watch::channel(false);
        let mut rescheduler = Rescheduler::new(Duration::from_secs(3600));

        let stop = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send(true).unwrap();
        });

        assert_eq!(Wake::Shutdown, rescheduler.idle(&mut rx).await);
        assert_eq!(Phase::Idle, rescheduler.phase());
        assert_eq!(0, rescheduler.rearmed());
        stop.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_already_requested() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();

        let mut rescheduler = Rescheduler::new(Duration::from_secs(3600));
        assert_eq!(Wake::Shutdown, rescheduler.idle(&mut rx).await);
    }
}
