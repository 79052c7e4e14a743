//! Pipeline orchestration.
//!
//! A pipeline drives one topology through an unbounded sequence of polling cycles. Each cycle
//! starts from the topology's entry tasks with freshly allocated cycle state, processes its
//! work queue one task at a time and publishes whatever completed plants the tasks hand back.
//! When the queue runs dry the cycle is over; its state is dropped and the rescheduler decides
//! when the next one begins.

pub mod chained;
pub mod paginated;

use crate::api::Error;
use crate::envelope;
use crate::metrics;
use crate::model::PlantSnapshot;
use crate::publisher::{Publish, Publisher};
use crate::rescheduler::{shutdown_requested, Rescheduler, Wake};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;

/// Outstanding requests of the current cycle, served first-in first-out.
#[derive(Debug)]
pub struct WorkQueue<T> {
    tasks: VecDeque<T>,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        WorkQueue {
            tasks: VecDeque::new(),
        }
    }

    pub fn push(&mut self, task: T) {
        self.tasks.push_back(task);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.tasks.pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One way of walking a remote dashboard.
#[async_trait]
pub trait Topology: Send + Sync {
    type Task: Send;
    type State: Send;

    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// State scoped to a single cycle. Called once at the start of every cycle.
    fn fresh_state(&self) -> Self::State;

    /// Entry-point requests of a cycle.
    fn seed(&self) -> Vec<Self::Task>;

    /// Process one task, queueing follow-up tasks. Returns the plants completed by this task
    /// that are due for publishing. An error drops the task (and whatever depended on it).
    async fn handle(
        &self,
        task: Self::Task,
        state: &mut Self::State,
        queue: &mut WorkQueue<Self::Task>,
    ) -> Result<Option<Vec<PlantSnapshot>>, Error>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub tasks: usize,
    /// Tasks dropped because of an error, malformed payloads included.
    pub failed: usize,
    pub malformed: usize,
    pub envelopes: usize,
    pub stations: usize,
}

pub struct Pipeline<T, P> {
    topology: T,
    publisher: Arc<Publisher<P>>,
    rescheduler: Rescheduler,
}

impl<T: Topology, P: Publish> Pipeline<T, P> {
    pub fn new(topology: T, publisher: Arc<Publisher<P>>, rescheduler: Rescheduler) -> Self {
        Pipeline {
            topology,
            publisher,
            rescheduler,
        }
    }

    pub fn name(&self) -> &'static str {
        self.topology.name()
    }

    pub fn topology(&self) -> &T {
        &self.topology
    }

    /// Run one polling cycle until its work queue is empty.
    ///
    /// Only a failed publish is returned as error; everything else is logged and skipped.
    pub async fn run_cycle(&self) -> Result<CycleReport, Error> {
        let name = self.topology.name();
        let mut state = self.topology.fresh_state();
        let mut queue = WorkQueue::new();
        let mut report = CycleReport::default();

        for task in self.topology.seed() {
            queue.push(task);
        }
        if queue.is_empty() {
            log::warn!("{}: topology has no entry requests", name);
        }
        log::debug!("{}: cycle started with {} request(s)", name, queue.len());

        while let Some(task) = queue.pop() {
            report.tasks += 1;

            let batch = match self.topology.handle(task, &mut state, &mut queue).await {
                Ok(Some(batch)) => batch,
                Ok(None) => continue,
                Err(e) if e.is_schema_error() => {
                    log::warn!("{}: dropping malformed payload: {}", name, e);
                    metrics::task_failed(name);
                    report.failed += 1;
                    report.malformed += 1;
                    continue;
                }
                Err(e) => {
                    log::warn!("{}: request failed, dropping it: {}", name, e);
                    metrics::task_failed(name);
                    report.failed += 1;
                    continue;
                }
            };

            let envelope = match envelope::assemble(batch) {
                Ok(envelope) => envelope,
                Err(e) => {
                    log::error!("{}: {}", name, e);
                    continue;
                }
            };

            metrics::observe_envelope(name, &envelope);
            report.envelopes += 1;
            report.stations += envelope.stations.len();
            self.publisher.publish(envelope).await?;
        }

        metrics::cycle_completed(name);
        log::info!(
            "{}: cycle finished after {} request(s), published {} station(s)",
            name,
            report.tasks,
            report.stations
        );
        Ok(report)
    }

    /// Poll forever: run a cycle, go idle, re-arm. Returns `Ok` on shutdown and the publish
    /// error that stopped the pipeline otherwise.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), Error> {
        log::info!("{}: pipeline started", self.name());

        loop {
            tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                report = self.run_cycle() => { report?; }
            }

            if self.rescheduler.idle(&mut shutdown).await == Wake::Shutdown {
                break;
            }
        }

        log::info!(
            "{}: pipeline stopped while {:?}, after {} re-arm(s)",
            self.name(),
            self.rescheduler.phase(),
            self.rescheduler.rearmed()
        );
        Ok(())
    }
}
