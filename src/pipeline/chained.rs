//! Chained-walk topology: plants are listed, then each one is fetched summary first, live
//! telemetry second, and finally walked inverter by inverter. Every completed plant is published
//! in its own envelope.

use super::{Topology, WorkQueue};
use crate::api::response::plant_list::PlantList;
use crate::api::response::plant_live::PlantLive;
use crate::api::response::plant_summary::PlantSummary;
use crate::api::Error;
use crate::model::PlantSnapshot;
use crate::source::PlantSource;
use crate::walker::{Step, WalkCursor};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug)]
pub enum WalkTask {
    Plants,
    Summary { slug: String },
    Live { plant: PlantSnapshot },
    Detail(WalkCursor),
}

/// Plants already scheduled during the running cycle.
pub type WalkState = HashSet<String>;

pub struct ChainedWalk<S> {
    name: &'static str,
    source: S,
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    let raw = value.to_string();
    serde_json::from_value(value).map_err(|e| Error::InvalidResponse(raw, e.to_string()))
}

fn schedule(step: Step, queue: &mut WorkQueue<WalkTask>) -> Option<Vec<PlantSnapshot>> {
    match step {
        Step::Next(cursor) => {
            queue.push(WalkTask::Detail(cursor));
            None
        }
        Step::Done(plant) => {
            log::debug!(
                "plant {} walked, {} inverter(s)",
                plant.id,
                plant.inverter_list.len()
            );
            Some(vec![plant])
        }
    }
}

impl<S: PlantSource> ChainedWalk<S> {
    pub fn new(name: &'static str, source: S) -> Self {
        ChainedWalk { name, source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: PlantSource> Topology for ChainedWalk<S> {
    type Task = WalkTask;
    type State = WalkState;

    fn name(&self) -> &'static str {
        self.name
    }

    fn fresh_state(&self) -> WalkState {
        HashSet::new()
    }

    fn seed(&self) -> Vec<WalkTask> {
        vec![WalkTask::Plants]
    }

    async fn handle(
        &self,
        task: WalkTask,
        scheduled: &mut WalkState,
        queue: &mut WorkQueue<WalkTask>,
    ) -> Result<Option<Vec<PlantSnapshot>>, Error> {
        match task {
            WalkTask::Plants => {
                let plants: PlantList = parse(self.source.plants().await?)?;
                for entry in plants {
                    if scheduled.insert(entry.slug.clone()) {
                        queue.push(WalkTask::Summary { slug: entry.slug });
                    } else {
                        log::warn!("plant {} listed twice", entry.slug);
                    }
                }
                Ok(None)
            }
            WalkTask::Summary { slug } => {
                let summary: PlantSummary = parse(self.source.summary(&slug).await?)?;
                let plant = summary.into_snapshot(&slug)?;
                queue.push(WalkTask::Live { plant });
                Ok(None)
            }
            WalkTask::Live { mut plant } => {
                let live: PlantLive = parse(self.source.live(&plant.id).await?)?;
                if live.generated_today() == Some(0.0) {
                    log::info!("plant {} generated nothing today, skipped", plant.id);
                    return Ok(None);
                }
                let inverters = live.apply(&mut plant)?;
                Ok(schedule(WalkCursor::start(plant, inverters), queue))
            }
            WalkTask::Detail(cursor) => {
                let detail = self
                    .source
                    .device_detail(cursor.plant_id(), cursor.device_id())
                    .await
                    .map_err(|e| {
                        log::warn!(
                            "abandoning walk of plant {} at inverter {}",
                            cursor.plant_id(),
                            cursor.device_id()
                        );
                        e
                    })?;
                Ok(schedule(cursor.advance(detail), queue))
            }
        }
    }
}
