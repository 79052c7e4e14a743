//! Sequential walk over the inverters of one plant.
//!
//! A walk owns its plant snapshot. Exactly one detail request per plant is outstanding at any
//! time: the cursor names the device to fetch next and is consumed by `advance` once that
//! device's detail has arrived.

use crate::api::response::inverter_reading::InverterReading;
use crate::api::Error;
use crate::model::{self, PlantSnapshot};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug)]
pub struct WalkCursor {
    plant: PlantSnapshot,
    devices: Vec<(String, InverterReading)>,
    next_index: usize,
}

#[derive(Debug)]
pub enum Step {
    /// Fetch the detail of `cursor.device_id()` and hand it to `advance`.
    Next(WalkCursor),
    Done(PlantSnapshot),
}

impl WalkCursor {
    /// Begin walking `devices` of `plant`. Devices without an id, or whose id was already
    /// listed, are dropped. A plant without devices completes immediately.
    pub fn start(plant: PlantSnapshot, devices: Vec<InverterReading>) -> Step {
        let mut seen = HashSet::new();
        let mut walk = Vec::with_capacity(devices.len());

        for reading in devices {
            match reading.device_id() {
                // Duplicates are logged and dropped in every build; the walk goes on.
                Some(id) if plant.contains_device(&id) || !seen.insert(id.clone()) => {
                    log::error!(
                        "{}",
                        Error::DuplicateDevice {
                            plant: plant.id.clone(),
                            device: id,
                        }
                    );
                }
                Some(id) => walk.push((id, reading)),
                None => log::warn!("plant {}: inverter without name or key skipped", plant.id),
            }
        }

        WalkCursor {
            plant,
            devices: walk,
            next_index: 0,
        }
        .step()
    }

    pub fn plant_id(&self) -> &str {
        &self.plant.id
    }

    /// Device whose detail is awaited.
    pub fn device_id(&self) -> &str {
        &self.devices[self.next_index].0
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn remaining(&self) -> usize {
        self.devices.len() - self.next_index
    }

    /// Merge the detail payload of the current device into the plant and move on. A detail that
    /// cannot be turned into a record drops that device only.
    pub fn advance(mut self, detail: Value) -> Step {
        let (id, listed) = &self.devices[self.next_index];

        let record = InverterReading::from_value(detail).and_then(|reading| {
            reading
                .merged_over(listed)
                .to_device_record(id.clone(), self.plant.timestamp)
        });

        match record {
            // Same as in `start`: the duplicate is reported, the plant keeps its first record.
            Ok(record) if self.plant.contains_device(&record.id) => {
                log::error!(
                    "{}",
                    Error::DuplicateDevice {
                        plant: self.plant.id.clone(),
                        device: record.id,
                    }
                );
            }
            Ok(record) => self.plant.inverter_list.push(record),
            Err(e) => log::warn!(
                "plant {}: skipping inverter {}: {}",
                self.plant.id,
                id,
                e
            ),
        }

        self.next_index += 1;
        self.step()
    }

    fn step(mut self) -> Step {
        if self.next_index < self.devices.len() {
            Step::Next(self)
        } else {
            if self.plant.status.is_none() {
                self.plant.status = model::station_status(&self.plant.inverter_list);
            }
            Step::Done(self.plant)
        }
    }
}
