//! Per-cycle accumulation of a paginated inverter listing into plants.
//!
//! A `CycleAccumulator` lives for exactly one polling cycle. Pages are merged one at a time; the
//! walk over pages stops at the first page that brings no plant not seen before.

use crate::api::response::inverter_list::InverterRow;
use crate::api::Error;
use crate::model::{self, DeviceRecord, PlantInfo, PlantSnapshot, PowerGenerationParameters};
use serde_json::Value;
use std::collections::HashMap;

/// What a single `merge` did with the rows of one page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged: usize,
    pub new_plants: usize,
    pub idle: usize,
    pub malformed: usize,
    pub duplicates: usize,
}

#[derive(Debug, Default)]
pub struct CycleAccumulator {
    plants: HashMap<String, Vec<DeviceRecord>>,
    names: HashMap<String, String>,
    /* plant ids in first-seen order */
    order: Vec<String>,
}

impl CycleAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one page of raw listing rows.
    ///
    /// Rows reporting exactly zero generation today are idle devices and skipped. Malformed rows
    /// and devices already recorded for their plant are dropped with a log line; neither stops
    /// the rest of the page.
    pub fn merge(&mut self, rows: Vec<Value>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for row in rows {
            let parsed = InverterRow::from_value(row).and_then(|row| {
                if row.generated_today() == Some(0.0) {
                    return Ok(None);
                }
                Ok(Some((row.plant_id()?, row.plant_name()?, row.to_device_record()?)))
            });

            match parsed {
                Ok(None) => outcome.idle += 1,
                Ok(Some((plant_id, plant_name, record))) => {
                    match self.insert(plant_id, plant_name, record) {
                        Ok(true) => {
                            outcome.new_plants += 1;
                            outcome.merged += 1;
                        }
                        Ok(false) => outcome.merged += 1,
                        // Duplicate device: logged and dropped in every build, the rest of the
                        // page is still merged.
                        Err(e) => {
                            log::error!("dropping listing row: {}", e);
                            outcome.duplicates += 1;
                        }
                    }
                }
                Err(e) => {
                    log::warn!("skipping malformed listing row: {}", e);
                    outcome.malformed += 1;
                }
            }
        }

        outcome
    }

    /// Returns whether `plant_id` was seen for the first time.
    fn insert(
        &mut self,
        plant_id: String,
        plant_name: String,
        record: DeviceRecord,
    ) -> Result<bool, Error> {
        match self.plants.get_mut(&plant_id) {
            Some(devices) => {
                if devices.iter().any(|d| d.id == record.id) {
                    return Err(Error::DuplicateDevice {
                        plant: plant_id,
                        device: record.id,
                    });
                }
                devices.push(record);
                Ok(false)
            }
            None => {
                self.plants.insert(plant_id.clone(), vec![record]);
                self.names.insert(plant_id.clone(), plant_name);
                self.order.push(plant_id);
                Ok(true)
            }
        }
    }

    /// The listing is exhausted once a page added no plant that was not already known.
    pub fn is_complete(&self, last_page: &MergeOutcome) -> bool {
        last_page.new_plants == 0
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn plant_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn name(&self, plant_id: &str) -> Option<&str> {
        self.names.get(plant_id).map(String::as_str)
    }

    pub fn devices(&self, plant_id: &str) -> Option<&[DeviceRecord]> {
        self.plants.get(plant_id).map(Vec::as_slice)
    }

    /// Consume the accumulator, building one snapshot per plant in first-seen order. Plant
    /// telemetry is the sum over its inverters, stamped with the newest inverter reading.
    pub fn into_snapshots(mut self) -> Vec<PlantSnapshot> {
        let mut snapshots = Vec::with_capacity(self.order.len());

        for plant_id in self.order {
            let inverters = self.plants.remove(&plant_id).unwrap_or_default();
            let name = self.names.remove(&plant_id).unwrap_or_default();

            let generated: Vec<f64> = inverters
                .iter()
                .filter_map(|inv| inv.power_generation_parameters.power_generated_today)
                .collect();

            let mut plant = PlantSnapshot::new(
                plant_id,
                PlantInfo {
                    name,
                    ..Default::default()
                },
            );
            plant.power_generation_parameters = PowerGenerationParameters {
                current_power_output: inverters
                    .iter()
                    .map(|inv| inv.power_generation_parameters.current_power_output)
                    .sum(),
                power_generated_today: if generated.is_empty() {
                    None
                } else {
                    Some(generated.iter().sum())
                },
                ..Default::default()
            };
            plant.timestamp = inverters
                .iter()
                .map(|inv| inv.timestamp)
                .max()
                .unwrap_or_default();
            plant.status = model::station_status(&inverters);
            plant.inverter_list = inverters;

            snapshots.push(plant);
        }

        snapshots
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::response::inverter_list;
    use crate::model::State;
    use crate::testing::read_json;
    use serde_json::json;
    use std::collections::HashSet;

    fn row(plant: &str, name: &str, device: &str, etoday: &str) -> Value {
        json!({
            "plantId": plant,
            "plantName": name,
            "deviceSn": format!("SN-{}", device),
            "uId": device,
            "pac": "1.5",
            "etoday": etoday,
            "time": "2021-06-14 10:20:30",
            "status": "1"
        })
    }

    fn key_sets_match(acc: &CycleAccumulator) -> bool {
        let plants: HashSet<&String> = acc.plants.keys().collect();
        let names: HashSet<&String> = acc.names.keys().collect();
        plants == names && plants.len() == acc.order.len()
    }

    #[test]
    fn fixture_pages() {
        let mut acc = CycleAccumulator::new();

        let first = acc.merge(
            inverter_list::rows(read_json("growatt_inverter_list_page1.json")).unwrap(),
        );
        assert_eq!(
            MergeOutcome {
                merged: 1,
                new_plants: 1,
                idle: 1,
                ..Default::default()
            },
            first
        );
        assert!(!acc.is_complete(&first));

        let second = acc.merge(
            inverter_list::rows(read_json("growatt_inverter_list_page2.json")).unwrap(),
        );
        assert_eq!(2, second.merged);
        assert_eq!(1, second.new_plants);

        let third = acc.merge(
            inverter_list::rows(read_json("growatt_inverter_list_empty.json")).unwrap(),
        );
        assert!(acc.is_complete(&third));

        assert_eq!(vec!["1001", "1002"], acc.plant_ids().collect::<Vec<_>>());
        assert!(key_sets_match(&acc));
    }

    #[test]
    fn name_set_on_first_sight_only() {
        let mut acc = CycleAccumulator::new();
        acc.merge(vec![row("A", "First", "d1", "1.0")]);
        acc.merge(vec![row("A", "Second", "d2", "1.0")]);

        assert_eq!(Some("First"), acc.name("A"));
        assert_eq!(2, acc.devices("A").unwrap().len());
    }

    #[test]
    fn zero_generation_never_accumulated() {
        let mut acc = CycleAccumulator::new();
        let outcome = acc.merge(vec![
            row("Z", "Zero", "z1", "0"),
            row("Z", "Zero", "z2", "0.0 kWh"),
            row("A", "Alive", "a1", "0.5"),
        ]);

        assert_eq!(2, outcome.idle);
        assert_eq!(None, acc.devices("Z"));
        assert_eq!(None, acc.name("Z"));
        assert_eq!(Some(0.5), acc.devices("A").unwrap()[0].power_generation_parameters.power_generated_today);
    }

    #[test]
    fn key_sets_stay_identical() {
        let mut acc = CycleAccumulator::new();
        let pages = vec![
            vec![row("A", "a", "1", "1"), row("B", "b", "2", "0")],
            vec![json!({"plantId": "C"}), row("B", "b", "3", "2")],
            vec![row("A", "a", "1", "1"), row("D", "d", "4", "4")],
            vec![],
        ];

        for page in pages {
            acc.merge(page);
            assert!(key_sets_match(&acc));
        }
        assert_eq!(vec!["A", "B", "D"], acc.plant_ids().collect::<Vec<_>>());
    }

    #[test]
    fn duplicate_device_dropped() {
        let mut acc = CycleAccumulator::new();
        acc.merge(vec![row("A", "a", "1", "1")]);
        let outcome = acc.merge(vec![row("A", "a", "1", "1")]);

        assert_eq!(1, outcome.duplicates);
        assert_eq!(0, outcome.merged);
        assert_eq!(1, acc.devices("A").unwrap().len());
        assert!(acc.is_complete(&outcome));
    }

    #[test]
    fn malformed_row_does_not_block_page() {
        let mut acc = CycleAccumulator::new();
        let outcome = acc.merge(vec![
            json!("not a row"),
            json!({"plantId": "A", "deviceSn": "x", "pac": "1", "etoday": "1", "time": "yesterday"}),
            row("B", "b", "1", "1"),
        ]);

        assert_eq!(2, outcome.malformed);
        assert_eq!(1, outcome.merged);
        assert_eq!(1, acc.len());
    }

    #[test]
    fn snapshots_aggregate_inverters() {
        let mut acc = CycleAccumulator::new();
        acc.merge(
            inverter_list::rows(read_json("growatt_inverter_list_page1.json")).unwrap(),
        );
        acc.merge(
            inverter_list::rows(read_json("growatt_inverter_list_page2.json")).unwrap(),
        );

        let snapshots = acc.into_snapshots();
        assert_eq!(2, snapshots.len());

        let alpha = &snapshots[0];
        assert_eq!("1001", alpha.id);
        assert_eq!("Alpha Farm", alpha.info.name);
        assert_eq!(
            vec!["U-1", "U-2"],
            alpha.inverter_list.iter().map(|i| i.id.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(4.0, alpha.power_generation_parameters.current_power_output);
        assert_eq!(Some(18.2), alpha.power_generation_parameters.power_generated_today);
        assert_eq!(1623668112, alpha.timestamp);
        assert_eq!(State::Connected, alpha.status.unwrap().state);

        assert_eq!("Beta Works", snapshots[1].info.name);
    }
}
