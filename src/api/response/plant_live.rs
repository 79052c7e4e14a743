use super::device_status;
use super::inverter_reading::InverterReading;
use crate::api::Error;
use crate::model::{KWh, PlantSnapshot, PowerGenerationParameters};
use crate::normalize::{self, ENERGY_UNIT, IRRADIATION_UNIT, POWER_UNIT, TEMPERATURE_UNIT};
use serde::Deserialize;
use serde_json::Value;

/// Live telemetry of one plant, including the inverters it currently reports.
#[derive(Debug, Deserialize)]
pub struct PlantLive {
    #[serde(default)]
    pub current_power: Value,
    #[serde(default)]
    pub irradiation: Value,
    #[serde(default)]
    pub module_temperature: Value,
    #[serde(default)]
    pub plant_generation_today: Value,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub inverters: Vec<InverterReading>,
}

impl PlantLive {
    pub fn generated_today(&self) -> Option<KWh> {
        normalize::quantity(&self.plant_generation_today, ENERGY_UNIT)
    }

    /// Write plant-level telemetry into `plant` and hand back the inverters left to walk.
    pub fn apply(self, plant: &mut PlantSnapshot) -> Result<Vec<InverterReading>, Error> {
        let updated_at = self
            .updated_at
            .as_deref()
            .ok_or(Error::MissingField("updated_at"))?;

        plant.power_generation_parameters = PowerGenerationParameters {
            current_power_output: normalize::quantity(&self.current_power, POWER_UNIT)
                .ok_or(Error::MissingField("current_power"))?,
            power_generated_today: self.generated_today(),
            irradiation: normalize::quantity(&self.irradiation, IRRADIATION_UNIT),
            module_temperature: normalize::quantity(&self.module_temperature, TEMPERATURE_UNIT),
        };
        plant.timestamp = normalize::parse_zulu_timestamp(updated_at)?;
        plant.status = device_status::status(&self.status);

        Ok(self.inverters)
    }
}
