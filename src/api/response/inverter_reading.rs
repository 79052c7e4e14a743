use super::{device_status, text};
use crate::api::Error;
use crate::model::{DeviceInfo, DeviceRecord, EpochSeconds, PowerGenerationParameters};
use crate::normalize::{
    self, CAPACITY_UNIT, ENERGY_UNIT, IRRADIATION_UNIT, POWER_UNIT, TEMPERATURE_UNIT,
};
use serde::Deserialize;
use serde_json::Value;

/// Reading of one inverter. Appears both inside a plant's live telemetry and as the body of the
/// per-inverter detail endpoint; the latter usually carries more fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InverterReading {
    #[serde(default)]
    pub key: Value,
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub power: Value,
    #[serde(default)]
    pub generation: Value,
    #[serde(default)]
    pub capacity: Value,
    #[serde(default)]
    pub irradiation: Value,
    #[serde(default)]
    pub module_temperature: Value,
    #[serde(default)]
    pub last_timestamp: Value,
    #[serde(default)]
    pub status: Value,
}

fn prefer(detail: Value, base: &Value) -> Value {
    if detail.is_null() {
        base.clone()
    } else {
        detail
    }
}

impl InverterReading {
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let raw = value.to_string();
        serde_json::from_value(value).map_err(|e| Error::InvalidResponse(raw, e.to_string()))
    }

    pub fn device_id(&self) -> Option<String> {
        text(&self.key).or_else(|| text(&self.name))
    }

    /// Fields present in `self` win, missing ones are taken from `base`.
    pub fn merged_over(self, base: &InverterReading) -> InverterReading {
        InverterReading {
            key: prefer(self.key, &base.key),
            name: prefer(self.name, &base.name),
            power: prefer(self.power, &base.power),
            generation: prefer(self.generation, &base.generation),
            capacity: prefer(self.capacity, &base.capacity),
            irradiation: prefer(self.irradiation, &base.irradiation),
            module_temperature: prefer(self.module_temperature, &base.module_temperature),
            last_timestamp: prefer(self.last_timestamp, &base.last_timestamp),
            status: prefer(self.status, &base.status),
        }
    }

    /// Build a record for device `id`. Readings without their own timestamp inherit
    /// `fallback_timestamp` (the plant's).
    pub fn to_device_record(
        &self,
        id: String,
        fallback_timestamp: EpochSeconds,
    ) -> Result<DeviceRecord, Error> {
        let timestamp = match &self.last_timestamp {
            Value::Null => fallback_timestamp,
            Value::String(s) => normalize::parse_zulu_timestamp(s)?,
            other => return Err(Error::MalformedTimestamp(other.to_string())),
        };

        Ok(DeviceRecord {
            power_generation_parameters: PowerGenerationParameters {
                current_power_output: normalize::quantity(&self.power, POWER_UNIT)
                    .ok_or(Error::MissingField("power"))?,
                power_generated_today: normalize::quantity(&self.generation, ENERGY_UNIT),
                irradiation: normalize::quantity(&self.irradiation, IRRADIATION_UNIT),
                module_temperature: normalize::quantity(&self.module_temperature, TEMPERATURE_UNIT),
            },
            info: DeviceInfo {
                name: text(&self.name).unwrap_or_else(|| id.clone()),
                power_capacity: normalize::quantity(&self.capacity, CAPACITY_UNIT),
            },
            status: device_status::status(&self.status),
            timestamp,
            id,
        })
    }
}
