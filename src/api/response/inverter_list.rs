use super::{device_status, text};
use crate::api::Error;
use crate::model::{DeviceInfo, DeviceRecord, KWh, PowerGenerationParameters};
use crate::normalize::{self, TimestampFormat, ENERGY_UNIT, POWER_UNIT};
use serde::Deserialize;
use serde_json::Value;

/// One row of the paginated inverter listing.
#[derive(Debug, Deserialize)]
pub struct InverterRow {
    #[serde(rename = "plantId", default)]
    pub plant_id: Value,
    #[serde(rename = "plantName", default)]
    pub plant_name: Value,
    #[serde(rename = "deviceSn", default)]
    pub device_sn: Value,
    #[serde(rename = "uId", default)]
    pub u_id: Value,
    #[serde(default)]
    pub pac: Value,
    #[serde(default)]
    pub etoday: Value,
    #[serde(default)]
    pub time: Value,
    #[serde(default)]
    pub status: Value,
}

impl InverterRow {
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let raw = value.to_string();
        serde_json::from_value(value).map_err(|e| Error::InvalidResponse(raw, e.to_string()))
    }

    pub fn plant_id(&self) -> Result<String, Error> {
        text(&self.plant_id).ok_or(Error::MissingField("plantId"))
    }

    /// Display name of the plant, falling back to the plant id when the dashboard left it blank.
    pub fn plant_name(&self) -> Result<String, Error> {
        text(&self.plant_name).map_or_else(|| self.plant_id(), Ok)
    }

    pub fn generated_today(&self) -> Option<KWh> {
        normalize::quantity(&self.etoday, ENERGY_UNIT)
    }

    pub fn to_device_record(&self) -> Result<DeviceRecord, Error> {
        let name = text(&self.device_sn).ok_or(Error::MissingField("deviceSn"))?;
        let id = text(&self.u_id).unwrap_or_else(|| name.clone());
        let current_power_output =
            normalize::quantity(&self.pac, POWER_UNIT).ok_or(Error::MissingField("pac"))?;
        let time = text(&self.time).ok_or(Error::MissingField("time"))?;

        Ok(DeviceRecord {
            id,
            power_generation_parameters: PowerGenerationParameters {
                current_power_output,
                power_generated_today: self.generated_today(),
                ..Default::default()
            },
            info: DeviceInfo {
                name,
                power_capacity: None,
            },
            status: device_status::status(&self.status),
            timestamp: normalize::parse_timestamp(&time, TimestampFormat::Plain)?,
        })
    }
}

/// Extract raw rows from `.obj.pagers[0].datas`. A listing without pagers or without `datas`
/// is an empty page, a body without `.obj.pagers` is not a listing at all.
pub fn rows(mut body: Value) -> Result<Vec<Value>, Error> {
    if !body.pointer("/obj/pagers").map_or(false, Value::is_array) {
        return Err(Error::UnexpectedApiResponse(body.to_string()));
    }

    match body.pointer_mut("/obj/pagers/0/datas") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(datas)) => Ok(std::mem::take(datas)),
        Some(other) => Err(Error::UnexpectedApiResponse(other.to_string())),
    }
}
