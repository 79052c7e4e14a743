use serde::Serialize;

pub type KW = f64;
pub type KWh = f64;
pub type EpochSeconds = i64;

/// Credentials and base URL of one remote monitoring dashboard.
#[derive(Debug, Clone)]
pub struct Api {
    pub api_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    pub state: State,
}

impl Status {
    pub fn new(state: State) -> Self {
        Status { state }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerGenerationParameters {
    pub current_power_output: KW,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_generated_today: Option<KWh>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irradiation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_temperature: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_capacity: Option<f64>,
}

/// One inverter reading. Never mutated once pushed into a plant's `inverter_list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: String,
    pub power_generation_parameters: PowerGenerationParameters,
    pub info: DeviceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    pub timestamp: EpochSeconds,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_capacity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantSnapshot {
    pub id: String,
    pub power_generation_parameters: PowerGenerationParameters,
    pub info: PlantInfo,
    pub inverter_list: Vec<DeviceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    pub timestamp: EpochSeconds,
}

impl PlantSnapshot {
    pub fn new(id: String, info: PlantInfo) -> Self {
        PlantSnapshot {
            id,
            info,
            ..Default::default()
        }
    }

    pub fn contains_device(&self, device_id: &str) -> bool {
        self.inverter_list.iter().any(|inv| inv.id == device_id)
    }
}

/// A station is connected as soon as one of its inverters is. Returns `None` when no inverter
/// reported a status at all.
pub fn station_status(inverters: &[DeviceRecord]) -> Option<Status> {
    let mut reported = inverters.iter().filter_map(|inv| inv.status);

    let first = reported.next()?;
    if first.state == State::Connected || reported.any(|s| s.state == State::Connected) {
        Some(Status::new(State::Connected))
    } else {
        Some(Status::new(State::Disconnected))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn inverter(id: &str, status: Option<State>) -> DeviceRecord {
        DeviceRecord {
            id: id.to_string(),
            power_generation_parameters: PowerGenerationParameters::default(),
            info: DeviceInfo {
                name: id.to_string(),
                power_capacity: None,
            },
            status: status.map(Status::new),
            timestamp: 0,
        }
    }

    #[test]
    fn station_connected_when_any_inverter_is() {
        let inverters = vec![
            inverter("a", Some(State::Disconnected)),
            inverter("b", Some(State::Connected)),
        ];
        assert_eq!(
            Some(Status::new(State::Connected)),
            station_status(&inverters)
        );
    }

    #[test]
    fn station_disconnected_or_unknown() {
        let inverters = vec![inverter("a", Some(State::Disconnected)), inverter("b", None)];
        assert_eq!(
            Some(Status::new(State::Disconnected)),
            station_status(&inverters)
        );
        assert_eq!(None, station_status(&[inverter("c", None)]));
    }

    #[test]
    fn device_record_wire_format() {
        let value = serde_json::to_value(inverter("inv-1", Some(State::Connected))).unwrap();
        assert_eq!("CONNECTED", value["status"]["state"]);
        assert_eq!(0.0, value["powerGenerationParameters"]["currentPowerOutput"]);
        assert!(value["powerGenerationParameters"]
            .get("powerGeneratedToday")
            .is_none());
    }
}
