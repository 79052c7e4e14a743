use crate::model::{State, Status};
use num_derive::FromPrimitive;
use serde_json::Value;

/// Status codes reported by dashboards for a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum DeviceStatusCode {
    Lost = -1,
    Offline = 0,
    Online = 1,
}

impl DeviceStatusCode {
    /// Accepts the code either as JSON number or as numeric string (`"-1"`). Unknown codes and
    /// missing fields yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let code = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }?;

        num::FromPrimitive::from_i64(code)
    }

    pub fn state(self) -> State {
        match self {
            DeviceStatusCode::Online => State::Connected,
            DeviceStatusCode::Offline | DeviceStatusCode::Lost => State::Disconnected,
        }
    }
}

pub fn status(value: &Value) -> Option<Status> {
    DeviceStatusCode::from_value(value).map(|code| Status::new(code.state()))
}
