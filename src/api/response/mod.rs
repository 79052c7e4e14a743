pub mod device_status;
pub mod inverter_list;
pub mod inverter_reading;
pub mod plant_list;
pub mod plant_live;
pub mod plant_summary;

use serde_json::Value;

/* Identifiers and names arrive either as strings or as numbers */
pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
