use crate::api::Error;
use crate::model::PlantSnapshot;
use serde::Serialize;

/// Structure version checked by downstream consumers.
pub const HEADER_VERSION: &str = "0.0.1";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub header: Header,
    pub stations: Vec<PlantSnapshot>,
}

impl Envelope {
    pub fn station_names(&self) -> Vec<&str> {
        self.stations.iter().map(|s| s.info.name.as_str()).collect()
    }
}

/// Wrap completed plant snapshots for publication. An empty batch means something upstream
/// lost track of its plants and is refused.
pub fn assemble(stations: Vec<PlantSnapshot>) -> Result<Envelope, Error> {
    if stations.is_empty() {
        return Err(Error::EmptyPublishBatch);
    }

    Ok(Envelope {
        header: Header {
            version: HEADER_VERSION.to_string(),
        },
        stations,
    })
}
