use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PlantEntry {
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
}

pub type PlantList = Vec<PlantEntry>;
