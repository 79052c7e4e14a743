pub type Endpoint = str;

/* Growatt OSS */
pub const GROWATT_LOGIN: &Endpoint = "/login";
pub const GROWATT_INVERTER_LIST: &Endpoint = "/deviceManage/inverterManage/list";

/* Dataglen */
pub const DATAGLEN_LOGIN: &Endpoint = "/api-auth/login/";
pub const DATAGLEN_PLANTS: &Endpoint = "/api/v1/solar/plants/";

pub fn dataglen_summary(plant_slug: &str) -> String {
    format!("/api/v1/solar/plants/{}/summary/", plant_slug)
}

pub fn dataglen_live(plant_slug: &str) -> String {
    format!("/api/v1/solar/plants/{}/live/", plant_slug)
}

pub fn dataglen_inverter(plant_slug: &str, device: &str) -> String {
    format!("/api/v1/solar/plants/{}/inverters/{}/live/", plant_slug, device)
}

/* Downstream mesh publish endpoint */
pub const MESH_REGISTER: &Endpoint = "/register";
pub const MESH_PUBLISH: &Endpoint = "/publish";
