pub type Endpoint = str;

pub const LOGIN: &Endpoint = "/login";
pub const OVERVIEW: &Endpoint = "/plant/overview";

/// Production endpoint, scoped to one plant.
pub fn production(selector: &str) -> String {
    format!("/plant/{}/production2", selector)
}
