use crate::api::Error;
use crate::normalize::normalize_power;
use serde::Serialize;
use serde_json::{Map, Value};

use std::collections::BTreeMap;
use std::fmt;

pub type RawPayload = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct Api {
    pub api_url: String,
    pub client: reqwest::Client,
}

/// Login material for one installation. Replaced wholesale on reconfiguration.
#[derive(Clone)]
pub struct Credentials {
    identifier: String,
    secret: String,
    selector: String,
}

impl Credentials {
    pub fn new(identifier: &str, secret: &str, selector: &str) -> Result<Self, Error> {
        let required = [
            ("username", identifier),
            ("password", secret),
            ("plant_id", selector),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(Error::ConfigError(format!("`{}` must not be empty", name)));
        }

        Ok(Credentials {
            identifier: identifier.trim().to_owned(),
            secret: secret.to_owned(),
            selector: selector.trim().to_owned(),
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }
}

/* Never print the password */
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("selector", &self.selector)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        AuthToken(token.into())
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(..)")
    }
}

/// Which vendor endpoint a field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Overview,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ETotal,
    EToday,
    TotalCo2,
    TotalTree,
    Power,
    Percent,
    NormalDevNum,
    OfflineDevNum,
    FaultDevNum,
    WaitDevNum,
    Capacity,
    EarningToday,
    EarningTotal,
    TodayGeneration,
    MonthGeneration,
    YearGeneration,
    TotalGeneration,
    Co2Saved,
    TreeEquivalent,
    DieselSaved,
    TodayRevenue,
    MonthRevenue,
    TotalRevenue,
}

impl Field {
    pub const ALL: [Field; 23] = [
        Field::ETotal,
        Field::EToday,
        Field::TotalCo2,
        Field::TotalTree,
        Field::Power,
        Field::Percent,
        Field::NormalDevNum,
        Field::OfflineDevNum,
        Field::FaultDevNum,
        Field::WaitDevNum,
        Field::Capacity,
        Field::EarningToday,
        Field::EarningTotal,
        Field::TodayGeneration,
        Field::MonthGeneration,
        Field::YearGeneration,
        Field::TotalGeneration,
        Field::Co2Saved,
        Field::TreeEquivalent,
        Field::DieselSaved,
        Field::TodayRevenue,
        Field::MonthRevenue,
        Field::TotalRevenue,
    ];

    /// Key used in the snapshot, MQTT topics and templates.
    pub fn key(self) -> &'static str {
        match self {
            Field::ETotal => "e_total",
            Field::EToday => "e_today",
            Field::TotalCo2 => "total_co2",
            Field::TotalTree => "total_tree",
            Field::Power => "power",
            Field::Percent => "percent",
            Field::NormalDevNum => "normal_dev_num",
            Field::OfflineDevNum => "offline_dev_num",
            Field::FaultDevNum => "fault_dev_num",
            Field::WaitDevNum => "wait_dev_num",
            Field::Capacity => "capacity",
            Field::EarningToday => "earning_today",
            Field::EarningTotal => "earning_total",
            Field::TodayGeneration => "today_generation",
            Field::MonthGeneration => "month_generation",
            Field::YearGeneration => "year_generation",
            Field::TotalGeneration => "total_generation",
            Field::Co2Saved => "co2_saved",
            Field::TreeEquivalent => "tree_equivalent",
            Field::DieselSaved => "diesel_saved",
            Field::TodayRevenue => "today_revenue",
            Field::MonthRevenue => "month_revenue",
            Field::TotalRevenue => "total_revenue",
        }
    }

    pub fn source(self) -> Source {
        match self {
            Field::TodayGeneration
            | Field::MonthGeneration
            | Field::YearGeneration
            | Field::TotalGeneration
            | Field::Co2Saved
            | Field::TreeEquivalent
            | Field::DieselSaved
            | Field::TodayRevenue
            | Field::MonthRevenue
            | Field::TotalRevenue => Source::Production,
            _ => Source::Overview,
        }
    }

    /// Read this field out of the payload of its source endpoint.
    fn extract(self, payload: &RawPayload) -> f64 {
        match self {
            /* earnings come as `earning: [{today, total}]` */
            Field::EarningToday | Field::EarningTotal => {
                let key = if self == Field::EarningToday {
                    "today"
                } else {
                    "total"
                };
                payload
                    .get("earning")
                    .and_then(|v| v.get(0))
                    .and_then(|v| v.get(key))
                    .map_or(0.0, |v| numeric(self, v))
            }
            Field::Co2Saved => lookup(self, payload, "co2"),
            Field::TreeEquivalent => lookup(self, payload, "tree"),
            Field::DieselSaved => lookup(self, payload, "diesel"),
            _ => lookup(self, payload, self.key()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn lookup(field: Field, payload: &RawPayload, key: &str) -> f64 {
    payload.get(key).map_or(0.0, |v| numeric(field, v))
}

/// Upstream sends numbers, sometimes numeric strings. Anything else counts as
/// zero, including "NaN" and "inf" which would not survive JSON serialization.
fn numeric(field: Field, value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                log::warn!("Non-numeric value for {}: {:?}", field, s);
                0.0
            }
        },
        Value::Null => 0.0,
        other => {
            log::warn!("Unexpected value for {}: {}", field, other);
            0.0
        }
    }
}

/// Merged, normalized result of one successful refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: BTreeMap<Field, f64>,
}

impl Snapshot {
    /// Merge both payloads into a complete snapshot. Only `power` is normalized.
    pub fn merge(overview: &RawPayload, production: &RawPayload) -> Snapshot {
        let values = Field::ALL
            .iter()
            .map(|&field| {
                let payload = match field.source() {
                    Source::Overview => overview,
                    Source::Production => production,
                };
                let value = field.extract(payload);
                match field {
                    Field::Power => (field, normalize_power(value)),
                    _ => (field, value),
                }
            })
            .collect();

        Snapshot { values }
    }

    pub fn get(&self, field: Field) -> f64 {
        self.values.get(&field).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
