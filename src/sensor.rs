use crate::model::Field;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Energy,
    Power,
    Monetary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

/// Static description of one sensor, used by hosts to render an entity.
#[derive(Debug, Clone, Serialize)]
pub struct SensorDescriptor {
    pub field: Field,
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    pub icon: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<DeviceClass>,
    pub state_class: StateClass,
}

const fn describe(
    field: Field,
    name: &'static str,
    unit: Option<&'static str>,
    icon: &'static str,
    device_class: Option<DeviceClass>,
    state_class: StateClass,
) -> SensorDescriptor {
    SensorDescriptor {
        field,
        name,
        unit,
        icon,
        device_class,
        state_class,
    }
}

use DeviceClass::*;
use StateClass::*;

const KWH: Option<&str> = Some("kWh");
const EUR: Option<&str> = Some("€");

#[rustfmt::skip]
static DESCRIPTORS: [SensorDescriptor; 23] = [
    describe(Field::ETotal, "Total Energy", KWH, "mdi:lightning-bolt", Some(Energy), TotalIncreasing),
    describe(Field::EToday, "Energy Today", KWH, "mdi:lightning-bolt", Some(Energy), TotalIncreasing),
    describe(Field::TotalCo2, "Total CO2 Avoided", Some("kg"), "mdi:molecule-co2", None, TotalIncreasing),
    describe(Field::TotalTree, "Equivalent Trees", Some("trees"), "mdi:tree", None, TotalIncreasing),
    describe(Field::Power, "Current Power", Some("kW"), "mdi:flash", Some(Power), Measurement),
    describe(Field::Percent, "Power Percentage", Some("%"), "mdi:percent", None, Measurement),
    describe(Field::NormalDevNum, "Normal Devices", None, "mdi:check-circle", None, Measurement),
    describe(Field::OfflineDevNum, "Offline Devices", None, "mdi:close-circle", None, Measurement),
    describe(Field::FaultDevNum, "Faulty Devices", None, "mdi:alert-circle", None, Measurement),
    describe(Field::WaitDevNum, "Waiting Devices", None, "mdi:clock", None, Measurement),
    describe(Field::Capacity, "Capacity", Some("kW"), "mdi:gauge", Some(Power), Measurement),
    describe(Field::EarningToday, "Earnings Today", EUR, "mdi:currency-eur", Some(Monetary), TotalIncreasing),
    describe(Field::EarningTotal, "Total Earnings", EUR, "mdi:currency-eur", Some(Monetary), TotalIncreasing),
    describe(Field::TodayGeneration, "Generation Today", KWH, "mdi:solar-panel", Some(Energy), TotalIncreasing),
    describe(Field::MonthGeneration, "Generation This Month", KWH, "mdi:calendar-month", Some(Energy), TotalIncreasing),
    describe(Field::YearGeneration, "Generation This Year", KWH, "mdi:calendar-year", Some(Energy), TotalIncreasing),
    describe(Field::TotalGeneration, "Total Generation", KWH, "mdi:lightning-bolt-circle", Some(Energy), TotalIncreasing),
    describe(Field::Co2Saved, "CO2 Saved", Some("kg"), "mdi:molecule-co2", None, TotalIncreasing),
    describe(Field::TreeEquivalent, "Tree Equivalent", Some("trees"), "mdi:tree", None, TotalIncreasing),
    describe(Field::DieselSaved, "Diesel Saved", Some("L"), "mdi:fuel", None, TotalIncreasing),
    describe(Field::TodayRevenue, "Revenue Today", EUR, "mdi:currency-eur", Some(Monetary), TotalIncreasing),
    describe(Field::MonthRevenue, "Revenue This Month", EUR, "mdi:calendar-month", Some(Monetary), TotalIncreasing),
    describe(Field::TotalRevenue, "Total Revenue", EUR, "mdi:bank", Some(Monetary), TotalIncreasing),
];

/// Descriptors for every field, in `Field::ALL` order.
pub fn descriptors() -> &'static [SensorDescriptor] {
    &DESCRIPTORS
}

pub fn descriptor(field: Field) -> &'static SensorDescriptor {
    &DESCRIPTORS[Field::ALL.iter().position(|f| *f == field).unwrap_or(0)]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn descriptors_follow_field_order() {
        let fields: Vec<Field> = descriptors().iter().map(|d| d.field).collect();
        assert_eq!(Field::ALL.to_vec(), fields);
    }

    #[test]
    fn descriptor_lookup() {
        let power = descriptor(Field::Power);
        assert_eq!(Some("kW"), power.unit);
        assert_eq!(StateClass::Measurement, power.state_class);
        assert_eq!(Some(DeviceClass::Power), power.device_class);

        let revenue = descriptor(Field::TotalRevenue);
        assert_eq!(StateClass::TotalIncreasing, revenue.state_class);
    }

    #[test]
    fn descriptor_json_omits_missing_unit() {
        let value = serde_json::to_value(descriptor(Field::FaultDevNum)).unwrap();
        assert_eq!("fault_dev_num", value["field"]);
        assert_eq!("measurement", value["state_class"]);
        assert!(value.get("unit").is_none());
        assert!(value.get("device_class").is_none());
    }
}
