/// Fixed field schemas for the two monitored system variants
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single tracked quantity of a schema.
pub trait SchemaField: Copy + Eq + fmt::Debug + 'static {
    /// JSON key used by the data source
    fn key(self) -> &'static str;
    /// Human readable name for summaries
    fn label(self) -> &'static str;
    /// Unit suffix, empty for dimensionless values
    fn unit(self) -> &'static str;
    /// Decimal places used when a summary value is displayed
    fn decimals(self) -> usize;
}

/// A closed, fixed-shape record with one optional value per field.
///
/// The same record shape is used for raw reading values, bucket means,
/// summaries and chart point values.
pub trait FieldSet: Clone + Default + fmt::Debug + PartialEq {
    type Field: SchemaField;

    /// Every field of the schema, in display order
    const FIELDS: &'static [Self::Field];

    /// Window length used when a requested window is not a positive integer
    const FALLBACK_WINDOW: usize;

    fn get(&self, field: Self::Field) -> Option<f64>;

    fn set(&mut self, field: Self::Field, value: Option<f64>);

    /// Demo values for the given simulator tick
    fn simulate(tick: u64) -> Self;
}

/// Which schema a deployment monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    Hydroponic,
    Irrigation,
}

impl SchemaVariant {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hydroponic" | "hidroponik" => Some(SchemaVariant::Hydroponic),
            "irrigation" | "irigasi" => Some(SchemaVariant::Irrigation),
            _ => None,
        }
    }

    pub fn fallback_window(self) -> usize {
        match self {
            SchemaVariant::Hydroponic => HydroponicFields::FALLBACK_WINDOW,
            SchemaVariant::Irrigation => IrrigationFields::FALLBACK_WINDOW,
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVariant::Hydroponic => write!(f, "hydroponic"),
            SchemaVariant::Irrigation => write!(f, "irrigation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydroponicField {
    Temperature,
    Ph,
    FlowRate,
}

impl SchemaField for HydroponicField {
    fn key(self) -> &'static str {
        match self {
            HydroponicField::Temperature => "suhu",
            HydroponicField::Ph => "pH",
            HydroponicField::FlowRate => "flowRate",
        }
    }

    fn label(self) -> &'static str {
        match self {
            HydroponicField::Temperature => "temperature",
            HydroponicField::Ph => "pH",
            HydroponicField::FlowRate => "flow rate",
        }
    }

    fn unit(self) -> &'static str {
        match self {
            HydroponicField::Temperature => "°C",
            HydroponicField::Ph => "",
            HydroponicField::FlowRate => " L/min",
        }
    }

    fn decimals(self) -> usize {
        match self {
            HydroponicField::Temperature => 1,
            HydroponicField::Ph | HydroponicField::FlowRate => 2,
        }
    }
}

/// Simple variant: nutrient solution temperature, acidity and flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HydroponicFields {
    #[serde(rename = "suhu", default, deserialize_with = "lenient_number")]
    pub temperature: Option<f64>,
    #[serde(rename = "pH", default, deserialize_with = "lenient_number")]
    pub ph: Option<f64>,
    #[serde(rename = "flowRate", default, deserialize_with = "lenient_number")]
    pub flow_rate: Option<f64>,
}

impl FieldSet for HydroponicFields {
    type Field = HydroponicField;

    const FIELDS: &'static [HydroponicField] = &[
        HydroponicField::Temperature,
        HydroponicField::Ph,
        HydroponicField::FlowRate,
    ];

    const FALLBACK_WINDOW: usize = 5;

    fn get(&self, field: HydroponicField) -> Option<f64> {
        match field {
            HydroponicField::Temperature => self.temperature,
            HydroponicField::Ph => self.ph,
            HydroponicField::FlowRate => self.flow_rate,
        }
    }

    fn set(&mut self, field: HydroponicField, value: Option<f64>) {
        match field {
            HydroponicField::Temperature => self.temperature = value,
            HydroponicField::Ph => self.ph = value,
            HydroponicField::FlowRate => self.flow_rate = value,
        }
    }

    fn simulate(tick: u64) -> Self {
        let t = tick as f64;
        HydroponicFields {
            temperature: Some(round_to(26.0 + 2.0 * (t / 12.0).sin(), 2)),
            ph: Some(round_to(6.2 + 0.3 * (t / 20.0).cos(), 2)),
            flow_rate: flow_sample(tick, 1.8, 0.4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrrigationField {
    SoilTemperature,
    AirTemperature,
    AirHumidity,
    SoilMoisture,
    Ph,
    FlowRate,
}

impl SchemaField for IrrigationField {
    fn key(self) -> &'static str {
        match self {
            IrrigationField::SoilTemperature => "temperature",
            IrrigationField::AirTemperature => "temperatureAir",
            IrrigationField::AirHumidity => "humidity",
            IrrigationField::SoilMoisture => "soilMoisture",
            IrrigationField::Ph => "ph",
            IrrigationField::FlowRate => "flowRate",
        }
    }

    fn label(self) -> &'static str {
        match self {
            IrrigationField::SoilTemperature => "soil temperature",
            IrrigationField::AirTemperature => "air temperature",
            IrrigationField::AirHumidity => "air humidity",
            IrrigationField::SoilMoisture => "soil moisture",
            IrrigationField::Ph => "soil pH",
            IrrigationField::FlowRate => "flow rate",
        }
    }

    fn unit(self) -> &'static str {
        match self {
            IrrigationField::SoilTemperature | IrrigationField::AirTemperature => "°C",
            IrrigationField::AirHumidity | IrrigationField::SoilMoisture => "%",
            IrrigationField::Ph => "",
            IrrigationField::FlowRate => " L/min",
        }
    }

    fn decimals(self) -> usize {
        match self {
            IrrigationField::Ph | IrrigationField::FlowRate => 2,
            _ => 1,
        }
    }
}

/// Extended variant: drip irrigation soil and air conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IrrigationFields {
    #[serde(rename = "temperature", default, deserialize_with = "lenient_number")]
    pub soil_temperature: Option<f64>,
    #[serde(rename = "temperatureAir", default, deserialize_with = "lenient_number")]
    pub air_temperature: Option<f64>,
    #[serde(rename = "humidity", default, deserialize_with = "lenient_number")]
    pub air_humidity: Option<f64>,
    #[serde(rename = "soilMoisture", default, deserialize_with = "lenient_number")]
    pub soil_moisture: Option<f64>,
    #[serde(rename = "ph", default, deserialize_with = "lenient_number")]
    pub ph: Option<f64>,
    #[serde(rename = "flowRate", default, deserialize_with = "lenient_number")]
    pub flow_rate: Option<f64>,
}

impl FieldSet for IrrigationFields {
    type Field = IrrigationField;

    const FIELDS: &'static [IrrigationField] = &[
        IrrigationField::SoilTemperature,
        IrrigationField::AirTemperature,
        IrrigationField::AirHumidity,
        IrrigationField::SoilMoisture,
        IrrigationField::Ph,
        IrrigationField::FlowRate,
    ];

    const FALLBACK_WINDOW: usize = 20;

    fn get(&self, field: IrrigationField) -> Option<f64> {
        match field {
            IrrigationField::SoilTemperature => self.soil_temperature,
            IrrigationField::AirTemperature => self.air_temperature,
            IrrigationField::AirHumidity => self.air_humidity,
            IrrigationField::SoilMoisture => self.soil_moisture,
            IrrigationField::Ph => self.ph,
            IrrigationField::FlowRate => self.flow_rate,
        }
    }

    fn set(&mut self, field: IrrigationField, value: Option<f64>) {
        match field {
            IrrigationField::SoilTemperature => self.soil_temperature = value,
            IrrigationField::AirTemperature => self.air_temperature = value,
            IrrigationField::AirHumidity => self.air_humidity = value,
            IrrigationField::SoilMoisture => self.soil_moisture = value,
            IrrigationField::Ph => self.ph = value,
            IrrigationField::FlowRate => self.flow_rate = value,
        }
    }

    fn simulate(tick: u64) -> Self {
        let t = tick as f64;
        IrrigationFields {
            soil_temperature: Some(round_to(27.0 + 1.5 * (t / 15.0).sin(), 2)),
            air_temperature: Some(round_to(30.0 + 3.0 * (t / 10.0).sin(), 2)),
            air_humidity: Some(round_to(70.0 - 8.0 * (t / 10.0).sin(), 2)),
            soil_moisture: Some(round_to(45.0 + 10.0 * (t / 25.0).cos(), 2)),
            ph: Some(round_to(6.5 + 0.2 * (t / 30.0).sin(), 2)),
            flow_rate: flow_sample(tick, 1.2, 0.3),
        }
    }
}

// Flow sensors drop out every ninth tick in the demo data.
fn flow_sample(tick: u64, base: f64, swing: f64) -> Option<f64> {
    if tick % 9 == 8 {
        return None;
    }
    Some(round_to(base + swing * (tick as f64 / 6.0).sin(), 2))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Accept any JSON value for a numeric field; anything that is not a finite
/// number becomes `None` instead of failing the whole record.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientNumber)
}

struct LenientNumber;

impl<'de> Visitor<'de> for LenientNumber {
    type Value = Option<f64>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any value")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v).filter(|v| v.is_finite()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(None)
    }
}
