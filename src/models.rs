use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::schema::FieldSet;
use crate::timestamp::{TimestampError, TimestampNormalizer};

/// A timestamp exactly as the data source delivered it.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawTimestamp {
    /// Epoch seconds or milliseconds
    Numeric(f64),
    /// An instant that is already resolved
    Instant(OffsetDateTime),
    /// Any textual form, parsed later
    Text(String),
    #[default]
    Missing,
}

impl fmt::Display for RawTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawTimestamp::Numeric(value) => write!(f, "{}", value),
            RawTimestamp::Instant(dt) => match dt.format(&Rfc3339) {
                Ok(text) => f.write_str(&text),
                Err(_) => write!(f, "{}", dt),
            },
            RawTimestamp::Text(text) => f.write_str(text),
            RawTimestamp::Missing => f.write_str("--"),
        }
    }
}

impl From<f64> for RawTimestamp {
    fn from(value: f64) -> Self {
        RawTimestamp::Numeric(value)
    }
}

impl From<i64> for RawTimestamp {
    fn from(value: i64) -> Self {
        RawTimestamp::Numeric(value as f64)
    }
}

impl From<&str> for RawTimestamp {
    fn from(value: &str) -> Self {
        RawTimestamp::Text(value.to_string())
    }
}

impl From<OffsetDateTime> for RawTimestamp {
    fn from(value: OffsetDateTime) -> Self {
        RawTimestamp::Instant(value)
    }
}

impl Serialize for RawTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawTimestamp::Numeric(value) => serializer.serialize_f64(*value),
            RawTimestamp::Instant(dt) => {
                let text = dt.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&text)
            }
            RawTimestamp::Text(text) => serializer.serialize_str(text),
            RawTimestamp::Missing => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for RawTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawTimestampVisitor)
    }
}

// Never fails: shapes that cannot carry a timestamp become `Missing`.
struct RawTimestampVisitor;

impl<'de> Visitor<'de> for RawTimestampVisitor {
    type Value = RawTimestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a string or null")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(RawTimestamp::Numeric(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(RawTimestamp::Numeric(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(RawTimestamp::Numeric(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(RawTimestamp::Text(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(RawTimestamp::Missing)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawTimestamp::Missing)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawTimestamp::Missing)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(RawTimestamp::Missing)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(RawTimestamp::Missing)
    }
}

/// One sensor sample as supplied by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading<F> {
    #[serde(default)]
    pub timestamp: RawTimestamp,
    #[serde(flatten)]
    pub values: F,
}

impl<F> Reading<F> {
    pub fn new(timestamp: impl Into<RawTimestamp>, values: F) -> Self {
        Reading {
            timestamp: timestamp.into(),
            values,
        }
    }
}

/// Per-field means of every reading whose timestamp falls in
/// `[start_ms, start_ms + width)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket<F> {
    pub start_ms: i64,
    #[serde(flatten)]
    pub means: F,
}

/// A display-ready point: a time label plus per-field values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint<F> {
    pub time: String,
    #[serde(flatten)]
    pub values: F,
}

/// Anything that can stand as one element of a series: a bucket or a raw
/// reading.
pub trait Sample {
    type Fields: FieldSet;

    fn fields(&self) -> &Self::Fields;

    fn epoch_ms(&self, normalizer: &TimestampNormalizer) -> Result<i64, TimestampError>;

    /// Label used when the timestamp cannot be resolved to an instant
    fn raw_label(&self) -> String;
}

impl<F: FieldSet> Sample for Reading<F> {
    type Fields = F;

    fn fields(&self) -> &F {
        &self.values
    }

    fn epoch_ms(&self, normalizer: &TimestampNormalizer) -> Result<i64, TimestampError> {
        normalizer.parse(&self.timestamp)
    }

    fn raw_label(&self) -> String {
        self.timestamp.to_string()
    }
}

impl<F: FieldSet> Sample for Bucket<F> {
    type Fields = F;

    fn fields(&self) -> &F {
        &self.means
    }

    fn epoch_ms(&self, _: &TimestampNormalizer) -> Result<i64, TimestampError> {
        Ok(self.start_ms)
    }

    fn raw_label(&self) -> String {
        self.start_ms.to_string()
    }
}

/// A sample paired with its timestamp, resolved once up front so later
/// stages do not parse it again.
#[derive(Debug, Clone)]
pub struct Resolved<'a, S> {
    pub sample: &'a S,
    pub epoch_ms: Result<i64, TimestampError>,
}

impl<'a, S: Sample> Resolved<'a, S> {
    pub fn new(sample: &'a S, normalizer: &TimestampNormalizer) -> Self {
        Resolved {
            sample,
            epoch_ms: sample.epoch_ms(normalizer),
        }
    }
}

impl<S: Sample> Sample for Resolved<'_, S> {
    type Fields = S::Fields;

    fn fields(&self) -> &S::Fields {
        self.sample.fields()
    }

    fn epoch_ms(&self, _: &TimestampNormalizer) -> Result<i64, TimestampError> {
        self.epoch_ms.clone()
    }

    fn raw_label(&self) -> String {
        self.sample.raw_label()
    }
}

impl<T: Sample + ?Sized> Sample for &T {
    type Fields = T::Fields;

    fn fields(&self) -> &T::Fields {
        (**self).fields()
    }

    fn epoch_ms(&self, normalizer: &TimestampNormalizer) -> Result<i64, TimestampError> {
        (**self).epoch_ms(normalizer)
    }

    fn raw_label(&self) -> String {
        (**self).raw_label()
    }
}
