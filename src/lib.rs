//! Normalization and aggregation of heterogeneous sensor readings into a
//! deterministic, bucketed series for charts and live summaries.
//!
//! Every call processes a complete snapshot of readings and holds no state
//! between calls:
//!
//! raw readings → [`sequence::chronological`] → [`bucket::aggregate`] →
//! {[`summary::summarize`], [`chart::project`]}
//!
//! [`pipeline::SeriesPipeline`] runs all stages with one configuration.

pub mod bucket;
pub mod chart;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod sequence;
pub mod source;
pub mod summary;
pub mod timestamp;
pub mod utils;

pub use models::{Bucket, ChartPoint, RawTimestamp, Reading, Resolved, Sample};
pub use pipeline::{SeriesOutput, SeriesPipeline};
pub use schema::{FieldSet, HydroponicFields, IrrigationFields, SchemaField, SchemaVariant};
pub use summary::AverageWindow;
pub use timestamp::{TimestampError, TimestampNormalizer};
