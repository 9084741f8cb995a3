use log::warn;
use std::env;
use std::path::PathBuf;
use time::macros::format_description;
use time::UtcOffset;

use crate::bucket::DEFAULT_BUCKET_MS;
use crate::chart::DEFAULT_MAX_CHART_POINTS;
use crate::schema::SchemaVariant;
use crate::source::DEFAULT_SIMULATOR_CAPACITY;
use crate::summary::AverageWindow;

const DEFAULT_REFRESH_SECS: u64 = 3;

/// Settings of the pipeline itself. Non-positive bucket widths and a zero
/// chart length fall back to their defaults where they are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesConfig {
    pub bucket_ms: i64,
    pub max_chart_points: usize,
    pub avg_window: AverageWindow,
    pub utc_offset: UtcOffset,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        SeriesConfig {
            bucket_ms: DEFAULT_BUCKET_MS,
            max_chart_points: DEFAULT_MAX_CHART_POINTS,
            avg_window: AverageWindow::All,
            utc_offset: UtcOffset::UTC,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Re-read a JSON snapshot file on every refresh
    File(PathBuf),
    /// Generate demo readings
    Simulated { capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub schema: SchemaVariant,
    pub series: SeriesConfig,
    pub source: SourceConfig,
    pub refresh_secs: u64,
}

impl AppConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let config = AppConfig::from_lookup(|key| env::var(key).ok(), system_offset());
        Ok(config)
    }

    /// Build the configuration from a variable lookup. Invalid values are
    /// replaced by their defaults with a warning.
    pub fn from_lookup<L>(lookup: L, local_offset: UtcOffset) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let schema = match lookup("SERIES_SCHEMA") {
            Some(value) => SchemaVariant::parse(&value).unwrap_or_else(|| {
                warn!("Unknown SERIES_SCHEMA '{}', using hydroponic", value);
                SchemaVariant::Hydroponic
            }),
            None => SchemaVariant::Hydroponic,
        };

        let bucket_ms = parse_or(&lookup, "SERIES_BUCKET_MS", DEFAULT_BUCKET_MS, |v| {
            v.parse::<i64>().ok().filter(|ms| *ms > 0)
        });

        let max_chart_points = parse_or(
            &lookup,
            "SERIES_MAX_CHART_POINTS",
            DEFAULT_MAX_CHART_POINTS,
            |v| v.parse::<usize>().ok().filter(|n| *n > 0),
        );

        let avg_window = parse_or(&lookup, "SERIES_AVG_WINDOW", AverageWindow::All, |v| {
            AverageWindow::parse(v, schema.fallback_window())
        });

        let utc_offset = parse_or(&lookup, "SERIES_UTC_OFFSET", local_offset, |v| {
            UtcOffset::parse(v, format_description!("[offset_hour sign:mandatory]:[offset_minute]")).ok()
        });

        let refresh_secs = parse_or(&lookup, "SERIES_REFRESH_SECS", DEFAULT_REFRESH_SECS, |v| {
            v.parse::<u64>().ok().filter(|s| *s > 0)
        });

        let source = match lookup("SERIES_SNAPSHOT").filter(|p| !p.trim().is_empty()) {
            Some(path) => SourceConfig::File(PathBuf::from(path.trim())),
            None => SourceConfig::Simulated {
                capacity: parse_or(
                    &lookup,
                    "SERIES_SIM_CAPACITY",
                    DEFAULT_SIMULATOR_CAPACITY,
                    |v| v.parse::<usize>().ok().filter(|n| *n > 0),
                ),
            },
        };

        AppConfig {
            schema,
            series: SeriesConfig {
                bucket_ms,
                max_chart_points,
                avg_window,
                utc_offset,
            },
            source,
            refresh_secs,
        }
    }
}

fn parse_or<L, T, P>(lookup: &L, key: &str, default: T, parse: P) -> T
where
    L: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    match lookup(key) {
        Some(value) => parse(value.trim()).unwrap_or_else(|| {
            warn!("Invalid {} '{}', using the default", key, value);
            default
        }),
        None => default,
    }
}

// Only reliable while the process is single threaded.
fn system_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or_else(|_| {
        warn!("Could not determine the local UTC offset, using UTC");
        UtcOffset::UTC
    })
}
