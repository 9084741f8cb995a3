use approx::assert_relative_eq;
use std::num::NonZeroUsize;
use time::macros::{datetime, offset};

use sensor_series::config::SeriesConfig;
use sensor_series::schema::{HydroponicField, IrrigationField};
use sensor_series::sequence::chronological;
use sensor_series::source::parse_snapshot;
use sensor_series::summary::compute_mean;
use sensor_series::{
    AverageWindow, Bucket, FieldSet, HydroponicFields, IrrigationFields, RawTimestamp, Reading,
    SeriesPipeline, TimestampNormalizer,
};

const SPREADSHEET_EXPORT: &str = r#"[
    {"timestamp": "Date(2024,0,15,10,30,4)", "suhu": 26.0, "pH": 6.1, "flowRate": 1.8},
    {"timestamp": "15/01/2024 10.30.00", "suhu": 24.0, "pH": "ERR", "flowRate": 1.6},
    {"timestamp": "15/01/2024, 10:30:07", "suhu": 27.0, "pH": 6.3},
    {"timestamp": "", "suhu": 99.0, "pH": 9.9, "flowRate": 9.9},
    {"timestamp": "2024-01-15T02:30:12Z", "suhu": 25.0, "pH": 6.2, "flowRate": null}
]"#;

fn wita() -> SeriesConfig {
    SeriesConfig {
        utc_offset: offset!(+8),
        ..SeriesConfig::default()
    }
}

#[test]
fn test_spreadsheet_snapshot_end_to_end() {
    let readings: Vec<Reading<HydroponicFields>> = parse_snapshot(SPREADSHEET_EXPORT).unwrap();
    let output = SeriesPipeline::new(wita()).process(&readings);

    assert_eq!(output.unparseable, 1);

    let base = datetime!(2024-01-15 02:30:00 UTC).unix_timestamp() * 1000;
    let starts: Vec<i64> = output.buckets.iter().map(|b| b.start_ms).collect();
    assert_eq!(starts, vec![base, base + 5000, base + 10_000]);

    // 10:30:00 and 10:30:04 local share the first bucket.
    let first = output.buckets[0].means;
    assert_relative_eq!(first.temperature.unwrap(), 25.0);
    assert_relative_eq!(first.ph.unwrap(), 6.1);
    assert_relative_eq!(first.flow_rate.unwrap(), 1.7, epsilon = 1e-9);

    let second = output.buckets[1].means;
    assert_relative_eq!(second.temperature.unwrap(), 27.0);
    assert_eq!(second.flow_rate, None);

    let labels: Vec<&str> = output.chart.iter().map(|p| p.time.as_str()).collect();
    assert_eq!(labels, vec!["10.30.00", "10.30.05", "10.30.10"]);

    // Averages are taken over bucket means, not raw readings.
    assert_relative_eq!(
        output.summary.temperature.unwrap(),
        (25.0 + 27.0 + 25.0) / 3.0,
        epsilon = 1e-9
    );
    assert_relative_eq!(output.summary.flow_rate.unwrap(), 1.7, epsilon = 1e-9);
}

#[test]
fn test_seconds_and_milliseconds_are_one_to_one_thousand() {
    let normalizer = TimestampNormalizer::default();
    let secs = normalizer
        .parse(&RawTimestamp::Numeric(1_700_000_000.0))
        .unwrap();
    let millis = normalizer
        .parse(&RawTimestamp::Numeric(1_700_000_000_000.0))
        .unwrap();
    assert_eq!(secs, 1_700_000_000 * 1000);
    assert_eq!(millis, 1_700_000_000_000);
}

#[test]
fn test_spreadsheet_and_day_first_strings_agree() {
    let normalizer = TimestampNormalizer::new(offset!(+8));
    let parse = |s: &str| normalizer.parse(&RawTimestamp::from(s)).unwrap();

    let expected = parse("Date(2024,0,15,10,30,0)");
    assert_eq!(parse("15/01/2024 10.30.00"), expected);
    assert_eq!(parse("15/01/2024, 10:30:00"), expected);
}

#[test]
fn test_two_readings_in_one_bucket_average() {
    let t = 1_700_000_000_000i64;
    let readings = vec![
        Reading::new(
            t,
            HydroponicFields {
                temperature: Some(20.0),
                ..Default::default()
            },
        ),
        Reading::new(
            t + 1000,
            HydroponicFields {
                temperature: Some(30.0),
                ..Default::default()
            },
        ),
    ];
    let output = SeriesPipeline::default().process(&readings);
    assert_eq!(output.buckets.len(), 1);
    assert_relative_eq!(output.buckets[0].means.temperature.unwrap(), 25.0);
}

#[test]
fn test_bucket_means_match_member_readings() {
    let width = 5000;
    let t0 = 1_700_000_000_000i64;
    // Deterministic scatter of readings over one minute, some missing values.
    let readings: Vec<Reading<IrrigationFields>> = (0..60)
        .map(|i| {
            let ts = t0 + (i * 7919 % 60_000);
            let mut values = IrrigationFields::simulate(i as u64);
            if i % 4 == 0 {
                values.soil_moisture = None;
            }
            Reading::new(ts, values)
        })
        .collect();

    let output = SeriesPipeline::default().process(&readings);

    let starts: Vec<i64> = output.buckets.iter().map(|b| b.start_ms).collect();
    assert!(starts.windows(2).all(|w| w[0] < w[1]));

    for bucket in &output.buckets {
        let members: Vec<&Reading<IrrigationFields>> = readings
            .iter()
            .filter(|r| match r.timestamp {
                RawTimestamp::Numeric(ms) => {
                    (ms as i64).div_euclid(width) * width == bucket.start_ms
                }
                _ => false,
            })
            .collect();
        assert!(!members.is_empty());

        let moisture: Vec<f64> = members
            .iter()
            .filter_map(|r| r.values.soil_moisture)
            .collect();
        match bucket.means.soil_moisture {
            Some(mean) => assert_relative_eq!(
                mean,
                moisture.iter().sum::<f64>() / moisture.len() as f64,
                epsilon = 1e-9
            ),
            None => assert!(moisture.is_empty()),
        }
    }
}

#[test]
fn test_sequencer_is_idempotent() {
    let readings: Vec<Reading<HydroponicFields>> = parse_snapshot(SPREADSHEET_EXPORT).unwrap();
    let normalizer = TimestampNormalizer::new(offset!(+8));

    let once: Vec<Reading<HydroponicFields>> = chronological(&readings, &normalizer)
        .into_iter()
        .cloned()
        .collect();
    let twice: Vec<Reading<HydroponicFields>> = chronological(&once, &normalizer)
        .into_iter()
        .cloned()
        .collect();
    assert_eq!(once, twice);
}

#[test]
fn test_mean_is_none_without_finite_values() {
    let buckets = vec![Bucket {
        start_ms: 0,
        means: IrrigationFields {
            air_humidity: Some(70.0),
            ..Default::default()
        },
    }];
    assert_eq!(
        compute_mean(&buckets, IrrigationField::SoilMoisture, AverageWindow::All),
        None
    );
    assert_eq!(
        compute_mean(&buckets, IrrigationField::AirHumidity, AverageWindow::All),
        Some(70.0)
    );
}

#[test]
fn test_raw_fallback_before_first_bucket() {
    // Nothing parses, so no bucket can form.
    let readings: Vec<Reading<HydroponicFields>> = (0..30)
        .map(|i| {
            Reading::new(
                format!("sample #{}", i).as_str(),
                HydroponicFields {
                    temperature: Some(20.0 + i as f64),
                    ..Default::default()
                },
            )
        })
        .collect();

    let config = SeriesConfig {
        avg_window: AverageWindow::Last(NonZeroUsize::new(5).unwrap()),
        ..SeriesConfig::default()
    };
    let output = SeriesPipeline::new(config).process(&readings);

    assert!(output.buckets.is_empty());
    assert_eq!(output.chart.len(), 20);
    assert_eq!(output.chart[0].time, "sample #10");
    assert_eq!(output.chart[19].values.temperature, Some(49.0));
    assert_relative_eq!(output.summary.temperature.unwrap(), 47.0);
    assert_eq!(
        compute_mean(&readings, HydroponicField::Ph, AverageWindow::All),
        None
    );
}
