/// End-to-end pipeline: order, bucket, summarize and project one snapshot
use log::debug;

use crate::bucket::aggregate;
use crate::chart::project;
use crate::config::SeriesConfig;
use crate::models::{Bucket, ChartPoint, Resolved, Sample};
use crate::sequence::chronological;
use crate::summary::summarize;
use crate::timestamp::TimestampNormalizer;

/// Everything the display layer needs from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesOutput<F> {
    pub buckets: Vec<Bucket<F>>,
    pub chart: Vec<ChartPoint<F>>,
    pub summary: F,
    /// Readings left out of bucketing because their timestamp did not parse
    pub unparseable: usize,
}

/// Stateless runner over complete snapshots of readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesPipeline {
    config: SeriesConfig,
    normalizer: TimestampNormalizer,
}

impl SeriesPipeline {
    pub fn new(config: SeriesConfig) -> Self {
        SeriesPipeline {
            config,
            normalizer: TimestampNormalizer::new(config.utc_offset),
        }
    }

    pub fn config(&self) -> &SeriesConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &TimestampNormalizer {
        &self.normalizer
    }

    /// Run every stage over one snapshot. Each timestamp is parsed once.
    pub fn process<S: Sample>(&self, readings: &[S]) -> SeriesOutput<S::Fields> {
        let resolved: Vec<Resolved<'_, S>> = readings
            .iter()
            .map(|reading| Resolved::new(reading, &self.normalizer))
            .collect();
        let unparseable = resolved.iter().filter(|r| r.epoch_ms.is_err()).count();

        let ordered = chronological(&resolved, &self.normalizer);

        let buckets = aggregate(&ordered, self.config.bucket_ms, &self.normalizer);
        let summary = summarize(&buckets, &ordered, self.config.avg_window);
        let chart = project(
            &buckets,
            &ordered,
            self.config.max_chart_points,
            &self.normalizer,
        );

        debug!(
            "Processed {} readings into {} buckets and {} chart points",
            readings.len(),
            buckets.len(),
            chart.len()
        );

        SeriesOutput {
            buckets,
            chart,
            summary,
            unparseable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Reading;
    use crate::schema::HydroponicFields;
    use crate::timestamp::TimestampError;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    const T0: i64 = 1_700_000_000_000;

    fn reading(ts: i64, temperature: f64) -> Reading<HydroponicFields> {
        Reading::new(
            ts,
            HydroponicFields {
                temperature: Some(temperature),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_process_out_of_order_snapshot() {
        let readings = vec![
            reading(T0 + 6_000, 30.0),
            reading(T0, 20.0),
            Reading::new("rusak", HydroponicFields::default()),
            reading(T0 + 1_000, 22.0),
        ];
        let output = SeriesPipeline::default().process(&readings);

        assert_eq!(output.unparseable, 1);
        assert_eq!(output.buckets.len(), 2);
        assert_relative_eq!(output.buckets[0].means.temperature.unwrap(), 21.0);
        assert_relative_eq!(output.buckets[1].means.temperature.unwrap(), 30.0);
        assert_eq!(output.chart.len(), 2);
        assert_relative_eq!(output.summary.temperature.unwrap(), 25.5);
        assert_eq!(output.summary.ph, None);
    }

    #[test]
    fn test_process_is_deterministic() {
        let readings = vec![reading(T0 + 2_000, 1.0), reading(T0, 2.0)];
        let pipeline = SeriesPipeline::default();
        assert_eq!(pipeline.process(&readings), pipeline.process(&readings));
    }

    #[test]
    fn test_process_empty_snapshot() {
        let readings: Vec<Reading<HydroponicFields>> = Vec::new();
        let output = SeriesPipeline::default().process(&readings);
        assert!(output.buckets.is_empty());
        assert!(output.chart.is_empty());
        assert_eq!(output.summary, HydroponicFields::default());
        assert_eq!(output.unparseable, 0);
    }

    /// Reading with a fixed instant that counts how often it is resolved.
    struct CountingReading<'a> {
        epoch_ms: i64,
        values: HydroponicFields,
        resolutions: &'a Cell<usize>,
    }

    impl Sample for CountingReading<'_> {
        type Fields = HydroponicFields;

        fn fields(&self) -> &HydroponicFields {
            &self.values
        }

        fn epoch_ms(&self, _: &TimestampNormalizer) -> Result<i64, TimestampError> {
            self.resolutions.set(self.resolutions.get() + 1);
            Ok(self.epoch_ms)
        }

        fn raw_label(&self) -> String {
            self.epoch_ms.to_string()
        }
    }

    #[test]
    fn test_process_resolves_each_timestamp_once() {
        let resolutions = Cell::new(0);
        let readings: Vec<CountingReading<'_>> = [T0 + 7_000, T0, T0 + 12_000, T0 + 1_000]
            .into_iter()
            .map(|epoch_ms| CountingReading {
                epoch_ms,
                values: HydroponicFields {
                    temperature: Some(20.0),
                    ..Default::default()
                },
                resolutions: &resolutions,
            })
            .collect();

        let output = SeriesPipeline::default().process(&readings);
        assert_eq!(output.buckets.len(), 3);
        assert_eq!(resolutions.get(), readings.len());
    }

    #[test]
    fn test_zero_chart_points_still_charts() {
        let config = SeriesConfig {
            max_chart_points: 0,
            ..SeriesConfig::default()
        };
        let readings: Vec<Reading<HydroponicFields>> = (0..30)
            .map(|i| reading(T0 + i * 5_000, i as f64))
            .collect();
        let output = SeriesPipeline::new(config).process(&readings);
        assert_eq!(output.chart.len(), 20);
    }
}
