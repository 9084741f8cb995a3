/// Bounded chart projection of the bucketed series
use log::debug;

use crate::models::{Bucket, ChartPoint, Sample};
use crate::schema::FieldSet;
use crate::timestamp::TimestampNormalizer;
use crate::utils::format_time_label;

pub const DEFAULT_MAX_CHART_POINTS: usize = 20;

/// The last `max_points` buckets as chart points.
///
/// Until the first bucket forms, the last `max_points` raw readings are
/// projected instead so the chart is never blank while data is arriving.
/// A zero `max_points` falls back to [`DEFAULT_MAX_CHART_POINTS`].
pub fn project<F, S>(
    buckets: &[Bucket<F>],
    chronological: &[S],
    max_points: usize,
    normalizer: &TimestampNormalizer,
) -> Vec<ChartPoint<F>>
where
    F: FieldSet,
    S: Sample<Fields = F>,
{
    let max_points = if max_points > 0 {
        max_points
    } else {
        DEFAULT_MAX_CHART_POINTS
    };

    if !buckets.is_empty() {
        return tail(buckets, max_points)
            .iter()
            .map(|bucket| to_point(bucket, normalizer))
            .collect();
    }

    debug!(
        "No buckets yet, charting up to {} raw readings",
        max_points.min(chronological.len())
    );
    tail(chronological, max_points)
        .iter()
        .map(|reading| to_point(reading, normalizer))
        .collect()
}

fn tail<T>(series: &[T], max_points: usize) -> &[T] {
    &series[series.len().saturating_sub(max_points)..]
}

fn to_point<S: Sample>(sample: &S, normalizer: &TimestampNormalizer) -> ChartPoint<S::Fields> {
    let time = sample
        .epoch_ms(normalizer)
        .ok()
        .and_then(|ms| format_time_label(ms, normalizer.offset()))
        .unwrap_or_else(|| sample.raw_label());

    let mut values = S::Fields::default();
    for field in S::Fields::FIELDS {
        values.set(*field, sample.fields().get(*field).filter(|v| v.is_finite()));
    }

    ChartPoint { time, values }
}
