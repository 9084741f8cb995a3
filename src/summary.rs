/// Scalar per-field averages for live summary tiles
use std::fmt;
use std::num::NonZeroUsize;

use crate::models::{Bucket, Sample};
use crate::schema::FieldSet;

/// How much of a series an average covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AverageWindow {
    #[default]
    All,
    /// The last `n` elements
    Last(NonZeroUsize),
}

impl AverageWindow {
    /// Window over the last `n` elements, or over the last `fallback` when
    /// `n` is not a positive integer. A zero fallback is clamped to one.
    pub fn last_or(n: i64, fallback: usize) -> Self {
        let n = usize::try_from(n)
            .ok()
            .and_then(NonZeroUsize::new)
            .unwrap_or_else(|| NonZeroUsize::new(fallback).unwrap_or(NonZeroUsize::MIN));
        AverageWindow::Last(n)
    }

    /// Parse `all` or an integer. Returns `None` for anything else.
    pub fn parse(value: &str, fallback: usize) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            return Some(AverageWindow::All);
        }
        value
            .parse::<i64>()
            .ok()
            .map(|n| AverageWindow::last_or(n, fallback))
    }

    /// The slice of `series` this window selects.
    pub fn select<'a, T>(&self, series: &'a [T]) -> &'a [T] {
        match self {
            AverageWindow::All => series,
            AverageWindow::Last(n) => &series[series.len().saturating_sub(n.get())..],
        }
    }
}

impl fmt::Display for AverageWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AverageWindow::All => write!(f, "all"),
            AverageWindow::Last(n) => write!(f, "last {}", n),
        }
    }
}

/// Mean of the finite values of `field` within the window of `series`.
/// `None` when the window holds no finite value for the field.
pub fn compute_mean<S: Sample>(
    series: &[S],
    field: <S::Fields as FieldSet>::Field,
    window: AverageWindow,
) -> Option<f64> {
    let (sum, count) = window
        .select(series)
        .iter()
        .filter_map(|sample| sample.fields().get(field))
        .filter(|v| v.is_finite())
        .fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Averages of every field. Buckets are the source; when none have formed
/// yet the raw chronological readings are used instead.
pub fn summarize<F, S>(buckets: &[Bucket<F>], chronological: &[S], window: AverageWindow) -> F
where
    F: FieldSet,
    S: Sample<Fields = F>,
{
    let mut summary = F::default();
    for field in F::FIELDS {
        let mean = if buckets.is_empty() {
            compute_mean(chronological, *field, window)
        } else {
            compute_mean(buckets, *field, window)
        };
        summary.set(*field, mean);
    }
    summary
}
