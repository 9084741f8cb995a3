/// Fixed-width interval aggregation of chronologically ordered readings
use log::debug;
use std::collections::BTreeMap;

use crate::models::{Bucket, Sample};
use crate::schema::FieldSet;
use crate::timestamp::TimestampNormalizer;

pub const DEFAULT_BUCKET_MS: i64 = 5000;

/// Running sum and count of the finite values seen for one field.
#[derive(Debug, Clone, Copy, Default)]
struct MeanAccumulator {
    sum: f64,
    count: u32,
}

impl MeanAccumulator {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// One accumulator per schema field, positionally aligned with `F::FIELDS`.
struct FieldAccumulator<F: FieldSet> {
    fields: Vec<MeanAccumulator>,
    _schema: std::marker::PhantomData<F>,
}

impl<F: FieldSet> FieldAccumulator<F> {
    fn new() -> Self {
        FieldAccumulator {
            fields: vec![MeanAccumulator::default(); F::FIELDS.len()],
            _schema: std::marker::PhantomData,
        }
    }

    fn push(&mut self, values: &F) {
        for (acc, field) in self.fields.iter_mut().zip(F::FIELDS) {
            acc.push(values.get(*field));
        }
    }

    fn finish(&self) -> F {
        let mut means = F::default();
        for (acc, field) in self.fields.iter().zip(F::FIELDS) {
            means.set(*field, acc.mean());
        }
        means
    }
}

/// Start of the bucket containing `epoch_ms`: `floor(epoch_ms / width) * width`.
pub fn bucket_start(epoch_ms: i64, width_ms: i64) -> i64 {
    epoch_ms.div_euclid(width_ms) * width_ms
}

/// Group readings into `width_ms` wide buckets and average every field.
///
/// Timestamps are re-resolved here; readings whose timestamp cannot be
/// parsed are left out. Non-finite or absent values are skipped for their
/// own field only. A non-positive width falls back to
/// [`DEFAULT_BUCKET_MS`]. The result is strictly ascending by start.
pub fn aggregate<F, I>(readings: I, width_ms: i64, normalizer: &TimestampNormalizer) -> Vec<Bucket<F>>
where
    F: FieldSet,
    I: IntoIterator,
    I::Item: Sample<Fields = F>,
{
    let width_ms = if width_ms > 0 {
        width_ms
    } else {
        DEFAULT_BUCKET_MS
    };

    let mut buckets: BTreeMap<i64, FieldAccumulator<F>> = BTreeMap::new();
    let mut skipped = 0usize;

    for reading in readings {
        let epoch_ms = match reading.epoch_ms(normalizer) {
            Ok(ms) => ms,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        buckets
            .entry(bucket_start(epoch_ms, width_ms))
            .or_insert_with(FieldAccumulator::new)
            .push(reading.fields());
    }

    debug!(
        "Aggregated into {} buckets of {} ms ({} readings without a usable timestamp)",
        buckets.len(),
        width_ms,
        skipped
    );

    buckets
        .into_iter()
        .map(|(start_ms, acc)| Bucket {
            start_ms,
            means: acc.finish(),
        })
        .collect()
}
