/// Chronological ordering of readings in arrival order
use log::debug;

use crate::models::Sample;
use crate::timestamp::TimestampNormalizer;

/// Stably sort a batch of readings into time order.
///
/// The ordering key of a reading is its parsed epoch milliseconds, or its
/// arrival index when the timestamp cannot be parsed. Nothing is dropped and
/// equal keys keep their arrival order. The returned references borrow the
/// caller's readings.
pub fn chronological<'a, S: Sample>(
    readings: &'a [S],
    normalizer: &TimestampNormalizer,
) -> Vec<&'a S> {
    let mut keyed: Vec<(i64, &'a S)> = readings
        .iter()
        .enumerate()
        .map(|(index, reading)| {
            let key = reading.epoch_ms(normalizer).unwrap_or(index as i64);
            (key, reading)
        })
        .collect();

    // `sort_by_key` is stable.
    keyed.sort_by_key(|(key, _)| *key);

    debug!("Ordered {} readings chronologically", keyed.len());
    keyed.into_iter().map(|(_, reading)| reading).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawTimestamp, Reading};
    use crate::schema::HydroponicFields;

    fn reading(ts: impl Into<RawTimestamp>, temperature: f64) -> Reading<HydroponicFields> {
        Reading::new(
            ts,
            HydroponicFields {
                temperature: Some(temperature),
                ..Default::default()
            },
        )
    }

    fn temperatures(ordered: &[&Reading<HydroponicFields>]) -> Vec<f64> {
        ordered
            .iter()
            .filter_map(|r| r.values.temperature)
            .collect()
    }

    #[test]
    fn test_orders_mixed_formats_by_instant() {
        let readings = vec![
            reading(1_700_000_010_000i64, 3.0),
            reading(1_700_000_000i64, 1.0),
            reading("2023-11-14T22:13:25Z", 2.0),
        ];
        let ordered = chronological(&readings, &TimestampNormalizer::default());
        assert_eq!(temperatures(&ordered), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_equal_keys_keep_arrival_order() {
        let readings = vec![
            reading(1_700_000_000_000i64, 1.0),
            reading(1_700_000_000i64, 2.0),
            reading(1_700_000_000_000i64, 3.0),
        ];
        let ordered = chronological(&readings, &TimestampNormalizer::default());
        assert_eq!(temperatures(&ordered), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_unparseable_readings_are_kept_by_arrival_index() {
        let readings = vec![
            reading(1_700_000_000i64, 10.0),
            reading("rusak", 1.0),
            reading(RawTimestamp::Missing, 2.0),
            reading(1_600_000_000i64, 5.0),
        ];
        let ordered = chronological(&readings, &TimestampNormalizer::default());
        // Index keys (1, 2) sort ahead of any real epoch value.
        assert_eq!(temperatures(&ordered), vec![1.0, 2.0, 5.0, 10.0]);
        assert_eq!(ordered.len(), readings.len());
    }

    #[test]
    fn test_sorting_is_idempotent() {
        let readings = vec![
            reading(1_700_000_003i64, 3.0),
            reading("garbage", 0.0),
            reading(1_700_000_001i64, 1.0),
            reading(1_700_000_002i64, 2.0),
        ];
        let normalizer = TimestampNormalizer::default();
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
    fn test_empty_input() {
        let readings: Vec<Reading<HydroponicFields>> = Vec::new();
        assert!(chronological(&readings, &TimestampNormalizer::default()).is_empty());
    }
}
