use poolwatch_common::types::FieldSet;

/// A data-quality alert is considered once every this many records.
pub const DATA_QUALITY_INTERVAL: u64 = 50;

/// `missing / total` is scaled by this factor; a scaled ratio of `1.0`
/// means one third of all records lacked a required field.
pub const MISSING_RATIO_SCALE: u64 = 3;

/// Lifetime counters of parsed records and of those missing a required field.
#[derive(Debug, Clone, Default)]
pub struct FieldCompletenessTracker {
    total: u64,
    missing: u64,
}

impl FieldCompletenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one parsed record. Returns `true` when it lacked a required field.
    pub fn record(&mut self, fields: &FieldSet) -> bool {
        self.total += 1;
        let incomplete = !fields.is_complete();
        if incomplete {
            self.missing += 1;
        }
        incomplete
    }

    pub fn total_records(&self) -> u64 {
        self.total
    }

    pub fn missing_records(&self) -> u64 {
        self.missing
    }

    pub fn missing_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.missing as f64 / self.total as f64) * MISSING_RATIO_SCALE as f64
    }

    /// Scaled ratio at or above one, checked only on every
    /// [`DATA_QUALITY_INTERVAL`]th record.
    pub fn should_alert(&self) -> bool {
        // missing / total * 3 >= 1, kept in integers to avoid rounding at exactly 1/3.
        self.total > 0
            && self.total % DATA_QUALITY_INTERVAL == 0
            && self.missing * MISSING_RATIO_SCALE >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolwatch_common::types::Field;

    #[test]
    fn counts_incomplete_records() {
        let mut tracker = FieldCompletenessTracker::new();
        assert!(!tracker.record(&FieldSet::all()));
        assert!(tracker.record(&[Field::Pool].into_iter().collect()));
        assert_eq!(tracker.total_records(), 2);
        assert_eq!(tracker.missing_records(), 1);
        assert_eq!(tracker.missing_ratio(), 1.5);
    }

    #[test]
    fn alerts_only_on_interval_boundary() {
        let mut tracker = FieldCompletenessTracker::new();
        let incomplete: FieldSet = [Field::Pool, Field::UpstreamStatus].into_iter().collect();
        for n in 1..=DATA_QUALITY_INTERVAL * 2 {
            tracker.record(&incomplete);
            assert_eq!(tracker.should_alert(), n % DATA_QUALITY_INTERVAL == 0, "record {n}");
        }
        assert_eq!(tracker.missing_ratio(), 3.0);
    }

    #[test]
    fn exactly_one_third_missing_is_enough() {
        let mut tracker = FieldCompletenessTracker::new();
        // 17 of 51 would be one third, but only multiples of 50 count: use 150.
        for n in 0..150 {
            if n % 3 == 0 {
                tracker.record(&FieldSet::default());
            } else {
                tracker.record(&FieldSet::all());
            }
        }
        assert_eq!(tracker.missing_records(), 50);
        assert!(tracker.should_alert());
    }

    #[test]
    fn below_one_third_never_alerts() {
        let mut tracker = FieldCompletenessTracker::new();
        for n in 0..100 {
            if n % 4 == 0 {
                tracker.record(&FieldSet::default());
            } else {
                tracker.record(&FieldSet::all());
            }
        }
        assert_eq!(tracker.total_records(), 100);
        assert!(!tracker.should_alert());
        assert!(tracker.missing_ratio() < 1.0);
    }
}
