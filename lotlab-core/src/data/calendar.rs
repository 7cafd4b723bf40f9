//! Calendar-day grouping shared by the engine and the lot allocator.

use chrono::NaiveDate;

/// Assign a 0-based day id to every tick.
///
/// `ids[0] == 0`; the id increments by one whenever the calendar date differs
/// from the previous tick's date. Ticks on the same date share an id.
pub fn day_ids<I>(dates: I) -> Vec<usize>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut ids = Vec::new();
    let mut prev: Option<NaiveDate> = None;
    let mut current = 0usize;
    for date in dates {
        if let Some(p) = prev {
            if date != p {
                current += 1;
            }
        }
        ids.push(current);
        prev = Some(date);
    }
    ids
}

/// Contiguous tick ranges sharing a calendar date, in series order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroups {
    pub dates: Vec<NaiveDate>,
    /// `ranges[k]` is the half-open tick range of `dates[k]`.
    pub ranges: Vec<std::ops::Range<usize>>,
}

impl DayGroups {
    pub fn from_dates(dates: &[NaiveDate]) -> Self {
        let mut out = DayGroups {
            dates: Vec::new(),
            ranges: Vec::new(),
        };
        let mut start = 0;
        for i in 1..=dates.len() {
            if i == dates.len() || dates[i] != dates[start] {
                out.dates.push(dates[start]);
                out.ranges.push(start..i);
                start = i;
            }
        }
        out
    }

    /// Sum `values` within each day.
    pub fn sum(&self, values: &[f64]) -> Vec<f64> {
        self.ranges
            .iter()
            .map(|r| values[r.clone()].iter().sum())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn same_day_ticks_share_an_id() {
        let ids = day_ids(vec![d(1), d(1), d(4), d(4), d(4), d(5)]);
        assert_eq!(ids, vec![0, 0, 1, 1, 1, 2]);
    }

    #[test]
    fn weekend_gap_counts_as_one_day() {
        // Fri → Mon is a single session boundary.
        let ids = day_ids(vec![d(1), d(4)]);
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn empty_input() {
        assert!(day_ids(Vec::new()).is_empty());
    }

    #[test]
    fn groups_and_sums() {
        let dates = vec![d(1), d(1), d(2), d(3), d(3)];
        let groups = DayGroups::from_dates(&dates);
        assert_eq!(groups.dates, vec![d(1), d(2), d(3)]);
        assert_eq!(groups.ranges, vec![0..2, 2..3, 3..5]);
        assert_eq!(groups.sum(&[1.0, 2.0, 3.0, 4.0, 5.0]), vec![3.0, 3.0, 9.0]);
    }
}
