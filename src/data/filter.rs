use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use super::model::{ObservationTable, StationKey};

// ---------------------------------------------------------------------------
// Date interval
// ---------------------------------------------------------------------------

/// Closed range of calendar dates. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateInterval {
    /// `None` when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The interval covering every parseable date of the table.
    pub fn spanning(table: &ObservationTable) -> Option<Self> {
        let (start, end) = table.date_bounds()?;
        Some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Narrow `self` so it lies within `bounds`. Falls back to `bounds` when
    /// the two do not overlap.
    pub fn clamped_to(&self, bounds: &DateInterval) -> DateInterval {
        let start = self.start.clamp(bounds.start, bounds.end);
        let end = self.end.clamp(bounds.start, bounds.end);
        DateInterval::new(start, end).unwrap_or(*bounds)
    }
}

// ---------------------------------------------------------------------------
// Filter predicate
// ---------------------------------------------------------------------------

/// Stations the user kept selected. A row passes when its station is in the set.
pub type StationSelection = BTreeSet<StationKey>;

#[derive(Debug, Clone, PartialEq)]
pub struct Filters {
    pub interval: DateInterval,
    pub stations: StationSelection,
}

/// Return indices of observations dated inside `interval` (ignoring stations).
pub fn indices_in_interval(table: &ObservationTable, interval: &DateInterval) -> Vec<usize> {
    table
        .observations
        .iter()
        .enumerate()
        .filter(|(_, obs)| obs.date.is_some_and(|d| interval.contains(d.date())))
        .map(|(i, _)| i)
        .collect()
}

/// Return indices of observations that pass the filters, in table order.
///
/// An observation passes when:
/// * its date is present and its calendar day lies in the interval (inclusive)
/// * its station is one of the selected stations
pub fn filtered_indices(table: &ObservationTable, filters: &Filters) -> Vec<usize> {
    indices_in_interval(table, &filters.interval)
        .into_iter()
        .filter(|&i| filters.stations.contains(&table.station(i)))
        .collect()
}

/// Distinct stations among `indices`, in order of first appearance.
pub fn stations_in(table: &ObservationTable, indices: &[usize]) -> Vec<StationKey> {
    let mut seen = BTreeSet::new();
    indices
        .iter()
        .map(|&i| table.station(i))
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_table() -> ObservationTable {
        let dates: Vec<String> = (1..=10).map(|m| format!("2023-{m:02}-15")).collect();
        let rows: Vec<(&str, &str, f64, &[(&str, Option<f64>)])> = dates
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let station = if i % 2 == 0 { "E1" } else { "E2" };
                (d.as_str(), station, 2023.0, &[] as &[(&str, Option<f64>)])
            })
            .collect();
        fixtures::table(&rows)
    }

    fn all_stations(table: &ObservationTable) -> StationSelection {
        let all: Vec<usize> = (0..table.len()).collect();
        stations_in(table, &all).into_iter().collect()
    }

    #[test]
    fn interval_rejects_inverted_bounds() {
        assert!(DateInterval::new(date(2023, 2, 1), date(2023, 1, 1)).is_none());
        assert!(DateInterval::new(date(2023, 1, 1), date(2023, 1, 1)).is_some());
    }

    #[test]
    fn second_half_of_year_excludes_earlier_rows() {
        let table = monthly_table();
        let filters = Filters {
            interval: DateInterval::new(date(2023, 6, 1), date(2023, 12, 31)).unwrap(),
            stations: all_stations(&table),
        };
        let kept = filtered_indices(&table, &filters);

        assert_eq!(kept, vec![5, 6, 7, 8, 9]);
        for &i in &kept {
            assert!(table.observations[i].date.unwrap().date() >= date(2023, 6, 1));
        }
    }

    #[test]
    fn interval_bounds_are_inclusive_on_calendar_days() {
        let table = fixtures::table(&[
            ("2023-03-01 00:00:00", "E1", 2023.0, &[]),
            ("2023-03-31 18:45:00", "E1", 2023.0, &[]),
            ("2023-04-01", "E1", 2023.0, &[]),
        ]);
        let interval = DateInterval::new(date(2023, 3, 1), date(2023, 3, 31)).unwrap();
        assert_eq!(indices_in_interval(&table, &interval), vec![0, 1]);
    }

    #[test]
    fn station_selection_keeps_order() {
        let table = monthly_table();
        let filters = Filters {
            interval: DateInterval::spanning(&table).unwrap(),
            stations: [Some("E2".to_string())].into_iter().collect(),
        };
        assert_eq!(filtered_indices(&table, &filters), vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn empty_selection_yields_empty_result() {
        let table = monthly_table();
        let filters = Filters {
            interval: DateInterval::spanning(&table).unwrap(),
            stations: StationSelection::new(),
        };
        assert!(filtered_indices(&table, &filters).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let table = monthly_table();
        let filters = Filters {
            interval: DateInterval::new(date(2023, 3, 1), date(2023, 8, 31)).unwrap(),
            stations: [Some("E1".to_string())].into_iter().collect(),
        };
        let once = table.select(&filtered_indices(&table, &filters));
        let again = filtered_indices(&once, &filters);

        assert_eq!(again, (0..once.len()).collect::<Vec<_>>());
    }

    #[test]
    fn missing_dates_never_pass() {
        let table = fixtures::table(&[
            ("n/a", "E1", 2023.0, &[]),
            ("2023-05-05", "E1", 2023.0, &[]),
        ]);
        let interval = DateInterval::spanning(&table).unwrap();
        assert_eq!(indices_in_interval(&table, &interval), vec![1]);
    }

    #[test]
    fn clamping_stays_within_bounds() {
        let bounds = DateInterval::new(date(2023, 1, 1), date(2023, 12, 31)).unwrap();
        let wide = DateInterval::new(date(2020, 1, 1), date(2023, 6, 1)).unwrap();
        let clamped = wide.clamped_to(&bounds);
        assert_eq!(clamped.start(), date(2023, 1, 1));
        assert_eq!(clamped.end(), date(2023, 6, 1));

        let outside = DateInterval::new(date(2030, 1, 1), date(2030, 2, 1)).unwrap();
        assert_eq!(outside.clamped_to(&bounds).start(), date(2023, 12, 31));
    }

    #[test]
    fn stations_listed_in_first_appearance_order() {
        let table = fixtures::table(&[
            ("2023-01-01", "B", 2023.0, &[]),
            ("2023-01-02", "A", 2023.0, &[]),
            ("2023-01-03", "B", 2023.0, &[]),
        ]);
        assert_eq!(
            stations_in(&table, &[0, 1, 2]),
            vec![Some("B".to_string()), Some("A".to_string())]
        );
    }
}
