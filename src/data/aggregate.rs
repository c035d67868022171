use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::Serialize;

use super::model::ObservationTable;

/// Mean of one parameter for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearMean {
    pub year: f64,
    /// `None` when no row of that year has a value for the parameter.
    pub mean: Option<f64>,
    /// Number of values averaged.
    pub count: usize,
}

/// One bar per distinct year, ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSeries {
    pub parameter: String,
    pub points: Vec<YearMean>,
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

/// Group the rows at `indices` by their year value and average `parameter`
/// inside each group. Rows without a year are left out; rows without the
/// parameter still make their year appear.
pub fn yearly_means(
    table: &ObservationTable,
    indices: &[usize],
    parameter: &str,
) -> AggregatedSeries {
    let mut groups: BTreeMap<OrderedFloat<f64>, Accumulator> = BTreeMap::new();

    for &i in indices {
        let Some(year) = table.year(i) else {
            continue;
        };
        let acc = groups.entry(OrderedFloat(year)).or_default();
        if let Some(value) = table.observations[i].number(parameter) {
            acc.sum += value;
            acc.count += 1;
        }
    }

    let points = groups
        .into_iter()
        .map(|(year, acc)| YearMean {
            year: year.into_inner(),
            mean: (acc.count > 0).then(|| acc.sum / acc.count as f64),
            count: acc.count,
        })
        .collect();

    AggregatedSeries {
        parameter: parameter.to_string(),
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures;

    #[test]
    fn means_per_year_in_ascending_order() {
        let table = fixtures::table(&[
            ("2022-03-01", "E1", 2022.0, &[("pH", Some(10.0))]),
            ("2021-03-01", "E1", 2021.0, &[("pH", Some(4.0))]),
            ("2021-09-01", "E2", 2021.0, &[("pH", Some(6.0))]),
        ]);
        let series = yearly_means(&table, &[0, 1, 2], "pH");

        assert_eq!(
            series.points,
            vec![
                YearMean { year: 2021.0, mean: Some(5.0), count: 2 },
                YearMean { year: 2022.0, mean: Some(10.0), count: 1 },
            ]
        );
    }

    #[test]
    fn one_row_per_distinct_year_even_without_values() {
        let table = fixtures::table(&[
            ("2020-01-01", "E1", 2020.0, &[("OD", None)]),
            ("2021-01-01", "E1", 2021.0, &[("OD", Some(7.5))]),
            ("2021-02-01", "E1", 2021.0, &[("OD", None)]),
        ]);
        let series = yearly_means(&table, &[0, 1, 2], "OD");

        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].mean, None);
        assert_eq!(series.points[1].mean, Some(7.5));
        assert_eq!(series.points[1].count, 1);
    }

    #[test]
    fn only_indexed_rows_are_grouped() {
        let table = fixtures::table(&[
            ("2020-01-01", "E1", 2020.0, &[("OD", Some(1.0))]),
            ("2021-01-01", "E1", 2021.0, &[("OD", Some(3.0))]),
        ]);
        let series = yearly_means(&table, &[1], "OD");
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].year, 2021.0);

        assert!(yearly_means(&table, &[], "OD").points.is_empty());
    }
}
