use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use super::error::Warning;
use super::model::{ObservationTable, StationKey};

/// Minimum number of complete (x, y) pairs for a scatter plot or a coefficient.
pub const MIN_PAIRED_ROWS: usize = 2;

/// A row with both chosen columns present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedPoint {
    /// Index into the observation table.
    pub row: usize,
    pub station: StationKey,
    pub x: f64,
    pub y: f64,
}

/// Spearman rank correlation between two columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrelationResult {
    /// Coefficient in `[-1, 1]`.
    pub coefficient: f64,
    /// Two-sided p-value from the t approximation; `None` with only two pairs.
    pub p_value: Option<f64>,
    /// Number of pairs used.
    pub n: usize,
}

impl CorrelationResult {
    /// Coefficient rounded to two decimals, as shown to the user.
    pub fn display(&self) -> String {
        format!("{:.2}", self.coefficient)
    }
}

/// Rows at `indices` where both `x_column` and `y_column` hold a number, in
/// table order.
pub fn paired_points(
    table: &ObservationTable,
    indices: &[usize],
    x_column: &str,
    y_column: &str,
) -> Vec<PairedPoint> {
    indices
        .iter()
        .filter_map(|&row| {
            let obs = &table.observations[row];
            Some(PairedPoint {
                row,
                station: table.station(row),
                x: obs.number(x_column)?,
                y: obs.number(y_column)?,
            })
        })
        .collect()
}

/// Correlate two columns over already paired points.
///
/// Checked in order: too few pairs, identical columns, then the coefficient.
pub fn correlate(
    points: &[PairedPoint],
    x_column: &str,
    y_column: &str,
) -> Result<CorrelationResult, Warning> {
    if points.len() < MIN_PAIRED_ROWS {
        return Err(Warning::InsufficientPairedRows);
    }
    if x_column == y_column {
        return Err(Warning::IdenticalAxisSelection);
    }
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    spearman(&xs, &ys)
}

/// Spearman's rho: Pearson correlation of the average ranks.
pub fn spearman(xs: &[f64], ys: &[f64]) -> Result<CorrelationResult, Warning> {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len().min(ys.len());
    if n < MIN_PAIRED_ROWS {
        return Err(Warning::InsufficientPairedRows);
    }

    let rx = average_ranks(&xs[..n]);
    let ry = average_ranks(&ys[..n]);
    let rho = pearson(&rx, &ry).ok_or(Warning::ConstantInput)?;

    Ok(CorrelationResult {
        coefficient: rho,
        p_value: two_sided_p_value(rho, n),
        n,
    })
}

/// 1-based ranks; tied values share the mean of the ranks they span.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1 ..= end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// `None` when either series has zero variance.
fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some((cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0))
}

fn two_sided_p_value(rho: f64, n: usize) -> Option<f64> {
    if n <= 2 {
        return None;
    }
    if rho.abs() >= 1.0 {
        return Some(0.0);
    }
    let df = (n - 2) as f64;
    let t = rho * (df / (1.0 - rho * rho)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures;

    fn rho(xs: &[f64], ys: &[f64]) -> f64 {
        spearman(xs, ys).unwrap().coefficient
    }

    #[test]
    fn perfectly_monotonic_is_one() {
        let result = spearman(&[1.0, 2.0, 3.0, 4.0], &[10.0, 20.0, 30.0, 40.0]).unwrap();
        assert_eq!(result.display(), "1.00");
        assert_eq!(result.n, 4);
        assert_eq!(result.p_value, Some(0.0));
    }

    #[test]
    fn reversed_order_is_minus_one() {
        assert!((rho(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn ties_use_average_ranks() {
        assert_eq!(average_ranks(&[10.0, 20.0, 20.0, 5.0]), vec![2.0, 3.5, 3.5, 1.0]);
        // Matches the textbook value for this tied sample.
        let r = rho(&[1.0, 2.0, 2.0, 3.0], &[1.0, 3.0, 2.0, 4.0]);
        assert!((r - 0.9486832980505138).abs() < 1e-9);
    }

    #[test]
    fn symmetric_and_bounded() {
        let xs = [3.1, 0.4, 2.2, 9.8, 5.5, 4.0];
        let ys = [1.0, 7.0, 2.5, 0.3, 6.1, 6.0];
        let a = rho(&xs, &ys);
        let b = rho(&ys, &xs);
        assert!((a - b).abs() < 1e-12);
        assert!((-1.0..=1.0).contains(&a));
    }

    #[test]
    fn invariant_under_monotonic_transform_and_row_order() {
        let xs = [3.1, 0.4, 2.2, 9.8, 5.5, 4.0];
        let ys = [1.0, 7.0, 2.5, 0.3, 6.1, 6.0];
        let base = rho(&xs, &ys);

        let exp_x: Vec<f64> = xs.iter().map(|v| v.exp()).collect();
        let cubed_y: Vec<f64> = ys.iter().map(|v| v * v * v + 4.0).collect();
        assert!((rho(&exp_x, &cubed_y) - base).abs() < 1e-12);

        let mut rows: Vec<(f64, f64)> = xs.iter().copied().zip(ys.iter().copied()).collect();
        rows.reverse();
        rows.swap(0, 3);
        let (sx, sy): (Vec<f64>, Vec<f64>) = rows.into_iter().unzip();
        assert!((rho(&sx, &sy) - base).abs() < 1e-12);
    }

    #[test]
    fn p_value_in_unit_interval() {
        let result = spearman(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 1.0, 4.0, 3.0, 5.0]).unwrap();
        assert!((result.coefficient - 0.8).abs() < 1e-12);
        let p = result.p_value.unwrap();
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn constant_column_has_no_coefficient() {
        assert_eq!(
            spearman(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]),
            Err(Warning::ConstantInput)
        );
    }

    #[test]
    fn single_pair_is_insufficient() {
        let table = fixtures::table(&[
            ("2023-01-01", "E1", 2023.0, &[("pH", Some(7.0)), ("OD", Some(8.0))]),
            ("2023-02-01", "E1", 2023.0, &[("pH", Some(7.2)), ("OD", None)]),
        ]);
        let points = paired_points(&table, &[0, 1], "pH", "OD");
        assert_eq!(points.len(), 1);
        assert_eq!(
            correlate(&points, "pH", "OD"),
            Err(Warning::InsufficientPairedRows)
        );
    }

    #[test]
    fn identical_axes_are_rejected() {
        let table = fixtures::table(&[
            ("2023-01-01", "E1", 2023.0, &[("pH", Some(7.0))]),
            ("2023-02-01", "E2", 2023.0, &[("pH", Some(7.4))]),
        ]);
        let points = paired_points(&table, &[0, 1], "pH", "pH");
        assert_eq!(points.len(), 2);
        assert_eq!(
            correlate(&points, "pH", "pH"),
            Err(Warning::IdenticalAxisSelection)
        );
    }

    #[test]
    fn paired_points_drop_rows_missing_either_value() {
        let table = fixtures::table(&[
            ("2023-01-01", "E1", 2023.0, &[("pH", Some(7.0)), ("OD", Some(8.0))]),
            ("2023-02-01", "E2", 2023.0, &[("pH", None), ("OD", Some(6.0))]),
            ("2023-03-01", "E3", 2023.0, &[("pH", Some(6.5)), ("OD", Some(9.0))]),
        ]);
        let points = paired_points(&table, &[0, 1, 2], "pH", "OD");
        assert_eq!(points.iter().map(|p| p.row).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(points[1].station, Some("E3".to_string()));

        let result = correlate(&points, "pH", "OD").unwrap();
        assert_eq!(result.display(), "-1.00");
        assert_eq!(result.p_value, None);
    }
}
