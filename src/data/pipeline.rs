use serde::Serialize;

use super::aggregate::{yearly_means, AggregatedSeries};
use super::correlation::{correlate, paired_points, CorrelationResult, PairedPoint, MIN_PAIRED_ROWS};
use super::error::Warning;
use super::filter::{filtered_indices, Filters};
use super::model::{ObservationTable, StationKey};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Everything the user can choose besides the file itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Selections {
    pub filters: Filters,
    /// Parameter shown in the yearly bar chart.
    pub bar_parameter: Option<String>,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub row: usize,
    pub station: StationKey,
    /// Longitude-like coordinate (`x` column).
    pub x: f64,
    /// Latitude-like coordinate (`y` column).
    pub y: f64,
}

/// Station positions plus the point the map view is centred on.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MapData {
    pub points: Vec<MapPoint>,
    /// Mean of `(x, y)` over the points; `None` when there are none.
    pub center: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterData {
    pub x_axis: String,
    pub y_axis: String,
    pub points: Vec<PairedPoint>,
}

/// Result of one full pass over the pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Evaluation {
    /// Rows passing the filters, in table order.
    pub filtered: Vec<usize>,
    pub map: MapData,
    /// Numeric columns selectable for the charts.
    pub parameters: Vec<String>,
    pub bar: Option<AggregatedSeries>,
    pub scatter: Option<ScatterData>,
    pub correlation: Option<CorrelationResult>,
    pub warnings: Vec<Warning>,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Run filter → {aggregate, correlate} over `table`.
///
/// Never fails: conditions that prevent a stage from running are reported in
/// `warnings` and the stage's output is left empty.
pub fn evaluate(table: &ObservationTable, selections: &Selections) -> Evaluation {
    let filtered = filtered_indices(table, &selections.filters);
    let map = map_data(table, &filtered);
    let parameters = table.numeric_parameters();
    let mut warnings = Vec::new();

    let bar = if table.has_column(&table.columns.year) {
        selections
            .bar_parameter
            .as_deref()
            .filter(|p| parameters.iter().any(|q| q == p))
            .map(|p| yearly_means(table, &filtered, p))
    } else {
        None
    };

    let mut scatter = None;
    let mut correlation = None;
    if parameters.len() < 2 {
        warnings.push(Warning::InsufficientNumericColumns);
    } else if let (Some(x), Some(y)) = (
        valid_choice(&selections.x_axis, &parameters),
        valid_choice(&selections.y_axis, &parameters),
    ) {
        let points = paired_points(table, &filtered, x, y);
        if points.len() >= MIN_PAIRED_ROWS {
            scatter = Some(ScatterData {
                x_axis: x.to_string(),
                y_axis: y.to_string(),
                points: points.clone(),
            });
        }
        match correlate(&points, x, y) {
            Ok(result) => correlation = Some(result),
            Err(warning) => warnings.push(warning),
        }
    }

    for warning in &warnings {
        log::warn!("{warning}");
    }
    log::debug!(
        "Evaluated {} of {} rows: {} map points, {} bars, correlation {:?}",
        filtered.len(),
        table.len(),
        map.points.len(),
        bar.as_ref().map_or(0, |b| b.points.len()),
        correlation.map(|c| c.coefficient),
    );

    Evaluation {
        filtered,
        map,
        parameters,
        bar,
        scatter,
        correlation,
        warnings,
    }
}

fn valid_choice<'a>(choice: &'a Option<String>, parameters: &[String]) -> Option<&'a str> {
    choice
        .as_deref()
        .filter(|c| parameters.iter().any(|p| p == c))
}

/// Rows with both coordinates, and their mean position.
pub fn map_data(table: &ObservationTable, indices: &[usize]) -> MapData {
    let points: Vec<MapPoint> = indices
        .iter()
        .filter_map(|&row| {
            let (x, y) = table.coordinates(row)?;
            Some(MapPoint {
                row,
                station: table.station(row),
                x,
                y,
            })
        })
        .collect();

    let center = (!points.is_empty()).then(|| {
        let n = points.len() as f64;
        (
            points.iter().map(|p| p.x).sum::<f64>() / n,
            points.iter().map(|p| p.y).sum::<f64>() / n,
        )
    });

    MapData { points, center }
}
