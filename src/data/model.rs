use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::settings::ColumnNames;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the observation table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a spreadsheet column can hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{v:.1}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::DateTime(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Interpret the value as an `f64`. NaN floats count as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if !v.is_nan() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Guess the type of a raw text cell (CSV, text spreadsheet cells).
    pub fn from_text(s: &str) -> CellValue {
        let s = s.trim();
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Date coercion
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Coerce a cell into a timestamp. Anything that is not a recognisable date
/// becomes `None` (a missing marker), never an error.
pub fn coerce_datetime(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Text(s) => parse_datetime_text(s),
        _ => None,
    }
}

fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    // Fractional seconds as written by most exporters.
    let base = s.split('.').next().unwrap_or(s);
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(base, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Column kinds
// ---------------------------------------------------------------------------

/// Inferred type of a whole column, equivalent to a dataframe dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Numeric,
    Date,
    Boolean,
    Text,
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a CellValue>) -> ColumnKind {
    let mut seen = [false; 4]; // numeric, date, bool, text
    for cell in cells {
        match cell {
            CellValue::Null => {}
            CellValue::Float(v) if v.is_nan() => {}
            CellValue::Integer(_) | CellValue::Float(_) => seen[0] = true,
            CellValue::DateTime(_) => seen[1] = true,
            CellValue::Bool(_) => seen[2] = true,
            CellValue::Text(_) => seen[3] = true,
        }
    }
    match seen {
        [true, false, false, false] => ColumnKind::Numeric,
        [false, true, false, false] => ColumnKind::Date,
        [false, false, true, false] => ColumnKind::Boolean,
        _ => ColumnKind::Text,
    }
}

// ---------------------------------------------------------------------------
// Observation – one row of the sheet
// ---------------------------------------------------------------------------

/// Station identifier of a row; `None` when the cell is empty.
pub type StationKey = Option<String>;

/// Human label for a station key.
pub fn station_label(key: &StationKey) -> String {
    key.clone().unwrap_or_else(|| "(sem estação)".to_string())
}

/// A single monitoring reading (one row of the source sheet).
#[derive(Debug, Clone)]
pub struct Observation {
    /// Parsed `Data` column; `None` when the cell could not be read as a date.
    pub date: Option<NaiveDateTime>,
    /// Every other column: column_name → value.
    pub cells: BTreeMap<String, CellValue>,
}

impl Observation {
    pub fn value(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Numeric value of `column`, `None` when absent, null or non-numeric.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.cells.get(column).and_then(CellValue::as_f64)
    }
}

// ---------------------------------------------------------------------------
// ObservationTable – the complete loaded sheet
// ---------------------------------------------------------------------------

/// The parsed sheet with its column index.
#[derive(Debug, Clone)]
pub struct ObservationTable {
    /// All rows, in file order.
    pub observations: Vec<Observation>,
    /// Column names in file order, including the date column.
    pub column_names: Vec<String>,
    /// Inferred kind for each column.
    pub column_kinds: BTreeMap<String, ColumnKind>,
    /// Names of the well-known columns.
    pub columns: ColumnNames,
}

impl ObservationTable {
    /// Build the table from raw rows. `column_names` must contain the date
    /// column; the loader checks that before calling.
    pub fn from_rows(
        column_names: Vec<String>,
        rows: Vec<BTreeMap<String, CellValue>>,
        columns: ColumnNames,
    ) -> Self {
        let column_kinds = column_names
            .iter()
            .map(|name| {
                let kind = if *name == columns.date {
                    ColumnKind::Date
                } else {
                    infer_kind(rows.iter().filter_map(|r| r.get(name)))
                };
                (name.clone(), kind)
            })
            .collect();

        let observations = rows
            .into_iter()
            .map(|mut cells| {
                let date = cells
                    .remove(&columns.date)
                    .as_ref()
                    .and_then(coerce_datetime);
                Observation { date, cells }
            })
            .collect();

        ObservationTable {
            observations,
            column_names,
            column_kinds,
            columns,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_kinds.contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.column_kinds.get(name).copied()
    }

    /// Station of row `idx`. Rows without a station cell yield `None`.
    pub fn station(&self, idx: usize) -> StationKey {
        match self.observations[idx].value(&self.columns.station) {
            None | Some(CellValue::Null) => None,
            Some(CellValue::Float(v)) if v.is_nan() => None,
            Some(other) => Some(other.to_string()),
        }
    }

    /// `(x, y)` coordinates of row `idx` when both are present.
    pub fn coordinates(&self, idx: usize) -> Option<(f64, f64)> {
        let obs = &self.observations[idx];
        Some((obs.number(&self.columns.x)?, obs.number(&self.columns.y)?))
    }

    /// Year value of row `idx` (`Ano` column).
    pub fn year(&self, idx: usize) -> Option<f64> {
        self.observations[idx].number(&self.columns.year)
    }

    /// Min and max calendar date over all parseable dates.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.observations.iter().filter_map(|o| o.date);
        let first = dates.next()?.date();
        Some(dates.fold((first, first), |(lo, hi), d| {
            let d = d.date();
            (lo.min(d), hi.max(d))
        }))
    }

    /// Numeric columns eligible as chart parameters: every numeric column
    /// except the year and coordinate columns, in file order.
    pub fn numeric_parameters(&self) -> Vec<String> {
        let excluded = [&self.columns.year, &self.columns.x, &self.columns.y];
        self.column_names
            .iter()
            .filter(|name| self.kind_of(name) == Some(ColumnKind::Numeric))
            .filter(|name| !excluded.contains(name))
            .cloned()
            .collect()
    }

    /// A new table holding only the rows at `indices`, in that order.
    #[cfg(test)]
    pub fn select(&self, indices: &[usize]) -> ObservationTable {
        ObservationTable {
            observations: indices
                .iter()
                .map(|&i| self.observations[i].clone())
                .collect(),
            column_names: self.column_names.clone(),
            column_kinds: self.column_kinds.clone(),
            columns: self.columns.clone(),
        }
    }

    /// Render cell `column` of row `idx` for tabular previews.
    pub fn display_cell(&self, idx: usize, column: &str) -> String {
        let obs = &self.observations[idx];
        if column == self.columns.date {
            return obs
                .date
                .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "NaT".to_string());
        }
        match obs.value(column) {
            Some(CellValue::Null) | None => String::new(),
            Some(v) => v.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// One reading: (date, station, year, parameters).
    pub fn table(rows: &[(&str, &str, f64, &[(&str, Option<f64>)])]) -> ObservationTable {
        let columns = ColumnNames::default();
        let mut names = vec![
            columns.date.clone(),
            columns.station.clone(),
            columns.x.clone(),
            columns.y.clone(),
            columns.year.clone(),
        ];
        let mut raw = Vec::new();
        for (i, (date, station, year, params)) in rows.iter().enumerate() {
            let mut cells = BTreeMap::new();
            cells.insert(columns.date.clone(), CellValue::Text(date.to_string()));
            cells.insert(columns.station.clone(), CellValue::Text(station.to_string()));
            cells.insert(columns.x.clone(), CellValue::Float(-47.0 - i as f64 * 0.01));
            cells.insert(columns.y.clone(), CellValue::Float(-22.0 - i as f64 * 0.01));
            cells.insert(columns.year.clone(), CellValue::Integer(*year as i64));
            for (name, value) in params.iter() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
                let cell = value.map(CellValue::Float).unwrap_or(CellValue::Null);
                cells.insert(name.to_string(), cell);
            }
            raw.push(cells);
        }
        ObservationTable::from_rows(names, raw, columns)
    }
}
