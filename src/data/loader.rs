use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Date32Array, Date64Array, Float32Array, Float64Array,
    Int32Array, Int64Array, StringArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use calamine::{open_workbook_auto, Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::LoadError;
use super::model::{CellValue, ObservationTable};
use crate::settings::ColumnNames;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Header plus rows as read from a file, before any validation.
struct RawSheet {
    headers: Vec<String>,
    rows: Vec<BTreeMap<String, CellValue>>,
}

/// Load an observation table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – first worksheet, first row is the header
/// * `.csv`     – header row, `,` or `;` separated
/// * `.json`    – `[{ "Data": "...", "Estação": "...", ... }, ...]`
/// * `.parquet` – flat columns
///
/// The sheet must have a column named `columns.date`; nothing else about its
/// layout is required.
pub fn load_file(path: &Path, columns: &ColumnNames) -> Result<ObservationTable, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let raw = match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_spreadsheet(path)?,
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(LoadError::UnsupportedExtension(other.to_string())),
    };

    build_table(raw, columns)
}

/// Validate the header and turn the raw rows into a table.
fn build_table(raw: RawSheet, columns: &ColumnNames) -> Result<ObservationTable, LoadError> {
    if !raw.headers.iter().any(|h| *h == columns.date) {
        return Err(LoadError::MissingRequiredColumn(columns.date.clone()));
    }

    let table = ObservationTable::from_rows(raw.headers, raw.rows, columns.clone());
    if table.date_bounds().is_none() {
        return Err(LoadError::NoValidDates(columns.date.clone()));
    }
    Ok(table)
}

/// Header names with blanks replaced by a positional placeholder.
fn normalise_headers(headers: impl Iterator<Item = String>) -> Vec<String> {
    headers
        .enumerate()
        .map(|(i, h)| {
            let h = h.trim().to_string();
            if h.is_empty() {
                format!("Unnamed: {i}")
            } else {
                h
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn load_spreadsheet(path: &Path) -> Result<RawSheet> {
    let mut workbook = open_workbook_auto(path).context("opening spreadsheet")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("spreadsheet has no worksheets")?
        .context("reading first worksheet")?;

    let mut rows_iter = range.rows();
    let header_row = rows_iter.next().context("worksheet is empty")?;
    let headers = normalise_headers(header_row.iter().map(header_text));

    let mut rows = Vec::new();
    for row in rows_iter {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut cells = BTreeMap::new();
        for (col_idx, name) in headers.iter().enumerate() {
            let value = row.get(col_idx).map(spreadsheet_cell).unwrap_or(CellValue::Null);
            cells.insert(name.clone(), value);
        }
        rows.push(cells);
    }

    Ok(RawSheet { headers, rows })
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::from_text(s),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Null),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one reading per record.
/// Files exported with a `;` separator (common with decimal commas) are
/// detected from the header line.
fn load_csv(path: &Path) -> Result<RawSheet> {
    let delimiter = sniff_delimiter(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    let headers = normalise_headers(
        reader
            .headers()
            .context("reading CSV headers")?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string()),
    );

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut cells = BTreeMap::new();
        for (col_idx, name) in headers.iter().enumerate() {
            let value = record
                .get(col_idx)
                .map(|s| csv_cell(s, delimiter))
                .unwrap_or(CellValue::Null);
            cells.insert(name.clone(), value);
        }
        rows.push(cells);
    }

    Ok(RawSheet { headers, rows })
}

fn sniff_delimiter(path: &Path) -> Result<u8> {
    let file = std::fs::File::open(path).context("opening CSV")?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .context("reading CSV header line")?;
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    Ok(if semicolons > commas { b';' } else { b',' })
}

/// A decimal comma ("7,25") is only read as a number in `;` separated files.
fn csv_cell(s: &str, delimiter: u8) -> CellValue {
    match CellValue::from_text(s) {
        CellValue::Text(t) if delimiter == b';' && t.matches(',').count() == 1 => t
            .replace(',', ".")
            .parse::<f64>()
            .map(CellValue::Float)
            .unwrap_or(CellValue::Text(t)),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Data": "2023-01-15", "Estação": "E1", "x": -47.1, "y": -22.9, "pH": 7.1 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<RawSheet> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut cells = BTreeMap::new();
        for (key, val) in obj {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
            cells.insert(key.clone(), json_cell(val));
        }
        rows.push(cells);
    }

    Ok(RawSheet { headers, rows })
}

fn json_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one reading per row.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`); timestamp and date columns are kept as
/// native dates.
fn load_parquet(path: &Path) -> Result<RawSheet> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let mut cells = BTreeMap::new();
            for (col_idx, name) in headers.iter().enumerate() {
                let value = arrow_cell(batch.column(col_idx), row)
                    .with_context(|| format!("Row {row}: failed to read '{name}'"))?;
                cells.insert(name.clone(), value);
            }
            rows.push(cells);
        }
    }

    Ok(RawSheet { headers, rows })
}

/// Downcast `col` to `$ty`, failing with a readable message.
macro_rules! downcast {
    ($col:expr, $ty:ty) => {
        $col.as_any()
            .downcast_ref::<$ty>()
            .context(concat!("expected ", stringify!($ty)))?
    };
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_cell(col: &Arc<dyn Array>, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => CellValue::Text(downcast!(col, StringArray).value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => CellValue::Integer(downcast!(col, Int32Array).value(row) as i64),
        DataType::Int64 => CellValue::Integer(downcast!(col, Int64Array).value(row)),
        DataType::Float32 => CellValue::Float(downcast!(col, Float32Array).value(row) as f64),
        DataType::Float64 => CellValue::Float(downcast!(col, Float64Array).value(row)),
        DataType::Boolean => CellValue::Bool(downcast!(col, BooleanArray).value(row)),
        DataType::Date32 => datetime_cell(downcast!(col, Date32Array).value_as_datetime(row)),
        DataType::Date64 => datetime_cell(downcast!(col, Date64Array).value_as_datetime(row)),
        DataType::Timestamp(unit, _) => datetime_cell(match unit {
            TimeUnit::Second => downcast!(col, TimestampSecondArray).value_as_datetime(row),
            TimeUnit::Millisecond => {
                downcast!(col, TimestampMillisecondArray).value_as_datetime(row)
            }
            TimeUnit::Microsecond => {
                downcast!(col, TimestampMicrosecondArray).value_as_datetime(row)
            }
            TimeUnit::Nanosecond => {
                downcast!(col, TimestampNanosecondArray).value_as_datetime(row)
            }
        }),
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(value)
}

fn datetime_cell(dt: Option<chrono::NaiveDateTime>) -> CellValue {
    dt.map(CellValue::DateTime).unwrap_or(CellValue::Null)
}
