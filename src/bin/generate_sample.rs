use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Station name, longitude, latitude, pollution load (0 = pristine).
const STATIONS: &[(&str, f64, f64, f64)] = &[
    ("PIRA-01", -47.78, -22.70, 0.1),
    ("PIRA-02", -47.65, -22.72, 0.4),
    ("CORU-01", -47.55, -22.66, 0.7),
    ("JAGU-03", -47.42, -22.78, 1.0),
];

struct Reading {
    date: NaiveDate,
    station: &'static str,
    x: f64,
    y: f64,
    year: i64,
    ph: Option<f64>,
    dissolved_oxygen: Option<f64>,
    turbidity: Option<f64>,
    temperature: Option<f64>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn generate(rng: &mut SimpleRng) -> Result<Vec<Reading>> {
    let mut readings = Vec::new();
    for year in 2019..=2023 {
        for month in 1..=12u32 {
            for &(station, x, y, load) in STATIONS {
                let day = 5 + (rng.next_u64() % 20) as u32;
                let date = NaiveDate::from_ymd_opt(year, month, day)
                    .with_context(|| format!("invalid date {year}-{month}-{day}"))?;

                // Warmer in the southern summer; warm water holds less oxygen.
                let season = (2.0 * std::f64::consts::PI * (month as f64 - 1.0) / 12.0).cos();
                let temperature = 22.0 + 4.0 * season + rng.gauss(0.0, 1.0);
                let dissolved_oxygen =
                    9.5 - 0.18 * temperature - 3.0 * load + rng.gauss(0.0, 0.4);
                let turbidity = (8.0 + 40.0 * load + 10.0 * season + rng.gauss(0.0, 5.0)).max(0.5);
                let ph = 7.2 - 0.5 * load + rng.gauss(0.0, 0.15);

                // Roughly one reading in twenty misses a parameter.
                let mut maybe = |v: f64| (rng.next_f64() > 0.05).then(|| round2(v));

                readings.push(Reading {
                    date,
                    station,
                    x,
                    y,
                    year: date.year() as i64,
                    ph: maybe(ph),
                    dissolved_oxygen: maybe(dissolved_oxygen),
                    turbidity: maybe(turbidity),
                    temperature: maybe(temperature),
                });
            }
        }
    }
    Ok(readings)
}

const HEADERS: [&str; 9] = ["Data", "Estação", "x", "y", "Ano", "pH", "OD", "Turbidez", "Temperatura"];

fn write_csv(path: &str, readings: &[Reading]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record(HEADERS)?;

    let opt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    for r in readings {
        writer.write_record([
            r.date.format("%Y-%m-%d").to_string(),
            r.station.to_string(),
            r.x.to_string(),
            r.y.to_string(),
            r.year.to_string(),
            opt(r.ph),
            opt(r.dissolved_oxygen),
            opt(r.turbidity),
            opt(r.temperature),
        ])?;
    }
    writer.flush().context("writing CSV file")?;
    Ok(())
}

fn write_parquet(path: &str, readings: &[Reading]) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("epoch")?;
    let float_col = |f: fn(&Reading) -> Option<f64>| -> ArrayRef {
        Arc::new(readings.iter().map(f).collect::<Float64Array>())
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new(HEADERS[0], DataType::Date32, false),
        Field::new(HEADERS[1], DataType::Utf8, false),
        Field::new(HEADERS[2], DataType::Float64, false),
        Field::new(HEADERS[3], DataType::Float64, false),
        Field::new(HEADERS[4], DataType::Int64, false),
        Field::new(HEADERS[5], DataType::Float64, true),
        Field::new(HEADERS[6], DataType::Float64, true),
        Field::new(HEADERS[7], DataType::Float64, true),
        Field::new(HEADERS[8], DataType::Float64, true),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from(
            readings
                .iter()
                .map(|r| (r.date - epoch).num_days() as i32)
                .collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            readings.iter().map(|r| r.station).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(readings.iter().map(|r| r.x).collect::<Vec<_>>())),
        Arc::new(Float64Array::from(readings.iter().map(|r| r.y).collect::<Vec<_>>())),
        Arc::new(Int64Array::from(readings.iter().map(|r| r.year).collect::<Vec<_>>())),
        float_col(|r| r.ph),
        float_col(|r| r.dissolved_oxygen),
        float_col(|r| r.turbidity),
        float_col(|r| r.temperature),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = SimpleRng::new(42);
    let readings = generate(&mut rng)?;

    write_csv("sample_water_quality.csv", &readings)?;
    write_parquet("sample_water_quality.parquet", &readings)?;

    log::info!(
        "Wrote {} readings from {} stations to sample_water_quality.{{csv,parquet}}",
        readings.len(),
        STATIONS.len()
    );
    println!("Wrote {} readings to sample_water_quality.csv and .parquet", readings.len());
    Ok(())
}
