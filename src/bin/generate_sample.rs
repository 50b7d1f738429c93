use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use clap::Parser;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// Write a synthetic hourly bike-share dataset in the UCI column layout.
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Cli {
    /// Output file; `.parquet` writes Parquet, anything else CSV
    #[arg(default_value = "sample_hour.csv")]
    output: PathBuf,

    /// Number of days to generate, starting 2011-01-01
    #[arg(long, default_value_t = 731)]
    days: u32,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Serialize)]
struct Row {
    instant: i64,
    dteday: String,
    season: i64,
    hr: i64,
    workingday: i64,
    weathersit: i64,
    temp: f64,
    hum: f64,
    casual: i64,
    registered: i64,
    cnt: i64,
}

/// Seeded splitmix64 stream; enough for reproducible demo data.
struct Noise {
    state: u64,
    spare: Option<f64>,
}

impl Noise {
    fn seeded(seed: u64) -> Self {
        Noise {
            state: seed,
            spare: None,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in [0, 1).
    fn uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Normal sample via the Marsaglia polar method; the second value is kept for the next call.
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        if let Some(z) = self.spare.take() {
            return mean + std_dev * z;
        }
        loop {
            let u = 2.0 * self.uniform() - 1.0;
            let v = 2.0 * self.uniform() - 1.0;
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                let factor = (-2.0 * s.ln() / s).sqrt();
                self.spare = Some(v * factor);
                return mean + std_dev * u * factor;
            }
        }
    }
}

/// UCI season code: 1 starts at the winter solstice, then one code per quarter.
fn season_of(date: NaiveDate) -> i64 {
    match (date.month(), date.day()) {
        (12, 21..) | (1 | 2, _) | (3, ..=20) => 1,
        (3, 21..) | (4 | 5, _) | (6, ..=20) => 2,
        (6, 21..) | (7 | 8, _) | (9, ..=22) => 3,
        _ => 4,
    }
}

/// Commuter peaks at 8:00 and 17:00-18:00 on working days, a midday hump otherwise.
fn hourly_demand(hour: u32, working: bool) -> f64 {
    let h = f64::from(hour);
    let bump = |centre: f64, width: f64| (-(h - centre).powi(2) / (2.0 * width * width)).exp();
    if working {
        40.0 + 420.0 * bump(8.0, 1.0) + 480.0 * bump(17.5, 1.2) + 120.0 * bump(12.5, 2.0)
    } else {
        20.0 + 300.0 * bump(14.0, 3.5)
    }
}

fn generate(days: u32, rng: &mut Noise) -> Result<Vec<Row>> {
    let first = NaiveDate::from_ymd_opt(2011, 1, 1).context("start date")?;
    let mut rows = Vec::with_capacity(days as usize * 24);

    for d in 0..days {
        let date = first
            .checked_add_days(Days::new(u64::from(d)))
            .context("date out of range")?;
        let working = !matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        let season = season_of(date);
        // Annual temperature cycle peaking in late July.
        let phase = (f64::from(date.ordinal()) - 205.0) / 365.0 * 2.0 * std::f64::consts::PI;
        let day_temp = 0.5 + 0.3 * phase.cos() + rng.normal(0.0, 0.05);
        let mut weather: i64 = 1;

        for hour in 0..24u32 {
            // Weather drifts hour to hour; severe weather stays rare.
            let roll = rng.uniform();
            weather = match weather {
                1 if roll < 0.08 => 2,
                2 if roll < 0.15 => 1,
                2 if roll < 0.22 => 3,
                3 if roll < 0.35 => 2,
                3 if roll < 0.37 => 4,
                4 if roll < 0.6 => 3,
                w => w,
            };

            let diurnal = 0.06 * ((f64::from(hour) - 15.0) / 24.0 * 2.0 * std::f64::consts::PI).cos();
            let temp = (day_temp + diurnal + rng.normal(0.0, 0.02)).clamp(0.02, 1.0);
            let hum = (0.45 + 0.1 * weather as f64 + rng.normal(0.0, 0.1)).clamp(0.0, 1.0);

            let comfort = 1.0 - 2.0 * (temp - 0.65).abs().powi(2) - 0.3 * (hum - 0.5).abs();
            let weather_factor = [1.0, 0.8, 0.45, 0.15][(weather - 1) as usize];
            let expected = hourly_demand(hour, working) * comfort.max(0.05) * weather_factor;
            let total = rng.normal(expected, expected.sqrt() + 1.0).round().max(0.0) as i64;
            let casual_share = if working { 0.12 } else { 0.35 };
            let casual = ((total as f64) * (casual_share + rng.normal(0.0, 0.03)).clamp(0.0, 1.0))
                .round() as i64;

            rows.push(Row {
                instant: rows.len() as i64 + 1,
                dteday: date.format("%Y-%m-%d").to_string(),
                season,
                hr: i64::from(hour),
                workingday: i64::from(working),
                weathersit: weather,
                temp: (temp * 100.0).round() / 100.0,
                hum: (hum * 100.0).round() / 100.0,
                casual,
                registered: total - casual,
                cnt: total,
            });
        }
    }
    Ok(rows)
}

fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    for row in rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let ints = |f: fn(&Row) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from_iter_values(rows.iter().map(f)))
    };
    let floats = |f: fn(&Row) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(rows.iter().map(f)))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("instant", DataType::Int64, false),
        Field::new("dteday", DataType::Utf8, false),
        Field::new("season", DataType::Int64, false),
        Field::new("hr", DataType::Int64, false),
        Field::new("workingday", DataType::Int64, false),
        Field::new("weathersit", DataType::Int64, false),
        Field::new("temp", DataType::Float64, false),
        Field::new("hum", DataType::Float64, false),
        Field::new("casual", DataType::Int64, false),
        Field::new("registered", DataType::Int64, false),
        Field::new("cnt", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            ints(|r| r.instant),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.dteday.as_str()))) as ArrayRef,
            ints(|r| r.season),
            ints(|r| r.hr),
            ints(|r| r.workingday),
            ints(|r| r.weathersit),
            floats(|r| r.temp),
            floats(|r| r.hum),
            ints(|r| r.casual),
            ints(|r| r.registered),
            ints(|r| r.cnt),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.days == 0 {
        bail!("--days must be at least 1");
    }

    let mut rng = Noise::seeded(cli.seed);
    let rows = generate(cli.days, &mut rng)?;

    let parquet = cli
        .output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
    if parquet {
        write_parquet(&cli.output, &rows)?;
    } else {
        write_csv(&cli.output, &rows)?;
    }

    println!(
        "Wrote {} hourly records ({} days) to {}",
        rows.len(),
        cli.days,
        cli.output.display()
    );
    Ok(())
}
