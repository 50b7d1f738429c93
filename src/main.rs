use std::path::PathBuf;

use anyhow::{Context, Result};
use bike_dashboard::{
    report, CategoryCode, DashboardState, DatasetCache, Season, View, Weather,
};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use log::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "bike-dashboard")]
#[command(about = "Summarise hourly bike-share usage for one dashboard view", long_about = None)]
struct Cli {
    /// Path to the hourly usage file (.csv or .parquet)
    #[arg(value_name = "FILE", env = "BIKE_DASHBOARD_DATA")]
    data: PathBuf,

    /// Which dashboard question to answer
    #[arg(short, long, default_value_t = View::TemperatureHumidity)]
    view: View,

    /// First date to include (YYYY-MM-DD); defaults to the earliest record
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD); defaults to the latest record
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Season to include, by label; repeat for several (default: all)
    #[arg(long = "season", value_name = "LABEL")]
    seasons: Vec<String>,

    /// Weather situation to include, by label; repeat for several (default: all)
    #[arg(long = "weather", value_name = "LABEL")]
    weathers: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let cache = DatasetCache::new(&cli.data);
    let dataset = cache
        .get()
        .with_context(|| format!("loading {}", cli.data.display()))?;

    let mut state = DashboardState::new(dataset);
    state.set_view(cli.view);

    if let Some(criteria) = state.criteria() {
        let start = cli.start.unwrap_or(criteria.start());
        let end = cli.end.unwrap_or(criteria.end());
        state
            .set_date_range(start, end)
            .context("applying date range")?;
    }
    if !cli.seasons.is_empty() {
        let seasons = cli
            .seasons
            .iter()
            .map(|s| Season::from_label(s))
            .collect::<Result<_, _>>()
            .context("parsing --season")?;
        state.set_seasons(seasons);
    }
    if !cli.weathers.is_empty() {
        let weathers = cli
            .weathers
            .iter()
            .map(|w| Weather::from_label(w))
            .collect::<Result<_, _>>()
            .context("parsing --weather")?;
        state.set_weathers(weathers);
    }

    info!(
        "view {}: {} of {} rows selected",
        state.view(),
        state.visible().len(),
        state.dataset().len()
    );

    let data = state.view_data().context("computing view")?;
    let rendered = match cli.format {
        Format::Text => report::render_text(&data).context("rendering tables")?,
        Format::Json => report::render_json(&data).context("serializing view")?,
    };
    println!("{rendered}");
    Ok(())
}
