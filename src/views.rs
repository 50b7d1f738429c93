use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::Serialize;

use crate::data::aggregate::{
    correlation_matrix, group_reduce, stacked_reduce, AggregationResult, CorrelationMatrix,
    KeyColumn, Reducer, StackedAggregation,
};
use crate::data::binning::{BinnedColumn, BucketDefinition, OutOfRangePolicy};
use crate::data::error::Result;
use crate::data::model::{NumericField, Table};

// ---------------------------------------------------------------------------
// View – the dashboard's navigation choices
// ---------------------------------------------------------------------------

/// One of the fixed dashboard questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    /// How do temperature and humidity relate to ridership?
    #[default]
    TemperatureHumidity,
    /// Casual vs registered riders on working days and holidays.
    UserTypes,
    /// Hourly usage pattern, overall and per weather situation.
    HourlyWeather,
}

impl View {
    pub const ALL: [View; 3] = [View::TemperatureHumidity, View::UserTypes, View::HourlyWeather];

    pub fn id(self) -> &'static str {
        match self {
            View::TemperatureHumidity => "temperature-humidity",
            View::UserTypes => "user-types",
            View::HourlyWeather => "hourly-weather",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            View::TemperatureHumidity => "Effect of temperature and humidity on ridership",
            View::UserTypes => "Casual vs registered riders: holidays vs working days",
            View::HourlyWeather => "Hourly usage pattern by weather situation",
        }
    }

    /// Compute every summary table the view shows.
    ///
    /// Binning uses [`OutOfRangePolicy::Fail`]: the loader already rejects
    /// normalized temperature or humidity outside [0, 1], so the scaled
    /// values always fall inside the bucket domains.
    pub fn build(self, table: &Table) -> Result<ViewData> {
        debug!("building view {} over {} rows", self.id(), table.len());
        match self {
            View::TemperatureHumidity => {
                let temp_buckets = BucketDefinition::temperature();
                let hum_buckets = BucketDefinition::humidity();
                let temp_col = BinnedColumn::derive(
                    table,
                    NumericField::TemperatureCelsius,
                    &temp_buckets,
                    OutOfRangePolicy::Fail,
                )?;
                let hum_col = BinnedColumn::derive(
                    table,
                    NumericField::Humidity,
                    &hum_buckets,
                    OutOfRangePolicy::Fail,
                )?;
                Ok(ViewData::TemperatureHumidity {
                    by_temperature: group_reduce(
                        table,
                        &[KeyColumn::Binned(&temp_col)],
                        NumericField::Total,
                        Reducer::Sum,
                    )?
                    .sorted(),
                    by_humidity: group_reduce(
                        table,
                        &[KeyColumn::Binned(&hum_col)],
                        NumericField::Total,
                        Reducer::Sum,
                    )?
                    .sorted(),
                    correlation: correlation_matrix(
                        table,
                        &[NumericField::Temperature, NumericField::Humidity, NumericField::Total],
                    ),
                })
            }
            View::UserTypes => Ok(ViewData::UserTypes {
                by_working_day: stacked_reduce(
                    table,
                    &[KeyColumn::WorkingDay],
                    &[NumericField::Casual, NumericField::Registered],
                    Reducer::Sum,
                )?
                .sorted(),
            }),
            View::HourlyWeather => {
                if !table.is_hourly() {
                    warn!("dataset has no hour column; all rows fall in the missing-hour group");
                }
                Ok(ViewData::HourlyWeather {
                    by_hour: group_reduce(
                        table,
                        &[KeyColumn::Hour],
                        NumericField::Total,
                        Reducer::Mean,
                    )?
                    .sorted(),
                    by_hour_and_weather: group_reduce(
                        table,
                        &[KeyColumn::Hour, KeyColumn::Weather],
                        NumericField::Total,
                        Reducer::Mean,
                    )?
                    .sorted(),
                })
            }
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let ids: Vec<&str> = View::ALL.iter().map(|v| v.id()).collect();
                format!("unknown view '{s}', expected one of: {}", ids.join(", "))
            })
    }
}

// ---------------------------------------------------------------------------
// ViewData – typed results handed to presentation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "kebab-case")]
pub enum ViewData {
    TemperatureHumidity {
        by_temperature: AggregationResult,
        by_humidity: AggregationResult,
        correlation: CorrelationMatrix,
    },
    UserTypes {
        by_working_day: StackedAggregation,
    },
    HourlyWeather {
        by_hour: AggregationResult,
        by_hour_and_weather: AggregationResult,
    },
}

impl ViewData {
    pub fn view(&self) -> View {
        match self {
            ViewData::TemperatureHumidity { .. } => View::TemperatureHumidity,
            ViewData::UserTypes { .. } => View::UserTypes,
            ViewData::HourlyWeather { .. } => View::HourlyWeather,
        }
    }
}
