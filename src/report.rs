//! Text and JSON renderings of view data for the command line.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use crate::data::aggregate::{AggregationResult, CorrelationMatrix, GroupKey, StackedAggregation};
use crate::views::ViewData;

/// A titled table ready to print.
pub struct Section {
    pub title: String,
    pub batch: RecordBatch,
}

/// One section per summary table of the view.
pub fn sections(data: &ViewData) -> Result<Vec<Section>, ArrowError> {
    let section = |title: &str, batch: RecordBatch| Section {
        title: title.to_string(),
        batch,
    };
    Ok(match data {
        ViewData::TemperatureHumidity {
            by_temperature,
            by_humidity,
            correlation,
        } => vec![
            section("Total riders by temperature group", aggregation_batch(by_temperature)?),
            section("Total riders by humidity group", aggregation_batch(by_humidity)?),
            section("Correlation: temperature, humidity, riders", correlation_batch(correlation)?),
        ],
        ViewData::UserTypes { by_working_day } => vec![section(
            "Casual vs registered riders by day type",
            stacked_batch(by_working_day)?,
        )],
        ViewData::HourlyWeather {
            by_hour,
            by_hour_and_weather,
        } => vec![
            section("Mean riders per hour", aggregation_batch(by_hour)?),
            section("Mean riders per hour and weather", aggregation_batch(by_hour_and_weather)?),
        ],
    })
}

/// Render all sections of a view as plain-text tables.
pub fn render_text(data: &ViewData) -> Result<String, ArrowError> {
    let mut out = format!("== {} ==\n", data.view().title());
    for s in sections(data)? {
        out.push_str(&format!("\n{}\n", s.title));
        out.push_str(&pretty_format_batches(&[s.batch])?.to_string());
        out.push('\n');
    }
    Ok(out)
}

pub fn render_json(data: &ViewData) -> serde_json::Result<String> {
    serde_json::to_string_pretty(data)
}

// -- batch builders --

fn key_columns(names: &[String], keys: Vec<&[GroupKey]>) -> (Vec<Field>, Vec<ArrayRef>) {
    let fields = names
        .iter()
        .map(|n| Field::new(n, DataType::Utf8, false))
        .collect();
    let arrays = (0..names.len())
        .map(|i| {
            let col: StringArray = keys.iter().map(|k| Some(k[i].to_string())).collect();
            Arc::new(col) as ArrayRef
        })
        .collect();
    (fields, arrays)
}

fn aggregation_batch(result: &AggregationResult) -> Result<RecordBatch, ArrowError> {
    let (mut fields, mut arrays) = key_columns(
        &result.columns,
        result.groups.iter().map(|g| g.key.as_slice()).collect(),
    );
    let value_name = format!("{:?}({})", result.reducer, result.value_column).to_lowercase();
    fields.push(Field::new(value_name, DataType::Float64, false));
    arrays.push(Arc::new(Float64Array::from_iter_values(
        result.groups.iter().map(|g| g.value),
    )));
    fields.push(Field::new("rows", DataType::UInt64, false));
    arrays.push(Arc::new(UInt64Array::from_iter_values(
        result.groups.iter().map(|g| g.rows as u64),
    )));
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

fn stacked_batch(result: &StackedAggregation) -> Result<RecordBatch, ArrowError> {
    let (mut fields, mut arrays) = key_columns(
        &result.columns,
        result.groups.iter().map(|g| g.key.as_slice()).collect(),
    );
    for (slot, field) in result.value_columns.iter().enumerate() {
        let name = format!("{:?}({field})", result.reducer).to_lowercase();
        fields.push(Field::new(name, DataType::Float64, false));
        arrays.push(Arc::new(Float64Array::from_iter_values(
            result.groups.iter().map(|g| g.values[slot]),
        )));
    }
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

fn correlation_batch(matrix: &CorrelationMatrix) -> Result<RecordBatch, ArrowError> {
    let mut fields = vec![Field::new("field", DataType::Utf8, false)];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from_iter_values(
        matrix.fields.iter().map(|f| f.to_string()),
    )) as ArrayRef];
    for (j, field) in matrix.fields.iter().enumerate() {
        fields.push(Field::new(field.to_string(), DataType::Float64, true));
        let col: Float64Array = matrix.values.iter().map(|row| row[j]).collect();
        arrays.push(Arc::new(col));
    }
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::record;
    use crate::data::model::Table;
    use crate::views::View;

    fn table() -> Table {
        let mut warm = record(9, 40, 60);
        warm.temperature = 0.7;
        Table::from_records(vec![record(8, 10, 20), warm])
    }

    #[test]
    fn every_view_renders_as_text() {
        let table = table();
        for view in View::ALL {
            let text = render_text(&view.build(&table).unwrap()).unwrap();
            assert!(text.starts_with(&format!("== {} ==", view.title())), "{text}");
        }
    }

    #[test]
    fn aggregation_batch_has_key_value_and_rows() {
        let data = View::HourlyWeather.build(&table()).unwrap();
        let secs = sections(&data).unwrap();
        assert_eq!(secs.len(), 2);
        let schema = secs[1].batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["hr", "weathersit", "mean(cnt)", "rows"]);
        assert_eq!(secs[1].batch.num_rows(), 2);
    }

    #[test]
    fn json_contains_view_tag() {
        let data = View::TemperatureHumidity.build(&table()).unwrap();
        let json = render_json(&data).unwrap();
        assert!(json.contains("\"view\": \"temperature-humidity\""), "{json}");
    }
}
