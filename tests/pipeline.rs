use std::io::Write;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bike_dashboard::{
    bucketize, filter, group_reduce, load_file, map_codes, BinnedColumn, BucketDefinition,
    DashboardError, DashboardState, DatasetCache, FilterCriteria, GroupKey, KeyColumn,
    NumericField, OutOfRangePolicy, Reducer, Season, View, ViewData, Weather, WorkingDay,
};
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;

const HEADER: &str = "instant,dteday,season,yr,mnth,hr,holiday,weekday,workingday,weathersit,temp,atemp,hum,windspeed,casual,registered,cnt";

/// Six hours across two days: a Saturday coded season 1 (Spring) and a Monday
/// coded season 2 (Summer), following the UCI season boundaries.
const ROWS: &str = "\
1,2011-01-01,1,0,1,8,0,6,0,1,0.24,0.28,0.81,0.0,100,50,150
2,2011-01-01,1,0,1,17,0,6,0,2,0.60,0.27,0.45,0.0,40,60,100
3,2011-01-01,1,0,1,18,0,6,0,3,0.10,0.27,0.95,0.0,2,8,10
4,2011-03-21,2,0,3,8,0,1,1,1,0.80,0.70,0.30,0.1,20,200,220
5,2011-03-21,2,0,3,17,0,1,1,1,0.65,0.62,0.50,0.1,15,285,300
6,2011-03-21,2,0,3,18,0,1,1,4,0.50,0.48,0.99,0.3,1,9,10
";

fn fixture() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    write!(file, "{ROWS}").unwrap();
    file
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn working_day_sums_from_file() {
    let file = fixture();
    let table = load_file(file.path()).unwrap();
    let keys = [KeyColumn::WorkingDay];
    let casual = group_reduce(&table, &keys, NumericField::Casual, Reducer::Sum).unwrap();
    let registered = group_reduce(&table, &keys, NumericField::Registered, Reducer::Sum).unwrap();

    let holiday = [GroupKey::WorkingDay(WorkingDay::Holiday)];
    let working = [GroupKey::WorkingDay(WorkingDay::Working)];
    assert_eq!(casual.get(&holiday), Some(142.0));
    assert_eq!(casual.get(&working), Some(36.0));
    assert_eq!(registered.get(&holiday), Some(118.0));
    assert_eq!(registered.get(&working), Some(494.0));
}

#[test]
fn filter_then_bin_then_aggregate() {
    let file = fixture();
    let table = load_file(file.path()).unwrap();
    let criteria = FilterCriteria::from_labels(
        date(2011, 1, 1),
        date(2011, 12, 31),
        &["Spring"],
        &["Clear / Partly Cloudy", "Mist / Cloudy", "Light Rain / Light Snow"],
    )
    .unwrap();
    let visible = filter(&table, &criteria);
    assert_eq!(visible.len(), 3);
    assert!(visible.shares_base_with(&table));

    let temps = BucketDefinition::temperature();
    let binned = BinnedColumn::derive(
        &visible,
        NumericField::TemperatureCelsius,
        &temps,
        OutOfRangePolicy::Fail,
    )
    .unwrap();
    let result = group_reduce(&visible, &[KeyColumn::Binned(&binned)], NumericField::Total, Reducer::Sum)
        .unwrap()
        .sorted();
    let labels: Vec<String> = result.groups.iter().map(|g| g.key[0].to_string()).collect();
    assert_eq!(labels, vec!["Very Cold (0-8°C)", "Cold (8-16°C)", "Normal (16-24°C)"]);
    assert_eq!(result.total(), 260.0);

    // The base table is untouched by filtering and binning.
    assert_eq!(table.len(), 6);
}

#[test]
fn point_six_normalized_is_normal_band() {
    let temps = BucketDefinition::temperature();
    let labels = bucketize(&[0.6 * 41.0, 24.6], &temps).unwrap();
    assert_eq!(labels, vec!["Normal (16-24°C)", "Warm (24-32°C)"]);
}

#[test]
fn weather_code_five_is_rejected() {
    let err = map_codes::<Weather>(&[5]).unwrap_err();
    assert!(matches!(err, DashboardError::UnknownCode { code: 5, .. }));
}

#[test]
fn state_drives_views_over_cached_table() {
    let file = fixture();
    let cache = DatasetCache::new(file.path());
    let mut state = DashboardState::new(cache.get().unwrap());
    assert!(Arc::ptr_eq(&cache.get().unwrap(), &cache.get().unwrap()));

    state.set_view(View::HourlyWeather);
    state.set_date_range(date(2011, 3, 21), date(2011, 3, 21)).unwrap();
    let ViewData::HourlyWeather { by_hour, .. } = state.view_data().unwrap() else {
        panic!("expected hourly data");
    };
    assert_eq!(by_hour.get(&[GroupKey::Hour(8)]), Some(220.0));
    assert_eq!(by_hour.len(), 3);

    state.set_seasons([Season::Winter].into());
    let ViewData::HourlyWeather { by_hour, .. } = state.view_data().unwrap() else {
        panic!("expected hourly data");
    };
    assert!(by_hour.is_empty());
}

#[test]
fn parquet_with_narrow_types_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hour.parquet");
    let ints = |v: Vec<i32>| Arc::new(Int32Array::from(v)) as ArrayRef;
    let schema = Arc::new(Schema::new(vec![
        Field::new("dteday", DataType::Utf8, false),
        Field::new("hr", DataType::Int32, false),
        Field::new("season", DataType::Int32, false),
        Field::new("weathersit", DataType::Int32, false),
        Field::new("workingday", DataType::Int32, false),
        Field::new("temp", DataType::Float64, false),
        Field::new("hum", DataType::Float64, false),
        Field::new("casual", DataType::Int32, false),
        Field::new("registered", DataType::Int32, false),
        Field::new("cnt", DataType::Int32, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec!["2012-07-04", "2012-07-04"])) as ArrayRef,
            ints(vec![12, 13]),
            ints(vec![3, 3]),
            ints(vec![1, 2]),
            ints(vec![0, 0]),
            Arc::new(Float64Array::from(vec![0.9, 0.88])) as ArrayRef,
            Arc::new(Float64Array::from(vec![0.4, 0.42])) as ArrayRef,
            ints(vec![300, 250]),
            ints(vec![200, 180]),
            ints(vec![500, 430]),
        ],
    )
    .unwrap();
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let table = load_file(&path).unwrap();
    assert_eq!(table.len(), 2);
    let first = table.get(0).unwrap();
    assert_eq!(first.date, date(2012, 7, 4));
    assert_eq!(first.season, Season::Fall);
    assert_eq!(first.total, 500);
    assert_eq!(table.get(1).unwrap().weather, Weather::Mist);
}
