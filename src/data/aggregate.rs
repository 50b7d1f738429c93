use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use super::binning::BinnedColumn;
use super::error::{DashboardError, Result};
use super::labels::{CategoryCode, Season, Weather, WorkingDay};
use super::model::{NumericField, Record, Table};

// ---------------------------------------------------------------------------
// GroupKey – one cell of a grouping column
// ---------------------------------------------------------------------------

/// A grouping value. Ordering follows the natural order of each column
/// (hour, date, code order, bucket order) with `Missing` sorted last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Hour(u8),
    Date(NaiveDate),
    Season(Season),
    Weather(Weather),
    WorkingDay(WorkingDay),
    Bucket { index: usize, label: String },
    /// The row had no value for this column (e.g. `hr` on day-level data).
    /// Kept as a group of its own instead of dropping the row.
    Missing,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Hour(h) => write!(f, "{h}"),
            GroupKey::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            GroupKey::Season(s) => f.write_str(s.label()),
            GroupKey::Weather(w) => f.write_str(w.label()),
            GroupKey::WorkingDay(w) => f.write_str(w.label()),
            GroupKey::Bucket { label, .. } => f.write_str(label),
            GroupKey::Missing => f.write_str("<missing>"),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            GroupKey::Hour(h) => serializer.serialize_u8(*h),
            GroupKey::Missing => serializer.serialize_none(),
            other => serializer.collect_str(other),
        }
    }
}

// ---------------------------------------------------------------------------
// KeyColumn / Reducer
// ---------------------------------------------------------------------------

/// A column rows can be grouped by.
#[derive(Debug, Clone, Copy)]
pub enum KeyColumn<'a> {
    Hour,
    Date,
    Season,
    Weather,
    WorkingDay,
    /// A bucket column derived from the same table view.
    Binned(&'a BinnedColumn),
}

impl KeyColumn<'_> {
    pub fn name(&self) -> &str {
        match self {
            KeyColumn::Hour => "hr",
            KeyColumn::Date => "dteday",
            KeyColumn::Season => Season::FIELD,
            KeyColumn::Weather => Weather::FIELD,
            KeyColumn::WorkingDay => WorkingDay::FIELD,
            KeyColumn::Binned(col) => &col.name,
        }
    }

    fn key(&self, position: usize, record: &Record) -> GroupKey {
        match self {
            KeyColumn::Hour => record.hour.map_or(GroupKey::Missing, GroupKey::Hour),
            KeyColumn::Date => GroupKey::Date(record.date),
            KeyColumn::Season => GroupKey::Season(record.season),
            KeyColumn::Weather => GroupKey::Weather(record.weather),
            KeyColumn::WorkingDay => GroupKey::WorkingDay(record.working_day),
            KeyColumn::Binned(col) => col.keys()[position].clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Sum,
    Mean,
}

impl Reducer {
    fn apply(self, sum: f64, rows: usize) -> f64 {
        match self {
            Reducer::Sum => sum,
            Reducer::Mean => sum / rows as f64,
        }
    }
}

// ---------------------------------------------------------------------------
// Partition – rows grouped by key tuple, first-appearance order
// ---------------------------------------------------------------------------

/// Row positions (within a table view) for each distinct key tuple.
#[derive(Debug, Clone)]
struct Partition {
    columns: Vec<String>,
    groups: Vec<(Vec<GroupKey>, Vec<usize>)>,
}

impl Partition {
    fn build(table: &Table, keys: &[KeyColumn<'_>]) -> Result<Self> {
        for key in keys {
            if let KeyColumn::Binned(col) = key {
                if col.len() != table.len() {
                    return Err(DashboardError::ColumnLength {
                        expected: table.len(),
                        actual: col.len(),
                    });
                }
                if !col.is_aligned_with(table) {
                    return Err(DashboardError::MisalignedColumn {
                        column: col.name.clone(),
                    });
                }
            }
        }

        let mut index: HashMap<Vec<GroupKey>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<GroupKey>, Vec<usize>)> = Vec::new();
        for (pos, record) in table.iter().enumerate() {
            let tuple: Vec<GroupKey> = keys.iter().map(|k| k.key(pos, record)).collect();
            match index.get(&tuple) {
                Some(&g) => groups[g].1.push(pos),
                None => {
                    index.insert(tuple.clone(), groups.len());
                    groups.push((tuple, vec![pos]));
                }
            }
        }

        Ok(Partition {
            columns: keys.iter().map(|k| k.name().to_string()).collect(),
            groups,
        })
    }

    fn sum(table: &Table, positions: &[usize], field: NumericField) -> f64 {
        positions
            .iter()
            .filter_map(|&p| table.get(p))
            .map(|r| r.value(field))
            .sum()
    }
}

// ---------------------------------------------------------------------------
// AggregationResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub key: Vec<GroupKey>,
    pub value: f64,
    /// Number of rows that fell into the group.
    pub rows: usize,
}

/// One reduced value per group, in first-appearance order unless sorted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub columns: Vec<String>,
    pub value_column: NumericField,
    pub reducer: Reducer,
    pub groups: Vec<Group>,
}

impl AggregationResult {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &[GroupKey]) -> Option<f64> {
        self.groups
            .iter()
            .find(|g| g.key.as_slice() == key)
            .map(|g| g.value)
    }

    /// Sort groups by key, for consumers that want ordered axes.
    pub fn sorted(mut self) -> Self {
        self.groups.sort_by(|a, b| a.key.cmp(&b.key));
        self
    }

    /// Sum of the per-group values.
    pub fn total(&self) -> f64 {
        self.groups.iter().map(|g| g.value).sum()
    }
}

/// Group `table` by the key tuple of `keys` and reduce `value` per group.
pub fn group_reduce(
    table: &Table,
    keys: &[KeyColumn<'_>],
    value: NumericField,
    reducer: Reducer,
) -> Result<AggregationResult> {
    let partition = Partition::build(table, keys)?;
    let groups = partition
        .groups
        .into_iter()
        .map(|(key, positions)| {
            let sum = Partition::sum(table, &positions, value);
            Group {
                key,
                value: reducer.apply(sum, positions.len()),
                rows: positions.len(),
            }
        })
        .collect();
    Ok(AggregationResult {
        columns: partition.columns,
        value_column: value,
        reducer,
        groups,
    })
}

// ---------------------------------------------------------------------------
// StackedAggregation – several values over one partition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedGroup {
    pub key: Vec<GroupKey>,
    /// One value per entry of [`StackedAggregation::value_columns`].
    pub values: Vec<f64>,
    pub rows: usize,
}

/// Reductions of several value columns computed over the same groups, so
/// that components add up per group (e.g. casual + registered = total).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedAggregation {
    pub columns: Vec<String>,
    pub value_columns: Vec<NumericField>,
    pub reducer: Reducer,
    pub groups: Vec<StackedGroup>,
}

impl StackedAggregation {
    /// Split out one component as a plain aggregation result.
    pub fn component(&self, field: NumericField) -> Option<AggregationResult> {
        let slot = self.value_columns.iter().position(|&f| f == field)?;
        Some(AggregationResult {
            columns: self.columns.clone(),
            value_column: field,
            reducer: self.reducer,
            groups: self
                .groups
                .iter()
                .map(|g| Group {
                    key: g.key.clone(),
                    value: g.values[slot],
                    rows: g.rows,
                })
                .collect(),
        })
    }

    pub fn sorted(mut self) -> Self {
        self.groups.sort_by(|a, b| a.key.cmp(&b.key));
        self
    }
}

pub fn stacked_reduce(
    table: &Table,
    keys: &[KeyColumn<'_>],
    values: &[NumericField],
    reducer: Reducer,
) -> Result<StackedAggregation> {
    let partition = Partition::build(table, keys)?;
    let groups = partition
        .groups
        .into_iter()
        .map(|(key, positions)| StackedGroup {
            values: values
                .iter()
                .map(|&f| reducer.apply(Partition::sum(table, &positions, f), positions.len()))
                .collect(),
            key,
            rows: positions.len(),
        })
        .collect();
    Ok(StackedAggregation {
        columns: partition.columns,
        value_columns: values.to_vec(),
        reducer,
        groups,
    })
}

// ---------------------------------------------------------------------------
// Correlation matrix
// ---------------------------------------------------------------------------

/// Pairwise Pearson coefficients. `None` where a column is constant or there
/// are fewer than two rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub fields: Vec<NumericField>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: NumericField, b: NumericField) -> Option<f64> {
        let i = self.fields.iter().position(|&f| f == a)?;
        let j = self.fields.iter().position(|&f| f == b)?;
        self.values[i][j]
    }
}

pub fn correlation_matrix(table: &Table, fields: &[NumericField]) -> CorrelationMatrix {
    let columns: Vec<Vec<f64>> = fields.iter().map(|&f| table.column(f)).collect();
    let values = columns
        .iter()
        .map(|x| columns.iter().map(|y| pearson(x, y)).collect())
        .collect();
    CorrelationMatrix {
        fields: fields.to_vec(),
        values,
    }
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::binning::{BucketDefinition, OutOfRangePolicy};
    use crate::data::model::fixtures::record;

    fn working_day_table() -> Table {
        let mut holiday = record(0, 100, 50);
        holiday.working_day = WorkingDay::Holiday;
        let working = record(0, 20, 200);
        Table::from_records(vec![holiday, working])
    }

    #[test]
    fn sums_by_working_day() {
        let table = working_day_table();
        let keys = [KeyColumn::WorkingDay];
        let casual = group_reduce(&table, &keys, NumericField::Casual, Reducer::Sum).unwrap();
        let registered =
            group_reduce(&table, &keys, NumericField::Registered, Reducer::Sum).unwrap();

        let holiday = [GroupKey::WorkingDay(WorkingDay::Holiday)];
        let working = [GroupKey::WorkingDay(WorkingDay::Working)];
        assert_eq!(casual.get(&holiday), Some(100.0));
        assert_eq!(casual.get(&working), Some(20.0));
        assert_eq!(registered.get(&holiday), Some(50.0));
        assert_eq!(registered.get(&working), Some(200.0));
        assert_eq!(casual.columns, vec!["workingday".to_string()]);
    }

    #[test]
    fn stacked_components_add_up() {
        let table = working_day_table();
        let stacked = stacked_reduce(
            &table,
            &[KeyColumn::WorkingDay],
            &[NumericField::Casual, NumericField::Registered, NumericField::Total],
            Reducer::Sum,
        )
        .unwrap();
        for g in &stacked.groups {
            assert_eq!(g.values[0] + g.values[1], g.values[2]);
        }
        let casual = stacked.component(NumericField::Casual).unwrap();
        assert_eq!(casual.total(), 120.0);
        assert!(stacked.component(NumericField::Humidity).is_none());
    }

    #[test]
    fn mean_by_hour_and_first_appearance_order() {
        let table = Table::from_records(vec![
            record(9, 10, 0),
            record(8, 1, 1),
            record(9, 20, 0),
        ]);
        let result = group_reduce(&table, &[KeyColumn::Hour], NumericField::Total, Reducer::Mean)
            .unwrap();
        assert_eq!(result.groups[0].key, vec![GroupKey::Hour(9)]);
        assert_eq!(result.groups[0].value, 15.0);
        assert_eq!(result.groups[0].rows, 2);
        let sorted = result.sorted();
        assert_eq!(sorted.groups[0].key, vec![GroupKey::Hour(8)]);
    }

    #[test]
    fn missing_hour_is_its_own_group() {
        let mut daily = record(0, 5, 5);
        daily.hour = None;
        let table = Table::from_records(vec![record(3, 1, 1), daily]);
        let result =
            group_reduce(&table, &[KeyColumn::Hour], NumericField::Total, Reducer::Sum).unwrap();
        assert_eq!(result.get(&[GroupKey::Missing]), Some(10.0));
        assert_eq!(result.total(), 12.0);
    }

    #[test]
    fn multi_key_grouping() {
        let mut misty = record(7, 2, 2);
        misty.weather = Weather::Mist;
        let table = Table::from_records(vec![record(7, 1, 1), misty, record(7, 3, 3)]);
        let result = group_reduce(
            &table,
            &[KeyColumn::Hour, KeyColumn::Weather],
            NumericField::Total,
            Reducer::Mean,
        )
        .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(
            result.get(&[GroupKey::Hour(7), GroupKey::Weather(Weather::Clear)]),
            Some(4.0)
        );
    }

    #[test]
    fn binned_column_must_match_view() {
        let table = working_day_table();
        let binned = BinnedColumn::derive(
            &table,
            NumericField::Humidity,
            &BucketDefinition::humidity(),
            OutOfRangePolicy::Fail,
        )
        .unwrap();
        let narrower = table.with_rows(vec![0]);
        let err = group_reduce(&narrower, &[KeyColumn::Binned(&binned)], NumericField::Total, Reducer::Sum)
            .unwrap_err();
        assert!(matches!(err, DashboardError::ColumnLength { expected: 1, actual: 2 }));
    }

    #[test]
    fn binned_column_from_another_view_of_same_length_is_rejected() {
        use crate::data::filter::{filter, FilterCriteria};

        let rows = [
            (Weather::Clear, 0.05, 1),
            (Weather::Clear, 0.95, 100),
            (Weather::Mist, 0.95, 1),
            (Weather::Mist, 0.05, 100),
        ]
        .into_iter()
        .map(|(weather, temperature, registered)| {
            let mut r = record(0, 0, registered);
            r.weather = weather;
            r.temperature = temperature;
            r
        })
        .collect();
        let table = Table::from_records(rows);
        let all = FilterCriteria::select_all(&table).unwrap();
        let clear = filter(&table, &all.with_weathers([Weather::Clear].into()));
        let mist = filter(&table, &all.with_weathers([Weather::Mist].into()));
        assert_eq!(clear.len(), mist.len());

        let def = BucketDefinition::temperature();
        let clear_temp =
            BinnedColumn::derive(&clear, NumericField::TemperatureCelsius, &def, OutOfRangePolicy::Fail)
                .unwrap();
        let err = group_reduce(&mist, &[KeyColumn::Binned(&clear_temp)], NumericField::Total, Reducer::Sum)
            .unwrap_err();
        assert!(matches!(err, DashboardError::MisalignedColumn { .. }), "{err}");

        let mist_temp =
            BinnedColumn::derive(&mist, NumericField::TemperatureCelsius, &def, OutOfRangePolicy::Fail)
                .unwrap();
        let sums = group_reduce(&mist, &[KeyColumn::Binned(&mist_temp)], NumericField::Total, Reducer::Sum)
            .unwrap()
            .sorted();
        let values: Vec<(String, f64)> = sums
            .groups
            .iter()
            .map(|g| (g.key[0].to_string(), g.value))
            .collect();
        assert_eq!(
            values,
            vec![
                ("Very Cold (0-8°C)".to_string(), 100.0),
                ("Hot (32-41°C)".to_string(), 1.0),
            ]
        );
    }

    #[test]
    fn empty_table_has_no_groups() {
        let table = Table::from_records(Vec::new());
        let result =
            group_reduce(&table, &[KeyColumn::Season], NumericField::Total, Reducer::Mean).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn correlation_of_linear_columns() {
        let rows = (0..5)
            .map(|i| {
                let mut r = record(i, i as u32 * 10, 0);
                r.temperature = i as f64 / 10.0;
                r.humidity = 0.5;
                r
            })
            .collect();
        let table = Table::from_records(rows);
        let m = correlation_matrix(
            &table,
            &[NumericField::Temperature, NumericField::Humidity, NumericField::Total],
        );
        let r = m.get(NumericField::Temperature, NumericField::Total).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        assert_eq!(m.get(NumericField::Humidity, NumericField::Total), None);
    }

    #[test]
    fn group_keys_serialize_by_kind() {
        let keys = vec![
            GroupKey::Hour(8),
            GroupKey::Missing,
            GroupKey::Season(Season::Fall),
            GroupKey::Bucket {
                index: 1,
                label: "Dry".into(),
            },
        ];
        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"[8,null,"Fall","Dry"]"#);
    }
}
