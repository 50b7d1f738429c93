pub mod data;
pub mod report;
pub mod state;
pub mod views;

pub use data::aggregate::{
    correlation_matrix, group_reduce, stacked_reduce, AggregationResult, CorrelationMatrix,
    GroupKey, KeyColumn, Reducer, StackedAggregation,
};
pub use data::binning::{bucketize, bucketize_with, BinnedColumn, BucketDefinition, OutOfRangePolicy};
pub use data::cache::DatasetCache;
pub use data::error::DashboardError;
pub use data::filter::{filter, FilterCriteria};
pub use data::labels::{map_codes, CategoryCode, Season, Weather, WorkingDay};
pub use data::loader::load_file;
pub use data::model::{NumericField, Record, Table};
pub use state::DashboardState;
pub use views::{View, ViewData};
