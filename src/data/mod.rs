/// Data layer: records, loading, labels, filtering, binning and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + validate rows, resolve codes (labels)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  Arc<Table>, loaded once
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  date range ∧ season ∧ weather → new Table view
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ binning   │  temperature / humidity → BinnedColumn
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ aggregate │  group by key tuple → sum / mean
///   └──────────┘
/// ```

pub mod aggregate;
pub mod binning;
pub mod cache;
pub mod error;
pub mod filter;
pub mod labels;
pub mod loader;
pub mod model;
