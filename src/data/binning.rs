use log::debug;
use serde::Serialize;

use super::aggregate::GroupKey;
use super::error::{DashboardError, Result};
use super::model::{NumericField, Table, TEMPERATURE_SCALE_CELSIUS};

// ---------------------------------------------------------------------------
// BucketDefinition – ordered, labeled, gap-free ranges
// ---------------------------------------------------------------------------

/// Half-open ranges `[edges[i], edges[i + 1])` with one label each.
///
/// The last bucket also includes the domain's upper bound, so every value in
/// `[edges[0], edges[n]]` lands in exactly one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketDefinition {
    edges: Vec<f64>,
    labels: Vec<String>,
}

/// What a call site does with a value outside the bucket domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutOfRangePolicy {
    /// Return [`DashboardError::OutOfRange`].
    #[default]
    Fail,
    /// Snap to the nearest end bucket. NaN still fails.
    Clamp,
    /// Yield `None` for that value.
    Drop,
}

impl BucketDefinition {
    pub fn new<S: Into<String>>(edges: Vec<f64>, labels: Vec<S>) -> Result<Self> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if edges.len() < 2 {
            return Err(DashboardError::InvalidBuckets(
                "at least two edges are required".into(),
            ));
        }
        if labels.len() != edges.len() - 1 {
            return Err(DashboardError::InvalidBuckets(format!(
                "{} edges need {} labels, got {}",
                edges.len(),
                edges.len() - 1,
                labels.len()
            )));
        }
        if let Some(bad) = edges.iter().find(|e| !e.is_finite()) {
            return Err(DashboardError::InvalidBuckets(format!("edge {bad} is not finite")));
        }
        if let Some(w) = edges.windows(2).find(|w| w[0] >= w[1]) {
            return Err(DashboardError::InvalidBuckets(format!(
                "edges must be strictly increasing ({} >= {})",
                w[0], w[1]
            )));
        }
        Ok(BucketDefinition { edges, labels })
    }

    /// Temperature bands in °C over `[0, 41]`; feed it `normalized * 41`.
    pub fn temperature() -> Self {
        BucketDefinition {
            edges: vec![0.0, 8.2, 16.4, 24.6, 32.8, TEMPERATURE_SCALE_CELSIUS],
            labels: [
                "Very Cold (0-8°C)",
                "Cold (8-16°C)",
                "Normal (16-24°C)",
                "Warm (24-32°C)",
                "Hot (32-41°C)",
            ]
            .map(String::from)
            .to_vec(),
        }
    }

    /// Five equal-width humidity bands over `[0, 1]`.
    pub fn humidity() -> Self {
        BucketDefinition {
            edges: vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0],
            labels: ["Very Dry", "Dry", "Normal", "Humid", "Very Humid"]
                .map(String::from)
                .to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.edges[0], self.edges[self.edges.len() - 1])
    }

    /// `[lower, upper)` of bucket `i`.
    pub fn bounds(&self, i: usize) -> Option<(f64, f64)> {
        Some((*self.edges.get(i)?, *self.edges.get(i + 1)?))
    }

    /// Index of the bucket holding `value`.
    pub fn index_of(&self, value: f64) -> Result<usize> {
        let (lower, upper) = self.domain();
        if value.is_nan() || value < lower || value > upper {
            return Err(DashboardError::OutOfRange { value, lower, upper });
        }
        let last = self.len() - 1;
        Ok((0..last)
            .find(|&i| value < self.edges[i + 1])
            .unwrap_or(last))
    }

    pub fn label_of(&self, value: f64) -> Result<&str> {
        self.index_of(value).map(|i| self.labels[i].as_str())
    }

    /// Index under a policy; `Ok(None)` only for [`OutOfRangePolicy::Drop`].
    pub fn index_with(&self, value: f64, policy: OutOfRangePolicy) -> Result<Option<usize>> {
        match (self.index_of(value), policy) {
            (Ok(i), _) => Ok(Some(i)),
            (Err(_), OutOfRangePolicy::Drop) => Ok(None),
            (Err(_), OutOfRangePolicy::Clamp) if !value.is_nan() => {
                let (lower, _) = self.domain();
                Ok(Some(if value < lower { 0 } else { self.len() - 1 }))
            }
            (Err(e), _) => Err(e),
        }
    }
}

/// Label every value, failing on the first one outside the domain.
pub fn bucketize<'d>(values: &[f64], definition: &'d BucketDefinition) -> Result<Vec<&'d str>> {
    values.iter().map(|&v| definition.label_of(v)).collect()
}

/// Label every value under an explicit out-of-range policy.
pub fn bucketize_with<'d>(
    values: &[f64],
    definition: &'d BucketDefinition,
    policy: OutOfRangePolicy,
) -> Result<Vec<Option<&'d str>>> {
    values
        .iter()
        .map(|&v| {
            definition
                .index_with(v, policy)
                .map(|i| i.map(|i| definition.labels[i].as_str()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// BinnedColumn – a derived bucket column aligned to one table view
// ---------------------------------------------------------------------------

/// Bucket keys for each selected row of a table, in row order.
///
/// Derived alongside the table rather than written into it, so the same base
/// can be binned differently by concurrent requests. The column remembers the
/// view it came from and only groups against that exact row selection.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedColumn {
    pub name: String,
    keys: Vec<GroupKey>,
    source: Table,
}

impl BinnedColumn {
    /// Bin `field` of every row of `table`.
    ///
    /// Rows dropped by [`OutOfRangePolicy::Drop`] get [`GroupKey::Missing`]
    /// so they remain visible as their own group.
    pub fn derive(
        table: &Table,
        field: NumericField,
        definition: &BucketDefinition,
        policy: OutOfRangePolicy,
    ) -> Result<Self> {
        let keys = table
            .iter()
            .map(|r| -> Result<GroupKey> {
                let idx = definition.index_with(r.value(field), policy)?;
                Ok(match idx {
                    Some(index) => GroupKey::Bucket {
                        index,
                        label: definition.labels[index].clone(),
                    },
                    None => GroupKey::Missing,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("binned {} rows of {field} into {} buckets", keys.len(), definition.len());
        Ok(BinnedColumn {
            name: format!("{field}_group"),
            keys,
            source: table.clone(),
        })
    }

    /// Whether the keys line up row for row with `table`.
    pub fn is_aligned_with(&self, table: &Table) -> bool {
        self.source.shares_base_with(table) && self.source.row_indices() == table.row_indices()
    }

    pub fn keys(&self) -> &[GroupKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
