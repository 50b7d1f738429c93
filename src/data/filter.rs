use std::collections::BTreeSet;

use chrono::NaiveDate;
use log::debug;

use super::error::{DashboardError, Result};
use super::labels::{CategoryCode, Season, Weather};
use super::model::{Record, Table};

// ---------------------------------------------------------------------------
// FilterCriteria – what the user selected
// ---------------------------------------------------------------------------

/// Inclusive date range plus accepted seasons and weather situations.
///
/// An empty accepted set selects nothing; there is no "no filter" encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    start: NaiveDate,
    end: NaiveDate,
    seasons: BTreeSet<Season>,
    weathers: BTreeSet<Weather>,
}

impl FilterCriteria {
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        seasons: BTreeSet<Season>,
        weathers: BTreeSet<Weather>,
    ) -> Result<Self> {
        if start > end {
            return Err(DashboardError::InvalidCriteria(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(FilterCriteria {
            start,
            end,
            seasons,
            weathers,
        })
    }

    /// Build criteria from selection-widget labels, rejecting unknown ones.
    pub fn from_labels<S: AsRef<str>>(
        start: NaiveDate,
        end: NaiveDate,
        seasons: &[S],
        weathers: &[S],
    ) -> Result<Self> {
        let seasons = seasons
            .iter()
            .map(|s| Season::from_label(s.as_ref()))
            .collect::<Result<BTreeSet<_>>>()?;
        let weathers = weathers
            .iter()
            .map(|w| Weather::from_label(w.as_ref()))
            .collect::<Result<BTreeSet<_>>>()?;
        Self::new(start, end, seasons, weathers)
    }

    /// Criteria that accept every row of `table`: its full date span and all
    /// categories. `None` for an empty table, which has no span.
    pub fn select_all(table: &Table) -> Option<Self> {
        let (start, end) = table.date_span()?;
        Some(FilterCriteria {
            start,
            end,
            seasons: Season::ALL.iter().copied().collect(),
            weathers: Weather::ALL.iter().copied().collect(),
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn seasons(&self) -> &BTreeSet<Season> {
        &self.seasons
    }

    pub fn weathers(&self) -> &BTreeSet<Weather> {
        &self.weathers
    }

    pub fn with_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        Self::new(start, end, self.seasons.clone(), self.weathers.clone())
    }

    pub fn with_seasons(&self, seasons: BTreeSet<Season>) -> Self {
        FilterCriteria {
            seasons,
            ..self.clone()
        }
    }

    pub fn with_weathers(&self, weathers: BTreeSet<Weather>) -> Self {
        FilterCriteria {
            weathers,
            ..self.clone()
        }
    }

    /// Whether nothing can pass, without looking at any row.
    pub fn selects_nothing(&self) -> bool {
        self.seasons.is_empty() || self.weathers.is_empty()
    }

    /// A record passes when every predicate holds.
    pub fn accepts(&self, record: &Record) -> bool {
        self.matcher()(record)
    }

    /// The row predicate, with category sets that hold every value skipped.
    fn matcher(&self) -> impl Fn(&Record) -> bool + '_ {
        let all_seasons = self.seasons.len() == Season::ALL.len();
        let all_weathers = self.weathers.len() == Weather::ALL.len();
        move |r: &Record| {
            (self.start..=self.end).contains(&r.date)
                && (all_seasons || self.seasons.contains(&r.season))
                && (all_weathers || self.weathers.contains(&r.weather))
        }
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Select the rows of `table` accepted by `criteria`.
///
/// Returns a new view over the same base; `table` is left untouched.
pub fn filter(table: &Table, criteria: &FilterCriteria) -> Table {
    if criteria.selects_nothing() {
        debug!("empty season or weather selection, nothing passes");
        return table.with_rows(Vec::new());
    }

    let accepts = criteria.matcher();
    let rows: Vec<usize> = table
        .row_indices()
        .iter()
        .zip(table.iter())
        .filter(|(_, r)| accepts(*r))
        .map(|(&i, _)| i)
        .collect();

    debug!("filter kept {} of {} rows", rows.len(), table.len());
    table.with_rows(rows)
}
