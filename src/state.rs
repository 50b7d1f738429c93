use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;

use crate::data::error::Result;
use crate::data::filter::{filter, FilterCriteria};
use crate::data::labels::{Season, Weather};
use crate::data::model::Table;
use crate::views::{View, ViewData};

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// The current selection and its filtered rows, independent of rendering.
pub struct DashboardState {
    /// Loaded dataset, shared with the cache.
    dataset: Arc<Table>,

    /// Selected navigation entry.
    view: View,

    /// Current filter selection. `None` only for an empty dataset.
    criteria: Option<FilterCriteria>,

    /// Rows passing the current criteria (cached).
    visible: Table,
}

impl DashboardState {
    /// Start with everything selected.
    pub fn new(dataset: Arc<Table>) -> Self {
        let criteria = FilterCriteria::select_all(&dataset);
        let visible = (*dataset).clone();
        DashboardState {
            dataset,
            view: View::default(),
            criteria,
            visible,
        }
    }

    pub fn dataset(&self) -> &Table {
        &self.dataset
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn criteria(&self) -> Option<&FilterCriteria> {
        self.criteria.as_ref()
    }

    /// Rows passing the current filters.
    pub fn visible(&self) -> &Table {
        &self.visible
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    /// Replace the whole selection and refilter.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = Some(criteria);
        self.refilter();
    }

    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) -> Result<()> {
        if let Some(c) = &self.criteria {
            self.criteria = Some(c.with_date_range(start, end)?);
            self.refilter();
        }
        Ok(())
    }

    pub fn set_seasons(&mut self, seasons: BTreeSet<Season>) {
        if let Some(c) = &self.criteria {
            self.criteria = Some(c.with_seasons(seasons));
            self.refilter();
        }
    }

    pub fn set_weathers(&mut self, weathers: BTreeSet<Weather>) {
        if let Some(c) = &self.criteria {
            self.criteria = Some(c.with_weathers(weathers));
            self.refilter();
        }
    }

    /// Toggle a single season in the selection.
    pub fn toggle_season(&mut self, season: Season) {
        if let Some(c) = &self.criteria {
            let mut seasons = c.seasons().clone();
            if !seasons.remove(&season) {
                seasons.insert(season);
            }
            self.set_seasons(seasons);
        }
    }

    /// Toggle a single weather situation in the selection.
    pub fn toggle_weather(&mut self, weather: Weather) {
        if let Some(c) = &self.criteria {
            let mut weathers = c.weathers().clone();
            if !weathers.remove(&weather) {
                weathers.insert(weather);
            }
            self.set_weathers(weathers);
        }
    }

    /// Go back to everything selected.
    pub fn reset(&mut self) {
        self.criteria = FilterCriteria::select_all(&self.dataset);
        self.refilter();
    }

    /// Summary tables of the selected view over the visible rows.
    pub fn view_data(&self) -> Result<ViewData> {
        self.view.build(&self.visible)
    }

    /// Recompute `visible` after a selection change.
    fn refilter(&mut self) {
        self.visible = match &self.criteria {
            Some(c) => filter(&self.dataset, c),
            None => (*self.dataset).clone(),
        };
        debug!(
            "{} of {} rows visible",
            self.visible.len(),
            self.dataset.len()
        );
    }
}
