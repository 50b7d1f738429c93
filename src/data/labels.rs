use std::fmt;

use serde::{Serialize, Serializer};

use super::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// CategoryCode – fixed code → label tables
// ---------------------------------------------------------------------------

/// A small categorical variable stored as an integer code in the source file.
///
/// Every implementor owns a closed table: codes outside it are a data-quality
/// defect and surface as [`DashboardError::UnknownCode`].
pub trait CategoryCode: Copy + Ord + Sized + 'static {
    /// Column name used in error messages.
    const FIELD: &'static str;

    /// All categories in code order.
    const ALL: &'static [Self];

    fn code(self) -> i64;

    fn label(self) -> &'static str;

    fn from_code(code: i64) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.code() == code)
            .ok_or(DashboardError::UnknownCode {
                field: Self::FIELD,
                code,
            })
    }

    /// Parse a label coming from a selection widget (case-insensitive).
    fn from_label(label: &str) -> Result<Self> {
        let wanted = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DashboardError::UnknownLabel {
                field: Self::FIELD,
                label: label.to_string(),
            })
    }
}

/// Map a sequence of raw codes to categories, failing on the first unmapped one.
pub fn map_codes<C: CategoryCode>(codes: &[i64]) -> Result<Vec<C>> {
    codes.iter().map(|&code| C::from_code(code)).collect()
}

macro_rules! category_impls {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Season
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl CategoryCode for Season {
    const FIELD: &'static str = "season";
    const ALL: &'static [Self] = &[Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    fn code(self) -> i64 {
        match self {
            Season::Spring => 1,
            Season::Summer => 2,
            Season::Fall => 3,
            Season::Winter => 4,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
            Season::Winter => "Winter",
        }
    }
}

category_impls!(Season);

// ---------------------------------------------------------------------------
// Weather – ordered by severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weather {
    Clear,
    Mist,
    LightPrecipitation,
    HeavyPrecipitation,
}

impl CategoryCode for Weather {
    const FIELD: &'static str = "weathersit";
    const ALL: &'static [Self] = &[
        Weather::Clear,
        Weather::Mist,
        Weather::LightPrecipitation,
        Weather::HeavyPrecipitation,
    ];

    fn code(self) -> i64 {
        match self {
            Weather::Clear => 1,
            Weather::Mist => 2,
            Weather::LightPrecipitation => 3,
            Weather::HeavyPrecipitation => 4,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Weather::Clear => "Clear / Partly Cloudy",
            Weather::Mist => "Mist / Cloudy",
            Weather::LightPrecipitation => "Light Rain / Light Snow",
            Weather::HeavyPrecipitation => "Heavy Rain / Storm",
        }
    }
}

category_impls!(Weather);

// ---------------------------------------------------------------------------
// WorkingDay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkingDay {
    /// Weekend or public holiday.
    Holiday,
    Working,
}

impl CategoryCode for WorkingDay {
    const FIELD: &'static str = "workingday";
    const ALL: &'static [Self] = &[WorkingDay::Holiday, WorkingDay::Working];

    fn code(self) -> i64 {
        match self {
            WorkingDay::Holiday => 0,
            WorkingDay::Working => 1,
        }
    }

    fn label(self) -> &'static str {
        match self {
            WorkingDay::Holiday => "Holiday / Weekend",
            WorkingDay::Working => "Working Day",
        }
    }
}

category_impls!(WorkingDay);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_codes_map_in_order() {
        let seasons: Vec<Season> = map_codes(&[1, 2, 3, 4]).unwrap();
        assert_eq!(
            seasons,
            vec![Season::Spring, Season::Summer, Season::Fall, Season::Winter]
        );
    }

    #[test]
    fn unmapped_weather_code_is_an_error() {
        let err = map_codes::<Weather>(&[1, 5]).unwrap_err();
        match err {
            DashboardError::UnknownCode { field, code } => {
                assert_eq!(field, "weathersit");
                assert_eq!(code, 5);
            }
            other => panic!("expected UnknownCode, got {other:?}"),
        }
    }

    #[test]
    fn working_day_rejects_two() {
        assert!(WorkingDay::from_code(2).is_err());
        assert_eq!(WorkingDay::from_code(0).unwrap(), WorkingDay::Holiday);
    }

    #[test]
    fn labels_round_trip_case_insensitively() {
        assert_eq!(Weather::from_label("mist / cloudy").unwrap(), Weather::Mist);
        assert_eq!(Season::from_label(" Fall ").unwrap(), Season::Fall);
        assert!(matches!(
            Season::from_label("Monsoon"),
            Err(DashboardError::UnknownLabel { field: "season", .. })
        ));
    }

    #[test]
    fn weather_orders_by_severity() {
        assert!(Weather::Clear < Weather::Mist);
        assert!(Weather::LightPrecipitation < Weather::HeavyPrecipitation);
    }

    #[test]
    fn categories_serialize_as_labels() {
        let json = serde_json::to_string(&vec![Season::Winter]).unwrap();
        assert_eq!(json, "[\"Winter\"]");
    }
}
