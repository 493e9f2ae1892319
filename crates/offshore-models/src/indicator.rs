use serde::{Deserialize, Serialize};

use crate::labels::{labelled_enum, ParseLabelError};

/// Direction of an economic indicator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Trend {
    Stable,
    Rising,
    Falling,
    #[default]
    #[serde(rename = "N/A")]
    NotApplicable,
}

labelled_enum!(Trend, "trend", {
    Stable => "Stable",
    Rising => "Rising",
    Falling => "Falling",
    NotApplicable => "N/A",
});

impl Trend {
    /// Parse a form label such as `"Rising ↗️"`. Only the first word counts.
    pub fn from_label(label: &str) -> Result<Self, ParseLabelError> {
        let word = label.split_whitespace().next().unwrap_or_default();
        word.parse().map_err(|_| ParseLabelError {
            kind: "trend",
            label: label.to_string(),
        })
    }

    /// Decorated label for display.
    pub fn decorated(&self) -> &'static str {
        match self {
            Trend::Stable => "Stable 😐",
            Trend::Rising => "Rising ↗️",
            Trend::Falling => "Falling ↘️",
            Trend::NotApplicable => "N/A",
        }
    }
}

/// A row of `economic_indicators`. Unique per `(country_id, indicator_name)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EconomicIndicator {
    pub id: i64,
    pub country_id: i64,
    pub indicator_name: String,
    /// Free text, e.g. `"5.2%"`.
    pub current_value: String,
    /// Free text, e.g. `"Jul/2025"`.
    pub reference_period: String,
    #[serde(default)]
    pub trend: Trend,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewIndicator {
    pub country_id: i64,
    pub indicator_name: String,
    pub current_value: String,
    pub reference_period: String,
    #[serde(default)]
    pub trend: Trend,
}

impl NewIndicator {
    /// Conflict key for upserts.
    pub const CONFLICT_KEY: &'static [&'static str] = &["country_id", "indicator_name"];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_from_decorated_label() {
        assert_eq!(Trend::from_label("Rising ↗️").unwrap(), Trend::Rising);
        assert_eq!(Trend::from_label("Falling ↘️").unwrap(), Trend::Falling);
        assert_eq!(Trend::from_label("Stable 😐").unwrap(), Trend::Stable);
        assert_eq!(Trend::from_label("N/A").unwrap(), Trend::NotApplicable);
    }

    #[test]
    fn trend_from_unknown_label() {
        let err = Trend::from_label("Sideways →").unwrap_err();
        assert_eq!(err.label, "Sideways →");
        assert!(Trend::from_label("").is_err());
    }

    #[test]
    fn decorated_label_parses_back() {
        for trend in Trend::ALL {
            assert_eq!(Trend::from_label(trend.decorated()).unwrap(), *trend);
        }
    }
}
