use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::labels::labelled_enum;
use crate::reference::Manager;

/// Category of a piece of research. Decides which foreign key is meaningful.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Macro,
    CentralBankView,
    Asset,
    MicroAsset,
    Thesis,
    Thematic,
}

labelled_enum!(AnalysisKind, "analysis kind", {
    Macro => "Macro",
    CentralBankView => "CentralBankView",
    Asset => "Asset",
    MicroAsset => "MicroAsset",
    Thesis => "Thesis",
    Thematic => "Thematic",
});

/// Directional view held by a manager or institution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Stance {
    Overweight,
    Neutral,
    Underweight,
    #[default]
    #[serde(rename = "N/A")]
    NotApplicable,
}

labelled_enum!(Stance, "stance", {
    Overweight => "Overweight",
    Neutral => "Neutral",
    Underweight => "Underweight",
    NotApplicable => "N/A",
});

impl Stance {
    /// Plot value for the stance timeline. `None` for N/A, which is not plotted.
    pub fn signal(&self) -> Option<i8> {
        match self {
            Stance::Overweight => Some(1),
            Stance::Neutral => Some(0),
            Stance::Underweight => Some(-1),
            Stance::NotApplicable => None,
        }
    }
}

/// A row of the `analyses` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub full_text: String,
    pub kind: AnalysisKind,
    #[serde(default)]
    pub stance: Stance,
    pub publication_date: NaiveDate,
    pub country_id: Option<i64>,
    pub manager_id: Option<i64>,
    pub asset_class_id: Option<i64>,
    pub asset_subclass_id: Option<i64>,
    pub theme_id: Option<i64>,
}

/// An analysis joined with the manager that authored it.
///
/// The backend nests the joined row under the related table's name,
/// `null` when the analysis has no manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisWithManager {
    #[serde(flatten)]
    pub analysis: Analysis,
    #[serde(rename = "managers", default)]
    pub manager: Option<Manager>,
}

impl AnalysisWithManager {
    /// Manager name, or `"N/A"` for institutional views without one.
    pub fn source(&self) -> &str {
        self.manager
            .as_ref()
            .map(|m| m.name.as_str())
            .unwrap_or("N/A")
    }
}

/// Insert payload for an analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAnalysis {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub full_text: String,
    pub kind: AnalysisKind,
    #[serde(default)]
    pub stance: Stance,
    pub publication_date: NaiveDate,
    #[serde(default)]
    pub country_id: Option<i64>,
    #[serde(default)]
    pub manager_id: Option<i64>,
    #[serde(default)]
    pub asset_class_id: Option<i64>,
    #[serde(default)]
    pub asset_subclass_id: Option<i64>,
    #[serde(default)]
    pub theme_id: Option<i64>,
}

/// Partial update for an analysis. Absent fields are left untouched.
///
/// Foreign keys use a nested option: `Some(None)` clears the column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AnalysisPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AnalysisKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stance: Option<Stance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub country_id: Option<Option<i64>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub manager_id: Option<Option<i64>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub asset_class_id: Option<Option<i64>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub asset_subclass_id: Option<Option<i64>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub theme_id: Option<Option<i64>>,
}

/// Distinguishes an explicit `null` (clear the column) from an absent field.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

impl AnalysisPatch {
    /// Apply the patch to an existing row, producing the row as it would be stored.
    pub fn apply_to(&self, current: &Analysis) -> Analysis {
        Analysis {
            id: current.id,
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            summary: self
                .summary
                .clone()
                .unwrap_or_else(|| current.summary.clone()),
            full_text: self
                .full_text
                .clone()
                .unwrap_or_else(|| current.full_text.clone()),
            kind: self.kind.unwrap_or(current.kind),
            stance: self.stance.unwrap_or(current.stance),
            publication_date: self.publication_date.unwrap_or(current.publication_date),
            country_id: self.country_id.unwrap_or(current.country_id),
            manager_id: self.manager_id.unwrap_or(current.manager_id),
            asset_class_id: self.asset_class_id.unwrap_or(current.asset_class_id),
            asset_subclass_id: self.asset_subclass_id.unwrap_or(current.asset_subclass_id),
            theme_id: self.theme_id.unwrap_or(current.theme_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> serde_json::Value {
        serde_json::json!({
            "id": 7,
            "title": "Brasil: ciclo de cortes",
            "summary": "Juros em queda",
            "full_text": "Texto completo",
            "kind": "Macro",
            "stance": "Overweight",
            "publication_date": "2025-07-15",
            "country_id": 1,
            "manager_id": 3,
            "asset_class_id": null,
            "asset_subclass_id": null,
            "theme_id": null,
            "managers": {"id": 3, "name": "BlackRock"}
        })
    }

    #[test]
    fn joined_row_deserializes_with_manager() {
        let row: AnalysisWithManager = serde_json::from_value(sample_row()).unwrap();
        assert_eq!(row.analysis.id, 7);
        assert_eq!(row.analysis.kind, AnalysisKind::Macro);
        assert_eq!(row.source(), "BlackRock");
    }

    #[test]
    fn missing_manager_reports_na() {
        let mut value = sample_row();
        value["managers"] = serde_json::Value::Null;
        value["manager_id"] = serde_json::Value::Null;
        let row: AnalysisWithManager = serde_json::from_value(value).unwrap();
        assert!(row.manager.is_none());
        assert_eq!(row.source(), "N/A");
    }

    #[test]
    fn stance_na_label() {
        assert_eq!(serde_json::to_string(&Stance::NotApplicable).unwrap(), "\"N/A\"");
        assert_eq!("n/a".parse::<Stance>().unwrap(), Stance::NotApplicable);
        assert_eq!("underweight".parse::<Stance>().unwrap(), Stance::Underweight);
        assert!("Bullish".parse::<Stance>().is_err());
    }

    #[test]
    fn stance_signal_mapping() {
        assert_eq!(Stance::Overweight.signal(), Some(1));
        assert_eq!(Stance::Neutral.signal(), Some(0));
        assert_eq!(Stance::Underweight.signal(), Some(-1));
        assert_eq!(Stance::NotApplicable.signal(), None);
    }

    #[test]
    fn patch_clears_and_keeps_fields() {
        let current: Analysis = serde_json::from_value(sample_row()).unwrap();
        let patch = AnalysisPatch {
            stance: Some(Stance::Neutral),
            manager_id: Some(None),
            ..Default::default()
        };
        let updated = patch.apply_to(&current);
        assert_eq!(updated.stance, Stance::Neutral);
        assert_eq!(updated.manager_id, None);
        assert_eq!(updated.country_id, Some(1));
        assert_eq!(updated.title, current.title);
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = AnalysisPatch {
            title: Some("Novo título".to_string()),
            theme_id: Some(None),
            ..Default::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["theme_id"], serde_json::Value::Null);
    }

    #[test]
    fn patch_json_null_clears_column() {
        let patch: AnalysisPatch =
            serde_json::from_str(r#"{"manager_id": null, "stance": "Neutral"}"#).unwrap();
        assert_eq!(patch.manager_id, Some(None));
        assert_eq!(patch.country_id, None);
        assert_eq!(patch.stance, Some(Stance::Neutral));
    }
}
