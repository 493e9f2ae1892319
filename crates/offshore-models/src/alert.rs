use serde::{Deserialize, Serialize};

use crate::labels::labelled_enum;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Severity {
    High,
    Medium,
    Low,
}

labelled_enum!(Severity, "severity", {
    High => "High",
    Medium => "Medium",
    Low => "Low",
});

/// A row of `alerts`. Written by administrators; there is no read path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: i64,
    pub title: String,
    pub alert_kind: String,
    pub severity: Severity,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAlert {
    pub title: String,
    pub alert_kind: String,
    pub severity: Severity,
    #[serde(default)]
    pub description: Option<String>,
}
