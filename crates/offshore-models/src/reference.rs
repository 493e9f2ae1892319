use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Country {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub flag_emoji: Option<String>,
}

impl Country {
    /// Selector label: `"Brasil 🇧🇷"`, or the bare name when no flag is set.
    pub fn label(&self) -> String {
        match self.flag_emoji.as_deref().map(str::trim) {
            Some(flag) if !flag.is_empty() => format!("{} {}", self.name, flag),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetClass {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetSubclass {
    pub id: i64,
    pub name: String,
    pub asset_class_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Theme {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manager {
    pub id: i64,
    pub name: String,
}

/// Insert payload for the name-only reference tables (asset classes, themes, managers).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewNamed {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCountry {
    pub name: String,
    #[serde(default)]
    pub flag_emoji: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAssetSubclass {
    pub name: String,
    pub asset_class_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_label_with_flag() {
        let country = Country {
            id: 1,
            name: "Brasil".to_string(),
            flag_emoji: Some("🇧🇷".to_string()),
        };
        assert_eq!(country.label(), "Brasil 🇧🇷");
    }

    #[test]
    fn country_label_without_flag() {
        let mut country = Country {
            id: 2,
            name: "Zona do Euro".to_string(),
            flag_emoji: None,
        };
        assert_eq!(country.label(), "Zona do Euro");

        country.flag_emoji = Some("  ".to_string());
        assert_eq!(country.label(), "Zona do Euro");
    }
}
