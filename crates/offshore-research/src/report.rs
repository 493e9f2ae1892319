//! Consolidated research report: picks the analyses matching the selected countries,
//! asset classes and themes and groups them into sections ready for rendering.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use offshore_models::{AnalysisKind, AnalysisWithManager, Stance};
use offshore_store::{Gateway, Query};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::browse::analyses_of_kind;
use crate::error::ResearchError;

/// Ids selected for each report section. An empty set skips that section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilters {
    #[serde(default)]
    pub countries: BTreeSet<i64>,
    #[serde(default)]
    pub asset_classes: BTreeSet<i64>,
    #[serde(default)]
    pub themes: BTreeSet<i64>,
}

impl ReportFilters {
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty() && self.asset_classes.is_empty() && self.themes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectionKind {
    Macro,
    AssetClass,
    Thematic,
}

impl SectionKind {
    /// Rendering order.
    pub const ORDER: [SectionKind; 3] = [SectionKind::Macro, SectionKind::AssetClass, SectionKind::Thematic];

    pub fn heading(&self) -> &'static str {
        match self {
            SectionKind::Macro => "Macro Analyses",
            SectionKind::AssetClass => "Asset Class Analyses",
            SectionKind::Thematic => "Thematic Analyses",
        }
    }

    pub fn analysis_kind(&self) -> AnalysisKind {
        match self {
            SectionKind::Macro => AnalysisKind::Macro,
            SectionKind::AssetClass => AnalysisKind::Asset,
            SectionKind::Thematic => AnalysisKind::Thematic,
        }
    }

    pub fn foreign_key(&self) -> &'static str {
        match self {
            SectionKind::Macro => "country_id",
            SectionKind::AssetClass => "asset_class_id",
            SectionKind::Thematic => "theme_id",
        }
    }

    fn selected<'a>(&self, filters: &'a ReportFilters) -> &'a BTreeSet<i64> {
        match self {
            SectionKind::Macro => &filters.countries,
            SectionKind::AssetClass => &filters.asset_classes,
            SectionKind::Thematic => &filters.themes,
        }
    }

    /// Query for this section's analyses among `ids`.
    pub fn query(&self, ids: &BTreeSet<i64>) -> Query {
        analyses_of_kind(self.analysis_kind()).is_in(self.foreign_key(), ids.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub title: String,
    pub source: String,
    pub stance: Stance,
    pub summary: String,
    pub publication_date: NaiveDate,
}

impl ReportEntry {
    pub fn heading_line(&self) -> String {
        format!("{} (Source: {})", self.title, self.source)
    }

    pub fn stance_line(&self) -> String {
        format!("Stance: {}", self.stance)
    }

    pub fn summary_line(&self) -> String {
        format!("Summary: {}", self.summary)
    }
}

impl From<AnalysisWithManager> for ReportEntry {
    fn from(row: AnalysisWithManager) -> Self {
        let source = row.source().to_string();
        Self {
            title: row.analysis.title,
            source,
            stance: row.analysis.stance,
            summary: row.analysis.summary,
            publication_date: row.analysis.publication_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub heading: String,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }
}

/// `research_report_2025-07-30.pdf` for the default prefix.
pub fn report_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}_{}.pdf", date.format("%Y-%m-%d"))
}

pub struct ReportAssembler {
    gateway: Arc<Gateway>,
    title: String,
}

impl ReportAssembler {
    pub fn new(gateway: Arc<Gateway>, title: impl Into<String>) -> Self {
        Self {
            gateway,
            title: title.into(),
        }
    }

    pub async fn assemble(&self, filters: &ReportFilters) -> Result<Report, ResearchError> {
        self.assemble_at(filters, Utc::now()).await
    }

    /// Same as [`assemble`](Self::assemble) with a fixed generation timestamp.
    pub async fn assemble_at(
        &self,
        filters: &ReportFilters,
        generated_at: DateTime<Utc>,
    ) -> Result<Report, ResearchError> {
        let mut sections = Vec::new();
        for kind in SectionKind::ORDER {
            let ids = kind.selected(filters);
            if ids.is_empty() {
                continue;
            }
            let rows: Vec<AnalysisWithManager> = self.gateway.fetch(&kind.query(ids)).await?;
            if rows.is_empty() {
                continue;
            }
            sections.push(ReportSection {
                kind,
                heading: kind.heading().to_string(),
                entries: rows.into_iter().map(ReportEntry::from).collect(),
            });
        }

        let report = Report {
            title: self.title.clone(),
            generated_at,
            sections,
        };
        info!(
            sections = report.sections.len(),
            entries = report.entry_count(),
            "Assembled research report"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{day, insert_analysis, new_analysis, seeded, Fixture};

    async fn with_macro_rows() -> Fixture {
        let fixture = seeded().await.unwrap();
        let rows = [
            ("Brazil rates", fixture.brazil, day(2025, 6, 1), Some(fixture.pimco)),
            ("Brazil fiscal", fixture.brazil, day(2025, 7, 1), None),
            ("US labour", fixture.usa, day(2025, 7, 15), Some(fixture.blackrock)),
        ];
        for (title, country, published, manager) in rows {
            let mut new = new_analysis(title, AnalysisKind::Macro, published);
            new.country_id = Some(country);
            new.manager_id = manager;
            insert_analysis(&fixture.gateway, &new).await.unwrap();
        }
        fixture
    }

    #[test]
    fn file_name_uses_prefix_and_iso_date() {
        assert_eq!(
            report_file_name("research_report", day(2025, 7, 30)),
            "research_report_2025-07-30.pdf"
        );
    }

    #[test]
    fn entry_lines() {
        let entry = ReportEntry {
            title: "Brazil rates".to_string(),
            source: "N/A".to_string(),
            stance: Stance::Overweight,
            summary: "Cuts ahead".to_string(),
            publication_date: day(2025, 6, 1),
        };
        assert_eq!(entry.heading_line(), "Brazil rates (Source: N/A)");
        assert_eq!(entry.stance_line(), "Stance: Overweight");
        assert_eq!(entry.summary_line(), "Summary: Cuts ahead");
    }

    #[tokio::test]
    async fn empty_filters_give_title_only_report() {
        let fixture = with_macro_rows().await;
        let assembler = ReportAssembler::new(fixture.gateway, "Global Research Report");
        let report = assembler.assemble(&ReportFilters::default()).await.unwrap();
        assert!(report.sections.is_empty());
        assert_eq!(report.title, "Global Research Report");
    }

    #[tokio::test]
    async fn macro_section_holds_only_selected_countries() {
        let fixture = with_macro_rows().await;
        let filters = ReportFilters {
            countries: BTreeSet::from([fixture.brazil]),
            ..Default::default()
        };
        let assembler = ReportAssembler::new(Arc::clone(&fixture.gateway), "Report");
        let report = assembler.assemble(&filters).await.unwrap();

        assert_eq!(report.sections.len(), 1);
        let section = &report.sections[0];
        assert_eq!(section.heading, "Macro Analyses");
        let titles: Vec<&str> = section.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Brazil fiscal", "Brazil rates"]);
        assert_eq!(section.entries[0].source, "N/A");
        assert_eq!(section.entries[1].source, "PIMCO");
    }

    #[tokio::test]
    async fn sections_follow_fixed_order_and_skip_empty_ones() {
        let fixture = with_macro_rows().await;
        let mut thematic = new_analysis("AI capex", AnalysisKind::Thematic, day(2025, 5, 5));
        thematic.theme_id = Some(fixture.artificial_intelligence);
        insert_analysis(&fixture.gateway, &thematic).await.unwrap();

        let filters = ReportFilters {
            countries: BTreeSet::from([fixture.usa]),
            asset_classes: BTreeSet::from([fixture.equities]),
            themes: BTreeSet::from([fixture.artificial_intelligence]),
        };
        let assembler = ReportAssembler::new(Arc::clone(&fixture.gateway), "Report");
        let report = assembler.assemble(&filters).await.unwrap();

        let headings: Vec<&str> = report.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, ["Macro Analyses", "Thematic Analyses"]);
        assert_eq!(report.entry_count(), 2);
    }

    #[tokio::test]
    async fn fixed_timestamp_is_kept() {
        let fixture = seeded().await.unwrap();
        let at = DateTime::<Utc>::from_timestamp(1_750_000_000, 0).unwrap();
        let report = ReportAssembler::new(fixture.gateway, "Report")
            .assemble_at(&ReportFilters::default(), at)
            .await
            .unwrap();
        assert_eq!(report.generated_at, at);
    }
}
