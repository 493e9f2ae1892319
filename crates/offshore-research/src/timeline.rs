use chrono::NaiveDate;
use offshore_models::{AnalysisWithManager, Stance};
use serde::Serialize;

/// One plotted stance: Overweight 1, Neutral 0, Underweight -1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub value: i8,
    pub stance: Stance,
    pub title: String,
    pub source: String,
}

/// Stance history in ascending date order. N/A stances are left out.
pub fn stance_timeline(analyses: &[AnalysisWithManager]) -> Vec<TimelinePoint> {
    let mut points: Vec<TimelinePoint> = analyses
        .iter()
        .filter_map(|row| {
            let value = row.analysis.stance.signal()?;
            Some(TimelinePoint {
                date: row.analysis.publication_date,
                value,
                stance: row.analysis.stance,
                title: row.analysis.title.clone(),
                source: row.source().to_string(),
            })
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}
