//! JSON export of generated reports, single and batch.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{PupilReport, ReportPeriod, ReportType};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub period: ReportPeriod,
    pub content: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
}

impl From<&PupilReport> for ExportedReport {
    fn from(report: &PupilReport) -> Self {
        Self {
            title: report.title.clone(),
            generated_at: report.generated_at,
            period: report.period,
            content: report.content.clone(),
            report_type: report.report_type,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBatch {
    pub reports: Vec<ExportedReport>,
    pub exported_at: DateTime<Utc>,
    pub total_reports: usize,
}

pub fn batch(reports: &[PupilReport]) -> ReportBatch {
    let reports: Vec<ExportedReport> = reports.iter().map(ExportedReport::from).collect();
    ReportBatch {
        total_reports: reports.len(),
        reports,
        exported_at: Utc::now(),
    }
}

/// Download filename derived from the report title.
pub fn file_name(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "report.json".to_string()
    } else {
        format!("{}.json", slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(title: &str) -> PupilReport {
        PupilReport {
            title: title.into(),
            content: "Steady progress.".into(),
            target: "p1".into(),
            report_type: ReportType::Parents,
            period: ReportPeriod::Term,
            strengths: vec![],
            improvements: vec![],
            next_steps: vec![],
            goals: vec![],
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn single_export_uses_type_key() {
        let value = serde_json::to_value(ExportedReport::from(&report("Parents report for Ada"))).unwrap();
        assert_eq!(value["type"], "parents");
        assert_eq!(value["period"], "term");
        assert!(value.get("generatedAt").is_some());
        assert!(value.get("strengths").is_none());
    }

    #[test]
    fn batch_counts_reports() {
        let value = serde_json::to_value(batch(&[report("a"), report("b")])).unwrap();
        assert_eq!(value["totalReports"], 2);
        assert_eq!(value["reports"].as_array().unwrap().len(), 2);
        assert!(value.get("exportedAt").is_some());
    }

    #[test]
    fn file_names_are_slugged() {
        assert_eq!(file_name("Progress report for Leo Chen"), "progress_report_for_leo_chen.json");
        assert_eq!(file_name("!!"), "report.json");
    }
}
