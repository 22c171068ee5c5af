use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The four fixed criteria every graded piece of work is scored against.
pub const GRADE_CRITERIA: [&str; 4] = ["creativity", "technical", "problemSolving", "evaluation"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedFile {
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: u64,
    /// Stored filename under the upload folder, when the file was uploaded.
    #[serde(default)]
    pub stored_as: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSubmission {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub files: Vec<AttachedFile>,
    #[serde(default, alias = "project")]
    pub project_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    pub grades: BTreeMap<String, u8>,
    pub feedback: BTreeMap<String, String>,
    pub suggestions: Vec<String>,
    pub overall_grade: f64,
    pub confidence: u8,
    pub generated_at: DateTime<Utc>,
    pub analysis_type: String,
}

impl GradeResult {
    pub fn mean_of(grades: &BTreeMap<String, u8>) -> f64 {
        if grades.is_empty() {
            return 0.0;
        }
        grades.values().map(|g| f64::from(*g)).sum::<f64>() / grades.len() as f64
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Excited,
    Proud,
    Confused,
    Frustrated,
    Curious,
    Neutral,
}

impl Default for Mood {
    fn default() -> Self {
        Mood::Neutral
    }
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Excited => "excited",
            Mood::Proud => "proud",
            Mood::Confused => "confused",
            Mood::Frustrated => "frustrated",
            Mood::Curious => "curious",
            Mood::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AIFeedback {
    pub content: String,
    pub suggestions: Vec<String>,
    pub encouragement: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherResponse {
    pub teacher_id: String,
    #[serde(default)]
    pub teacher_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub mood: Mood,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<AttachedFile>,
    #[serde(default)]
    pub ai_feedback: Option<AIFeedback>,
    #[serde(default)]
    pub teacher_responses: Vec<TeacherResponse>,
    #[serde(default)]
    pub needs_response: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub title: String,
    pub duration: String,
    pub objectives: Vec<String>,
    pub resources: Vec<String>,
    pub assessment: String,
    pub week: u32,
    pub learning_outcomes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentCriteria {
    pub category: String,
    pub criteria: Vec<String>,
    pub weightage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemeAnalysisResult {
    pub lessons: Vec<Lesson>,
    pub assessment_criteria: Vec<AssessmentCriteria>,
    pub total_duration: String,
    pub confidence: u8,
    pub generated_at: DateTime<Utc>,
    pub analysis_type: String,
}

/// An uploaded scheme-of-work document, reduced to its text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeDocument {
    pub title: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub year_group: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    pub name: String,
    pub email: String,
    pub year_group: String,
    pub class_name: String,
    pub original_row: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub year_group: String,
    #[serde(default)]
    pub pupil_count: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Individual,
    Progress,
    Parents,
    Class,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Individual => "individual",
            ReportType::Progress => "progress",
            ReportType::Parents => "parents",
            ReportType::Class => "class",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Week,
    Month,
    Term,
    Year,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Week => "week",
            ReportPeriod::Month => "month",
            ReportPeriod::Term => "term",
            ReportPeriod::Year => "year",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportPeriod::Week => "this week",
            ReportPeriod::Month => "this month",
            ReportPeriod::Term => "this term",
            ReportPeriod::Year => "this year",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    pub title: String,
    pub grade: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PupilSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub year_group: String,
    /// Attendance as a percentage in [0, 100].
    #[serde(default)]
    pub attendance: f64,
    #[serde(default)]
    pub behaviour: String,
    #[serde(default)]
    pub grades: Vec<GradeRecord>,
}

impl PupilSummary {
    pub fn average_grade(&self) -> f64 {
        if self.grades.is_empty() {
            return 0.0;
        }
        self.grades.iter().map(|g| g.grade).sum::<f64>() / self.grades.len() as f64
    }

    /// Most recent grade records first.
    pub fn recent_grades(&self, n: usize) -> Vec<&GradeRecord> {
        let mut sorted: Vec<&GradeRecord> = self.grades.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted.truncate(n);
        sorted
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PupilReportRequest {
    pub pupil: PupilSummary,
    pub report_type: ReportType,
    pub period: ReportPeriod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassReportRequest {
    pub class_name: String,
    #[serde(default)]
    pub year_group: String,
    pub pupils: Vec<PupilSummary>,
    pub period: ReportPeriod,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PupilReport {
    pub title: String,
    pub content: String,
    /// Pupil id, or the class name for class reports.
    pub target: String,
    pub report_type: ReportType,
    pub period: ReportPeriod,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Pupil,
}

impl Role {
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Teacher)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Pupil => "pupil",
        })
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "pupil" | "student" => Ok(Role::Pupil),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_serializes_lowercase() {
        let json = serde_json::to_string(&Mood::Frustrated).unwrap();
        assert_eq!(json, "\"frustrated\"");
        let mood: Mood = serde_json::from_str("\"curious\"").unwrap();
        assert_eq!(mood, Mood::Curious);
    }

    #[test]
    fn recent_grades_are_newest_first() {
        let pupil = PupilSummary {
            id: "p1".into(),
            name: "Sam".into(),
            class_name: "Year 5 Oak".into(),
            year_group: "Year 5".into(),
            attendance: 96.0,
            behaviour: "Good".into(),
            grades: vec![
                GradeRecord { title: "Bridge".into(), grade: 3.0, date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap() },
                GradeRecord { title: "Torch".into(), grade: 4.0, date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap() },
                GradeRecord { title: "Bag".into(), grade: 5.0, date: NaiveDate::from_ymd_opt(2026, 2, 14).unwrap() },
                GradeRecord { title: "Pizza".into(), grade: 2.0, date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap() },
            ],
        };
        let recent: Vec<&str> = pupil.recent_grades(3).iter().map(|g| g.title.as_str()).collect();
        assert_eq!(recent, vec!["Torch", "Bag", "Bridge"]);
        assert!((pupil.average_grade() - 3.5).abs() < 1e-9);
    }

    #[test]
    fn role_parses_student_alias() {
        assert_eq!("Student".parse::<Role>().unwrap(), Role::Pupil);
        assert!("janitor".parse::<Role>().is_err());
    }
}
