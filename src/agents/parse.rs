use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::mock::{grading, scheme};
use super::FallbackReason;
use crate::models::{
    AIFeedback, AssessmentCriteria, GradeResult, Lesson, SchemeAnalysisResult, GRADE_CRITERIA,
};

/// Pulls the JSON object out of provider text, tolerating Markdown fences and prose around it.
pub fn extract_json(text: &str) -> Result<Value, FallbackReason> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid fence regex"));

    let candidate = fence
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    let start = candidate.find('{');
    let end = candidate.rfind('}');
    let slice = match (start, end) {
        (Some(s), Some(e)) if e > s => &candidate[s..=e],
        _ => return Err(FallbackReason::Parse("no JSON object in response".to_string())),
    };

    serde_json::from_str(slice).map_err(|e| FallbackReason::Parse(e.to_string()))
}

fn parse_err(msg: impl Into<String>) -> FallbackReason {
    FallbackReason::Parse(msg.into())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteGrade {
    grades: BTreeMap<String, f64>,
    #[serde(default)]
    feedback: BTreeMap<String, String>,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Provider JSON into a grade result; the overall grade is always recomputed.
pub fn grade_result(text: &str) -> Result<GradeResult, FallbackReason> {
    let remote: RemoteGrade =
        serde_json::from_value(extract_json(text)?).map_err(|e| parse_err(e.to_string()))?;

    let mut grades = BTreeMap::new();
    for criterion in GRADE_CRITERIA {
        let score = *remote
            .grades
            .get(criterion)
            .ok_or_else(|| parse_err(format!("missing {} score", criterion)))?;
        if !(1.0..=5.0).contains(&score) {
            return Err(parse_err(format!("{} score {} outside 1-5", criterion, score)));
        }
        grades.insert(criterion.to_string(), score.round() as u8);
    }

    let mut result = GradeResult {
        overall_grade: GradeResult::mean_of(&grades),
        grades,
        feedback: remote.feedback,
        suggestions: remote.suggestions,
        confidence: remote.confidence.unwrap_or(85.0).clamp(0.0, 100.0).round() as u8,
        generated_at: Utc::now(),
        analysis_type: "grade-work".to_string(),
    };
    grading::complete_feedback(&mut result);
    Ok(result)
}

#[derive(Deserialize)]
struct RemoteFeedback {
    content: String,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    encouragement: String,
}

pub fn journal_feedback(text: &str) -> Result<AIFeedback, FallbackReason> {
    let remote: RemoteFeedback =
        serde_json::from_value(extract_json(text)?).map_err(|e| parse_err(e.to_string()))?;
    if remote.content.trim().is_empty() {
        return Err(parse_err("feedback content is empty"));
    }
    let mut suggestions = remote.suggestions;
    suggestions.truncate(3);
    Ok(AIFeedback {
        content: remote.content,
        suggestions,
        encouragement: remote.encouragement,
        created_at: Utc::now(),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteLesson {
    title: String,
    duration: Value,
    #[serde(default)]
    objectives: Vec<String>,
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default)]
    assessment: String,
    #[serde(default)]
    week: Option<u32>,
    #[serde(default)]
    learning_outcomes: Vec<String>,
}

#[derive(Deserialize)]
struct RemoteCriteria {
    category: String,
    #[serde(default)]
    criteria: Vec<String>,
    #[serde(default)]
    weightage: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteScheme {
    lessons: Vec<RemoteLesson>,
    assessment_criteria: Vec<RemoteCriteria>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Provider JSON into a scheme analysis; weightage is renormalized and the
/// total duration recomputed from the lessons.
pub fn scheme_analysis(text: &str) -> Result<SchemeAnalysisResult, FallbackReason> {
    let remote: RemoteScheme =
        serde_json::from_value(extract_json(text)?).map_err(|e| parse_err(e.to_string()))?;

    if remote.lessons.is_empty() {
        return Err(parse_err("no lessons in scheme analysis"));
    }
    if remote.assessment_criteria.is_empty() {
        return Err(parse_err("no assessment criteria in scheme analysis"));
    }

    let mut total_minutes: u32 = 0;
    let mut lessons = Vec::with_capacity(remote.lessons.len());
    for (i, lesson) in remote.lessons.into_iter().enumerate() {
        let duration = match &lesson.duration {
            Value::String(s) => s.clone(),
            Value::Number(n) => match n.as_u64() {
                Some(minutes) => format!("{} minutes", minutes),
                None => return Err(parse_err(format!("non-integer duration {}", n))),
            },
            other => return Err(parse_err(format!("invalid duration {}", other))),
        };
        let minutes = scheme::parse_duration_minutes(&duration)
            .ok_or_else(|| parse_err(format!("unparseable duration {:?}", duration)))?;
        total_minutes = total_minutes
            .checked_add(minutes)
            .ok_or_else(|| parse_err("total scheme duration is too large"))?;
        lessons.push(Lesson {
            title: lesson.title,
            duration,
            objectives: lesson.objectives,
            resources: lesson.resources,
            assessment: lesson.assessment,
            week: lesson.week.unwrap_or(i as u32 + 1),
            learning_outcomes: lesson.learning_outcomes,
        });
    }

    let raw: Vec<u32> = remote
        .assessment_criteria
        .iter()
        .map(|c| c.weightage.max(0.0).round() as u32)
        .collect();
    let assessment_criteria = remote
        .assessment_criteria
        .into_iter()
        .zip(scheme::normalize_weightage(&raw))
        .map(|(c, weightage)| AssessmentCriteria {
            category: c.category,
            criteria: c.criteria,
            weightage,
        })
        .collect();

    Ok(SchemeAnalysisResult {
        lessons,
        assessment_criteria,
        total_duration: scheme::format_total_duration(total_minutes),
        confidence: remote.confidence.unwrap_or(80.0).clamp(0.0, 100.0).round() as u8,
        generated_at: Utc::now(),
        analysis_type: "scheme-analysis".to_string(),
    })
}

/// Narrative reports are used as returned, minus any wrapping fence.
pub fn narrative(text: &str) -> Result<String, FallbackReason> {
    let trimmed = text
        .trim()
        .trim_start_matches("```markdown")
        .trim_start_matches("```text")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if trimmed.is_empty() {
        return Err(FallbackReason::EmptyResponse);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_inside_fences_and_prose() {
        let text = "Here is the grading:\n```json\n{\"grades\": {\"creativity\": 4}}\n```\nThanks";
        assert_eq!(extract_json(text).unwrap()["grades"]["creativity"], 4);
        assert!(extract_json("no braces here").is_err());
    }

    #[test]
    fn remote_grade_overall_is_recomputed() {
        let text = r#"{"grades":{"creativity":4,"technical":3,"problemSolving":5,"evaluation":2},
            "feedback":{"creativity":"Nice","technical":"Ok"},
            "suggestions":["Sand the edges"],"overallGrade":4.9,"confidence":91}"#;
        let result = grade_result(text).unwrap();
        assert!((result.overall_grade - 3.5).abs() < 1e-9);
        assert_eq!(result.confidence, 91);
        assert_eq!(result.feedback["creativity"], "Nice");
        assert_eq!(
            result.grades.keys().collect::<Vec<_>>(),
            result.feedback.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn out_of_range_score_is_a_parse_failure() {
        let text = r#"{"grades":{"creativity":9}}"#;
        assert!(matches!(grade_result(text), Err(FallbackReason::Parse(_))));
        assert!(matches!(grade_result(r#"{"grades":{}}"#), Err(FallbackReason::Parse(_))));
    }

    #[test]
    fn remote_scheme_is_normalized() {
        let text = r#"{"lessons":[
            {"title":"Intro","duration":"60 minutes","objectives":["a"]},
            {"title":"Make","duration":90,"week":3}
        ],"assessmentCriteria":[
            {"category":"Design","criteria":["x"],"weightage":40},
            {"category":"Making","weightage":40},
            {"category":"Evaluation","weightage":40}
        ]}"#;
        let result = scheme_analysis(text).unwrap();
        assert_eq!(result.total_duration, "2h 30m");
        assert_eq!(result.lessons[0].week, 1);
        assert_eq!(result.lessons[1].week, 3);
        assert_eq!(result.lessons[1].duration, "90 minutes");
        let sum: u32 = result.assessment_criteria.iter().map(|c| c.weightage).sum();
        assert_eq!(sum, 100);
    }

    #[test]
    fn remote_scheme_with_bad_duration_is_rejected() {
        let text = r#"{"lessons":[{"title":"Intro","duration":"soon"}],
            "assessmentCriteria":[{"category":"Design","weightage":100}]}"#;
        assert!(matches!(scheme_analysis(text), Err(FallbackReason::Parse(_))));
    }

    #[test]
    fn oversized_durations_fall_back() {
        let text = r#"{"lessons":[{"title":"Intro","duration":"71582789 hours"}],
            "assessmentCriteria":[{"category":"Design","weightage":100}]}"#;
        assert!(matches!(scheme_analysis(text), Err(FallbackReason::Parse(_))));

        let text = r#"{"lessons":[
            {"title":"Intro","duration":"4294967295 minutes"},
            {"title":"Make","duration":1}
        ],"assessmentCriteria":[{"category":"Design","weightage":100}]}"#;
        assert!(matches!(scheme_analysis(text), Err(FallbackReason::Parse(_))));
    }

    #[test]
    fn decimal_durations() {
        let text = r#"{"lessons":[{"title":"Intro","duration":"1.5 hours"}],
            "assessmentCriteria":[{"category":"Design","weightage":100}]}"#;
        let result = scheme_analysis(text).unwrap();
        assert_eq!(result.total_duration, "1h 30m");

        let text = r#"{"lessons":[{"title":"Intro","duration":1.5}],
            "assessmentCriteria":[{"category":"Design","weightage":100}]}"#;
        assert!(matches!(scheme_analysis(text), Err(FallbackReason::Parse(_))));

        let text = r#"{"lessons":[{"title":"Intro","duration":"1.5 minutes"}],
            "assessmentCriteria":[{"category":"Design","weightage":100}]}"#;
        assert!(matches!(scheme_analysis(text), Err(FallbackReason::Parse(_))));
    }

    #[test]
    fn journal_envelope_parses() {
        let text = r#"{"content":"Great reflection","suggestions":["a","b","c","d"],"encouragement":"Keep going"}"#;
        let fb = journal_feedback(text).unwrap();
        assert_eq!(fb.suggestions.len(), 3);
        assert_eq!(fb.encouragement, "Keep going");
    }

    #[test]
    fn narrative_strips_fences() {
        assert_eq!(narrative("```\nDear parent\n```").unwrap(), "Dear parent");
        assert_eq!(narrative("   "), Err(FallbackReason::EmptyResponse));
    }
}
