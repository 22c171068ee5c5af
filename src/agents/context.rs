//! JSON summaries of request payloads sent to providers. File contents never
//! leave the server; only names, types and sizes.

use serde_json::{json, Value};

use crate::models::{
    ClassReportRequest, JournalEntry, PupilReportRequest, SchemeDocument, WorkSubmission, GRADE_CRITERIA,
};

const SCHEME_EXCERPT_CHARS: usize = 4000;

pub fn grade(submission: &WorkSubmission) -> Value {
    json!({
        "title": submission.title,
        "description": submission.description,
        "projectId": submission.project_id,
        "fileCount": submission.files.len(),
        "files": submission.files.iter().map(|f| json!({
            "name": f.name,
            "type": f.mime_type,
            "size": f.size,
        })).collect::<Vec<_>>(),
        "criteria": GRADE_CRITERIA,
    })
}

pub fn journal(entry: &JournalEntry) -> Value {
    json!({
        "title": entry.title,
        "content": entry.content,
        "subject": entry.subject,
        "mood": entry.mood,
        "tags": entry.tags,
        "imageCount": entry.images.len(),
    })
}

pub fn pupil_report(request: &PupilReportRequest) -> Value {
    let pupil = &request.pupil;
    json!({
        "pupilName": pupil.name,
        "className": pupil.class_name,
        "yearGroup": pupil.year_group,
        "attendance": pupil.attendance,
        "behaviour": pupil.behaviour,
        "averageGrade": pupil.average_grade(),
        "gradeCount": pupil.grades.len(),
        "recentGrades": pupil.recent_grades(3),
        "reportType": request.report_type,
        "period": request.period,
    })
}

pub fn class_report(request: &ClassReportRequest) -> Value {
    json!({
        "className": request.class_name,
        "yearGroup": request.year_group,
        "pupilCount": request.pupils.len(),
        "pupils": request.pupils.iter().map(|p| json!({
            "name": p.name,
            "averageGrade": p.average_grade(),
            "gradeCount": p.grades.len(),
            "attendance": p.attendance,
        })).collect::<Vec<_>>(),
        "period": request.period,
    })
}

pub fn scheme(doc: &SchemeDocument) -> Value {
    let excerpt: String = doc.text.chars().take(SCHEME_EXCERPT_CHARS).collect();
    json!({
        "title": doc.title,
        "subject": doc.subject,
        "yearGroup": doc.year_group,
        "fileName": doc.file_name,
        "excerpt": excerpt,
        "truncated": doc.text.chars().count() > SCHEME_EXCERPT_CHARS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttachedFile;

    #[test]
    fn grade_context_lists_file_metadata_only() {
        let submission = WorkSubmission {
            title: "Box design".into(),
            description: "A box".into(),
            files: vec![AttachedFile {
                name: "box.jpg".into(),
                mime_type: Some("image/jpeg".into()),
                size: 2048,
                stored_as: Some("abc_box.jpg".into()),
            }],
            project_id: "2".into(),
        };
        let ctx = grade(&submission);
        assert_eq!(ctx["fileCount"], 1);
        assert_eq!(ctx["files"][0]["type"], "image/jpeg");
        assert!(ctx["files"][0].get("stored_as").is_none());
        assert_eq!(ctx["criteria"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn scheme_excerpt_is_bounded() {
        let doc = SchemeDocument {
            title: "Bridges".into(),
            subject: "Structures".into(),
            year_group: "Year 6".into(),
            file_name: Some("bridges.pdf".into()),
            text: "x".repeat(SCHEME_EXCERPT_CHARS + 10),
        };
        let ctx = scheme(&doc);
        assert_eq!(ctx["excerpt"].as_str().unwrap().len(), SCHEME_EXCERPT_CHARS);
        assert_eq!(ctx["truncated"], true);
    }
}
