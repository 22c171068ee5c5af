mod test_support;

use std::sync::atomic::Ordering;

use dtassess::agents::{FallbackReason, GenerateError, Generated, GenerationKind, GenerationRequest};
use dtassess::models::{JournalEntry, Mood, GRADE_CRITERIA};
use serde_json::json;
use test_support::{box_design, engine_with, ScriptedProvider};

#[tokio::test]
async fn grade_work_without_key_falls_back_to_templates() {
    let engine = engine_with(None, 7);
    let generation = engine.grade_work(&box_design(), None).await.unwrap();

    assert_eq!(generation.fallback, Some(FallbackReason::NotConfigured));
    let result = generation.value;
    let keys: Vec<&str> = result.grades.keys().map(String::as_str).collect();
    let mut expected = GRADE_CRITERIA.to_vec();
    expected.sort();
    assert_eq!(keys, expected);
    assert!((1.0..=5.0).contains(&result.overall_grade));
    assert!(!result.suggestions.is_empty());
    assert!((80..=99).contains(&result.confidence));
    assert_eq!(
        result.grades.keys().collect::<Vec<_>>(),
        result.feedback.keys().collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn remote_grade_is_used_when_it_parses() {
    let provider = ScriptedProvider::replying(
        "```json\n{\"grades\":{\"creativity\":5,\"technical\":4,\"problemSolving\":4,\"evaluation\":3},\
         \"feedback\":{\"creativity\":\"Bold idea\"},\"suggestions\":[\"Add a hinge\"],\"confidence\":88}\n```",
    );
    let calls = provider.calls.clone();
    let engine = engine_with(Some(provider), 7);

    let generation = engine.grade_work(&box_design(), Some("Grade strictly")).await.unwrap();
    assert!(!generation.is_fallback());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!((generation.value.overall_grade - 4.0).abs() < 1e-9);
    assert_eq!(generation.value.feedback["creativity"], "Bold idea");
    assert_eq!(generation.value.feedback.len(), 4);
}

#[tokio::test]
async fn unparseable_remote_grade_reports_parse_fallback() {
    let engine = engine_with(Some(ScriptedProvider::replying("I think it deserves a 4.")), 3);
    let generation = engine.grade_work(&box_design(), None).await.unwrap();

    assert!(matches!(generation.fallback, Some(FallbackReason::Parse(_))));
    assert_eq!(generation.value.grades.len(), 4);
}

#[tokio::test]
async fn transport_failure_is_absorbed() {
    let provider = ScriptedProvider::failing(FallbackReason::Status(503));
    let engine = engine_with(Some(provider), 3);
    let generation = engine.grade_work(&box_design(), None).await.unwrap();
    assert_eq!(generation.fallback, Some(FallbackReason::Status(503)));
}

#[tokio::test]
async fn missing_fields_are_rejected_before_any_call() {
    let provider = ScriptedProvider::replying("{}");
    let calls = provider.calls.clone();
    let engine = engine_with(Some(provider), 1);

    let mut submission = box_design();
    submission.project_id = String::new();
    let err = engine.grade_work(&submission, None).await.unwrap_err();
    assert!(matches!(err, GenerateError::InvalidInput(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn journal_feedback_deterministic_parts_repeat() {
    let entry: JournalEntry = serde_json::from_value(json!({
        "title": "Gears week",
        "content": "I struggled to get the gear train turning but my cam worked in the end.",
        "mood": "frustrated",
    }))
    .unwrap();
    assert_eq!(entry.mood, Mood::Frustrated);

    let first = engine_with(None, 11).journal_feedback(&entry, None).await.unwrap();
    let second = engine_with(None, 11).journal_feedback(&entry, None).await.unwrap();
    assert_eq!(first.value.content, second.value.content);
    assert_eq!(first.value.suggestions, second.value.suggestions);
    assert!(first.value.suggestions.len() <= 3);
}

#[tokio::test]
async fn generate_contract_dispatches_on_kind() {
    let engine = engine_with(None, 5);
    let request = GenerationRequest::from_payload(
        GenerationKind::SchemeAnalysis,
        json!({ "title": "Moving toys", "subject": "Mechanisms", "yearGroup": "Year 4" }),
    )
    .unwrap();
    let generation = engine.generate(&request, None).await.unwrap();

    match generation.value {
        Generated::SchemeAnalysis(result) => {
            let sum: u32 = result.assessment_criteria.iter().map(|c| c.weightage).sum();
            assert_eq!(sum, 100);
            assert!((4..=10).contains(&result.lessons.len()));
        }
        other => panic!("unexpected result {:?}", other),
    }

    let bad = GenerationRequest::from_payload(GenerationKind::PupilReport, json!({ "pupil": 3 }));
    assert!(matches!(bad, Err(GenerateError::InvalidInput(_))));
}
