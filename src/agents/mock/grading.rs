use chrono::Utc;
use std::collections::BTreeMap;

use crate::agents::random::RandomSource;
use crate::models::{GradeResult, WorkSubmission, GRADE_CRITERIA};

/// Feedback phrase per criterion, indexed by `score - 1`.
fn band_phrase(criterion: &str, score: u8) -> &'static str {
    let table: [&'static str; 5] = match criterion {
        "creativity" => [
            "The idea follows the example closely; try adding a feature of your own.",
            "There are signs of your own ideas starting to come through.",
            "A sensible design with a few original touches.",
            "Imaginative ideas that make the product stand out.",
            "Highly original thinking that takes the brief somewhere new.",
        ],
        "technical" => [
            "Tools and materials need more care to produce an accurate finish.",
            "Making is developing, though joins and measurements are uneven.",
            "Secure making skills with a mostly neat finish.",
            "Accurate, careful making with well chosen materials.",
            "Excellent craftsmanship with precise measuring, cutting and joining.",
        ],
        "problemSolving" => [
            "Problems were not yet identified or tackled during making.",
            "Some problems were spotted but the fixes were not explained.",
            "Problems were solved sensibly as they came up.",
            "Thoughtful changes show good problem solving through the project.",
            "Problems were anticipated and solved with clever, tested fixes.",
        ],
        _ => [
            "The evaluation does not yet say what worked or what to change.",
            "Some comments about the product, but without reasons.",
            "A clear evaluation that names what worked and what did not.",
            "Insightful evaluation linked back to the design criteria.",
            "Outstanding evaluation with tested evidence and clear next steps.",
        ],
    };
    table[usize::from(score.clamp(1, 5) - 1)]
}

fn improvement(criterion: &str) -> &'static str {
    match criterion {
        "creativity" => "Sketch at least three different ideas before choosing one to make.",
        "technical" => "Practise measuring and marking out twice before cutting.",
        "problemSolving" => "Keep a list of problems you meet and how you fixed each one.",
        _ => "Test your product against the design brief and write down what you find.",
    }
}

fn stretch(criterion: &str) -> &'static str {
    match criterion {
        "creativity" => "Look at how a real designer solved a similar brief and borrow one idea.",
        "technical" => "Try a more challenging joining technique on your next project.",
        "problemSolving" => "Explain why your chosen fix was better than the alternatives.",
        _ => "Ask a user to test your product and include their comments.",
    }
}

const MIN_SUGGESTIONS: usize = 2;
const MAX_SUGGESTIONS: usize = 3;

pub fn grade(_submission: &WorkSubmission, rng: &mut dyn RandomSource) -> GradeResult {
    let mut grades = BTreeMap::new();
    let mut feedback = BTreeMap::new();
    let mut scores = Vec::with_capacity(GRADE_CRITERIA.len());

    for criterion in GRADE_CRITERIA {
        let score = rng.between(1, 5) as u8;
        grades.insert(criterion.to_string(), score);
        feedback.insert(criterion.to_string(), band_phrase(criterion, score).to_string());
        scores.push((criterion, score));
    }

    // Improvements for scores below 3, topped up with stretch targets to at least two.
    let mut suggestions: Vec<String> = scores
        .iter()
        .filter(|(_, score)| *score < 3)
        .map(|(criterion, _)| improvement(criterion).to_string())
        .collect();
    let stretches = scores
        .iter()
        .filter(|(_, score)| *score >= 3)
        .map(|(criterion, _)| stretch(criterion).to_string());
    let missing = MIN_SUGGESTIONS.saturating_sub(suggestions.len());
    suggestions.extend(stretches.take(missing));
    suggestions.truncate(MAX_SUGGESTIONS);

    GradeResult {
        overall_grade: GradeResult::mean_of(&grades),
        grades,
        feedback,
        suggestions,
        confidence: rng.between(80, 99) as u8,
        generated_at: Utc::now(),
        analysis_type: "grade-work".to_string(),
    }
}

/// Fills missing feedback from the phrase table so score and feedback keys match.
pub fn complete_feedback(result: &mut GradeResult) {
    result.feedback.retain(|k, _| result.grades.contains_key(k));
    for (criterion, score) in &result.grades {
        result
            .feedback
            .entry(criterion.clone())
            .or_insert_with(|| band_phrase(criterion, *score).to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::random::RngSource;

    fn submission() -> WorkSubmission {
        WorkSubmission {
            title: "Box design".into(),
            description: String::new(),
            files: Vec::new(),
            project_id: "2".into(),
        }
    }

    #[test]
    fn mock_grade_keeps_keys_and_mean_consistent() {
        for seed in 0..50 {
            let result = grade(&submission(), &mut RngSource::seeded(seed));
            let grade_keys: Vec<_> = result.grades.keys().collect();
            let feedback_keys: Vec<_> = result.feedback.keys().collect();
            assert_eq!(grade_keys, feedback_keys);
            assert_eq!(result.grades.len(), 4);
            let mean = result.grades.values().map(|v| f64::from(*v)).sum::<f64>() / 4.0;
            assert!((result.overall_grade - mean).abs() < 1e-9);
            assert!((80..=99).contains(&result.confidence));
            assert!((2..=3).contains(&result.suggestions.len()));
            assert!(result.grades.values().all(|g| (1..=5).contains(g)));
        }
    }

    #[test]
    fn low_scores_come_first_in_suggestions() {
        struct Fixed(Vec<usize>);
        impl RandomSource for Fixed {
            fn below(&mut self, _n: usize) -> usize {
                self.0.remove(0)
            }
        }
        // creativity 1, technical 5, problemSolving 2, evaluation 4, confidence 80
        let mut rng = Fixed(vec![0, 4, 1, 3, 0]);
        let result = grade(&submission(), &mut rng);
        assert_eq!(result.grades["creativity"], 1);
        assert_eq!(result.grades["problemSolving"], 2);
        assert_eq!(result.suggestions[0], improvement("creativity"));
        assert_eq!(result.suggestions[1], improvement("problemSolving"));
        assert_eq!(result.suggestions.len(), 2);
        assert_eq!(result.confidence, 80);
        assert!((result.overall_grade - 3.0).abs() < 1e-9);
    }

    #[test]
    fn suggestion_count_follows_the_threshold() {
        struct Fixed(Vec<usize>);
        impl RandomSource for Fixed {
            fn below(&mut self, _n: usize) -> usize {
                self.0.remove(0)
            }
        }
        // All at 4 or above: two stretch targets.
        let result = grade(&submission(), &mut Fixed(vec![3, 4, 3, 4, 0]));
        assert_eq!(
            result.suggestions,
            vec![stretch("creativity").to_string(), stretch("technical").to_string()]
        );

        // One low score: its improvement, then one stretch.
        let result = grade(&submission(), &mut Fixed(vec![3, 0, 3, 3, 0]));
        assert_eq!(result.suggestions[0], improvement("technical"));
        assert_eq!(result.suggestions[1], stretch("creativity"));
        assert_eq!(result.suggestions.len(), 2);

        // Three low scores: three improvements, no stretch.
        let result = grade(&submission(), &mut Fixed(vec![0, 1, 0, 4, 0]));
        assert_eq!(result.suggestions.len(), 3);
        assert!(!result.suggestions.contains(&stretch("evaluation").to_string()));
    }

    #[test]
    fn complete_feedback_aligns_keys() {
        let mut result = grade(&submission(), &mut RngSource::seeded(1));
        result.feedback.remove("technical");
        result.feedback.insert("extra".into(), "stray".into());
        complete_feedback(&mut result);
        assert_eq!(
            result.grades.keys().collect::<Vec<_>>(),
            result.feedback.keys().collect::<Vec<_>>()
        );
    }
}
