use dtassess::agents::mock::scheme::{
    self, format_total_duration, normalize_weightage, parse_duration_minutes, MIN_WEIGHTAGE,
};
use dtassess::agents::RngSource;
use dtassess::models::SchemeDocument;

fn doc(title: &str, subject: &str) -> SchemeDocument {
    SchemeDocument {
        title: title.to_string(),
        subject: subject.to_string(),
        year_group: "Year 5".to_string(),
        file_name: None,
        text: String::new(),
    }
}

#[test]
fn generated_schemes_always_total_one_hundred() {
    let docs = [
        doc("Moving monsters", "Mechanisms"),
        doc("Bridges", "Structures"),
        doc("Healthy snacks", "Food"),
        doc("Mystery unit", ""),
    ];
    for seed in 0..50 {
        for d in &docs {
            let result = scheme::analyze(d, &mut RngSource::seeded(seed));
            let weights: Vec<u32> = result.assessment_criteria.iter().map(|c| c.weightage).collect();
            assert_eq!(weights.iter().sum::<u32>(), 100, "seed {} {:?}", seed, weights);
            assert!(weights.iter().all(|w| *w >= MIN_WEIGHTAGE));

            let minutes: u32 = result
                .lessons
                .iter()
                .map(|l| parse_duration_minutes(&l.duration).expect("lesson duration parses"))
                .sum();
            assert!(result.lessons.iter().all(|l| parse_duration_minutes(&l.duration) > Some(0)));
            assert_eq!(result.total_duration, format_total_duration(minutes));
        }
    }
}

#[test]
fn normalization_handles_any_category_count() {
    for n in 1..=20usize {
        let raw: Vec<u32> = (0..n as u32).map(|i| i * 7 + 1).collect();
        let weights = normalize_weightage(&raw);
        assert_eq!(weights.len(), n);
        assert_eq!(weights.iter().sum::<u32>(), 100);
        assert!(weights.iter().all(|w| *w >= MIN_WEIGHTAGE), "{:?}", weights);
    }
    assert_eq!(normalize_weightage(&[0, 0]), vec![50, 50]);
}
