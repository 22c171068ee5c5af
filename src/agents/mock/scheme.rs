use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;

use crate::agents::random::{pick, shuffled, RandomSource};
use crate::models::{AssessmentCriteria, Lesson, SchemeAnalysisResult, SchemeDocument};

pub const MIN_WEIGHTAGE: u32 = 5;

struct SubjectFamily {
    keywords: &'static [&'static str],
    topics: &'static [&'static str],
    resources: &'static [&'static str],
    criteria: (&'static str, &'static [&'static str]),
}

const FAMILIES: &[SubjectFamily] = &[
    SubjectFamily {
        keywords: &["mechanism", "lever", "linkage", "cam", "gear", "pulley", "wheel", "axle"],
        topics: &["levers and linkages", "cams and followers", "wheels and axles", "pulleys and gears"],
        resources: &["Card strips and split pins", "Cam and follower kits", "Dowel and wheels", "Glue guns", "Junior hacksaws"],
        criteria: ("Mechanical Understanding", &["Explains how the mechanism creates movement", "Selects suitable mechanical components", "Tests and adjusts moving parts"]),
    },
    SubjectFamily {
        keywords: &["structure", "bridge", "shelter", "frame", "wood", "tower"],
        topics: &["frame structures", "shell structures", "strengthening joints", "stable bases"],
        resources: &["Square-section timber", "Card triangles", "Bench hooks", "Masking tape", "Weights for testing"],
        criteria: ("Structural Knowledge", &["Identifies ways to strengthen and stiffen structures", "Uses triangulation appropriately", "Tests structures under load"]),
    },
    SubjectFamily {
        keywords: &["textile", "fabric", "sew", "stitch", "puppet", "bag"],
        topics: &["joining fabrics", "running stitch", "pattern templates", "decorating textiles"],
        resources: &["Felt and cotton fabric", "Needles and embroidery thread", "Fabric scissors", "Paper pattern templates", "Buttons and sequins"],
        criteria: ("Textiles Techniques", &["Uses a template to mark and cut fabric", "Joins fabric with neat, secure stitches", "Adds decoration appropriate to the user"]),
    },
    SubjectFamily {
        keywords: &["food", "cook", "nutrition", "recipe", "bread", "healthy", "snack"],
        topics: &["healthy eating", "food hygiene", "seasonal ingredients", "preparing a savoury dish"],
        resources: &["Chopping boards and knives", "Weighing scales", "Seasonal vegetables", "Aprons", "Eatwell guide posters"],
        criteria: ("Food Hygiene & Nutrition", &["Prepares food safely and hygienically", "Applies principles of a healthy diet", "Measures ingredients accurately"]),
    },
    SubjectFamily {
        keywords: &["electr", "circuit", "torch", "light", "switch", "buzzer"],
        topics: &["simple circuits", "switches", "series and parallel circuits", "programming control"],
        resources: &["Batteries and holders", "Bulbs and LEDs", "Crocodile clip wires", "Buzzers and switches", "Micro:bit kits"],
        criteria: ("Electrical Systems", &["Builds a working circuit from a diagram", "Incorporates switches to control the product", "Troubleshoots faulty connections"]),
    },
];

struct Phase {
    pattern: &'static str,
    assessment: &'static str,
    objectives: [&'static str; 2],
    outcomes: [&'static str; 2],
}

/// Title pattern families, in teaching order.
const PHASES: &[Phase] = &[
    Phase {
        pattern: "Introduction to {}",
        assessment: "Class discussion and targeted questioning",
        objectives: ["Understand what {} are used for", "Explore everyday products that use {}"],
        outcomes: ["I can describe {} in familiar products", "I can use key vocabulary about {}"],
    },
    Phase {
        pattern: "Investigating {}",
        assessment: "Product analysis worksheet",
        objectives: ["Disassemble and analyse existing products using {}", "Record findings about {} in a table"],
        outcomes: ["I can explain how {} work", "I can compare different examples of {}"],
    },
    Phase {
        pattern: "Designing with {}",
        assessment: "Annotated design sketches",
        objectives: ["Generate design ideas that use {}", "Write design criteria for a product using {}"],
        outcomes: ["I can sketch and label ideas using {}", "I can choose my best idea and explain why"],
    },
    Phase {
        pattern: "Making with {}",
        assessment: "Teacher observation of practical skills",
        objectives: ["Select tools and materials for working with {}", "Make a product that uses {} accurately"],
        outcomes: ["I can use tools safely when working with {}", "I can follow my plan to make my product"],
    },
    Phase {
        pattern: "Evaluating {}",
        assessment: "Self and peer evaluation against the design criteria",
        objectives: ["Test the finished product that uses {}", "Suggest improvements to the use of {}"],
        outcomes: ["I can say what worked well and what I would change", "I can evaluate my product against my criteria"],
    },
];

const CATALOGUE: &[(&str, &[&str], u32)] = &[
    ("Design & Planning", &["Generates a range of design ideas", "Communicates ideas through annotated sketches", "Develops clear design criteria"], 25),
    ("Making & Practical Skills", &["Measures, marks out and cuts accurately", "Uses tools safely and appropriately", "Achieves a quality finish"], 30),
    ("Technical Knowledge", &["Uses correct technical vocabulary", "Understands properties of materials"], 20),
    ("Evaluation", &["Tests the product against the design criteria", "Suggests realistic improvements"], 15),
    ("Communication & Teamwork", &["Explains choices to others", "Works collaboratively and safely"], 10),
];

const SUBSTITUTED_CATEGORY: &str = "Technical Knowledge";
const DURATIONS: &[&str] = &["45 minutes", "60 minutes", "90 minutes"];

fn family_for(doc: &SchemeDocument) -> Option<&'static SubjectFamily> {
    let text = format!("{} {}", doc.title, doc.subject).to_lowercase();
    FAMILIES
        .iter()
        .find(|family| family.keywords.iter().any(|k| text.contains(k)))
}

fn fill(template: &str, topic: &str) -> String {
    template.replace("{}", topic)
}

/// Minutes in a lesson duration such as "60 minutes", "45 mins", "1h 30m",
/// "2 hours" or "1.5 hours". Fractional minutes and totals that do not fit
/// in a `u32` are rejected.
pub fn parse_duration_minutes(duration: &str) -> Option<u32> {
    static HOURS: OnceLock<Regex> = OnceLock::new();
    static MINUTES: OnceLock<Regex> = OnceLock::new();
    let hours_re = HOURS.get_or_init(|| {
        Regex::new(r"(?:^|[^\d.])(\d+(?:\.\d+)?)\s*(?:h\b|hrs?\b|hours?\b)").expect("valid hours regex")
    });
    let minutes_re = MINUTES.get_or_init(|| {
        Regex::new(r"(?:^|[^\d.])(\d+(?:\.\d+)?)\s*(?:m\b|mins?\b|minutes?\b)").expect("valid minutes regex")
    });

    let text = duration.trim().to_lowercase();
    let hours = hours_re.captures(&text).map(|c| c[1].to_string());
    let minutes = minutes_re.captures(&text).map(|c| c[1].to_string());

    let total = match (hours, minutes) {
        (None, None) => text.parse::<u32>().ok()?,
        (h, m) => {
            let from_hours = match h {
                Some(h) => hours_to_minutes(&h)?,
                None => 0,
            };
            let from_minutes = match m {
                Some(m) => m.parse::<u32>().ok()?,
                None => 0,
            };
            from_hours.checked_add(from_minutes)?
        }
    };
    (total > 0).then_some(total)
}

/// Whole minutes in a possibly fractional hour count; "1.5" is 90, "0.01" is rejected.
fn hours_to_minutes(hours: &str) -> Option<u32> {
    if !hours.contains('.') {
        return hours.parse::<u32>().ok()?.checked_mul(60);
    }
    let minutes = hours.parse::<f64>().ok()? * 60.0;
    let whole = minutes.round();
    if !minutes.is_finite() || (minutes - whole).abs() > 1e-6 || whole > f64::from(u32::MAX) {
        return None;
    }
    Some(whole as u32)
}

pub fn format_total_duration(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Scales weights to sum to exactly 100 by largest remainder, then lifts any
/// category below the minimum by taking points from the largest ones.
/// The minimum is only enforced when there are at most 20 categories.
pub fn normalize_weightage(raw: &[u32]) -> Vec<u32> {
    let n = raw.len();
    if n == 0 {
        return Vec::new();
    }
    let total: u64 = raw.iter().map(|w| u64::from(*w)).sum();
    let exact: Vec<f64> = if total == 0 {
        vec![100.0 / n as f64; n]
    } else {
        raw.iter()
            .map(|w| f64::from(*w) * 100.0 / total as f64)
            .collect()
    };

    let mut out: Vec<u32> = exact.iter().map(|e| e.floor() as u32).collect();
    let assigned: u32 = out.iter().sum();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    for &i in order.iter().cycle().take(100u32.saturating_sub(assigned) as usize) {
        out[i] += 1;
    }

    if n as u32 * MIN_WEIGHTAGE <= 100 {
        while let Some(low) = out.iter().position(|w| *w < MIN_WEIGHTAGE) {
            let high = (0..n)
                .max_by(|&a, &b| out[a].cmp(&out[b]).then(b.cmp(&a)))
                .unwrap_or(low);
            if high == low {
                break;
            }
            out[high] -= 1;
            out[low] += 1;
        }
    }
    out
}

fn lesson(index: usize, count: usize, topics: &[&str], resources: &[&str], rng: &mut dyn RandomSource) -> Lesson {
    let phase = &PHASES[index * PHASES.len() / count];
    let topic = topics[index % topics.len()];
    let resource_count = rng.between(2, 3) as usize;

    Lesson {
        title: capitalise_first(&fill(phase.pattern, topic)),
        duration: pick(rng, DURATIONS).to_string(),
        objectives: phase.objectives.iter().map(|o| fill(o, topic)).collect(),
        resources: shuffled(rng, resources)
            .into_iter()
            .take(resource_count)
            .map(str::to_string)
            .collect(),
        assessment: phase.assessment.to_string(),
        week: index as u32 + 1,
        learning_outcomes: phase.outcomes.iter().map(|o| fill(o, topic)).collect(),
    }
}

fn capitalise_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn criteria(family: Option<&'static SubjectFamily>, rng: &mut dyn RandomSource) -> Vec<AssessmentCriteria> {
    let mut categories: Vec<(String, Vec<String>, u32)> = CATALOGUE
        .iter()
        .map(|(category, items, weight)| {
            let (category, items) = match family {
                Some(f) if *category == SUBSTITUTED_CATEGORY => (f.criteria.0, f.criteria.1),
                _ => (*category, *items),
            };
            (
                category.to_string(),
                items.iter().map(|s| s.to_string()).collect(),
                *weight,
            )
        })
        .collect();

    for entry in categories.iter_mut() {
        entry.2 += rng.between(0, 5);
    }
    let raw: Vec<u32> = categories.iter().map(|c| c.2).collect();
    categories
        .into_iter()
        .zip(normalize_weightage(&raw))
        .map(|((category, criteria, _), weightage)| AssessmentCriteria {
            category,
            criteria,
            weightage,
        })
        .collect()
}

pub fn analyze(doc: &SchemeDocument, rng: &mut dyn RandomSource) -> SchemeAnalysisResult {
    let matched = family_for(doc);
    let family = match matched {
        Some(f) => f,
        None => pick(rng, FAMILIES),
    };

    let count = rng.between(4, 10) as usize;
    let lessons: Vec<Lesson> = (0..count)
        .map(|i| lesson(i, count, family.topics, family.resources, rng))
        .collect();

    let total_minutes: u32 = lessons
        .iter()
        .filter_map(|l| parse_duration_minutes(&l.duration))
        .sum();

    SchemeAnalysisResult {
        assessment_criteria: criteria(matched, rng),
        total_duration: format_total_duration(total_minutes),
        lessons,
        confidence: rng.between(85, 95) as u8,
        generated_at: Utc::now(),
        analysis_type: "scheme-analysis".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::random::RngSource;

    fn doc(title: &str, subject: &str) -> SchemeDocument {
        SchemeDocument {
            title: title.into(),
            subject: subject.into(),
            year_group: "Year 4".into(),
            file_name: None,
            text: String::new(),
        }
    }

    #[test]
    fn durations_parse() {
        assert_eq!(parse_duration_minutes("60 minutes"), Some(60));
        assert_eq!(parse_duration_minutes("45 mins"), Some(45));
        assert_eq!(parse_duration_minutes("1h 30m"), Some(90));
        assert_eq!(parse_duration_minutes("2 hours"), Some(120));
        assert_eq!(parse_duration_minutes("1 hour 15 minutes"), Some(75));
        assert_eq!(parse_duration_minutes("50"), Some(50));
        assert_eq!(parse_duration_minutes("0 minutes"), None);
        assert_eq!(parse_duration_minutes("a while"), None);
    }

    #[test]
    fn fractional_durations() {
        assert_eq!(parse_duration_minutes("1.5 hours"), Some(90));
        assert_eq!(parse_duration_minutes("0.75h"), Some(45));
        assert_eq!(parse_duration_minutes("1.5 minutes"), None);
        assert_eq!(parse_duration_minutes("1.5"), None);
        assert_eq!(parse_duration_minutes("0.01 hours"), None);
    }

    #[test]
    fn oversized_durations_are_rejected() {
        assert_eq!(parse_duration_minutes("71582789 hours"), None);
        assert_eq!(parse_duration_minutes("71582788 hours 4294967295 minutes"), None);
        assert_eq!(parse_duration_minutes("99999999999 minutes"), None);
    }

    #[test]
    fn total_duration_formatting() {
        assert_eq!(format_total_duration(0), "0h 0m");
        assert_eq!(format_total_duration(405), "6h 45m");
    }

    #[test]
    fn normalize_keeps_exact_hundred() {
        assert_eq!(normalize_weightage(&[25, 30, 20, 15, 10]), vec![25, 30, 20, 15, 10]);
        assert_eq!(normalize_weightage(&[1, 1, 1]), vec![34, 33, 33]);
        assert_eq!(normalize_weightage(&[0, 0]), vec![50, 50]);
        assert!(normalize_weightage(&[]).is_empty());
    }

    #[test]
    fn normalize_enforces_minimum() {
        let out = normalize_weightage(&[1000, 1, 1, 1]);
        assert_eq!(out.iter().sum::<u32>(), 100);
        assert!(out.iter().all(|w| *w >= MIN_WEIGHTAGE));
        assert_eq!(out, vec![85, 5, 5, 5]);

        let many: Vec<u32> = (0..20).map(|i| if i == 0 { 500 } else { 1 }).collect();
        let out = normalize_weightage(&many);
        assert_eq!(out.iter().sum::<u32>(), 100);
        assert!(out.iter().all(|w| *w == 5));
    }

    #[test]
    fn mock_scheme_satisfies_invariants() {
        for seed in 0..100 {
            let result = analyze(&doc("Moving Monsters", "Mechanisms"), &mut RngSource::seeded(seed));
            assert!((4..=10).contains(&result.lessons.len()));
            let weights: Vec<u32> = result.assessment_criteria.iter().map(|c| c.weightage).collect();
            assert_eq!(weights.iter().sum::<u32>(), 100);
            assert!(weights.iter().all(|w| *w >= MIN_WEIGHTAGE));

            let minutes: Vec<u32> = result
                .lessons
                .iter()
                .map(|l| parse_duration_minutes(&l.duration).unwrap())
                .collect();
            assert_eq!(result.total_duration, format_total_duration(minutes.iter().sum()));
            for (i, lesson) in result.lessons.iter().enumerate() {
                assert_eq!(lesson.week, i as u32 + 1);
            }
        }
    }

    #[test]
    fn subject_keyword_swaps_in_variant_category() {
        let result = analyze(&doc("Healthy Wraps", "Food Technology"), &mut RngSource::seeded(5));
        let categories: Vec<&str> = result
            .assessment_criteria
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert!(categories.contains(&"Food Hygiene & Nutrition"));
        assert!(!categories.contains(&SUBSTITUTED_CATEGORY));
        assert!(result.lessons[0].title.starts_with("Introduction to"));
    }

    #[test]
    fn unmatched_subject_keeps_catalogue() {
        let result = analyze(&doc("Spring term plan", "D&T"), &mut RngSource::seeded(8));
        assert!(result
            .assessment_criteria
            .iter()
            .any(|c| c.category == SUBSTITUTED_CATEGORY));
        assert_eq!(result.assessment_criteria.len(), CATALOGUE.len());
    }
}
