use chrono::Utc;
use serde::Serialize;
use tera::Context;
use tracing::warn;

use crate::models::{ClassReportRequest, PupilReport, PupilReportRequest, PupilSummary, ReportType};
use crate::templates::get_tera;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Excellent,
    Good,
    Developing,
}

impl Band {
    pub fn classify(average: f64) -> Self {
        if average >= 4.0 {
            Band::Excellent
        } else if average >= 3.0 {
            Band::Good
        } else {
            Band::Developing
        }
    }

    fn phrase(&self) -> &'static str {
        match self {
            Band::Excellent => "excellent progress and a high level of skill",
            Band::Good => "good progress and growing confidence",
            Band::Developing => "developing skills and steady effort",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Band::Excellent => "excellent",
            Band::Good => "good",
            Band::Developing => "developing",
        }
    }

    fn strengths(&self) -> &'static [&'static str] {
        match self {
            Band::Excellent => &[
                "Generates creative, original design ideas",
                "Uses tools and materials accurately and safely",
                "Evaluates products thoughtfully against the brief",
            ],
            Band::Good => &[
                "Follows the design process with growing independence",
                "Makes sensible choices of materials",
                "Works well with others during practical tasks",
            ],
            Band::Developing => &[
                "Shows enthusiasm during practical lessons",
                "Is willing to try new techniques with support",
            ],
        }
    }

    fn improvements(&self) -> &'static [&'static str] {
        match self {
            Band::Excellent => &["Explain design decisions in more technical depth"],
            Band::Good => &[
                "Annotate sketches in more detail",
                "Check measurements carefully before cutting",
            ],
            Band::Developing => &[
                "Plan each step of making before starting",
                "Use equipment more independently",
                "Say what worked and what did not when evaluating",
            ],
        }
    }

    fn next_steps(&self) -> &'static [&'static str] {
        match self {
            Band::Excellent => &[
                "Take on an extension challenge with a more complex mechanism",
                "Research how professional designers approach a similar brief",
            ],
            Band::Good => &[
                "Try a wider range of joining techniques",
                "Test prototypes with a user and record their feedback",
            ],
            Band::Developing => &[
                "Practise measuring and marking out with a ruler at home",
                "Talk through each project's design brief before starting",
            ],
        }
    }

    fn goals(&self) -> &'static [&'static str] {
        match self {
            Band::Excellent => &[
                "Lead a small group design challenge",
                "Produce a fully annotated design portfolio",
            ],
            Band::Good => &[
                "Raise the average grade to 4 by refining the finish of products",
                "Include at least two alternative ideas for every project",
            ],
            Band::Developing => &[
                "Complete every stage of the design process in the next project",
                "Use a checklist to evaluate the finished product",
            ],
        }
    }
}

#[derive(Serialize)]
struct RecentGrade {
    title: String,
    grade: String,
    date: String,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn render(name: &str, ctx: &Context) -> String {
    get_tera().render(name, ctx).unwrap_or_else(|e| {
        warn!("Report template {} failed to render: {}", name, e);
        format!("Report unavailable ({})", name)
    })
}

fn trend_sentence(pupil: &PupilSummary) -> &'static str {
    let recent = pupil.recent_grades(3);
    if recent.is_empty() || pupil.grades.len() <= recent.len() {
        return "";
    }
    let recent_avg = recent.iter().map(|g| g.grade).sum::<f64>() / recent.len() as f64;
    let overall = pupil.average_grade();
    if recent_avg > overall + 0.25 {
        "Recent work shows a clear upward trend."
    } else if recent_avg < overall - 0.25 {
        "Recent grades have dipped slightly and will be monitored."
    } else {
        "Performance has been consistent."
    }
}

pub fn pupil_report(request: &PupilReportRequest) -> PupilReport {
    let pupil = &request.pupil;
    let average = pupil.average_grade();
    let band = Band::classify(average);

    let recent: Vec<RecentGrade> = pupil
        .recent_grades(3)
        .into_iter()
        .map(|g| RecentGrade {
            title: g.title.clone(),
            grade: format!("{:.1}", g.grade),
            date: g.date.format("%d %b %Y").to_string(),
        })
        .collect();

    let strengths = to_strings(band.strengths());
    let improvements = to_strings(band.improvements());
    let next_steps = to_strings(band.next_steps());
    let goals = to_strings(band.goals());

    let mut ctx = Context::new();
    ctx.insert("name", &pupil.name);
    ctx.insert("class_name", &pupil.class_name);
    ctx.insert("period", request.period.label());
    ctx.insert("average", &format!("{:.1}", average));
    ctx.insert("attendance", &format!("{:.0}", pupil.attendance));
    ctx.insert(
        "behaviour",
        &if pupil.behaviour.trim().is_empty() {
            "good".to_string()
        } else {
            pupil.behaviour.to_lowercase()
        },
    );
    ctx.insert("band_phrase", band.phrase());
    ctx.insert("band_label", band.label());
    ctx.insert("count", &pupil.grades.len());
    ctx.insert("trend", trend_sentence(pupil));
    ctx.insert("recent", &recent);
    ctx.insert("strengths", &strengths);
    ctx.insert("improvements", &improvements);
    ctx.insert("next_steps", &next_steps);
    ctx.insert("goals", &goals);

    let template = match request.report_type {
        ReportType::Progress => "report/progress",
        ReportType::Parents => "report/parents",
        ReportType::Individual | ReportType::Class => "report/individual",
    };

    PupilReport {
        title: format!("{} report for {}", capitalised(request.report_type.as_str()), pupil.name),
        content: render(template, &ctx),
        target: pupil.id.clone(),
        report_type: request.report_type,
        period: request.period,
        strengths,
        improvements,
        next_steps,
        goals,
        generated_at: Utc::now(),
    }
}

#[derive(Serialize)]
struct PupilAverage {
    name: String,
    average: String,
}

fn averages(rows: &[(&PupilSummary, f64)]) -> Vec<PupilAverage> {
    rows.iter()
        .map(|(p, avg)| PupilAverage {
            name: p.name.clone(),
            average: format!("{:.1}", avg),
        })
        .collect()
}

pub fn class_report(request: &ClassReportRequest) -> PupilReport {
    let graded: Vec<(&PupilSummary, f64)> = request
        .pupils
        .iter()
        .filter(|p| !p.grades.is_empty())
        .map(|p| (p, p.average_grade()))
        .collect();

    let average = if graded.is_empty() {
        0.0
    } else {
        graded.iter().map(|(_, avg)| avg).sum::<f64>() / graded.len() as f64
    };
    let attendance = if request.pupils.is_empty() {
        0.0
    } else {
        request.pupils.iter().map(|p| p.attendance).sum::<f64>() / request.pupils.len() as f64
    };
    let band = Band::classify(average);
    let count_in = |b: Band| graded.iter().filter(|(_, avg)| Band::classify(*avg) == b).count();

    let mut ranked = graded.clone();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let top: Vec<(&PupilSummary, f64)> = ranked
        .iter()
        .filter(|(_, avg)| *avg >= 4.0)
        .take(3)
        .cloned()
        .collect();
    let support: Vec<(&PupilSummary, f64)> = ranked
        .iter()
        .rev()
        .filter(|(_, avg)| *avg < 3.0)
        .take(3)
        .cloned()
        .collect();

    let next_steps = to_strings(band.next_steps());

    let mut ctx = Context::new();
    ctx.insert("class_name", &request.class_name);
    ctx.insert("year_group", &request.year_group);
    ctx.insert("period", request.period.label());
    ctx.insert("count", &request.pupils.len());
    ctx.insert("average", &format!("{:.1}", average));
    ctx.insert("attendance", &format!("{:.0}", attendance));
    ctx.insert("band_label", band.label());
    ctx.insert("excellent", &count_in(Band::Excellent));
    ctx.insert("good", &count_in(Band::Good));
    ctx.insert("developing", &count_in(Band::Developing));
    ctx.insert("top", &averages(&top));
    ctx.insert("support", &averages(&support));
    ctx.insert("next_steps", &next_steps);

    PupilReport {
        title: format!("Class report for {}", request.class_name),
        content: render("report/class", &ctx),
        target: request.class_name.clone(),
        report_type: ReportType::Class,
        period: request.period,
        strengths: to_strings(band.strengths()),
        improvements: to_strings(band.improvements()),
        next_steps,
        goals: to_strings(band.goals()),
        generated_at: Utc::now(),
    }
}

fn capitalised(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
