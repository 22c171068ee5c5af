use chrono::Utc;

use crate::agents::random::{shuffled, RandomSource};
use crate::models::{AIFeedback, JournalEntry, Mood};

const DEFAULT_TOPIC: &str = "your learning";

/// Keyword to topic; the first keyword found in the entry wins.
const TOPIC_KEYWORDS: &[(&str, &str)] = &[
    ("sketch", "your design sketches"),
    ("prototype", "building your prototype"),
    ("model", "building your model"),
    ("cardboard", "working with cardboard"),
    ("wood", "working with wood"),
    ("saw", "using the saw safely"),
    ("glue", "joining materials"),
    ("circuit", "your electrical circuit"),
    ("battery", "your electrical circuit"),
    ("motor", "making things move"),
    ("lever", "levers and linkages"),
    ("wheel", "wheels and axles"),
    ("sew", "sewing and textiles"),
    ("fabric", "sewing and textiles"),
    ("cook", "cooking and nutrition"),
    ("recipe", "cooking and nutrition"),
    ("food", "cooking and nutrition"),
    ("test", "testing your product"),
    ("evaluat", "evaluating your work"),
    ("design", "your design ideas"),
    ("measure", "measuring accurately"),
];

const STRUGGLE: &[&str] = &["difficult", "hard", "struggl", "stuck", "didn't work", "broke"];
const HELP: &[&str] = &["help", "asked", "partner", "together"];
const FIRST_TIME: &[&str] = &["first time", "never", "new", "tried"];
const SUCCESS: &[&str] = &["worked", "finished", "success", "proud", "managed"];

const GENERIC_SUGGESTIONS: &[&str] = &[
    "Add a labelled sketch to show what you made.",
    "Write down one thing you would change next time and why.",
    "Take a photo of each stage so you can see your progress.",
    "Explain which materials you chose and why they were suitable.",
    "Ask a classmate what they think of your work and note their ideas.",
    "Link what you did today to the design brief.",
];

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// Main topic of an entry, from its content then title.
pub fn extract_topic(title: &str, content: &str) -> &'static str {
    let text = format!("{} {}", content, title).to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, topic)| *topic)
        .unwrap_or(DEFAULT_TOPIC)
}

pub fn keyword_sentence(content: &str) -> &'static str {
    let text = content.to_lowercase();
    if contains_any(&text, STRUGGLE) {
        "Finding something tricky is part of being a designer. Every problem you work through makes you better at solving the next one."
    } else if contains_any(&text, HELP) {
        "Working with others and asking for help are real design skills. Good designers share ideas all the time."
    } else if contains_any(&text, FIRST_TIME) {
        "Trying something for the first time takes courage, and now you have a new skill to build on."
    } else if contains_any(&text, SUCCESS) {
        "Well done for seeing it through to the end. Think about which step made the biggest difference."
    } else {
        "Writing about your work like this helps you remember what you learned."
    }
}

fn mood_opening(mood: Mood, topic: &str) -> String {
    match mood {
        Mood::Excited => format!("It's brilliant to see how excited you are about {}!", topic),
        Mood::Proud => format!("You should be really proud of what you achieved with {}.", topic),
        Mood::Confused => format!(
            "It's completely fine to feel confused about {}. Questions are how we learn.",
            topic
        ),
        Mood::Frustrated => format!(
            "I can see {} was frustrating today, and sticking with it shows real determination.",
            topic
        ),
        Mood::Curious => format!("Your curiosity about {} is exactly what great designers have.", topic),
        Mood::Neutral => format!("Thank you for sharing your thoughts about {}.", topic),
    }
}

fn encouragement(mood: Mood) -> &'static str {
    match mood {
        Mood::Excited => "Keep that energy going into your next lesson!",
        Mood::Proud => "Fantastic work, keep aiming high!",
        Mood::Confused => "Ask your teacher about the part that confused you. You are closer than you think.",
        Mood::Frustrated => "Take a breath. Tomorrow is a fresh start and you've already done the hard part.",
        Mood::Curious => "Keep asking questions and exploring!",
        Mood::Neutral => "Keep up the steady work!",
    }
}

fn push_unique(s: &str, out: &mut Vec<String>) {
    if out.len() < 3 && !out.iter().any(|existing| existing == s) {
        out.push(s.to_string());
    }
}

fn subject_suggestion(subject: &str) -> Option<&'static str> {
    let subject = subject.to_lowercase();
    if subject.contains("food") || subject.contains("cook") {
        Some("Record the ingredients you used and how the taste test went.")
    } else if subject.contains("textile") {
        Some("Practise your stitch on a spare piece of fabric first.")
    } else if subject.contains("electr") {
        Some("Draw your circuit diagram and check each connection.")
    } else if subject.contains("mechanism") {
        Some("Draw arrows to show how each part of your mechanism moves.")
    } else if subject.contains("structure") || subject.contains("wood") {
        Some("Test how strong your structure is and see where it could be reinforced.")
    } else if subject.contains("design") {
        Some("Annotate your sketches to explain your design decisions.")
    } else {
        None
    }
}

fn mood_suggestion(mood: Mood) -> &'static str {
    match mood {
        Mood::Confused | Mood::Frustrated => {
            "Break the task into smaller steps and tick each one off as you go."
        }
        Mood::Excited | Mood::Proud => "Share what you made with the class and explain how you did it.",
        Mood::Curious => "Research how a real product solves the same problem.",
        Mood::Neutral => "Pick one part of today's work you would like to improve.",
    }
}

pub fn feedback(entry: &JournalEntry, rng: &mut dyn RandomSource) -> AIFeedback {
    let topic = extract_topic(&entry.title, &entry.content);
    let content = format!(
        "{} {}",
        mood_opening(entry.mood, topic),
        keyword_sentence(&entry.content)
    );

    let mut suggestions: Vec<String> = Vec::with_capacity(3);

    if let Some(s) = subject_suggestion(&entry.subject) {
        push_unique(s, &mut suggestions);
    }
    push_unique(mood_suggestion(entry.mood), &mut suggestions);
    for generic in shuffled(rng, GENERIC_SUGGESTIONS) {
        push_unique(generic, &mut suggestions);
    }

    AIFeedback {
        content,
        suggestions,
        encouragement: encouragement(entry.mood).to_string(),
        created_at: Utc::now(),
    }
}
