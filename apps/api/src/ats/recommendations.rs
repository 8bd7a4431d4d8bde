//! Recommendation rules, evaluated in table order.
//!
//! The first four rules target the lowest-scoring component (ties broken in
//! the order skills, keywords, title, experience). The rest are threshold
//! rules. Duplicate messages are dropped.

use serde::Serialize;
use tracing::debug;

/// The four weighted components of the ATS score, each in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Components {
    pub skills: f32,
    pub keywords: f32,
    pub title: f32,
    pub experience: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Skills,
    Keywords,
    Title,
    Experience,
}

impl Components {
    /// The weakest component, or `None` when every component is perfect.
    pub fn lowest(&self) -> Option<Component> {
        let ranked = [
            (Component::Skills, self.skills),
            (Component::Keywords, self.keywords),
            (Component::Title, self.title),
            (Component::Experience, self.experience),
        ];
        let (component, value) = ranked
            .into_iter()
            .fold(ranked[0], |best, next| if next.1 < best.1 { next } else { best });
        (value < 1.0).then_some(component)
    }
}

/// Everything a rule may look at.
#[derive(Debug, Clone)]
pub struct Signals {
    pub components: Components,
    pub total_years: f32,
    pub missing_skills: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub jd_title: Option<String>,
}

pub struct Rule {
    pub name: &'static str,
    trigger: fn(&Signals) -> bool,
    message: fn(&Signals) -> String,
}

pub static RULES: [Rule; 9] = [
    Rule {
        name: "lowest_skills",
        trigger: lowest_is_skills,
        message: add_missing_skills,
    },
    Rule {
        name: "lowest_keywords",
        trigger: lowest_is_keywords,
        message: weave_missing_keywords,
    },
    Rule {
        name: "lowest_title",
        trigger: lowest_is_title,
        message: align_title,
    },
    Rule {
        name: "lowest_experience",
        trigger: lowest_is_experience,
        message: highlight_experience,
    },
    Rule {
        name: "skills_below_60",
        trigger: |s| s.components.skills < 0.6,
        message: |_| "Add more technical skills relevant to the job description".to_string(),
    },
    Rule {
        name: "keywords_below_40",
        trigger: |s| s.components.keywords < 0.4,
        message: |_| {
            "Include more keywords from the job description in your experience bullets".to_string()
        },
    },
    Rule {
        name: "title_below_40",
        trigger: |s| s.components.title < 0.4,
        message: |_| "Consider adjusting your job titles to better match the target role".to_string(),
    },
    Rule {
        name: "experience_below_40",
        trigger: |s| s.components.experience < 0.4,
        message: highlight_experience,
    },
    Rule {
        name: "under_two_years",
        trigger: |s| s.total_years < 2.0,
        message: |_| {
            "Emphasize relevant projects, internships, or coursework to strengthen experience"
                .to_string()
        },
    },
];

/// Fires every matching rule in table order, keeping the first copy of each message.
pub fn recommend(signals: &Signals) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for rule in RULES.iter().filter(|r| (r.trigger)(signals)) {
        let message = (rule.message)(signals);
        debug!(rule = rule.name, "Recommendation rule fired");
        if !out.contains(&message) {
            out.push(message);
        }
    }
    out
}

fn lowest_is_skills(s: &Signals) -> bool {
    s.components.lowest() == Some(Component::Skills)
}

fn lowest_is_keywords(s: &Signals) -> bool {
    s.components.lowest() == Some(Component::Keywords)
}

fn lowest_is_title(s: &Signals) -> bool {
    s.components.lowest() == Some(Component::Title)
}

fn lowest_is_experience(s: &Signals) -> bool {
    s.components.lowest() == Some(Component::Experience)
}

fn add_missing_skills(s: &Signals) -> String {
    if s.missing_skills.is_empty() {
        "Add more technical skills relevant to the job description".to_string()
    } else {
        format!(
            "Add {} to your skills or projects",
            first_three(&s.missing_skills)
        )
    }
}

fn weave_missing_keywords(s: &Signals) -> String {
    if s.missing_keywords.is_empty() {
        "Include more keywords from the job description in your experience bullets".to_string()
    } else {
        format!(
            "Work {} into your experience bullets",
            first_three(&s.missing_keywords)
        )
    }
}

fn align_title(s: &Signals) -> String {
    match &s.jd_title {
        Some(title) => format!("Align your most recent job title with the target role \"{title}\""),
        None => "Consider adjusting your job titles to better match the target role".to_string(),
    }
}

fn highlight_experience(_: &Signals) -> String {
    "Highlight your years of experience and specific project durations".to_string()
}

fn first_three(items: &[String]) -> String {
    items.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
}
