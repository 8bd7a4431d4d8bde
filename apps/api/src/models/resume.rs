//! Resume record shape shared by every stage of the tailoring pipeline.
//!
//! `ResumeRecord` always carries all nine top-level sections. Empty sections are
//! represented by empty strings, sequences, or maps, never by a missing key.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ────────────────────────────────────────────────────────────────────────────
// Section keys
// ────────────────────────────────────────────────────────────────────────────

/// The nine top-level sections of a resume record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    ContactInfo,
    Links,
    Summary,
    Education,
    Experience,
    Projects,
    Certifications,
    Skills,
    Languages,
}

impl SectionKey {
    pub const ALL: [SectionKey; 9] = [
        SectionKey::ContactInfo,
        SectionKey::Links,
        SectionKey::Summary,
        SectionKey::Education,
        SectionKey::Experience,
        SectionKey::Projects,
        SectionKey::Certifications,
        SectionKey::Skills,
        SectionKey::Languages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::ContactInfo => "contact_info",
            SectionKey::Links => "links",
            SectionKey::Summary => "summary",
            SectionKey::Education => "education",
            SectionKey::Experience => "experience",
            SectionKey::Projects => "projects",
            SectionKey::Certifications => "certifications",
            SectionKey::Skills => "skills",
            SectionKey::Languages => "languages",
        }
    }

    /// Display label used when a template does not override the section title.
    pub fn default_title(&self) -> &'static str {
        match self {
            SectionKey::ContactInfo => "CONTACT",
            SectionKey::Links => "LINKS",
            SectionKey::Summary => "SUMMARY",
            SectionKey::Education => "EDUCATION",
            SectionKey::Experience => "EXPERIENCE",
            SectionKey::Projects => "PROJECTS",
            SectionKey::Certifications => "CERTIFICATIONS",
            SectionKey::Skills => "SKILLS",
            SectionKey::Languages => "LANGUAGES",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Links
// ────────────────────────────────────────────────────────────────────────────

/// Controlled set of link labels. Unknown providers land under `Website(n)`
/// (serialized as "Website", "Website 2", ...) instead of being dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkLabel {
    LinkedIn,
    GitHub,
    HuggingFace,
    Coursera,
    Website(u8),
}

impl LinkLabel {
    /// Recognizes one of the named providers from a free-form label.
    pub fn from_label(label: &str) -> Option<LinkLabel> {
        let folded: String = label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match folded.as_str() {
            "linkedin" => Some(LinkLabel::LinkedIn),
            "github" => Some(LinkLabel::GitHub),
            "huggingface" | "hf" => Some(LinkLabel::HuggingFace),
            "coursera" => Some(LinkLabel::Coursera),
            _ => None,
        }
    }

    /// Recognizes one of the named providers from a URL host.
    pub fn from_url(url: &str) -> Option<LinkLabel> {
        let lower = url.to_lowercase();
        if lower.contains("linkedin.com") {
            Some(LinkLabel::LinkedIn)
        } else if lower.contains("github.com") {
            Some(LinkLabel::GitHub)
        } else if lower.contains("huggingface.co") {
            Some(LinkLabel::HuggingFace)
        } else if lower.contains("coursera.org") {
            Some(LinkLabel::Coursera)
        } else {
            None
        }
    }

    fn parse(s: &str) -> Option<LinkLabel> {
        if let Some(known) = LinkLabel::from_label(s) {
            return Some(known);
        }
        let rest = s.trim().strip_prefix("Website")?;
        let rest = rest.trim();
        if rest.is_empty() {
            Some(LinkLabel::Website(1))
        } else {
            rest.parse::<u8>().ok().filter(|n| *n >= 1).map(LinkLabel::Website)
        }
    }
}

impl fmt::Display for LinkLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkLabel::LinkedIn => f.write_str("LinkedIn"),
            LinkLabel::GitHub => f.write_str("GitHub"),
            LinkLabel::HuggingFace => f.write_str("HuggingFace"),
            LinkLabel::Coursera => f.write_str("Coursera"),
            LinkLabel::Website(1) => f.write_str("Website"),
            LinkLabel::Website(n) => write!(f, "Website {n}"),
        }
    }
}

impl Serialize for LinkLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LinkLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        LinkLabel::parse(&raw)
            .ok_or_else(|| de::Error::custom(format!("unknown link label '{raw}'")))
    }
}

/// Link label → URL, iterated in label order (named providers first).
pub type Links = BTreeMap<LinkLabel, String>;

// ────────────────────────────────────────────────────────────────────────────
// Skills
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillCategory {
    pub name: String,
    pub items: Vec<String>,
}

/// Category name → ordered items, preserving category order on both
/// serialization and deserialization (JSON object key order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillGroups(pub Vec<SkillCategory>);

impl SkillGroups {
    pub fn iter(&self) -> std::slice::Iter<'_, SkillCategory> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive lookup of a category by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.0
            .iter()
            .position(|c| c.name.trim().to_lowercase() == wanted)
    }

    pub fn all_items(&self) -> impl Iterator<Item = &String> {
        self.0.iter().flat_map(|c| c.items.iter())
    }
}

impl Serialize for SkillGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for category in &self.0 {
            map.serialize_entry(&category.name, &category.items)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SkillGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = SkillGroups;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of skill category to a list of skills")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SkillGroups, A::Error> {
                let mut groups = Vec::new();
                while let Some((name, items)) = access.next_entry::<String, Vec<String>>()? {
                    groups.push(SkillCategory { name, items });
                }
                Ok(SkillGroups(groups))
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Entries
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub institution: String,
    pub degree: String,
    pub field: String,
    pub location: String,
    pub graduation_date: String,
    pub gpa: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub company: String,
    pub position: String,
    pub location: String,
    /// Free-form as written on the resume ("Apr 2024", "2019-06", ...).
    pub start_date: String,
    /// Free-form; empty or "Present" for a current role.
    pub end_date: String,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    /// Doubles as the project identifier in rewrite proposals.
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub bullets: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Record
// ────────────────────────────────────────────────────────────────────────────

/// The complete nine-section resume shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub contact_info: ContactInfo,
    pub links: Links,
    pub summary: String,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub projects: Vec<ProjectEntry>,
    pub certifications: Vec<String>,
    pub skills: SkillGroups,
    pub languages: Vec<String>,
}

/// Best-effort structured output of the external parser. Every field is
/// optional and link labels are free-form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredGuess {
    pub contact_info: ContactInfo,
    pub links: BTreeMap<String, String>,
    pub summary: String,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub projects: Vec<ProjectEntry>,
    pub certifications: Vec<String>,
    pub skills: SkillGroups,
    pub languages: Vec<String>,
}

/// Entity counts that no rewrite may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StructureCounts {
    pub education: usize,
    pub experience: usize,
    pub projects: usize,
    pub certifications: usize,
    pub skill_categories: usize,
    pub skill_items: usize,
    pub languages: usize,
    pub links: usize,
}

impl ResumeRecord {
    pub fn structure_counts(&self) -> StructureCounts {
        StructureCounts {
            education: self.education.len(),
            experience: self.experience.len(),
            projects: self.projects.len(),
            certifications: self.certifications.len(),
            skill_categories: self.skills.len(),
            skill_items: self.skills.all_items().count(),
            languages: self.languages.len(),
            links: self.links.len(),
        }
    }

    /// Every text field of the record, one fragment per field.
    pub fn text_fragments(&self) -> Vec<&str> {
        let mut parts: Vec<&str> = Vec::new();
        let ci = &self.contact_info;
        parts.extend([
            ci.full_name.as_str(),
            ci.email.as_str(),
            ci.phone.as_str(),
            ci.location.as_str(),
        ]);
        parts.extend(self.links.values().map(String::as_str));
        parts.push(&self.summary);
        for edu in &self.education {
            parts.extend([
                edu.institution.as_str(),
                edu.degree.as_str(),
                edu.field.as_str(),
                edu.location.as_str(),
                edu.graduation_date.as_str(),
                edu.gpa.as_str(),
            ]);
        }
        for exp in &self.experience {
            parts.extend([
                exp.company.as_str(),
                exp.position.as_str(),
                exp.location.as_str(),
                exp.start_date.as_str(),
                exp.end_date.as_str(),
            ]);
            parts.extend(exp.achievements.iter().map(String::as_str));
        }
        for proj in &self.projects {
            parts.push(&proj.title);
            parts.push(&proj.description);
            parts.extend(proj.technologies.iter().map(String::as_str));
            parts.extend(proj.bullets.iter().map(String::as_str));
        }
        parts.extend(self.certifications.iter().map(String::as_str));
        for category in self.skills.iter() {
            parts.push(&category.name);
            parts.extend(category.items.iter().map(String::as_str));
        }
        parts.extend(self.languages.iter().map(String::as_str));
        parts.retain(|p| !p.is_empty());
        parts
    }

    /// Flattened plain text of the whole record, used for token tracing and keyword matching.
    pub fn searchable_text(&self) -> String {
        self.text_fragments().join(" \n ")
    }
}
