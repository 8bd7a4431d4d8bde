//! Tokenizer, stop words, and the skill vocabulary used for ATS matching.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9+#./]+").expect("valid regex"));

/// One word of text: `text` as written (edge punctuation stripped), `norm` lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub norm: String,
}

/// Splits text into tokens. Keeps `c++`, `c#`, `node.js`, `ci/cd` intact and
/// strips sentence punctuation from both ends.
pub fn tokenize(text: &str) -> Vec<Token> {
    TOKEN
        .find_iter(text)
        .filter_map(|m| {
            let trimmed = m.as_str().trim_matches(|c| c == '.' || c == '/');
            if trimmed.is_empty() {
                return None;
            }
            Some(Token {
                text: trimmed.to_string(),
                norm: trimmed.to_lowercase(),
            })
        })
        .collect()
}

pub fn norms(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|t| t.norm).collect()
}

/// A token worth matching: has a letter and is not a stop word.
pub fn is_significant(norm: &str) -> bool {
    norm.chars().any(|c| c.is_alphabetic()) && !STOP_WORDS.contains(norm)
}

/// Token stream with fast single-token and phrase lookup.
pub struct TokenIndex {
    norms: Vec<String>,
    set: HashSet<String>,
}

impl TokenIndex {
    pub fn new(text: &str) -> Self {
        let norms = norms(text);
        let set = norms.iter().cloned().collect();
        TokenIndex { norms, set }
    }

    pub fn contains(&self, norm: &str) -> bool {
        self.set.contains(norm)
    }

    /// True when `phrase` occurs as a contiguous run of tokens.
    pub fn contains_phrase<S: AsRef<str>>(&self, phrase: &[S]) -> bool {
        match phrase {
            [] => false,
            [single] => self.contains(single.as_ref()),
            _ => self.norms.windows(phrase.len()).any(|window| {
                window
                    .iter()
                    .zip(phrase)
                    .all(|(have, want)| have == want.as_ref())
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vocabulary
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Technical,
    Business,
}

/// A vocabulary entry, pre-tokenized. `tokens` holds the lowercased form used
/// for lookup in resume text; a case-sensitive entry matches the job
/// description only when written exactly as `written`.
#[derive(Debug, Clone)]
pub struct VocabTerm {
    pub kind: TermKind,
    pub tokens: Vec<String>,
    written: Vec<String>,
    case_sensitive: bool,
}

impl VocabTerm {
    fn new(kind: TermKind, term: &str, case_sensitive: bool) -> Self {
        let (written, tokens) = tokenize(term).into_iter().map(|t| (t.text, t.norm)).unzip();
        VocabTerm {
            kind,
            tokens,
            written,
            case_sensitive,
        }
    }

    /// True when the term starts at `tokens[at]`.
    pub fn matches_at(&self, tokens: &[Token], at: usize) -> bool {
        let end = at + self.tokens.len();
        if end > tokens.len() {
            return false;
        }
        let wanted = if self.case_sensitive {
            &self.written
        } else {
            &self.tokens
        };
        tokens[at..end].iter().zip(wanted).all(|(tok, want)| {
            let have = if self.case_sensitive { &tok.text } else { &tok.norm };
            have == want
        })
    }
}

const TECHNICAL_TERMS: &[&str] = &[
    "python", "java", "javascript", "typescript", "golang", "rust", "c++", "c#", "scala",
    "kotlin", "ruby", "php", "sql", "nosql", "bash", "html", "css", "react",
    "angular", "vue", "node.js", "nodejs", "django", "flask", "fastapi", "aws", "azure",
    "gcp", "google cloud", "docker", "kubernetes", "terraform", "ansible", "jenkins", "git",
    "linux", "ci/cd", "devops", "microservices", "restful", "graphql", "grpc", "api", "apis",
    "mongodb", "postgresql", "postgres", "mysql", "redis", "kafka", "rabbitmq", "elasticsearch",
    "snowflake", "databricks", "spark", "pyspark", "hadoop", "airflow", "dbt", "etl",
    "data warehouse", "data pipelines", "pandas", "numpy", "scikit-learn", "tensorflow",
    "pytorch", "keras", "machine learning", "deep learning", "nlp", "computer vision", "llm",
    "llms", "generative ai", "mlops", "statistics", "tableau", "power bi", "powerbi", "looker",
    "a/b testing", "cloud computing", "database", "algorithms", "distributed systems",
];

/// Technical terms that are also everyday English words. They count only when
/// the posting writes them exactly like this.
const CASED_TECHNICAL_TERMS: &[&str] = &["Go", "R", "REST", "Excel", "Spring", "Swift"];

const BUSINESS_TERMS: &[&str] = &[
    "agile", "scrum", "kanban", "project management", "product management", "leadership",
    "communication", "collaboration", "stakeholder management", "stakeholders", "strategy",
    "business analysis", "requirements gathering", "roadmap", "planning", "budgeting",
    "presentation", "documentation", "mentoring", "negotiation", "forecasting",
    "cross-functional", "reporting", "kpis", "okrs", "customer success", "go-to-market",
];

/// Technical terms first, then business terms; within a kind, longer phrases
/// first so "machine learning" wins over a shorter overlapping entry.
pub static VOCABULARY: Lazy<Vec<VocabTerm>> = Lazy::new(|| {
    let mut terms: Vec<VocabTerm> = TECHNICAL_TERMS
        .iter()
        .map(|t| VocabTerm::new(TermKind::Technical, t, false))
        .chain(
            CASED_TECHNICAL_TERMS
                .iter()
                .map(|t| VocabTerm::new(TermKind::Technical, t, true)),
        )
        .chain(
            BUSINESS_TERMS
                .iter()
                .map(|t| VocabTerm::new(TermKind::Business, t, false)),
        )
        .filter(|t| !t.tokens.is_empty())
        .collect();
    terms.sort_by_key(|t| std::cmp::Reverse(t.tokens.len()));
    terms
});

/// Vocabulary kind of a single normalized token, if it is a known term.
/// Case-sensitive terms are skipped: their lowercase form is a plain word.
pub fn vocabulary_kind(norm: &str) -> Option<TermKind> {
    VOCABULARY
        .iter()
        .find(|t| !t.case_sensitive && t.tokens.len() == 1 && t.tokens[0] == norm)
        .map(|t| t.kind)
}

// ────────────────────────────────────────────────────────────────────────────
// Stop words
// ────────────────────────────────────────────────────────────────────────────

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // English
        "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are",
        "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
        "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "etc", "e.g",
        "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
        "hers", "him", "his", "how", "i", "i.e", "if", "in", "into", "is", "it", "its", "itself",
        "just", "me", "more", "most", "my", "no", "nor", "not", "now", "of", "off", "on", "once",
        "only", "or", "other", "our", "ours", "out", "over", "own", "same", "she", "should", "so",
        "some", "such", "than", "that", "the", "their", "them", "then", "there", "these", "they",
        "this", "those", "through", "to", "too", "under", "until", "up", "very", "was", "we",
        "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with",
        "would", "you", "your", "yours", "us", "via", "per", "within", "across", "well", "like",
        // Job-description boilerplate
        "ability", "able", "apply", "benefits", "bonus", "candidate", "candidates", "company",
        "degree", "description", "environment", "equivalent", "excellent", "experience",
        "experienced", "familiarity", "good", "great", "help", "hiring", "ideal", "including",
        "join", "job", "knowledge", "looking", "must", "need", "new", "nice", "opportunity",
        "plus", "position", "preferred", "proficiency", "proficient", "qualifications",
        "related", "required", "requirements", "responsibilities", "role", "seeking", "skills",
        "strong", "team", "understanding", "using", "work", "working", "year", "years",
    ]
    .into_iter()
    .collect()
});
