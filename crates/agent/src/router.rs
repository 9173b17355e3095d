//! First-utterance topic routing
//!
//! The caller's first utterance is matched against two disjoint keyword
//! sets. Exactly one matching set selects that topic's bumper; both or
//! neither fall through to generation.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Legal,
    Medical,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Legal => "legal",
            Topic::Medical => "medical",
        }
    }

    /// Fixed reply played instead of a generated answer
    pub fn bumper(&self) -> &'static str {
        match self {
            Topic::Legal => LEGAL_BUMPER,
            Topic::Medical => MEDICAL_BUMPER,
        }
    }
}

pub const LEGAL_BUMPER: &str =
    "I can help with that. As a member you have access to our attorney network at discounted rates. What happened?";

pub const MEDICAL_BUMPER: &str =
    "I can help with that. Our telemedicine service connects you with a certified doctor by phone, no appointment needed. What's going on?";

/// Every bumper, for preloading
pub const BUMPERS: [&str; 2] = [LEGAL_BUMPER, MEDICAL_BUMPER];

static LEGAL_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(lawyers?|attorneys?|legal|lawsuits?|sue|suing|sued|court|accidents?|injury|injured|custody|divorce)\b",
    )
    .expect("legal keyword pattern")
});

static MEDICAL_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(doctors?|medical|telemedicine|prescriptions?|medications?|sick|nurses?|symptoms?|fever|illness)\b",
    )
    .expect("medical keyword pattern")
});

/// Topic whose keyword set alone matches `text`
pub fn route_first_utterance(text: &str) -> Option<Topic> {
    let legal = LEGAL_KEYWORDS.is_match(text);
    let medical = MEDICAL_KEYWORDS.is_match(text);

    match (legal, medical) {
        (true, false) => Some(Topic::Legal),
        (false, true) => Some(Topic::Medical),
        _ => None,
    }
}
