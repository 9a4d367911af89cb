//! Emergency keyword categories for model-reported red flags.
//!
//! A red flag that matches any category here is independently sufficient to
//! mark the analysis as an emergency, whatever risk level the model claims.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Known emergency categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyCategory {
    BreathingDifficulty,
    ChestPain,
    SevereHeadacheWithVisionChange,
    ProlongedHighFever,
    AlteredMentalStatus,
    SevereAbdominalPain,
    BloodInExcreta,
}

/// Condition under which a category matches a (lowercased) flag.
enum CategoryCondition {
    /// Flag contains any keyword.
    AnyKeyword(&'static [&'static str]),
    /// Flag contains at least one keyword from every group.
    AllGroups(&'static [&'static [&'static str]]),
    /// Flag mentions fever and a duration longer than `min_days`.
    FeverLongerThan { min_days: u32 },
}

struct CategoryRule {
    category: EmergencyCategory,
    conditions: &'static [CategoryCondition],
}

// ── Keyword sets ────────────────────────────────────────────

const BREATHING_KEYWORDS: &[&str] = &[
    "difficulty breathing", "breathing difficulty", "difficulty in breathing", "trouble breathing", "shortness of breath", "short of breath",
    "can't breathe", "cannot breathe", "breathless", "breathlessness", "respiratory distress",
    "labored breathing", "laboured breathing", "gasping", "fast breathing", "chest indrawing",
    "cyanosis", "blue lips",
];

const CHEST_PAIN_KEYWORDS: &[&str] = &[
    "chest pain", "chest tightness", "chest pressure", "pain in chest", "pain in the chest",
    "crushing chest",
];

const HEADACHE_KEYWORDS: &[&str] = &["headache", "head ache", "head pain", "migraine"];

const VISION_KEYWORDS: &[&str] = &[
    "vision", "blurred", "blurry", "seeing spots", "double vision", "flashing lights",
    "can't see", "cannot see",
];

const SEVERE_KEYWORDS: &[&str] = &["severe", "intense", "worst", "excruciating", "extreme"];

const ALTERED_MENTAL_KEYWORDS: &[&str] = &[
    "altered mental", "confusion", "confused", "disoriented", "disorientation",
    "unresponsive", "unconscious", "not responding", "loss of consciousness", "lethargic",
    "hard to wake", "difficult to wake", "seizure", "convulsion", "fitting",
];

const ABDOMINAL_KEYWORDS: &[&str] = &[
    "abdominal pain", "abdomen pain", "stomach pain", "belly pain", "abdominal cramps",
    "pain in the abdomen", "pain in abdomen",
];

const ACUTE_ABDOMEN_KEYWORDS: &[&str] = &["acute abdomen", "rigid abdomen"];

const BLOOD_IN_EXCRETA_KEYWORDS: &[&str] = &[
    "blood in stool", "bloody stool", "blood in the stool", "blood in urine",
    "bloody urine", "blood in the urine", "black stool", "tarry stool", "bloody diarrhea",
    "bloody diarrhoea", "rectal bleeding", "hematuria", "haematuria", "melena", "melaena",
    "vomiting blood",
];

const FEVER_KEYWORDS: &[&str] = &["fever", "febrile", "pyrexia"];

static DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:\+\s*)?days?").expect("valid day-count regex"));

static WEEKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:a|one|\d+)\s+weeks?\b").expect("valid week regex"));

// ── Rule registry ───────────────────────────────────────────

static RULES: &[CategoryRule] = &[
    CategoryRule {
        category: EmergencyCategory::BreathingDifficulty,
        conditions: &[CategoryCondition::AnyKeyword(BREATHING_KEYWORDS)],
    },
    CategoryRule {
        category: EmergencyCategory::ChestPain,
        conditions: &[CategoryCondition::AnyKeyword(CHEST_PAIN_KEYWORDS)],
    },
    CategoryRule {
        category: EmergencyCategory::SevereHeadacheWithVisionChange,
        conditions: &[CategoryCondition::AllGroups(&[HEADACHE_KEYWORDS, VISION_KEYWORDS])],
    },
    CategoryRule {
        category: EmergencyCategory::ProlongedHighFever,
        conditions: &[CategoryCondition::FeverLongerThan { min_days: 3 }],
    },
    CategoryRule {
        category: EmergencyCategory::AlteredMentalStatus,
        conditions: &[CategoryCondition::AnyKeyword(ALTERED_MENTAL_KEYWORDS)],
    },
    CategoryRule {
        category: EmergencyCategory::SevereAbdominalPain,
        conditions: &[
            CategoryCondition::AllGroups(&[SEVERE_KEYWORDS, ABDOMINAL_KEYWORDS]),
            CategoryCondition::AnyKeyword(ACUTE_ABDOMEN_KEYWORDS),
        ],
    },
    CategoryRule {
        category: EmergencyCategory::BloodInExcreta,
        conditions: &[CategoryCondition::AnyKeyword(BLOOD_IN_EXCRETA_KEYWORDS)],
    },
];

// ── Matching logic ──────────────────────────────────────────

/// Categories matched by a single red flag, in rule order.
pub fn categorize_flag(flag: &str) -> Vec<EmergencyCategory> {
    let lower = flag.to_lowercase();
    RULES
        .iter()
        .filter(|rule| rule.conditions.iter().any(|c| c.matches(&lower)))
        .map(|rule| rule.category)
        .collect()
}

/// Distinct categories matched across all flags, in first-seen order.
pub fn emergency_categories<S: AsRef<str>>(flags: &[S]) -> Vec<EmergencyCategory> {
    let mut found = Vec::new();
    for flag in flags {
        for category in categorize_flag(flag.as_ref()) {
            if !found.contains(&category) {
                found.push(category);
            }
        }
    }
    found
}

impl CategoryCondition {
    fn matches(&self, lower: &str) -> bool {
        match self {
            Self::AnyKeyword(keywords) => contains_any(lower, keywords),
            Self::AllGroups(groups) => groups.iter().all(|g| contains_any(lower, g)),
            Self::FeverLongerThan { min_days } => {
                contains_any(lower, FEVER_KEYWORDS) && duration_exceeds(lower, *min_days)
            }
        }
    }
}

fn contains_any(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| lower.contains(kw))
}

fn duration_exceeds(lower: &str, min_days: u32) -> bool {
    let by_days = DAYS.captures_iter(lower).any(|cap| {
        cap.get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .is_some_and(|days| days > min_days)
    });
    by_days || (min_days < 7 && WEEKS.is_match(lower))
}
