//! Post-call lead extraction.
//!
//! Pattern matching over the accumulated call transcript. The extracted
//! record travels inside the `call_ended` notification event; persistence is
//! the consumer's concern, not the gateway's.
//!
//! This is deliberately heuristic. Patterns favour precision over recall:
//! a missed field is fine, a fabricated one is not.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// What the caller is trying to do, when it can be inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadIntent {
    Buyer,
    Seller,
    Renter,
}

/// Structured record extracted from one call transcript.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LeadRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<LeadIntent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
}

impl LeadRecord {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone_number.is_none()
            && self.intent.is_none()
            && self.timeline.is_none()
            && self.budget.is_none()
    }
}

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+\d{10,15}").expect("valid regex"));

static NAME_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)my name is ([A-Za-z]+(?:\s+[A-Za-z]+)?)",
        r"(?i)this is ([A-Za-z]+(?:\s+[A-Za-z]+)?)",
        r"(?i)I'm ([A-Za-z]+(?:\s+[A-Za-z]+)?)",
        r"(?i)([A-Za-z]+) speaking",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Common conversational words that the name patterns can false-positive on.
const NAME_STOPWORDS: &[&str] = &[
    "hello", "hi", "yes", "no", "okay", "sure", "thanks", "calling", "good", "fine", "sorry",
    "afraid", "here", "there",
];

static SELLER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)looking to sell|want to sell|interested in selling|sell (?:my|our|the) (?:house|home|property|condo)")
        .expect("valid regex")
});

static RENTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)looking to rent|want to rent|interested in renting|rental|lease")
        .expect("valid regex")
});

static BUYER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)looking to buy|want to buy|interested in buying|purchase|first.?time buyer|house hunt")
        .expect("valid regex")
});

static TIMELINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(within|in the next|in about|in)\s+(\w+\s+(?:months?|weeks?|years?))|\b(\d+\s*(?:months?|weeks?|years?))\b|(immediately|as soon as possible|right away|no rush|no hurry)")
        .expect("valid regex")
});

static BUDGET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\$[\d,]+(?:k)?|\b(\d{2,4})\s*k\b|\b\d+\s*thousand\b").expect("valid regex"));

/// Extract a lead record from a call transcript.
///
/// Returns `None` when nothing usable was found.
pub fn extract_lead(transcript: &str) -> Option<LeadRecord> {
    if transcript.trim().is_empty() {
        return None;
    }

    let mut record = LeadRecord::default();

    if let Some(m) = PHONE_RE.find(transcript) {
        record.phone_number = Some(m.as_str().to_string());
    }

    for re in NAME_RES.iter() {
        if let Some(caps) = re.captures(transcript) {
            let candidate = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            let first_word = candidate.split_whitespace().next().unwrap_or("");
            if candidate.len() >= 2 && !NAME_STOPWORDS.contains(&first_word.to_lowercase().as_str())
            {
                record.full_name = Some(titlecase(candidate));
                break;
            }
        }
    }

    // Seller and renter phrasing is more specific than buyer phrasing, so
    // check in that order.
    record.intent = if SELLER_RE.is_match(transcript) {
        Some(LeadIntent::Seller)
    } else if RENTER_RE.is_match(transcript) {
        Some(LeadIntent::Renter)
    } else if BUYER_RE.is_match(transcript) {
        Some(LeadIntent::Buyer)
    } else {
        None
    };

    if let Some(m) = TIMELINE_RE.find(transcript) {
        record.timeline = Some(m.as_str().trim().to_string());
    }

    if let Some(m) = BUDGET_RE.find(transcript) {
        record.budget = Some(m.as_str().trim().to_string());
    }

    if record.is_empty() { None } else { Some(record) }
}

fn titlecase(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
