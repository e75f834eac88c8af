use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Local hours during which automated texts and calls may go out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub default_timezone: Tz,
}

impl Default for ContactWindow {
    fn default() -> Self {
        Self { start_hour: 8, end_hour: 21, default_timezone: chrono_tz::America::Denver }
    }
}

impl ContactWindow {
    /// Unknown or missing timezones fall back to the window's default.
    pub fn resolve_timezone(&self, timezone: Option<&str>) -> Tz {
        timezone
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(self.default_timezone)
    }

    pub fn allows(&self, timezone: Option<&str>, now: DateTime<Utc>) -> bool {
        let local_hour = now.with_timezone(&self.resolve_timezone(timezone)).hour();
        self.start_hour <= local_hour && local_hour < self.end_hour
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundIntent {
    Stop,
    Appt,
    Hot,
    Question,
    Neutral,
}

impl InboundIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "STOP",
            Self::Appt => "APPT",
            Self::Hot => "HOT",
            Self::Question => "QUESTION",
            Self::Neutral => "NEUTRAL",
        }
    }

    /// Intents that mean a human conversation is underway.
    pub fn is_engaged(&self) -> bool {
        matches!(self, Self::Hot | Self::Question | Self::Appt)
    }
}

const STOP_WORDS: &[&str] = &["stop", "unsubscribe", "do not contact", "dont contact", "dnc"];
const APPT_WORDS: &[&str] = &["appointment", "appt", "schedule", "book", "booking"];
const HOT_WORDS: &[&str] = &["call me", "ready", "yes", "yep", "yeah", "now", "interested"];
const QUESTION_WORDS: &[&str] = &[
    "how much", "price", "cost", "quote", "coverage", "premium", "term", "whole", "iul", "annuity",
];

/// Keyword classification of an inbound SMS body. Opt-out words win over everything else.
///
/// Keywords match whole words (multi-word keywords match consecutive words), so "nonstop"
/// is not an opt-out and "know" is not "now". Apostrophes are dropped before splitting.
pub fn classify_inbound_text(body: &str) -> InboundIntent {
    let words = words(body);
    let mentions_any = |keywords: &[&str]| keywords.iter().any(|keyword| mentions(&words, keyword));

    if mentions_any(STOP_WORDS) {
        InboundIntent::Stop
    } else if mentions_any(APPT_WORDS) {
        InboundIntent::Appt
    } else if mentions_any(HOT_WORDS) {
        InboundIntent::Hot
    } else if mentions_any(QUESTION_WORDS) {
        InboundIntent::Question
    } else {
        InboundIntent::Neutral
    }
}

fn words(body: &str) -> Vec<String> {
    body.to_lowercase()
        .replace(['\'', '\u{2019}'], "")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn mentions(words: &[String], keyword: &str) -> bool {
    let wanted: Vec<&str> = keyword.split_whitespace().collect();
    if wanted.is_empty() {
        return false;
    }
    words.windows(wanted.len()).any(|window| window.iter().zip(&wanted).all(|(word, want)| word == want))
}
