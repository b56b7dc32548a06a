//! Temporal phrase parser.
//!
//! Maps a free-text query to an optional [`DateRange`] by checking an ordered
//! table of lexical rules. The first rule that fires wins, so a query holding
//! both "last week" and a month name resolves as "last week".

use std::sync::LazyLock;

use chrono::{Datelike, Month, NaiveDateTime};
use regex::Regex;
use tracing::{debug, error};

use worklog_core::date_range::MONTH_NAMES;
use worklog_core::{month_from_name, DateRange, MonthThird, Result};

// =============================================================================
// Compiled patterns
// =============================================================================

static MONTH_THIRD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(early|mid|late)\s+({})\b",
        MONTH_NAMES.join("|")
    ))
    .unwrap()
});

static FULL_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?:in\s+)?({})\b", MONTH_NAMES.join("|"))).unwrap()
});

/// Phrases that mark a recency question on their own.
const RECENCY_PHRASES: &[&str] = &[
    "recently",
    "lately",
    "last few days",
    "recent days",
    "recent weeks",
];

/// Words that make a bare "recent" count as a recency question.
const RECENCY_ACTION_WORDS: &[&str] = &["what", "show", "tell", "summary", "update"];

// =============================================================================
// TemporalCue
// =============================================================================

/// The temporal phrase recognised in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalCue {
    LastWeek,
    ThisWeek,
    LastMonth,
    Today,
    Yesterday,
    Recent,
    MonthThird { third: MonthThird, month: Month },
    FullMonth { month: Month },
}

impl TemporalCue {
    /// Turn the cue into a concrete window relative to `now`. Month cues
    /// refer to the year of `now`.
    pub fn resolve(&self, now: NaiveDateTime) -> Result<DateRange> {
        let range = match *self {
            TemporalCue::LastWeek => DateRange::last_week(now),
            TemporalCue::ThisWeek => DateRange::this_week(now),
            TemporalCue::LastMonth => DateRange::last_month(now),
            TemporalCue::Today => DateRange::today(now),
            TemporalCue::Yesterday => DateRange::yesterday(now),
            TemporalCue::Recent => DateRange::recent(now),
            TemporalCue::MonthThird { third, month } => {
                DateRange::month_third_of(third, month, now.year())?
            }
            TemporalCue::FullMonth { month } => DateRange::full_month_of(month, now.year())?,
        };
        Ok(range)
    }
}

// =============================================================================
// Rule table
// =============================================================================

struct TemporalRule {
    name: &'static str,
    detect: fn(&str) -> Option<TemporalCue>,
}

/// Evaluated top to bottom against the lowercased query.
static RULES: &[TemporalRule] = &[
    TemporalRule {
        name: "last_week",
        detect: |q| {
            (q.contains("last week") || q.contains("past week")).then_some(TemporalCue::LastWeek)
        },
    },
    TemporalRule {
        name: "this_week",
        detect: |q| q.contains("this week").then_some(TemporalCue::ThisWeek),
    },
    TemporalRule {
        name: "last_month",
        detect: |q| {
            (q.contains("last month") || q.contains("past month"))
                .then_some(TemporalCue::LastMonth)
        },
    },
    TemporalRule {
        name: "today",
        detect: |q| q.contains("today").then_some(TemporalCue::Today),
    },
    TemporalRule {
        name: "yesterday",
        detect: |q| q.contains("yesterday").then_some(TemporalCue::Yesterday),
    },
    TemporalRule {
        name: "recent",
        detect: detect_recent,
    },
    TemporalRule {
        name: "month_third",
        detect: detect_month_third,
    },
    TemporalRule {
        name: "full_month",
        detect: detect_full_month,
    },
];

fn detect_recent(q: &str) -> Option<TemporalCue> {
    let phrase = RECENCY_PHRASES.iter().any(|p| q.contains(p));
    // Known heuristic: "recent" alone is too ambiguous ("recent projects"),
    // so it needs an accompanying action word.
    let bare = q.contains("recent") && RECENCY_ACTION_WORDS.iter().any(|w| q.contains(w));
    (phrase || bare).then_some(TemporalCue::Recent)
}

fn detect_month_third(q: &str) -> Option<TemporalCue> {
    let caps = MONTH_THIRD_RE.captures(q)?;
    let third = MonthThird::from_name(caps.get(1)?.as_str())?;
    let month = matched_month(caps.get(2)?.as_str())?;
    Some(TemporalCue::MonthThird { third, month })
}

fn detect_full_month(q: &str) -> Option<TemporalCue> {
    let caps = FULL_MONTH_RE.captures(q)?;
    let month = matched_month(caps.get(1)?.as_str())?;
    Some(TemporalCue::FullMonth { month })
}

/// The patterns only capture valid month names, so a failure here is a bug.
fn matched_month(token: &str) -> Option<Month> {
    match month_from_name(token) {
        Ok(month) => Some(month),
        Err(e) => {
            error!(token = %token, error = %e, "Month pattern captured an unknown month");
            None
        }
    }
}

// =============================================================================
// TemporalQueryParser
// =============================================================================

/// Rule-based recogniser for temporal phrases in free-text queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalQueryParser;

impl TemporalQueryParser {
    pub fn new() -> Self {
        Self
    }

    /// Find the first temporal cue in `query`, case-insensitively.
    pub fn detect(&self, query: &str) -> Option<TemporalCue> {
        let lower = query.to_lowercase();
        RULES.iter().find_map(|rule| {
            let cue = (rule.detect)(&lower)?;
            debug!(rule = rule.name, cue = ?cue, "Temporal rule matched");
            Some(cue)
        })
    }

    /// Parse `query` into a date window relative to `now`, or `None` when the
    /// query is not temporal.
    pub fn parse(&self, query: &str, now: NaiveDateTime) -> Option<DateRange> {
        let cue = self.detect(query)?;
        match cue.resolve(now) {
            Ok(range) => Some(range),
            Err(e) => {
                error!(cue = ?cue, error = %e, "Temporal cue could not be resolved");
                None
            }
        }
    }

    /// Whether `query` names a date window.
    pub fn is_temporal_query(&self, query: &str) -> bool {
        self.detect(query).is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================
