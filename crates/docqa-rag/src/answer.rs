//! Parsing of replies to the structured prompt templates

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use docqa_core::{Error, Result};

static VERDICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[^a-z]*(yes|no)\b").expect("verdict pattern is valid"));

static REASON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[^a-z]*reason[^a-z:]*:[\s*_]*(.*)$").expect("reason pattern is valid")
});

/// Reply to the yes/no template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YesNoAnswer {
    pub answer: bool,
    pub reason: String,
}

impl YesNoAnswer {
    /// Parse a reply whose first non-empty line starts with YES or NO
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        let first = lines
            .next()
            .ok_or_else(|| unexpected_reply("empty reply"))?;

        let verdict = VERDICT
            .captures(first)
            .and_then(|c| c.get(1))
            .ok_or_else(|| {
                unexpected_reply(format!("expected YES or NO, got '{}'", first))
            })?;
        let answer = verdict.as_str().eq_ignore_ascii_case("yes");

        let reason = match REASON.captures(text).and_then(|c| c.get(1)) {
            Some(m) => m.as_str().trim().to_string(),
            None => {
                // "YES, because ..." or a reason on the following lines
                let inline = first[verdict.end()..]
                    .trim_start_matches(|c: char| !c.is_alphanumeric())
                    .trim();
                let rest: Vec<&str> = lines.collect();
                if inline.is_empty() {
                    rest.join(" ")
                } else {
                    inline.to_string()
                }
            }
        };

        Ok(Self { answer, reason })
    }
}

/// Reply to the decision-record template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision: String,
    pub amount: Option<String>,
    pub justification: String,
}

#[derive(Deserialize)]
struct RawDecisionRecord {
    decision: String,
    #[serde(default)]
    amount: Option<serde_json::Value>,
    #[serde(default)]
    justification: String,
}

impl DecisionRecord {
    /// Extract the JSON object from a reply, tolerating code fences and
    /// surrounding prose
    pub fn parse(text: &str) -> Result<Self> {
        let start = text.find('{');
        let end = text.rfind('}');
        let json = match (start, end) {
            (Some(start), Some(end)) if start < end => &text[start..=end],
            _ => return Err(unexpected_reply("no JSON object in reply")),
        };

        let raw: RawDecisionRecord = serde_json::from_str(json)
            .map_err(|e| unexpected_reply(format!("malformed decision record: {}", e)))?;

        let amount = match raw.amount {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => {
                let s = s.trim();
                if s.is_empty() || s.eq_ignore_ascii_case("n/a") || s.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(s.to_string())
                }
            }
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            decision: raw.decision.trim().to_string(),
            amount,
            justification: raw.justification.trim().to_string(),
        })
    }

    pub fn is_approved(&self) -> bool {
        self.decision.eq_ignore_ascii_case("approved")
    }
}

fn unexpected_reply(reason: impl Into<String>) -> Error {
    Error::GenerationFailure {
        reason: format!("unexpected model reply: {}", reason.into()),
    }
}
