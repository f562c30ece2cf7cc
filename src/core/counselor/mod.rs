//! Keyword-matched replies for the chat widget.
//!
//! No model is involved: the first rule with a keyword found in the
//! message wins, in table order. Latin keywords match whole words only.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Greeting,
    Grief,
    Anxiety,
    Loneliness,
    Family,
    Prayer,
    Doubt,
    WorshipTimes,
    Newcomer,
    General,
}

struct Rule {
    topic: Topic,
    keywords: &'static [&'static str],
    reply: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        topic: Topic::Grief,
        keywords: &["passed away", "funeral", "died", "grief", "mourning", "돌아가", "장례", "슬픔"],
        reply: "I am so sorry for your loss. \"Blessed are those who mourn, for they will be comforted\" (Matthew 5:4). Our pastors would be glad to visit or pray with you; please leave a prayer request or call the church office.",
    },
    Rule {
        topic: Topic::Anxiety,
        keywords: &["anxious", "anxiety", "worried", "worry", "afraid", "fear", "stress", "불안", "걱정", "두려"],
        reply: "\"Cast all your anxiety on him because he cares for you\" (1 Peter 5:7). You do not have to carry this alone. Would you like us to pray with you this week?",
    },
    Rule {
        topic: Topic::Loneliness,
        keywords: &["lonely", "alone", "isolated", "no friends", "외로", "혼자"],
        reply: "God sets the lonely in families (Psalm 68:6). Our small groups meet every week and would love to welcome you. Ask at the welcome desk after service.",
    },
    Rule {
        topic: Topic::Family,
        keywords: &["marriage", "husband", "wife", "divorce", "children", "parents", "family", "가정", "부부", "자녀"],
        reply: "Family struggles are heavy. Our pastoral team offers confidential family counseling; you can request a meeting through the church office.",
    },
    Rule {
        topic: Topic::Prayer,
        keywords: &["pray for", "prayer request", "please pray", "기도"],
        reply: "Thank you for sharing. You can post a prayer request on the prayer board, and our intercessory team prays over every request on Wednesday evenings.",
    },
    Rule {
        topic: Topic::Doubt,
        keywords: &["doubt", "believe", "faith", "does god", "is god", "의심", "믿음"],
        reply: "Honest questions are welcome here. \"I do believe; help me overcome my unbelief!\" (Mark 9:24). Our Bible study on Thursdays is a good place to explore them together.",
    },
    Rule {
        topic: Topic::WorshipTimes,
        keywords: &["service time", "worship time", "what time", "sunday service", "예배 시간", "예배시간"],
        reply: "Sunday worship is at 9:00 and 11:00, Wednesday prayer meeting at 19:30, and early morning prayer on weekdays at 5:30. See the worship page for details.",
    },
    Rule {
        topic: Topic::Newcomer,
        keywords: &["new here", "first time", "visit", "newcomer", "새가족", "처음"],
        reply: "Welcome! Newcomers can register at the welcome desk or through the newcomer page, and a member of our newcomer team will reach out to you.",
    },
    Rule {
        topic: Topic::Greeting,
        keywords: &["hello", "hi", "good morning", "good evening", "안녕"],
        reply: "Hello and welcome. How can we walk with you today?",
    },
];

/// A word boundary is only asserted at a keyword edge that is an ASCII
/// letter or digit. Hangul keywords are stems ("돌아가", "두려") that
/// appear inside longer words, so they stay substring matches.
fn keyword_pattern(keyword: &str) -> String {
    let edge = |c: Option<char>| {
        if c.is_some_and(|c| c.is_ascii_alphanumeric()) {
            r"\b"
        } else {
            ""
        }
    };
    format!(
        "{}{}{}",
        edge(keyword.chars().next()),
        regex::escape(keyword),
        edge(keyword.chars().last())
    )
}

fn rule_matchers() -> &'static [Regex] {
    static MATCHERS: OnceLock<Vec<Regex>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        RULES
            .iter()
            .map(|rule| {
                let alternatives: Vec<String> =
                    rule.keywords.iter().map(|keyword| keyword_pattern(keyword)).collect();
                Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))
                    .expect("counselor keywords form a valid regex")
            })
            .collect()
    })
}

const FALLBACK_REPLY: &str = "Thank you for reaching out. A pastor would be glad to talk with you in person; please contact the church office or leave a prayer request.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CounselRequest {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounselReply {
    pub topic: Topic,
    pub reply: String,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CounselError {
    #[error("message is required")]
    EmptyMessage,
}

#[derive(Debug, Clone, Default)]
pub struct CounselorService;

impl CounselorService {
    pub fn name(&self) -> &'static str {
        "counselor"
    }

    pub fn status(&self) -> &'static str {
        "ready"
    }

    pub fn respond(&self, message: &str) -> Result<CounselReply, CounselError> {
        respond(message)
    }
}

pub fn respond(message: &str) -> Result<CounselReply, CounselError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(CounselError::EmptyMessage);
    }

    let reply = RULES
        .iter()
        .zip(rule_matchers())
        .find(|(_, matcher)| matcher.is_match(trimmed))
        .map(|(rule, _)| CounselReply {
            topic: rule.topic,
            reply: rule.reply.to_string(),
            matched: true,
        })
        .unwrap_or_else(|| CounselReply {
            topic: Topic::General,
            reply: FALLBACK_REPLY.to_string(),
            matched: false,
        });
    Ok(reply)
}
