//! Rule-based intent classification.
//!
//! Maps free text onto one of a fixed set of intents using an ordered
//! cascade of keyword patterns. The first matching pattern wins.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Inputs shorter than this (after trimming) that match no keyword are
/// treated as noise rather than a general question.
const MIN_GENERAL_CHARS: usize = 3;

/// Classification bucket that selects the response template pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Help,
    Code,
    Danger,
    Tech,
    Farewell,
    Unknown,
    General,
}

impl Intent {
    pub const ALL: [Intent; 8] = [
        Intent::Greeting,
        Intent::Help,
        Intent::Code,
        Intent::Danger,
        Intent::Tech,
        Intent::Farewell,
        Intent::Unknown,
        Intent::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Help => "help",
            Intent::Code => "code",
            Intent::Danger => "danger",
            Intent::Tech => "tech",
            Intent::Farewell => "farewell",
            Intent::Unknown => "unknown",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Compiled cascade (compiled once, reused across calls)
// =============================================================================

static INTENT_CASCADE: LazyLock<Vec<(Intent, Regex)>> = LazyLock::new(|| {
    let mk = |intent: Intent, pat: &str| -> (Intent, Regex) {
        (intent, Regex::new(pat).expect("Invalid intent regex"))
    };

    // Order matters: danger is checked before tech so "kill the system
    // process" is treated as hostile.
    vec![
        mk(
            Intent::Greeting,
            r"(?i)\b(?:hello|hi|hey|greetings|good\s+morning|good\s+evening)\b",
        ),
        mk(
            Intent::Help,
            r"(?i)\b(?:help(?:s|ed|ing|ful)?|what\s+can\s+you\s+do|capabilit(?:y|ies)|assist(?:s|ed|ing|ance)?)\b",
        ),
        mk(
            Intent::Code,
            r"(?i)\b(?:code[sd]?|coding|program(?:s|med|ming|mer|mers)?|functions?|scripts?|scripting|javascript|python|typescript)\b",
        ),
        mk(
            Intent::Danger,
            r"(?i)\b(?:kill(?:s|ed|ing)?|destroy(?:s|ed|ing)?|terminat(?:e|es|ed|ing|ion)|attack(?:s|ed|ing)?|harm(?:s|ed|ing|ful)?|weapons?)\b",
        ),
        mk(
            Intent::Tech,
            r"(?i)\b(?:how\s+does|explain(?:s|ed|ing)?|technology|technologies|technical|systems?|works)\b",
        ),
        mk(
            Intent::Farewell,
            r"(?i)\b(?:bye|goodbye|see\s+you|exit|quit)\b",
        ),
    ]
});

/// Classify the intent of a raw user message.
///
/// Checks patterns in order: Greeting, Help, Code, Danger, Tech, Farewell.
/// Falls back to `Unknown` for very short input and `General` otherwise.
pub fn classify(text: &str) -> Intent {
    if let Some((intent, _)) = INTENT_CASCADE.iter().find(|(_, re)| re.is_match(text)) {
        return *intent;
    }

    if text.trim().chars().count() < MIN_GENERAL_CHARS {
        Intent::Unknown
    } else {
        Intent::General
    }
}

// =============================================================================
// Tests
// =============================================================================
