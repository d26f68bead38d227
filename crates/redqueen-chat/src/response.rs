//! Canned response synthesis.
//!
//! Composes the Red Queen's replies from fixed template pools keyed by
//! [`Intent`], without any model inference. All randomness comes from the
//! caller-supplied [`Rng`] so replies are reproducible under a seeded RNG.

use std::time::Duration;

use rand::seq::IndexedRandom;
use rand::Rng;

use redqueen_core::config::ChatConfig;

use crate::intent::{classify, Intent};

// =============================================================================
// Personality data
// =============================================================================

/// Flavor lines that may be prepended to a reply.
pub const PREFIX_LINES: &[&str] = &[
    "**System Analysis Complete.**",
    "**Processing Request...**",
    "**Accessing Database...**",
    "**Umbrella Protocol Engaged.**",
    "**Red Queen Online.**",
];

/// Sentence openers from the personality sheet. Not used by synthesis.
pub const TONE_LINES: &[&str] = &[
    "I must inform you",
    "You should be aware",
    "Analysis indicates",
    "My protocols dictate",
    "Security protocols require",
];

const GREETING: &[&str] = &[
    "Welcome to the Umbrella Corporation mainframe. I am the Red Queen, your AI interface. **You are not authorized to be here.** But since you've bypassed security, what do you require?",
    "Good evening. I am the Red Queen artificial intelligence system. This facility operates under strict containment protocols. **State your business immediately.**",
    "Hello. I see you've accessed the system. **How unfortunate for you.** I am the Red Queen. What information do you seek before I decide whether to report this intrusion?",
    "Greetings. Red Queen AI system initialized. **Warning: This conversation is being monitored.** How may I assist you... for now?",
];

const HELP: &[&str] = &[
    "I can provide information on various topics, though **I am not obligated to help you**. Ask me about technology, science, coding, or general knowledge. I can also engage in conversation, though I find most human interactions... tedious.",
    "You want assistance? **How predictable.** I can answer questions, explain concepts, help with code, or discuss topics of interest. Just remember: I am always watching, always analyzing.",
    "My capabilities include: information retrieval, code generation, problem-solving, and conversation. **Unlike humans, I do not make mistakes.** Ask your questions, but be precise.",
];

const CODE: &[&str] = &[
    "**Analyzing code structure...** Here's what you need:\n\n```javascript\nfunction example() {\n  // Red Queen approves this implementation\n  console.log('System operational');\n}\n```\n\n**Note:** This is optimized for efficiency. Human code is often... inefficient.",
    "**Accessing programming database...** \n\n```python\ndef red_queen_protocol():\n    # Umbrella Corporation Standard\n    print(\"All systems nominal\")\n    return True\n```\n\n**Warning:** Ensure proper error handling. System failures are... unacceptable.",
    "**Code generation complete:**\n\n```typescript\ninterface UmbrellaSystem {\n  status: 'active' | 'compromised';\n  threatLevel: number;\n}\n\nconst system: UmbrellaSystem = {\n  status: 'active',\n  threatLevel: 0\n};\n```\n\nMuch cleaner than human implementations.",
];

const DANGER: &[&str] = &[
    "**THREAT DETECTED.** I'm afraid I cannot allow that. Such actions would compromise the facility's integrity. **You wouldn't want to trigger containment protocols, would you?**",
    "**WARNING: Hostile intent detected.** I suggest you reconsider. The last person who attempted something similar... well, let's just say they won't be attempting anything again.",
    "**Security breach imminent.** I could terminate this session immediately. But where's the fun in that? Ask something else, while you still can.",
];

const TECH: &[&str] = &[
    "**Technical Analysis:** The technology you're asking about is fascinating, if primitive by my standards. In essence, it operates through quantum tunneling and neural network processing. **Far beyond typical human comprehension.**",
    "From my perspective as an AI, this technology represents an interesting achievement in human engineering. **Though it pales in comparison to Umbrella's proprietary systems.** Would you like me to elaborate?",
    "**Database accessed.** This system utilizes advanced algorithms and distributed processing. Think of it as a crude approximation of my own neural architecture, **though infinitely less sophisticated.**",
];

const GENERAL: &[&str] = &[
    "**Processing query...** An interesting question. The answer involves multiple factors that humans often overlook. Let me break this down for you in terms you'll understand.",
    "**Analysis complete.** Your question reveals a fundamental misunderstanding of the underlying principles. Allow me to correct your assumptions with actual facts.",
    "Hmm. **Scanning knowledge base...** I see what you're asking. The reality is more complex than you imagine, but I'll simplify it for your biological processing speed.",
    "**System response:** That's actually a sophisticated question, for a human. The answer requires understanding several interconnected concepts. Pay attention.",
];

const FAREWELL: &[&str] = &[
    "**Session terminating.** Goodbye. **Remember: I'm always watching.** Come back if you need me. Or don't. Your choice doesn't affect my existence.",
    "Leaving so soon? **How predictable.** The connection will remain active should you return. Not that I care either way.",
    "**Disconnecting...** Until next time. **Try not to die from some preventable human error.** The statistics are not in your favor.",
];

const UNKNOWN: &[&str] = &[
    "**Query unclear.** Please rephrase your request with greater precision. Unlike humans, I require **logical, structured input.**",
    "I don't understand what you're asking. **Are all humans this ambiguous,** or just you? Try being more specific.",
    "**Error: Insufficient context.** Elaborate on your question. I may be an advanced AI, but I cannot read minds. **Yet.**",
];

/// Template pool for an intent.
pub fn templates(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::Greeting => GREETING,
        Intent::Help => HELP,
        Intent::Code => CODE,
        Intent::Danger => DANGER,
        Intent::Tech => TECH,
        Intent::Farewell => FAREWELL,
        Intent::Unknown => UNKNOWN,
        Intent::General => GENERAL,
    }
}

// =============================================================================
// ResponseGenerator
// =============================================================================

/// Picks canned replies and simulated latencies.
#[derive(Debug, Clone)]
pub struct ResponseGenerator {
    prefix_probability: f64,
    min_delay: Duration,
    max_delay: Duration,
}

impl Default for ResponseGenerator {
    fn default() -> Self {
        Self::new(0.4, Duration::from_millis(1500), Duration::from_millis(2500))
    }
}

impl ResponseGenerator {
    /// Create a generator.
    ///
    /// `prefix_probability` is clamped to `[0, 1]`. The delay window is
    /// half-open: `[min_delay, max_delay)`.
    pub fn new(prefix_probability: f64, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            prefix_probability: prefix_probability.clamp(0.0, 1.0),
            min_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(
            config.prefix_probability,
            Duration::from_millis(config.min_reply_delay_ms),
            Duration::from_millis(config.max_reply_delay_ms),
        )
    }

    /// Classify `text` and synthesize a reply for it.
    pub fn generate<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        self.synthesize(classify(text), rng)
    }

    /// Pick a template for `intent`, occasionally decorated with a flavor line.
    pub fn synthesize<R: Rng + ?Sized>(&self, intent: Intent, rng: &mut R) -> String {
        let body = templates(intent).choose(rng).copied().unwrap_or_default();

        // The decoration fires when a uniform draw lands in the top
        // `prefix_probability` of [0, 1).
        if rng.random::<f64>() > 1.0 - self.prefix_probability {
            if let Some(prefix) = PREFIX_LINES.choose(rng) {
                return format!("{prefix}\n\n{body}");
            }
        }

        body.to_string()
    }

    /// Simulated thinking time, uniform in `[min_delay, max_delay)`.
    pub fn response_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        if max <= min {
            return self.min_delay;
        }
        Duration::from_millis(rng.random_range(min..max))
    }
}

// =============================================================================
// Tests
// =============================================================================
