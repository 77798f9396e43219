//! Generated commentary on top of a [`StatsDocument`].
//!
//! The text service itself lives behind [`TextGenerator`]. Each kind of
//! content is one row in a table (key, instructions, fallback) and all kinds
//! share one prompt builder and one response parser.

use crate::report::StatsDocument;
use anyhow::Result;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde_json::{Map, Value, json};

pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Never calls out; every kind ends up with its fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGenerator;

impl TextGenerator for NoopGenerator {
    fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(String::new())
    }
}

impl<F> TextGenerator for F
where
    F: Fn(&str) -> Result<String>,
{
    fn generate(&self, prompt: &str) -> Result<String> {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Narrative,
    Personality,
    Roast,
    Aura,
    Superlatives,
    HotTakes,
    Suggestions,
    Theme,
}

impl ContentKind {
    pub const ALL: [ContentKind; 8] = [
        Self::Narrative,
        Self::Personality,
        Self::Roast,
        Self::Aura,
        Self::Superlatives,
        Self::HotTakes,
        Self::Suggestions,
        Self::Theme,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Narrative => "narrative",
            Self::Personality => "personality",
            Self::Roast => "roast",
            Self::Aura => "aura",
            Self::Superlatives => "superlatives",
            Self::HotTakes => "hot_takes",
            Self::Suggestions => "suggestions",
            Self::Theme => "theme",
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            Self::Narrative => {
                "Write a playful, humorous narrative that tells the story of their year through music. \
                 Make it personal and slightly irreverent.\n\
                 Format: {\"narrative\": \"Your musical journey...\"}"
            }
            Self::Personality => {
                "Invent a funny music personality type that captures their listening patterns.\n\
                 Format: {\"type\": \"The Chaos Agent\", \"tagline\": \"Your playlists have trust issues\", \
                 \"description\": \"You listen to everything...\", \"spirit_animal\": \"A caffeinated raccoon\"}"
            }
            Self::Roast => {
                "Write 3-5 light-hearted roasts about their taste or habits. Friendly banter, never mean.\n\
                 Format: {\"roasts\": [\"Your 2am listening habits are concerning\"]}"
            }
            Self::Aura => {
                "Describe a music aura color and vibe that represents their listening energy.\n\
                 Format: {\"color\": \"Midnight Purple\", \"hex\": \"#9B59B6\", \"vibe\": \"Mysterious and moody\", \
                 \"description\": \"Your aura radiates...\"}"
            }
            Self::Superlatives => {
                "Hand out 3-5 funny awards such as \"Most Likely To...\" based on their patterns.\n\
                 Format: {\"superlatives\": [{\"award\": \"Most Dedicated Fan\", \"reason\": \"Played the same song 200 times\"}]}"
            }
            Self::HotTakes => {
                "Give 3-5 bold, playful opinions about their taste.\n\
                 Format: {\"hot_takes\": [\"Your top 10 is basically the radio\"]}"
            }
            Self::Suggestions => {
                "Give 3-5 personalized listening suggestions or predictions for next year.\n\
                 Format: {\"suggestions\": [\"Based on your late-night listening, try: Artist Name\"]}"
            }
            Self::Theme => {
                "Pick a five color palette and a visualization (aurora, particles or gradient_blob), mood and \
                 intensity between 0 and 1 for each slide: intro, totalTime, topArtist, topTracks, listeningClock, \
                 quirkyStats, personality, aura, roasts, narrative, share.\n\
                 Format: {\"palette\": {\"primary\": \"#hex\", \"secondary\": \"#hex\", \"accent\": \"#hex\", \
                 \"background\": \"#hex\", \"text\": \"#ffffff\"}, \
                 \"slides\": {\"intro\": {\"visualization\": \"aurora\", \"mood\": \"dramatic\", \"intensity\": 0.8}}}"
            }
        }
    }

    pub fn fallback(self) -> Value {
        match self {
            Self::Narrative => json!({
                "narrative": "Your musical journey was too epic to put into words."
            }),
            Self::Personality => json!({
                "type": "The Mystery Listener",
                "tagline": "Your taste defies classification",
                "description": "We couldn't quite figure you out, but that's probably a compliment.",
                "spirit_animal": "A sphinx"
            }),
            Self::Roast => json!({
                "roasts": ["Your music taste is so unique, we couldn't even roast it properly."]
            }),
            Self::Aura => json!({
                "color": "Cosmic Purple",
                "hex": "#9B59B6",
                "vibe": "Enigmatic and eclectic",
                "description": "Your musical energy transcends simple description."
            }),
            Self::Superlatives => json!({
                "superlatives": [
                    {"award": "Most Dedicated Listener", "reason": "You showed up for your music"}
                ]
            }),
            Self::HotTakes => json!({
                "hot_takes": ["Your music taste is impeccable and we have no notes."]
            }),
            Self::Suggestions => json!({
                "suggestions": ["Keep doing what you're doing - your taste is already excellent."]
            }),
            Self::Theme => default_theme(),
        }
    }

    pub fn prompt(self, year: i32, stats_json: &str) -> String {
        format!(
            "You are writing part of a year-in-review for a music listener's {year} listening year.\n\n\
             User Stats:\n{stats_json}\n\n{}\n\nReturn ONLY valid JSON in the format above.",
            self.instructions()
        )
    }
}

fn default_theme() -> Value {
    let slide = |visualization: &str, mood: &str, intensity: f64| {
        json!({"visualization": visualization, "mood": mood, "intensity": intensity})
    };
    json!({
        "palette": {
            "primary": "#6366F1",
            "secondary": "#8B5CF6",
            "accent": "#EC4899",
            "background": "#0F172A",
            "text": "#FFFFFF"
        },
        "slides": {
            "intro": slide("aurora", "dramatic", 0.8),
            "totalTime": slide("particles", "celebratory", 0.6),
            "topArtist": slide("gradient_blob", "warm", 0.7),
            "topTracks": slide("particles", "energetic", 0.5),
            "listeningClock": slide("aurora", "analytical", 0.4),
            "quirkyStats": slide("particles", "playful", 0.6),
            "personality": slide("gradient_blob", "introspective", 0.7),
            "aura": slide("aurora", "mystical", 0.9),
            "roasts": slide("particles", "chaotic", 0.8),
            "narrative": slide("gradient_blob", "reflective", 0.3),
            "share": slide("aurora", "triumphant", 0.7)
        }
    })
}

/// Best-effort read of a JSON object out of model output.
pub fn parse_response(response: &str) -> Option<Map<String, Value>> {
    let body = strip_code_fence(response);

    if let Some(object) = parse_object(body) {
        return Some(object);
    }
    if let Some(object) = parse_object(&escape_newlines_in_strings(body)) {
        return Some(object);
    }

    lazy_static! {
        static ref FLAT_OBJECT: Regex = Regex::new(r"(?s)\{[^{}]*\}").expect("valid object regex");
    }
    FLAT_OBJECT
        .find(body)
        .and_then(|found| parse_object(found.as_str()))
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn strip_code_fence(response: &str) -> &str {
    let mut body = response.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Models like to put literal line breaks inside string values.
fn escape_newlines_in_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    for ch in text.chars() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                out.push(ch);
                escaped = true;
            }
            '"' => {
                out.push(ch);
                in_string = !in_string;
            }
            '\n' if in_string => out.push_str("\\n"),
            '\r' if in_string => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

/// One kind, never failing: a generator error gives an empty object and an
/// unreadable answer gives the kind's fallback.
pub fn generate_content(
    generator: &dyn TextGenerator,
    kind: ContentKind,
    year: i32,
    stats_json: &str,
) -> Value {
    let response = match generator.generate(&kind.prompt(year, stats_json)) {
        Ok(response) => response,
        Err(err) => {
            warn!("failed to generate {}: {err:#}", kind.key());
            return Value::Object(Map::new());
        }
    };
    match parse_response(&response) {
        Some(object) => Value::Object(object),
        None => {
            debug!("unreadable {} response, using fallback", kind.key());
            kind.fallback()
        }
    }
}

pub fn generate_all(generator: &dyn TextGenerator, document: &StatsDocument) -> Result<Map<String, Value>> {
    let stats_json = document.stats_json()?;
    let mut content = Map::new();
    for (index, kind) in ContentKind::ALL.into_iter().enumerate() {
        debug!(
            "generating {} ({}/{}) for {}",
            kind.key(),
            index + 1,
            ContentKind::ALL.len(),
            document.user
        );
        let value = generate_content(generator, kind, document.year, &stats_json);
        content.insert(kind.key().to_string(), value);
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ListeningHistory;
    use std::cell::RefCell;

    #[test]
    fn parses_fenced_json() {
        let parsed = parse_response("```json\n{\"narrative\": \"hi\"}\n```").expect("object");
        assert_eq!(parsed["narrative"], "hi");

        let bare = parse_response("```\n{\"a\": 1}```").expect("object");
        assert_eq!(bare["a"], 1);
    }

    #[test]
    fn repairs_raw_newlines_inside_strings() {
        let parsed = parse_response("{\"narrative\": \"line one\nline two\"}").expect("object");
        assert_eq!(parsed["narrative"], "line one\nline two");
    }

    #[test]
    fn pulls_object_out_of_chatter() {
        let parsed =
            parse_response("Sure! Here you go: {\"vibe\": \"moody\"} Hope that helps.").expect("object");
        assert_eq!(parsed["vibe"], "moody");
    }

    #[test]
    fn rejects_non_objects() {
        assert!(parse_response("").is_none());
        assert!(parse_response("[1, 2, 3]").is_none());
        assert!(parse_response("no json here").is_none());
    }

    #[test]
    fn fallbacks_are_objects() {
        for kind in ContentKind::ALL {
            assert!(kind.fallback().is_object(), "{}", kind.key());
        }
        assert_eq!(ContentKind::Theme.fallback()["slides"].as_object().map(Map::len), Some(11));
    }

    #[test]
    fn prompt_embeds_stats_and_format() {
        let prompt = ContentKind::Roast.prompt(2024, "{\"total\": {}}");
        assert!(prompt.contains("2024"));
        assert!(prompt.contains("{\"total\": {}}"));
        assert!(prompt.contains("roasts"));
        assert!(prompt.ends_with("Return ONLY valid JSON in the format above."));
    }

    #[test]
    fn noop_generator_yields_fallbacks() {
        let document = StatsDocument::build(&ListeningHistory::new("u", 2024, Vec::new()), 10);
        let content = generate_all(&NoopGenerator, &document).expect("content");
        assert_eq!(content.len(), ContentKind::ALL.len());
        assert_eq!(content["narrative"], ContentKind::Narrative.fallback());
        assert_eq!(content["hot_takes"], ContentKind::HotTakes.fallback());
    }

    #[test]
    fn generator_errors_leave_empty_objects() {
        let calls = RefCell::new(0);
        let flaky = |prompt: &str| -> Result<String> {
            *calls.borrow_mut() += 1;
            if prompt.contains("light-hearted roasts") {
                anyhow::bail!("service unavailable");
            }
            Ok(String::from("{\"ok\": true}"))
        };
        let document = StatsDocument::build(&ListeningHistory::new("u", 2024, Vec::new()), 10);
        let content = generate_all(&flaky, &document).expect("content");

        assert_eq!(*calls.borrow(), ContentKind::ALL.len());
        assert_eq!(content["roast"], json!({}));
        assert_eq!(content["aura"], json!({"ok": true}));
    }
}
