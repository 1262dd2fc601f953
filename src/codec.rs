//! Lora spec text codec
//!
//! Converts between the free-text `<lora:name:strength>` DSL and an ordered
//! list of structured entries. Decoding is lossy about formatting; encoding
//! is surgical: it rewrites only token regions and preserves every other
//! byte of the previous text, so repeated round-trips never corrupt text the
//! user typed around the tokens.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

lazy_static! {
    /// `<lora:name>`, `<lora:name:strength>` or `<lora:name:strength:clip>`
    static ref LORA_TOKEN: Regex =
        Regex::new(r"(?i)<lora:([^:>]+)(?::([^:>]+))?(?::([^:>]+))?>").unwrap();
}

/// Model and clip strengths closer than this are emitted in the single-
/// strength token form.
const CLIP_EPSILON: f64 = 1e-3;

/// A named adjustable-strength modifier selectable for application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraEntry {
    pub name: String,
    pub strength: f64,
    /// Separate clip strength; `None` means "same as `strength`"
    #[serde(
        default,
        rename = "clipStrength",
        skip_serializing_if = "Option::is_none"
    )]
    pub clip_strength: Option<f64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl LoraEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, strength: f64) -> Self {
        Self {
            name: name.into(),
            strength,
            clip_strength: None,
            active: true,
        }
    }

    #[must_use]
    pub fn with_clip(mut self, clip_strength: f64) -> Self {
        self.clip_strength = Some(clip_strength);
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Clip strength, falling back to the model strength.
    #[must_use]
    pub fn effective_clip(&self) -> f64 {
        self.clip_strength.unwrap_or(self.strength)
    }
}

/// A region of lora spec text: either plain text or a well-formed token.
#[derive(Debug)]
enum Segment<'a> {
    Text(&'a str),
    Token {
        name: &'a str,
        strength: f64,
        clip: Option<f64>,
        raw: &'a str,
    },
}

/// Split `text` into plain-text and token segments.
///
/// A token whose strength fails to parse as a number is malformed and stays
/// inside the surrounding plain text.
fn tokenize(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in LORA_TOKEN.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let name = caps.get(1).unwrap().as_str();

        let strength = match caps.get(2) {
            Some(m) => match m.as_str().trim().parse::<f64>() {
                Ok(v) => v,
                Err(_) => continue, // malformed: leave in place as plain text
            },
            None => 1.0,
        };
        let clip = match caps.get(3) {
            Some(m) => match m.as_str().trim().parse::<f64>() {
                Ok(v) => Some(v),
                Err(_) => continue,
            },
            None => None,
        };

        if whole.start() > last {
            segments.push(Segment::Text(&text[last..whole.start()]));
        }
        segments.push(Segment::Token {
            name,
            strength,
            clip,
            raw: whole.as_str(),
        });
        last = whole.end();
    }

    if last < text.len() {
        segments.push(Segment::Text(&text[last..]));
    }
    segments
}

/// Extract every well-formed token in left-to-right order.
///
/// Duplicate names collapse to a single entry: the first occurrence's
/// position, the last occurrence's strengths. Decoded entries are active.
#[must_use]
pub fn decode(text: &str) -> Vec<LoraEntry> {
    let mut entries: Vec<LoraEntry> = Vec::new();
    for segment in tokenize(text) {
        if let Segment::Token {
            name,
            strength,
            clip,
            ..
        } = segment
        {
            if let Some(existing) = entries.iter_mut().find(|e| e.name == name) {
                existing.strength = strength;
                existing.clip_strength = clip;
            } else {
                entries.push(LoraEntry {
                    name: name.to_string(),
                    strength,
                    clip_strength: clip,
                    active: true,
                });
            }
        }
    }
    entries
}

/// Rewrite only the token regions of `previous_text` to reflect `entries`.
///
/// Tokens are matched to entries by name: matched tokens are rewritten in
/// place (keeping their original spelling when the strengths already agree),
/// tokens without an entry are deleted, and entries without a token are
/// appended at the end. All non-token text is preserved byte-for-byte.
#[must_use]
pub fn encode(previous_text: &str, entries: &[LoraEntry]) -> String {
    let mut out = String::with_capacity(previous_text.len());
    let mut written: HashSet<&str> = HashSet::new();

    for segment in tokenize(previous_text) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Token {
                name,
                strength,
                clip,
                raw,
            } => {
                let entry = entries.iter().find(|e| e.name == name);
                match entry {
                    Some(entry) if !written.contains(name) => {
                        written.insert(name);
                        if token_matches(entry, strength, clip) {
                            out.push_str(raw);
                        } else {
                            out.push_str(&format_token(entry));
                        }
                    }
                    // removed entry, or a duplicate token already rewritten
                    _ => {}
                }
            }
        }
    }

    for entry in entries {
        if !written.contains(entry.name.as_str()) {
            if !out.is_empty() && !out.ends_with(char::is_whitespace) {
                out.push(' ');
            }
            out.push_str(&format_token(entry));
        }
    }
    out
}

/// Union `incoming` into `current` by name.
///
/// Present in both: keep `current`'s position and `active` flag, adopt
/// `incoming`'s strengths. Only in `incoming`: appended at the end, active.
/// Only in `current`: kept unchanged. Total and deterministic: merging is
/// how the text-derived and widget-derived representations reconcile
/// without discarding user edits on either side.
#[must_use]
pub fn merge(incoming: &[LoraEntry], current: &[LoraEntry]) -> Vec<LoraEntry> {
    let mut merged = current.to_vec();
    for inc in incoming {
        if let Some(existing) = merged.iter_mut().find(|e| e.name == inc.name) {
            existing.strength = inc.strength;
            existing.clip_strength = inc.clip_strength;
        } else {
            let mut appended = inc.clone();
            appended.active = true;
            merged.push(appended);
        }
    }
    merged
}

/// Format an entry as a token, using the dual-strength form only when the
/// clip strength meaningfully differs from the model strength.
#[must_use]
pub fn format_token(entry: &LoraEntry) -> String {
    let clip = entry.effective_clip();
    if (clip - entry.strength).abs() > CLIP_EPSILON {
        format!("<lora:{}:{}:{}>", entry.name, entry.strength, clip)
    } else {
        format!("<lora:{}:{}>", entry.name, entry.strength)
    }
}

/// Whether an existing token already encodes the entry's strengths.
fn token_matches(entry: &LoraEntry, strength: f64, clip: Option<f64>) -> bool {
    let token_clip = clip.unwrap_or(strength);
    (entry.strength - strength).abs() <= CLIP_EPSILON
        && (entry.effective_clip() - token_clip).abs() <= CLIP_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_extracts_tokens_in_order() {
        let entries = decode("intro <lora:foo:0.8> middle <lora:bar:1.2> end");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "foo");
        assert_eq!(entries[0].strength, 0.8);
        assert_eq!(entries[1].name, "bar");
        assert_eq!(entries[1].strength, 1.2);
        assert!(entries.iter().all(|e| e.active));
    }

    #[test]
    fn decode_strength_defaults_to_one() {
        let entries = decode("<lora:foo>");
        assert_eq!(entries[0].strength, 1.0);
    }

    #[test]
    fn decode_ignores_malformed_tokens() {
        assert!(decode("<lora:foo:abc>").is_empty());
        assert!(decode("<lora::0.5>").is_empty());
        assert!(decode("<notlora:foo:0.5>").is_empty());
    }

    #[test]
    fn decode_parses_clip_strength() {
        let entries = decode("<lora:foo:0.8:0.6>");
        assert_eq!(entries[0].strength, 0.8);
        assert_eq!(entries[0].clip_strength, Some(0.6));
    }

    #[test]
    fn decode_is_case_insensitive_on_keyword() {
        let entries = decode("<LoRA:foo:0.5>");
        assert_eq!(entries[0].name, "foo");
    }

    #[test]
    fn decode_collapses_duplicates_to_last_strength_first_position() {
        let entries = decode("<lora:foo:0.5> <lora:bar:1> <lora:foo:0.9>");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "foo");
        assert_eq!(entries[0].strength, 0.9);
        assert_eq!(entries[1].name, "bar");
    }

    #[test]
    fn round_trip_is_byte_stable() {
        let text = "a prompt <lora:foo:0.8>, with <lora:bar> style";
        assert_eq!(encode(text, &decode(text)), text);
    }

    #[test]
    fn round_trip_keeps_unusual_strength_spelling() {
        // 0.80 parses to the same value; the original spelling must survive
        let text = "<lora:foo:0.80>";
        assert_eq!(encode(text, &decode(text)), text);
    }

    #[test]
    fn encode_preserves_non_token_text() {
        let text = "masterpiece, best quality <lora:foo:0.5> trailing";
        let updated = encode(text, &[LoraEntry::new("foo", 1.0)]);
        assert!(updated.contains("masterpiece, best quality "));
        assert!(updated.contains(" trailing"));
        assert!(updated.contains("<lora:foo:1>"));
    }

    #[test]
    fn encode_deletes_removed_entries() {
        let text = "keep <lora:foo:0.5> this";
        assert_eq!(encode(text, &[]), "keep  this");
    }

    #[test]
    fn encode_appends_new_entries() {
        let updated = encode(
            "prompt",
            &[LoraEntry::new("foo", 0.8), LoraEntry::new("bar", 0.5)],
        );
        assert_eq!(updated, "prompt <lora:foo:0.8> <lora:bar:0.5>");
    }

    #[test]
    fn encode_on_empty_text() {
        assert_eq!(encode("", &[LoraEntry::new("foo", 0.8)]), "<lora:foo:0.8>");
    }

    #[test]
    fn encode_emits_dual_form_when_clip_differs() {
        let entry = LoraEntry::new("foo", 0.8).with_clip(0.5);
        assert_eq!(format_token(&entry), "<lora:foo:0.8:0.5>");
        let same = LoraEntry::new("foo", 0.8).with_clip(0.8);
        assert_eq!(format_token(&same), "<lora:foo:0.8>");
    }

    #[test]
    fn merge_is_idempotent() {
        let list = vec![
            LoraEntry::new("foo", 0.8),
            LoraEntry::new("bar", 0.5).inactive(),
        ];
        assert_eq!(merge(&list, &list), list);
    }

    #[test]
    fn merge_keeps_current_active_flag_and_adopts_incoming_strength() {
        let current = vec![LoraEntry::new("foo", 0.8).inactive()];
        let incoming = vec![LoraEntry::new("foo", 0.3)];
        let merged = merge(&incoming, &current);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].strength, 0.3);
        assert!(!merged[0].active);
    }

    #[test]
    fn merge_appends_new_entries_active() {
        let current = vec![LoraEntry::new("foo", 0.8)];
        let incoming = vec![LoraEntry::new("bar", 0.5).inactive()];
        let merged = merge(&incoming, &current);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].name, "bar");
        assert!(merged[1].active);
    }

    #[test]
    fn merge_keeps_entries_missing_from_incoming() {
        let current = vec![LoraEntry::new("foo", 0.8), LoraEntry::new("bar", 0.5)];
        let incoming = vec![LoraEntry::new("foo", 1.0)];
        let merged = merge(&incoming, &current);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1], current[1]);
    }

    #[test]
    fn widget_payload_round_trips_through_serde() {
        let json = r#"{"name":"foo","strength":0.8,"clipStrength":0.6,"active":false}"#;
        let entry: LoraEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.clip_strength, Some(0.6));
        assert!(!entry.active);

        let defaulted: LoraEntry = serde_json::from_str(r#"{"name":"x","strength":1.0}"#).unwrap();
        assert!(defaulted.active);
    }
}
