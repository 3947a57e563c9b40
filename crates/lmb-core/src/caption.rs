//! Caption canonicalization used as the matching key between channels.

use std::sync::OnceLock;

use caseless::default_case_fold_str;
use regex::Regex;

static URL_IN_TEXT_RE: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

fn url_in_text_re() -> &'static Regex {
    URL_IN_TEXT_RE.get_or_init(|| {
        Regex::new(r"(?i)(?:https?://\S+|t\.me/\S+|telegram\.(?:me|dog)/\S+)")
            .expect("static url regex is valid")
    })
}

fn whitespace_re() -> &'static Regex {
    WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("static whitespace regex is valid"))
}

/// Normalized caption. The empty key never takes part in matching.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptionKey(String);

impl CaptionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Canonicalize a caption for comparison.
///
/// Links are dropped, whitespace runs collapse to one space and the result is
/// Unicode case-folded, so `"Sunset  view https://x"` and `"SUNSET VIEW"`
/// share a key, as do `"STRASSE"` and `"straße"`.
pub fn normalize(raw: Option<&str>) -> CaptionKey {
    let Some(raw) = raw else {
        return CaptionKey(String::new());
    };
    let t = url_in_text_re().replace_all(raw.trim(), "");
    let t = whitespace_re().replace_all(&t, " ");
    CaptionKey(default_case_fold_str(t.trim()))
}
