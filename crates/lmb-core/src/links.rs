//! Telegram deep links: parsing operator-supplied post links and building
//! permalinks for relayed captions.

use std::sync::OnceLock;

use regex::Regex;

use crate::{
    domain::{ChatId, ChatReference, MessageId},
    errors::Error,
    Result,
};

/// Bot API channel ids are the internal id prefixed with `-100`.
const CHANNEL_ID_PREFIX: &str = "-100";

/// Appended between the original caption and the permalink.
pub const LINK_LABEL: &str = "🔗 Link:";

static POST_LINK_RE: OnceLock<Regex> = OnceLock::new();

fn post_link_re() -> &'static Regex {
    // t.me/username/123 OR t.me/c/123456789/123
    POST_LINK_RE.get_or_init(|| {
        Regex::new(r"(?i)(?:https?://)?t\.me/(c/)?([^/\s]+)/(\d+)").expect("valid regex")
    })
}

/// A parsed post link. The chat part is informational only: runs always use
/// the chat configured for the range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostLink {
    pub chat: ChatReference,
    pub message_id: MessageId,
}

pub fn parse_post_link(text: &str) -> Result<PostLink> {
    let caps = post_link_re()
        .captures(text.trim())
        .ok_or_else(|| Error::LinkParse(format!("not a t.me post link: {:?}", text.trim())))?;

    let is_private = caps.get(1).is_some();
    let chat_part = &caps[2];
    let message_id = caps[3]
        .parse::<i32>()
        .map_err(|_| Error::LinkParse(format!("message id out of range: {}", &caps[3])))?;

    let chat = if is_private {
        let id = format!("{CHANNEL_ID_PREFIX}{chat_part}")
            .parse::<i64>()
            .map_err(|_| Error::LinkParse(format!("invalid private chat id: {chat_part}")))?;
        ChatReference::Id(id)
    } else {
        ChatReference::Handle(chat_part.to_string())
    };

    Ok(PostLink {
        chat,
        message_id: MessageId(message_id),
    })
}

/// Public link when the chat has a handle, private `t.me/c/...` link otherwise.
pub fn build_link(handle: Option<&str>, chat_id: ChatId, message_id: MessageId) -> String {
    if let Some(handle) = handle.filter(|h| !h.is_empty()) {
        return format!("https://t.me/{handle}/{}", message_id.0);
    }
    let raw = chat_id.0.to_string();
    let internal = raw
        .strip_prefix(CHANNEL_ID_PREFIX)
        .or_else(|| raw.strip_prefix('-'))
        .unwrap_or(&raw);
    format!("https://t.me/c/{internal}/{}", message_id.0)
}

/// Original caption, blank line, then the labeled link.
///
/// `limit` is in UTF-16 code units, the way Telegram counts caption length.
/// When the result would exceed it the original caption is shortened so the
/// link is never cut off.
pub fn compose_relay_caption(original: Option<&str>, link: &str, limit: usize) -> String {
    let original = original.unwrap_or("").trim();
    let suffix = format!("\n\n{LINK_LABEL} {link}");

    let full = format!("{original}{suffix}");
    if utf16_len(&full) <= limit {
        return full.trim().to_string();
    }

    // One unit is reserved for the ellipsis.
    let room = limit.saturating_sub(utf16_len(&suffix) + 1);
    if room == 0 {
        return format!("{LINK_LABEL} {link}");
    }
    let head = take_utf16(original, room);
    format!("{}…{suffix}", head.trim_end()).trim().to_string()
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Longest prefix of `s` that fits in `units` UTF-16 code units without
/// splitting a character.
fn take_utf16(s: &str, units: usize) -> &str {
    let mut used = 0;
    for (i, c) in s.char_indices() {
        used += c.len_utf16();
        if used > units {
            return &s[..i];
        }
    }
    s
}
