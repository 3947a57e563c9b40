use std::fmt;

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A chat as the operator typed it: numeric id or public handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatReference {
    Id(i64),
    Handle(String),
}

impl ChatReference {
    /// Strips an optional leading `@` and coerces signed digit strings to `Id`.
    pub fn parse(text: &str) -> Self {
        let s = text.trim();
        let s = s.strip_prefix('@').unwrap_or(s);
        let digits = s.strip_prefix(&['-', '+'][..]).unwrap_or(s);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = s.parse::<i64>() {
                return ChatReference::Id(id);
            }
        }
        ChatReference::Handle(s.to_string())
    }
}

impl fmt::Display for ChatReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatReference::Id(id) => write!(f, "{id}"),
            ChatReference::Handle(h) => write!(f, "@{h}"),
        }
    }
}

/// Inclusive message id range. Order of the endpoints does not matter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageRange {
    pub start: MessageId,
    pub end: MessageId,
}

impl MessageRange {
    pub fn new(start: MessageId, end: MessageId) -> Self {
        Self { start, end }
    }

    pub fn lo(&self) -> MessageId {
        self.start.min(self.end)
    }

    pub fn hi(&self) -> MessageId {
        self.start.max(self.end)
    }

    /// Number of ids covered, both endpoints included.
    pub fn span(&self) -> u64 {
        (i64::from(self.hi().0) - i64::from(self.lo().0) + 1) as u64
    }
}

/// The slice of a remote message the relay engine looks at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMessage {
    pub id: MessageId,
    pub has_photo: bool,
    pub caption: Option<String>,
    /// Deleted/service placeholder with no content.
    pub is_empty: bool,
}

/// Result of looking a chat up on the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedChat {
    pub id: ChatId,
    pub handle: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_and_handle_references() {
        assert_eq!(
            ChatReference::parse("-1001234567890"),
            ChatReference::Id(-1001234567890)
        );
        assert_eq!(ChatReference::parse(" 42 "), ChatReference::Id(42));
        assert_eq!(
            ChatReference::parse("@photo_list"),
            ChatReference::Handle("photo_list".to_string())
        );
        assert_eq!(
            ChatReference::parse("photo_list"),
            ChatReference::Handle("photo_list".to_string())
        );
        assert_eq!(
            ChatReference::parse("-abc"),
            ChatReference::Handle("-abc".to_string())
        );
    }

    #[test]
    fn range_is_order_independent() {
        let r = MessageRange::new(MessageId(120), MessageId(100));
        assert_eq!(r.lo(), MessageId(100));
        assert_eq!(r.hi(), MessageId(120));
        assert_eq!(r.span(), 21);
    }
}
