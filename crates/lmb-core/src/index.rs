use std::collections::HashMap;

use crate::{
    caption::{normalize, CaptionKey},
    domain::{ChatId, MessageId, MessageRange},
    errors::Error,
    ports::ChatPlatform,
    scan::RangeScanner,
    Result,
};

/// Caption key -> message id for one target in one run.
#[derive(Clone, Debug, Default)]
pub struct CaptionIndex {
    entries: HashMap<CaptionKey, MessageId>,
}

impl CaptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is empty or already present.
    /// Returns whether the entry was stored.
    pub fn insert_first(&mut self, key: CaptionKey, message_id: MessageId) -> bool {
        if key.is_empty() || self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, message_id);
        true
    }

    pub fn get(&self, key: &CaptionKey) -> Option<MessageId> {
        if key.is_empty() {
            return None;
        }
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Index every captioned photo in `range`, first occurrence wins.
///
/// No retries here: a remote failure aborts the build and nothing partial is
/// returned.
pub async fn build_index(
    platform: &dyn ChatPlatform,
    chat_id: ChatId,
    range: MessageRange,
    batch_size: usize,
) -> Result<CaptionIndex> {
    let mut index = CaptionIndex::new();
    let mut duplicates = 0usize;
    let mut scanner = RangeScanner::new(platform, chat_id, range, batch_size);

    loop {
        let msg = match scanner.next().await {
            Ok(Some(msg)) => msg,
            Ok(None) => break,
            Err(e) => {
                return Err(Error::IndexBuild {
                    target: chat_id.0.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        if !msg.has_photo {
            continue;
        }
        let key = normalize(msg.caption.as_deref());
        if key.is_empty() {
            continue;
        }
        if !index.insert_first(key, msg.id) {
            duplicates += 1;
        }
    }

    tracing::info!(
        chat_id = chat_id.0,
        entries = index.len(),
        duplicates,
        "caption index built"
    );
    Ok(index)
}
