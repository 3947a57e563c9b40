use std::collections::VecDeque;

use crate::{
    domain::{ChatId, MessageId, MessageRange, SourceMessage},
    ports::ChatPlatform,
    Result,
};

pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Lazy, ascending walk over a chat's message range.
///
/// Ids are fetched in `batch_size` windows, one remote call per window, and
/// handed out one message at a time. Missing ids and empty placeholders are
/// skipped. A scanner is single-use: scan again by building a new one.
pub struct RangeScanner<'a> {
    platform: &'a dyn ChatPlatform,
    chat_id: ChatId,
    cursor: i64,
    hi: i64,
    batch_size: usize,
    buffer: VecDeque<SourceMessage>,
}

impl<'a> RangeScanner<'a> {
    pub fn new(
        platform: &'a dyn ChatPlatform,
        chat_id: ChatId,
        range: MessageRange,
        batch_size: usize,
    ) -> Self {
        Self {
            platform,
            chat_id,
            cursor: i64::from(range.lo().0),
            hi: i64::from(range.hi().0),
            batch_size: batch_size.max(1),
            buffer: VecDeque::new(),
        }
    }

    /// Next non-empty message, or `None` once the range is exhausted.
    pub async fn next(&mut self) -> Result<Option<SourceMessage>> {
        loop {
            if let Some(msg) = self.buffer.pop_front() {
                return Ok(Some(msg));
            }
            if self.cursor > self.hi {
                return Ok(None);
            }
            self.fill().await?;
        }
    }

    async fn fill(&mut self) -> Result<()> {
        let end = (self.cursor + self.batch_size as i64 - 1).min(self.hi);
        // Range endpoints come from i32 ids, so every id in between fits.
        let ids: Vec<MessageId> = (self.cursor..=end)
            .map(|id| MessageId(id as i32))
            .collect();
        self.cursor = end + 1;

        let batch = self.platform.fetch_messages(self.chat_id, &ids).await?;
        tracing::debug!(
            chat_id = self.chat_id.0,
            first = ids.first().map(|m| m.0),
            last = ids.last().map(|m| m.0),
            found = batch.iter().filter(|m| m.is_some()).count(),
            "scanned batch"
        );

        let mut kept: Vec<SourceMessage> = batch
            .into_iter()
            .flatten()
            .filter(|m| !m.is_empty)
            .collect();
        kept.sort_by_key(|m| m.id);
        self.buffer.extend(kept);
        Ok(())
    }
}
