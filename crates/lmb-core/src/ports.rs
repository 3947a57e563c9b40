use std::time::Duration;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, ChatReference, MessageId, ResolvedChat, SourceMessage},
    Result,
};

/// Outcome of a single copy call.
///
/// Rate limiting is an expected answer from the platform, not an error, so the
/// relay driver can decide on the backoff explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CopyOutcome {
    Sent,
    RateLimited(Duration),
    Failed(String),
}

/// Hexagonal port for the chat platform the relay reads from and posts to.
///
/// Telegram is implemented in the adapter crate; tests use in-memory fakes.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Look a chat up. Fails with `Error::ChatResolution` when the chat does
    /// not exist or the bot cannot see it.
    async fn resolve_chat(&self, reference: &ChatReference) -> Result<ResolvedChat>;

    /// Fetch a batch of messages. The result is aligned with `ids`; `None`
    /// marks ids with no retrievable message.
    async fn fetch_messages(
        &self,
        chat_id: ChatId,
        ids: &[MessageId],
    ) -> Result<Vec<Option<SourceMessage>>>;

    /// Copy `message_id` from `from` into `to`, replacing its caption.
    async fn copy_message(
        &self,
        from: ChatId,
        message_id: MessageId,
        to: &ChatReference,
        caption: &str,
    ) -> CopyOutcome;
}

/// Numeric references need no remote call; handles cost one lookup.
pub async fn resolve_id(platform: &dyn ChatPlatform, reference: &ChatReference) -> Result<ChatId> {
    match reference {
        ChatReference::Id(id) => Ok(ChatId(*id)),
        ChatReference::Handle(_) => Ok(platform.resolve_chat(reference).await?.id),
    }
}

/// Public handle of a chat, if it has one.
pub async fn resolve_handle(platform: &dyn ChatPlatform, chat_id: ChatId) -> Result<Option<String>> {
    Ok(platform
        .resolve_chat(&ChatReference::Id(chat_id.0))
        .await?
        .handle)
}

/// Fetch one message by id.
pub async fn fetch_one(
    platform: &dyn ChatPlatform,
    chat_id: ChatId,
    message_id: MessageId,
) -> Result<Option<SourceMessage>> {
    let mut batch = platform.fetch_messages(chat_id, &[message_id]).await?;
    Ok(batch.pop().flatten())
}
