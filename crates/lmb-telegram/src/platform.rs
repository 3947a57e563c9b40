use async_trait::async_trait;
use teloxide::{prelude::*, ApiError, RequestError};

use lmb_core::{
    domain::{ChatId, ChatReference, MessageId, ResolvedChat, SourceMessage},
    errors::Error,
    ports::{ChatPlatform, CopyOutcome},
    Result,
};

use crate::{is_not_found, map_err, recipient, retry_after, tg_chat, tg_msg_id, with_retry};

/// `ChatPlatform` over the Bot API.
///
/// The Bot API cannot read channel history by id, so messages are inspected
/// by forwarding them into a peek chat the bot controls and deleting the
/// forwarded copy right after.
#[derive(Clone)]
pub struct TelegramPlatform {
    bot: Bot,
    peek_chat: ChatId,
}

impl TelegramPlatform {
    pub fn new(bot: Bot, peek_chat: ChatId) -> Self {
        Self { bot, peek_chat }
    }

    async fn peek(&self, chat_id: ChatId, id: MessageId) -> Result<Option<SourceMessage>> {
        let forwarded = with_retry(|| {
            self.bot
                .forward_message(tg_chat(self.peek_chat), tg_chat(chat_id), tg_msg_id(id))
                .disable_notification(true)
        })
        .await;

        let msg = match forwarded {
            Ok(msg) => msg,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(map_err(e)),
        };

        let seen = SourceMessage {
            id,
            has_photo: msg.photo().is_some(),
            caption: msg.caption().map(str::to_string),
            is_empty: false,
        };

        if let Err(e) = with_retry(|| self.bot.delete_message(msg.chat.id, msg.id)).await {
            tracing::warn!(
                peek_chat = self.peek_chat.0,
                message_id = msg.id.0,
                error = %e,
                "failed to clean up peeked message"
            );
        }

        Ok(Some(seen))
    }
}

#[async_trait]
impl ChatPlatform for TelegramPlatform {
    async fn resolve_chat(&self, reference: &ChatReference) -> Result<ResolvedChat> {
        let chat = with_retry(|| self.bot.get_chat(recipient(reference)))
            .await
            .map_err(|e| {
                let reason = match &e {
                    RequestError::Api(ApiError::ChatNotFound) => "chat not found".to_string(),
                    other => other.to_string(),
                };
                Error::ChatResolution {
                    reference: reference.to_string(),
                    reason,
                }
            })?;

        Ok(ResolvedChat {
            id: ChatId(chat.id.0),
            handle: chat.username().map(str::to_string),
        })
    }

    async fn fetch_messages(
        &self,
        chat_id: ChatId,
        ids: &[MessageId],
    ) -> Result<Vec<Option<SourceMessage>>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(self.peek(chat_id, *id).await?);
        }
        Ok(out)
    }

    async fn copy_message(
        &self,
        from: ChatId,
        message_id: MessageId,
        to: &ChatReference,
        caption: &str,
    ) -> CopyOutcome {
        let res = self
            .bot
            .copy_message(recipient(to), tg_chat(from), tg_msg_id(message_id))
            .caption(caption.to_string())
            .await;

        match res {
            Ok(_) => CopyOutcome::Sent,
            Err(e) => match retry_after(&e) {
                Some(wait) => CopyOutcome::RateLimited(wait),
                None => CopyOutcome::Failed(e.to_string()),
            },
        }
    }
}
