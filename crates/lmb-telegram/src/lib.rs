//! Telegram adapter (teloxide).
//!
//! This crate implements the `lmb-core` ports over the Telegram Bot API:
//! `MessagingPort` for operator replies and `ChatPlatform` for relay traffic.

use std::time::Duration;

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ParseMode, Recipient},
    ApiError, RequestError,
};

use tokio::time::sleep;

pub mod handlers;
pub mod platform;
pub mod router;

use lmb_core::{
    domain::{ChatId, ChatReference, MessageId, MessageRef},
    errors::Error,
    messaging::port::MessagingPort,
    Result,
};

pub use platform::TelegramPlatform;

fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
    teloxide::types::ChatId(chat_id.0)
}

fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
    teloxide::types::MessageId(message_id.0)
}

fn recipient(reference: &ChatReference) -> Recipient {
    match reference {
        ChatReference::Id(id) => Recipient::Id(teloxide::types::ChatId(*id)),
        ChatReference::Handle(h) => Recipient::ChannelUsername(format!("@{h}")),
    }
}

fn map_err(e: RequestError) -> Error {
    Error::External(format!("telegram error: {e}"))
}

fn retry_after(e: &RequestError) -> Option<Duration> {
    match e {
        RequestError::RetryAfter(wait) => Some(*wait),
        _ => None,
    }
}

/// Ids that hold nothing readable: deleted posts and service messages
/// (pins, title changes), which cannot be forwarded.
fn is_not_found(e: &RequestError) -> bool {
    matches!(
        e,
        RequestError::Api(
            ApiError::MessageToForwardNotFound
                | ApiError::MessageIdInvalid
                | ApiError::MessageCantBeForwarded
        )
    )
}

/// Run a request, sleeping and retrying once on a 429.
async fn with_retry<T, Fut>(mut op: impl FnMut() -> Fut) -> std::result::Result<T, RequestError>
where
    Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
    Fut::IntoFuture: Send,
{
    const MAX_RETRIES: usize = 1;
    let mut attempts = 0usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => match retry_after(&e) {
                Some(d) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    tracing::warn!(wait_secs = d.as_secs(), "telegram rate limit, retrying once");
                    sleep(d).await;
                }
                _ => return Err(e),
            },
        }
    }
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = with_retry(|| {
            self.bot
                .send_message(tg_chat(chat_id), html.to_string())
                .parse_mode(ParseMode::Html)
        })
        .await
        .map_err(map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
        let res = with_retry(|| {
            self.bot
                .edit_message_text(tg_chat(msg.chat_id), tg_msg_id(msg.message_id), html.to_string())
                .parse_mode(ParseMode::Html)
        })
        .await;
        match res {
            Ok(_) => Ok(()),
            // Same text twice is not worth an error.
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(map_err(e)),
        }
    }
}
