//! Telegram update handlers.
//!
//! Every update passes the operator gate first. After that, slash commands go
//! to `commands` and free text goes to `text`. Both reply through
//! `MessagingPort`, so nothing below the gate touches teloxide.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use lmb_core::{
    commands::OperatorCommand,
    domain::{ChatId, UserId},
    security::is_operator,
};

use crate::router::AppState;

mod commands;
mod text;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let user_id = msg.from().map(|u| UserId(u.id.0 as i64));

    if !is_operator(user_id, state.cfg.owner_id) {
        tracing::debug!(
            chat_id = msg.chat.id.0,
            user_id = ?user_id.map(|u| u.0),
            "ignoring update from non-operator"
        );
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    dispatch_text(&state, ChatId(msg.chat.id.0), text).await;
    Ok(())
}

pub(crate) async fn dispatch_text(state: &Arc<AppState>, chat: ChatId, text: &str) {
    match OperatorCommand::parse(text) {
        Some(cmd) => commands::handle_command(state, chat, cmd).await,
        None => text::handle_text(state, chat, text).await,
    }
}

async fn reply(state: &AppState, chat: ChatId, html: &str) {
    if let Err(e) = state.messenger.send_html(chat, html).await {
        tracing::warn!(chat_id = chat.0, error = %e, "reply failed");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use lmb_core::{
        config::Config,
        domain::{ChatId, ChatReference, MessageId, MessageRef, ResolvedChat, SourceMessage},
        errors::Error,
        messaging::port::MessagingPort,
        ports::{ChatPlatform, CopyOutcome},
        Result,
    };

    use crate::router::AppState;

    pub const OPERATOR_CHAT: ChatId = ChatId(42);

    #[derive(Default)]
    pub struct FakeMessenger {
        pub sent: Mutex<Vec<String>>,
        pub edits: Mutex<Vec<String>>,
    }

    impl FakeMessenger {
        pub fn last_sent(&self) -> Option<String> {
            self.sent.lock().unwrap().last().cloned()
        }

        pub fn last_edit(&self) -> Option<String> {
            self.edits.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(html.to_string());
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(sent.len() as i32),
            })
        }

        async fn edit_html(&self, _msg: MessageRef, html: &str) -> Result<()> {
            self.edits.lock().unwrap().push(html.to_string());
            Ok(())
        }
    }

    /// Platform where every chat is unknown.
    pub struct UnreachablePlatform;

    #[async_trait]
    impl ChatPlatform for UnreachablePlatform {
        async fn resolve_chat(&self, reference: &ChatReference) -> Result<ResolvedChat> {
            Err(Error::ChatResolution {
                reference: reference.to_string(),
                reason: "chat not found".to_string(),
            })
        }

        async fn fetch_messages(
            &self,
            _chat_id: ChatId,
            ids: &[MessageId],
        ) -> Result<Vec<Option<SourceMessage>>> {
            Ok(vec![None; ids.len()])
        }

        async fn copy_message(
            &self,
            _from: ChatId,
            _message_id: MessageId,
            _to: &ChatReference,
            _caption: &str,
        ) -> CopyOutcome {
            CopyOutcome::Failed("unreachable".to_string())
        }
    }

    pub fn app_state() -> (Arc<AppState>, Arc<FakeMessenger>) {
        let cfg = Config::from_vars(|key| match key {
            "TELEGRAM_BOT_TOKEN" => Some("token".to_string()),
            "OWNER_ID" => Some(OPERATOR_CHAT.0.to_string()),
            _ => None,
        })
        .unwrap();
        let messenger = Arc::new(FakeMessenger::default());
        let state = Arc::new(AppState::new(
            Arc::new(cfg),
            Arc::new(UnreachablePlatform),
            messenger.clone(),
        ));
        (state, messenger)
    }
}
