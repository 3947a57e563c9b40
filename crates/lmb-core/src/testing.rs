//! In-memory `ChatPlatform` used by the engine tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, ChatReference, MessageId, ResolvedChat, SourceMessage},
    errors::Error,
    ports::{ChatPlatform, CopyOutcome},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyCall {
    pub from: ChatId,
    pub message_id: MessageId,
    pub to: ChatReference,
    pub caption: String,
}

#[derive(Default)]
pub struct FakePlatform {
    chats: HashMap<i64, Option<String>>,
    messages: HashMap<(i64, i32), SourceMessage>,
    failing_chats: HashSet<i64>,
    pub fetch_calls: Mutex<Vec<(ChatId, Vec<MessageId>)>>,
    pub resolve_calls: Mutex<usize>,
    pub copy_script: Mutex<VecDeque<CopyOutcome>>,
    pub copies: Mutex<Vec<CopyCall>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chat(mut self, id: i64, handle: Option<&str>) -> Self {
        self.chats.insert(id, handle.map(str::to_string));
        self
    }

    pub fn with_photo(self, chat: i64, id: i32, caption: Option<&str>) -> Self {
        self.with_message(
            chat,
            SourceMessage {
                id: MessageId(id),
                has_photo: true,
                caption: caption.map(str::to_string),
                is_empty: false,
            },
        )
    }

    pub fn with_text(self, chat: i64, id: i32, text: &str) -> Self {
        self.with_message(
            chat,
            SourceMessage {
                id: MessageId(id),
                has_photo: false,
                caption: Some(text.to_string()),
                is_empty: false,
            },
        )
    }

    pub fn with_placeholder(self, chat: i64, id: i32) -> Self {
        self.with_message(
            chat,
            SourceMessage {
                id: MessageId(id),
                has_photo: false,
                caption: None,
                is_empty: true,
            },
        )
    }

    pub fn with_message(mut self, chat: i64, msg: SourceMessage) -> Self {
        self.messages.insert((chat, msg.id.0), msg);
        self
    }

    pub fn failing_fetch(mut self, chat: i64) -> Self {
        self.failing_chats.insert(chat);
        self
    }

    pub fn script_copies(&self, outcomes: impl IntoIterator<Item = CopyOutcome>) {
        self.copy_script.lock().unwrap().extend(outcomes);
    }

    pub fn copies(&self) -> Vec<CopyCall> {
        self.copies.lock().unwrap().clone()
    }

    pub fn remove_message(&mut self, chat: i64, id: i32) {
        self.messages.remove(&(chat, id));
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn resolve_chat(&self, reference: &ChatReference) -> Result<ResolvedChat> {
        *self.resolve_calls.lock().unwrap() += 1;
        let found = match reference {
            ChatReference::Id(id) => self.chats.get(id).map(|h| (*id, h.clone())),
            ChatReference::Handle(name) => self
                .chats
                .iter()
                .find(|(_, h)| h.as_deref() == Some(name.as_str()))
                .map(|(id, h)| (*id, h.clone())),
        };
        let (id, handle) = found.ok_or_else(|| Error::ChatResolution {
            reference: reference.to_string(),
            reason: "chat not found".to_string(),
        })?;
        Ok(ResolvedChat {
            id: ChatId(id),
            handle,
        })
    }

    async fn fetch_messages(
        &self,
        chat_id: ChatId,
        ids: &[MessageId],
    ) -> Result<Vec<Option<SourceMessage>>> {
        self.fetch_calls
            .lock()
            .unwrap()
            .push((chat_id, ids.to_vec()));
        if self.failing_chats.contains(&chat_id.0) {
            return Err(Error::External("network unreachable".to_string()));
        }
        Ok(ids
            .iter()
            .map(|id| self.messages.get(&(chat_id.0, id.0)).cloned())
            .collect())
    }

    async fn copy_message(
        &self,
        from: ChatId,
        message_id: MessageId,
        to: &ChatReference,
        caption: &str,
    ) -> CopyOutcome {
        self.copies.lock().unwrap().push(CopyCall {
            from,
            message_id,
            to: to.clone(),
            caption: caption.to_string(),
        });
        self.copy_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CopyOutcome::Sent)
    }
}
