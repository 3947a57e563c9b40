use lmb_core::{domain::ChatId, formatting::text_accepted_html};

use crate::router::AppState;

use super::reply;

/// Free text only matters while a range input is armed.
pub async fn handle_text(state: &AppState, chat: ChatId, text: &str) {
    let accepted = state.run_state.lock().await.accept_text(text);
    match accepted {
        Some(accepted) => reply(state, chat, &text_accepted_html(accepted)).await,
        None => tracing::debug!(chat_id = chat.0, "ignoring free text, nothing awaited"),
    }
}
