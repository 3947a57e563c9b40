use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::Mutex;

use lmb_core::{
    config::Config,
    domain::ChatId,
    messaging::port::MessagingPort,
    ports::ChatPlatform,
    run::LastRun,
    state::RunState,
};

use crate::handlers;
use crate::{TelegramMessenger, TelegramPlatform};

/// Shared handler state. `RunState` is only written by the operator's
/// command/text handlers; runs work on a cloned snapshot.
pub struct AppState {
    pub cfg: Arc<Config>,
    pub platform: Arc<dyn ChatPlatform>,
    pub messenger: Arc<dyn MessagingPort>,
    pub run_state: Mutex<RunState>,
    pub last_run: Mutex<Option<LastRun>>,
    /// Held for the whole duration of a run.
    pub run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        cfg: Arc<Config>,
        platform: Arc<dyn ChatPlatform>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        let run_state = RunState::from_config(&cfg);
        Self {
            cfg,
            platform,
            messenger,
            run_state: Mutex::new(run_state),
            last_run: Mutex::new(None),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "lmb started"),
        Err(e) => tracing::warn!(error = %e, "get_me failed"),
    }
    tracing::info!(
        owner_id = cfg.owner_id,
        peek_chat_id = cfg.peek_chat_id,
        delay_ms = cfg.send_delay.as_millis() as u64,
        batch = cfg.scan_batch_size,
        "configuration loaded"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let platform: Arc<dyn ChatPlatform> = Arc::new(TelegramPlatform::new(
        bot.clone(),
        ChatId(cfg.peek_chat_id),
    ));

    let state = Arc::new(AppState::new(cfg.clone(), platform, messenger));

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
