use std::sync::Arc;

use lmb_core::{
    commands::OperatorCommand,
    domain::{ChatId, ChatReference},
    formatting::{
        awaiting_prompt_html, error_html, escape_html, help_html, status_html, summary_html,
    },
    messaging::progress::ProgressMessage,
    relay::RunCounters,
    run::{execute, LastRun, RunPlan},
    state::{Awaiting, RunState},
    Result,
};

use crate::router::AppState;

use super::reply;

const RUN_STARTING: &str = "⏳ Starting run...";

pub async fn handle_command(state: &Arc<AppState>, chat: ChatId, cmd: OperatorCommand) {
    tracing::debug!(chat_id = chat.0, command = ?cmd, "operator command");

    let html = match cmd {
        OperatorCommand::Help => help_html(state.cfg.max_targets),
        OperatorCommand::SetSource(reference) => {
            state.run_state.lock().await.set_source(reference.clone());
            format!("✅ Source set to {}", chat_code(&reference))
        }
        OperatorCommand::SetTarget(n, reference) => {
            let res = state
                .run_state
                .lock()
                .await
                .set_target_chat(n, reference.clone());
            match res {
                Ok(()) => format!("✅ Target {n} channel set to {}", chat_code(&reference)),
                Err(e) => error_html(&e.to_string()),
            }
        }
        OperatorCommand::SetDestination(n, reference) => {
            let res = state
                .run_state
                .lock()
                .await
                .set_destination(n, reference.clone());
            match res {
                Ok(()) => format!(
                    "✅ Target {n} destination set to {}",
                    chat_code(&reference)
                ),
                Err(e) => error_html(&e.to_string()),
            }
        }
        OperatorCommand::BeginSourceRange => {
            match state.run_state.lock().await.begin_source_range() {
                Ok(()) => awaiting_prompt_html(Awaiting::SourceRangeStart),
                Err(e) => error_html(&format!("{e}. Use /setsource first.")),
            }
        }
        OperatorCommand::BeginTargetRange(n) => {
            match state.run_state.lock().await.begin_target_range(n) {
                Ok(()) => awaiting_prompt_html(Awaiting::TargetRangeStart(n)),
                Err(e) => error_html(&e.to_string()),
            }
        }
        OperatorCommand::Status => {
            let snapshot = state.run_state.lock().await.clone();
            let last = state.last_run.lock().await.clone();
            status_html(&snapshot, last.as_ref(), state.is_running())
        }
        OperatorCommand::Reset => {
            state.run_state.lock().await.reset();
            "🔄 All settings cleared.".to_string()
        }
        OperatorCommand::Run => {
            start_run(state, chat).await;
            return;
        }
        OperatorCommand::Usage(usage) => format!("Usage: <code>{}</code>", escape_html(usage)),
        OperatorCommand::Unknown(cmd) => format!(
            "Unknown command: <code>/{}</code>\nUse /help to see what I can do.",
            escape_html(&cmd)
        ),
    };

    reply(state, chat, &html).await;
}

fn chat_code(reference: &ChatReference) -> String {
    format!("<code>{}</code>", escape_html(&reference.to_string()))
}

/// Start a run in the background. The run lock is held until the summary
/// (or the error) has been delivered and recorded.
async fn start_run(state: &Arc<AppState>, chat: ChatId) {
    let Ok(guard) = state.run_lock.clone().try_lock_owned() else {
        reply(state, chat, "⏳ A run is already in progress.").await;
        return;
    };

    let snapshot = state.run_state.lock().await.clone();

    let msg = match state.messenger.send_html(chat, RUN_STARTING).await {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(chat_id = chat.0, error = %e, "could not post run progress");
            return;
        }
    };
    let progress = ProgressMessage::new(state.messenger.clone(), msg, RUN_STARTING);

    let state = state.clone();
    tokio::spawn(async move {
        let _guard = guard;

        let outcome = run_once(&state, &snapshot, &progress).await;
        match &outcome {
            Ok(counters) => progress.finish(&summary_html(counters)).await,
            Err(e) => {
                tracing::error!(error = %e, "run failed");
                progress.finish(&error_html(&format!("Run failed: {e}"))).await;
            }
        }

        *state.last_run.lock().await = Some(LastRun::new(outcome));
    });
}

async fn run_once(
    state: &AppState,
    snapshot: &RunState,
    progress: &ProgressMessage,
) -> Result<RunCounters> {
    let platform = state.platform.as_ref();
    let plan = RunPlan::prepare(snapshot, platform).await?;
    tracing::info!(
        source_chat = plan.source_chat.0,
        targets = plan.targets.len(),
        "run started"
    );
    execute(platform, &plan, state.cfg.relay_settings(), progress).await
}
