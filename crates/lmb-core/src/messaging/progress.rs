use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::MessageRef,
    formatting::progress_html,
    messaging::port::MessagingPort,
    run::{RunEvent, RunProgress},
};

/// Single operator message edited in place as a run advances.
///
/// Each event adds a line; edits are best-effort and never fail the run.
pub struct ProgressMessage {
    messenger: Arc<dyn MessagingPort>,
    msg: MessageRef,
    lines: Mutex<Vec<String>>,
}

impl ProgressMessage {
    pub fn new(messenger: Arc<dyn MessagingPort>, msg: MessageRef, first_line: &str) -> Self {
        Self {
            messenger,
            msg,
            lines: Mutex::new(vec![first_line.to_string()]),
        }
    }

    pub fn message(&self) -> MessageRef {
        self.msg
    }

    /// Replace the whole message, e.g. with the final summary.
    pub async fn finish(&self, html: &str) {
        if let Err(e) = self.messenger.edit_html(self.msg, html).await {
            tracing::warn!(error = %e, "progress finish edit failed");
        }
    }
}

#[async_trait]
impl RunProgress for ProgressMessage {
    async fn report(&self, event: RunEvent) {
        let html = {
            let mut lines = self.lines.lock().await;
            // "Indexing" lines are replaced by their "Indexed" result.
            if matches!(event, RunEvent::Indexed { .. }) && lines.len() > 1 {
                lines.pop();
            }
            lines.push(progress_html(&event));
            lines.join("\n")
        };
        if let Err(e) = self.messenger.edit_html(self.msg, &html).await {
            tracing::warn!(error = %e, "progress edit failed");
        }
    }
}
