//! Turning a configuration snapshot into a run: validate, parse, resolve,
//! index every target in order, then relay.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{ChatId, ChatReference, MessageRange},
    errors::Error,
    index::build_index,
    links::parse_post_link,
    ports::{resolve_handle, resolve_id, ChatPlatform},
    relay::{RelayDriver, RelaySettings, RelayTarget, RunCounters},
    state::{LinkRange, RunState},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedTarget {
    pub number: u8,
    pub label: String,
    pub chat_id: ChatId,
    pub handle: Option<String>,
    pub destination: ChatReference,
    pub range: MessageRange,
}

/// A fully resolved run, ready to execute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunPlan {
    pub source_chat: ChatId,
    pub source_range: MessageRange,
    pub targets: Vec<PlannedTarget>,
}

impl RunPlan {
    /// Validate the snapshot, parse every range link, then resolve chats.
    ///
    /// Links are parsed before any remote call so a typo fails fast.
    pub async fn prepare(state: &RunState, platform: &dyn ChatPlatform) -> Result<Self> {
        let missing = state.missing_fields();
        if !missing.is_empty() {
            return Err(Error::ConfigurationIncomplete(missing));
        }

        let source_ref = required(state.source.as_ref(), "source channel")?;
        let source_range = parse_range(&state.source_range, "source range")?;

        let mut pending = Vec::with_capacity(state.targets.len());
        for (number, spec) in &state.targets {
            let chat = required(spec.chat.as_ref(), &format!("target {number} channel"))?;
            let destination =
                required(spec.destination.as_ref(), &format!("target {number} destination"))?;
            let range = parse_range(&spec.range, &format!("target {number} range"))?;
            pending.push((*number, chat, destination, range));
        }

        let source_chat = resolve_reference(platform, source_ref).await?;

        let mut targets = Vec::with_capacity(pending.len());
        for (number, chat, destination, range) in pending {
            let chat_id = resolve_reference(platform, chat).await?;
            let handle = resolve_handle(platform, chat_id)
                .await
                .map_err(|e| as_resolution_error(chat, e))?;
            targets.push(PlannedTarget {
                number,
                label: format!("target {number}"),
                chat_id,
                handle,
                destination: destination.clone(),
                range,
            });
        }

        Ok(Self {
            source_chat,
            source_range,
            targets,
        })
    }
}

/// Progress notifications emitted while a run executes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunEvent {
    Indexing { label: String },
    Indexed { label: String, entries: usize },
    Relaying { targets: usize },
}

#[async_trait]
pub trait RunProgress: Send + Sync {
    async fn report(&self, event: RunEvent);
}

/// Build each target's index strictly in target order. The first failure
/// aborts and no index is kept.
pub async fn build_target_indexes(
    platform: &dyn ChatPlatform,
    plan: &RunPlan,
    batch_size: usize,
    progress: &dyn RunProgress,
) -> Result<Vec<RelayTarget>> {
    let mut out = Vec::with_capacity(plan.targets.len());
    for t in &plan.targets {
        progress
            .report(RunEvent::Indexing {
                label: t.label.clone(),
            })
            .await;

        let index = build_index(platform, t.chat_id, t.range, batch_size)
            .await
            .map_err(|e| match e {
                Error::IndexBuild { reason, .. } => Error::IndexBuild {
                    target: t.label.clone(),
                    reason,
                },
                other => other,
            })?;

        progress
            .report(RunEvent::Indexed {
                label: t.label.clone(),
                entries: index.len(),
            })
            .await;

        out.push(RelayTarget {
            label: t.label.clone(),
            index,
            chat_id: t.chat_id,
            handle: t.handle.clone(),
            destination: t.destination.clone(),
        });
    }
    Ok(out)
}

/// Index every target, then relay the source range into them.
pub async fn execute(
    platform: &dyn ChatPlatform,
    plan: &RunPlan,
    settings: RelaySettings,
    progress: &dyn RunProgress,
) -> Result<RunCounters> {
    let targets = build_target_indexes(platform, plan, settings.batch_size, progress).await?;

    progress
        .report(RunEvent::Relaying {
            targets: targets.len(),
        })
        .await;

    let counters = RelayDriver::new(platform, settings)
        .run(plan.source_chat, plan.source_range, &targets)
        .await?;

    tracing::info!(
        processed = counters.processed,
        sent = counters.total_sent(),
        "run finished"
    );
    Ok(counters)
}

/// The most recent run, kept in memory for `/status`.
#[derive(Clone, Debug)]
pub struct LastRun {
    pub finished_at: DateTime<Utc>,
    pub outcome: std::result::Result<RunCounters, String>,
}

impl LastRun {
    pub fn new(outcome: Result<RunCounters>) -> Self {
        Self {
            finished_at: Utc::now(),
            outcome: outcome.map_err(|e| e.to_string()),
        }
    }
}

fn required<'a, T>(value: Option<&'a T>, field: &str) -> Result<&'a T> {
    value.ok_or_else(|| Error::ConfigurationIncomplete(vec![field.to_string()]))
}

fn parse_range(range: &LinkRange, field: &str) -> Result<MessageRange> {
    let first = required(range.first.as_ref(), field)?;
    let last = required(range.last.as_ref(), field)?;
    let start = parse_post_link(first).map_err(|e| link_context(field, "first", e))?;
    let end = parse_post_link(last).map_err(|e| link_context(field, "last", e))?;
    Ok(MessageRange::new(start.message_id, end.message_id))
}

fn link_context(field: &str, which: &str, e: Error) -> Error {
    match e {
        Error::LinkParse(msg) => Error::LinkParse(format!("{field} {which} link: {msg}")),
        other => other,
    }
}

async fn resolve_reference(platform: &dyn ChatPlatform, reference: &ChatReference) -> Result<ChatId> {
    resolve_id(platform, reference)
        .await
        .map_err(|e| as_resolution_error(reference, e))
}

fn as_resolution_error(reference: &ChatReference, e: Error) -> Error {
    match e {
        Error::ChatResolution { .. } => e,
        other => Error::ChatResolution {
            reference: reference.to_string(),
            reason: other.to_string(),
        },
    }
}
