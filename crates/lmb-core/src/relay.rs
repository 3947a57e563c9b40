use std::time::Duration;

use tokio::time::sleep;

use crate::{
    caption::normalize,
    domain::{ChatId, ChatReference, MessageId, MessageRange},
    errors::Error,
    index::CaptionIndex,
    links::{build_link, compose_relay_caption},
    ports::{fetch_one, ChatPlatform, CopyOutcome},
    scan::RangeScanner,
    Result,
};

/// Everything the driver needs to relay into one target.
#[derive(Clone, Debug)]
pub struct RelayTarget {
    pub label: String,
    pub index: CaptionIndex,
    /// Chat the indexed messages live in.
    pub chat_id: ChatId,
    /// Public handle of `chat_id`, used for permalinks.
    pub handle: Option<String>,
    pub destination: ChatReference,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetCounters {
    pub label: String,
    pub sent: u64,
    pub not_found: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Source photos with a non-empty caption key.
    pub processed: u64,
    pub targets: Vec<TargetCounters>,
}

impl RunCounters {
    pub fn total_sent(&self) -> u64 {
        self.targets.iter().map(|t| t.sent).sum()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RelaySettings {
    /// Pause after every relay attempt.
    pub send_delay: Duration,
    pub batch_size: usize,
    pub caption_limit: usize,
}

pub struct RelayDriver<'a> {
    platform: &'a dyn ChatPlatform,
    settings: RelaySettings,
}

impl<'a> RelayDriver<'a> {
    pub fn new(platform: &'a dyn ChatPlatform, settings: RelaySettings) -> Self {
        Self { platform, settings }
    }

    pub async fn run(
        &self,
        source_chat: ChatId,
        source_range: MessageRange,
        targets: &[RelayTarget],
    ) -> Result<RunCounters> {
        let mut counters = RunCounters {
            processed: 0,
            targets: targets
                .iter()
                .map(|t| TargetCounters {
                    label: t.label.clone(),
                    ..Default::default()
                })
                .collect(),
        };

        let mut scanner = RangeScanner::new(
            self.platform,
            source_chat,
            source_range,
            self.settings.batch_size,
        );

        while let Some(msg) = scanner.next().await? {
            if !msg.has_photo {
                continue;
            }
            let key = normalize(msg.caption.as_deref());
            if key.is_empty() {
                continue;
            }
            counters.processed += 1;

            // Targets run in order so later ones never race earlier ones.
            for (target, tc) in targets.iter().zip(counters.targets.iter_mut()) {
                let Some(indexed_id) = target.index.get(&key) else {
                    tc.not_found += 1;
                    continue;
                };

                let indexed = fetch_one(self.platform, target.chat_id, indexed_id).await?;
                let Some(indexed) = indexed.filter(|m| !m.is_empty && m.has_photo) else {
                    tracing::warn!(
                        label = %target.label,
                        message_id = indexed_id.0,
                        "indexed message vanished or is no longer a photo"
                    );
                    tc.not_found += 1;
                    continue;
                };

                let link = build_link(target.handle.as_deref(), target.chat_id, indexed_id);
                let caption = compose_relay_caption(
                    indexed.caption.as_deref(),
                    &link,
                    self.settings.caption_limit,
                );

                let outcome = self
                    .copy_with_backoff(target.chat_id, indexed_id, &target.destination, &caption)
                    .await;
                sleep(self.settings.send_delay).await;
                outcome?;

                tc.sent += 1;
                tracing::info!(
                    label = %target.label,
                    source_id = msg.id.0,
                    indexed_id = indexed_id.0,
                    destination = %target.destination,
                    "relayed"
                );
            }
        }

        Ok(counters)
    }

    /// One copy call; on a rate-limit answer wait the requested time and try
    /// exactly once more.
    async fn copy_with_backoff(
        &self,
        from: ChatId,
        message_id: MessageId,
        to: &ChatReference,
        caption: &str,
    ) -> Result<()> {
        match self.platform.copy_message(from, message_id, to, caption).await {
            CopyOutcome::Sent => return Ok(()),
            CopyOutcome::Failed(reason) => return Err(relay_error(message_id, reason)),
            CopyOutcome::RateLimited(wait) => {
                tracing::warn!(
                    message_id = message_id.0,
                    wait_secs = wait.as_secs(),
                    "rate limited, backing off once"
                );
                sleep(wait).await;
            }
        }

        match self.platform.copy_message(from, message_id, to, caption).await {
            CopyOutcome::Sent => Ok(()),
            CopyOutcome::Failed(reason) => Err(relay_error(message_id, reason)),
            CopyOutcome::RateLimited(wait) => Err(relay_error(
                message_id,
                format!("still rate limited after retry ({}s)", wait.as_secs()),
            )),
        }
    }
}

fn relay_error(message_id: MessageId, reason: String) -> Error {
    Error::Relay {
        message_id: message_id.0,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_index;
    use crate::testing::FakePlatform;

    const SOURCE: i64 = -1001;
    const TARGET: i64 = -1005;

    fn settings() -> RelaySettings {
        RelaySettings {
            send_delay: Duration::from_millis(400),
            batch_size: 200,
            caption_limit: 1024,
        }
    }

    async fn target(platform: &FakePlatform, label: &str, lo: i32, hi: i32) -> RelayTarget {
        let index = build_index(
            platform,
            ChatId(TARGET),
            MessageRange::new(MessageId(lo), MessageId(hi)),
            200,
        )
        .await
        .unwrap();
        RelayTarget {
            label: label.to_string(),
            index,
            chat_id: ChatId(TARGET),
            handle: Some("target_list".to_string()),
            destination: ChatReference::Handle("dest".to_string()),
        }
    }

    fn sunset_platform() -> FakePlatform {
        FakePlatform::new()
            .with_photo(SOURCE, 100, Some("Sunset  view"))
            .with_photo(SOURCE, 101, Some(""))
            .with_photo(SOURCE, 102, Some("SUNSET VIEW http://x"))
            .with_photo(TARGET, 50, Some("sunset view"))
    }

    #[tokio::test(start_paused = true)]
    async fn relays_matching_photos_end_to_end() {
        let platform = sunset_platform();
        let t = target(&platform, "target 1", 50, 50).await;

        let driver = RelayDriver::new(&platform, settings());
        let counters = driver
            .run(
                ChatId(SOURCE),
                MessageRange::new(MessageId(100), MessageId(102)),
                &[t],
            )
            .await
            .unwrap();

        assert_eq!(counters.processed, 2);
        assert_eq!(counters.targets[0].sent, 2);
        assert_eq!(counters.targets[0].not_found, 0);

        let copies = platform.copies();
        assert_eq!(copies.len(), 2);
        for c in &copies {
            assert_eq!(c.from, ChatId(TARGET));
            assert_eq!(c.message_id, MessageId(50));
            assert_eq!(c.to, ChatReference::Handle("dest".to_string()));
            assert_eq!(
                c.caption,
                "sunset view\n\n🔗 Link: https://t.me/target_list/50"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn non_photos_and_misses_are_counted_correctly() {
        let platform = FakePlatform::new()
            .with_text(SOURCE, 1, "sunset view")
            .with_photo(SOURCE, 2, Some("harbor"))
            .with_photo(SOURCE, 3, None)
            .with_photo(SOURCE, 4, Some("sunset view"))
            .with_photo(TARGET, 50, Some("sunset view"));
        let t = target(&platform, "target 1", 50, 50).await;

        let counters = RelayDriver::new(&platform, settings())
            .run(
                ChatId(SOURCE),
                MessageRange::new(MessageId(1), MessageId(4)),
                &[t],
            )
            .await
            .unwrap();

        assert_eq!(counters.processed, 2);
        assert_eq!(counters.targets[0].sent, 1);
        assert_eq!(counters.targets[0].not_found, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_index_entry_counts_as_not_found() {
        let platform = sunset_platform();
        let t = target(&platform, "target 1", 50, 50).await;
        let mut platform = platform;
        platform.remove_message(TARGET, 50);

        let counters = RelayDriver::new(&platform, settings())
            .run(
                ChatId(SOURCE),
                MessageRange::new(MessageId(100), MessageId(102)),
                &[t],
            )
            .await
            .unwrap();

        assert_eq!(counters.processed, 2);
        assert_eq!(counters.targets[0].sent, 0);
        assert_eq!(counters.targets[0].not_found, 2);
        assert!(platform.copies().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn targets_are_evaluated_in_order_per_message() {
        let platform = sunset_platform();
        let mut first = target(&platform, "target 1", 50, 50).await;
        first.destination = ChatReference::Id(-2001);
        let mut second = first.clone();
        second.label = "target 2".to_string();
        second.destination = ChatReference::Id(-2002);

        let counters = RelayDriver::new(&platform, settings())
            .run(
                ChatId(SOURCE),
                MessageRange::new(MessageId(100), MessageId(102)),
                &[first, second],
            )
            .await
            .unwrap();

        assert_eq!(counters.total_sent(), 4);
        let order: Vec<ChatReference> = platform.copies().into_iter().map(|c| c.to).collect();
        assert_eq!(
            order,
            vec![
                ChatReference::Id(-2001),
                ChatReference::Id(-2002),
                ChatReference::Id(-2001),
                ChatReference::Id(-2002),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn throttles_after_every_relay() {
        let platform = sunset_platform();
        let t = target(&platform, "target 1", 50, 50).await;

        let started = tokio::time::Instant::now();
        RelayDriver::new(&platform, settings())
            .run(
                ChatId(SOURCE),
                MessageRange::new(MessageId(100), MessageId(102)),
                &[t],
            )
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_backs_off_once_then_succeeds() {
        let platform = sunset_platform();
        platform.script_copies([CopyOutcome::RateLimited(Duration::from_secs(5))]);
        let t = target(&platform, "target 1", 50, 50).await;

        let started = tokio::time::Instant::now();
        let counters = RelayDriver::new(&platform, settings())
            .run(
                ChatId(SOURCE),
                MessageRange::new(MessageId(100), MessageId(102)),
                &[t],
            )
            .await
            .unwrap();

        assert_eq!(counters.targets[0].sent, 2);
        assert_eq!(platform.copies().len(), 3);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn second_rate_limit_aborts_the_run() {
        let platform = sunset_platform();
        platform.script_copies([
            CopyOutcome::RateLimited(Duration::from_secs(5)),
            CopyOutcome::RateLimited(Duration::from_secs(5)),
        ]);
        let t = target(&platform, "target 1", 50, 50).await;

        let started = tokio::time::Instant::now();
        let err = RelayDriver::new(&platform, settings())
            .run(
                ChatId(SOURCE),
                MessageRange::new(MessageId(100), MessageId(102)),
                &[t],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Relay { message_id: 50, .. }));
        assert!(started.elapsed() >= Duration::from_secs(5));
        // Only the first source message was attempted (twice).
        assert_eq!(platform.copies().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn copy_failure_aborts_without_retry() {
        let platform = sunset_platform();
        platform.script_copies([CopyOutcome::Failed("CHAT_WRITE_FORBIDDEN".to_string())]);
        let t = target(&platform, "target 1", 50, 50).await;

        let err = RelayDriver::new(&platform, settings())
            .run(
                ChatId(SOURCE),
                MessageRange::new(MessageId(100), MessageId(102)),
                &[t],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Relay { .. }));
        assert_eq!(platform.copies().len(), 1);
    }
}
