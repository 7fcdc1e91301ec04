//! Where raw log entries come from.
//!
//! Both variants hand the monitor the same boxed stream, so decoding and
//! reporting do not care whether logs are pushed by a live subscription or
//! pulled from a bounded historical window.

use crate::error::{MonitorError, RpcError};
use crate::filter::EventFilter;
use crate::models::RawLogEntry;
use crate::rpc::{ChainClient, EntryStream};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

pub const DEFAULT_LOOKBACK_BLOCKS: u64 = 100;

pub type LogStream = BoxStream<'static, Result<RawLogEntry, MonitorError>>;

#[async_trait]
pub trait LogSource: Send + Sync {
    async fn open(&self, filter: &EventFilter) -> Result<LogStream, MonitorError>;
}

/// First block of a `lookback`-block window ending at `latest`, clamped at genesis.
pub fn lookback_start(latest: u64, lookback: u64) -> u64 {
    latest.saturating_sub(lookback.saturating_sub(1))
}

/// Bounded query over the last `lookback` blocks, resolved against the head once.
pub struct HistoricalRange<C> {
    client: Arc<C>,
    lookback: u64,
}

impl<C: ChainClient> HistoricalRange<C> {
    pub fn new(client: Arc<C>, lookback: u64) -> Self {
        HistoricalRange {
            client,
            lookback: lookback.max(1),
        }
    }

    pub async fn fetch(&self, filter: &EventFilter) -> Result<Vec<RawLogEntry>, MonitorError> {
        let latest_block = self
            .client
            .latest_block()
            .await
            .map_err(|e| MonitorError::QueryFailed(format!("latest block lookup failed: {e}")))?;

        let from = lookback_start(latest_block, self.lookback);
        info!("Fetching logs for blocks {} to {}", from, latest_block);

        let entries = self
            .client
            .get_logs(&filter.with_range(from, latest_block))
            .await
            .map_err(|e| {
                MonitorError::QueryFailed(format!("blocks {from}-{latest_block}: {e}"))
            })?;

        info!(
            "Received {} logs for blocks {} to {}",
            entries.len(),
            from,
            latest_block
        );
        Ok(entries)
    }
}

#[async_trait]
impl<C: ChainClient> LogSource for HistoricalRange<C> {
    async fn open(&self, filter: &EventFilter) -> Result<LogStream, MonitorError> {
        let entries = self.fetch(filter).await?;
        Ok(stream::iter(entries.into_iter().map(Ok)).boxed())
    }
}

/// How a dropped subscription is re-established.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl ReconnectPolicy {
    /// Any subscription error ends the stream.
    pub fn fail_fast() -> Self {
        ReconnectPolicy {
            max_attempts: 0,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(self, max_attempts: usize) -> Self {
        ReconnectPolicy {
            max_attempts,
            ..self
        }
    }

    /// Un-jittered delays: `base_delay`, then doubling up to `max_delay`.
    fn backoff(&self) -> impl Iterator<Item = Duration> + Send + use<> {
        // ExponentialBackoff yields `2^n * factor` for n = 1, 2, ...
        let half_base = (self.base_delay.as_millis() as u64 / 2).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(half_base)
            .max_delay(self.max_delay)
            .take(self.max_attempts)
    }

    fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        Box::new(self.backoff().map(jitter))
    }
}

/// Unbounded push subscription. The filter's block range is ignored.
pub struct LiveSubscription<C> {
    client: Arc<C>,
    policy: ReconnectPolicy,
}

impl<C: ChainClient> LiveSubscription<C> {
    pub fn new(client: Arc<C>, policy: ReconnectPolicy) -> Self {
        LiveSubscription { client, policy }
    }
}

#[async_trait]
impl<C: ChainClient> LogSource for LiveSubscription<C> {
    async fn open(&self, filter: &EventFilter) -> Result<LogStream, MonitorError> {
        let filter = EventFilter {
            block_range: None,
            ..filter.clone()
        };

        let inner = self
            .client
            .subscribe_logs(&filter)
            .await
            .map_err(|e| MonitorError::SubscriptionFailure(e.to_string()))?;
        info!("Subscribed to logs of {:?}", filter.address);

        let state = Session {
            client: self.client.clone(),
            filter,
            policy: self.policy.clone(),
            inner: Some(inner),
            delays: None,
            finished: false,
        };
        Ok(stream::unfold(state, |session| session.next_entry()).boxed())
    }
}

struct Session<C> {
    client: Arc<C>,
    filter: EventFilter,
    policy: ReconnectPolicy,
    inner: Option<EntryStream>,
    // Remaining backoff for the current outage; cleared once an entry arrives.
    delays: Option<Box<dyn Iterator<Item = Duration> + Send>>,
    finished: bool,
}

impl<C: ChainClient> Session<C> {
    async fn next_entry(mut self) -> Option<(Result<RawLogEntry, MonitorError>, Self)> {
        if self.finished {
            return None;
        }

        loop {
            let cause = match self.inner.as_mut() {
                Some(inner) => match inner.next().await {
                    Some(Ok(entry)) => {
                        self.delays = None;
                        return Some((Ok(entry), self));
                    }
                    Some(Err(e)) => e,
                    None => RpcError::SubscriptionClosed,
                },
                None => RpcError::SubscriptionClosed,
            };

            self.inner = None;
            warn!("Subscription interrupted: {}", cause);

            match self.resubscribe(cause).await {
                Ok(inner) => self.inner = Some(inner),
                Err(e) => {
                    self.finished = true;
                    return Some((Err(e), self));
                }
            }
        }
    }

    async fn resubscribe(&mut self, cause: RpcError) -> Result<EntryStream, MonitorError> {
        let mut last_error = cause.to_string();
        let delays = self.delays.get_or_insert_with(|| self.policy.delays());

        for (attempt, delay) in delays.enumerate() {
            debug!("Reconnect attempt {} in {:?}", attempt + 1, delay);
            sleep(delay).await;

            match self.client.subscribe_logs(&self.filter).await {
                Ok(inner) => {
                    info!("Resubscribed to logs of {:?}", self.filter.address);
                    return Ok(inner);
                }
                Err(e) => {
                    warn!("Reconnect attempt {} failed: {}", attempt + 1, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(MonitorError::SubscriptionFailure(last_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TRANSFER_EVENT_SIGNATURE;
    use crate::testing::{MockChain, USDT, transfer_entry};
    use alloy_primitives::{Address, address};

    const ALICE: Address = address!("1111111111111111111111111111111111111111");

    fn filter() -> EventFilter {
        EventFilter::for_signature(USDT, TRANSFER_EVENT_SIGNATURE)
    }

    fn quick_policy(max_attempts: usize) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn backoff_doubles_from_base_up_to_cap() {
        let delays: Vec<_> = ReconnectPolicy::default().backoff().collect();
        assert_eq!(
            delays,
            [100, 200, 400, 800, 1_600].map(Duration::from_millis).to_vec()
        );

        let capped = ReconnectPolicy::default().with_max_attempts(10);
        assert_eq!(capped.backoff().last(), Some(Duration::from_secs(10)));
        assert!(ReconnectPolicy::fail_fast().backoff().next().is_none());
    }

    #[test]
    fn lookback_window_is_inclusive() {
        assert_eq!(lookback_start(1_000, 100), 901);
        assert_eq!(lookback_start(99, 100), 0);
        assert_eq!(lookback_start(100, 100), 1);
        assert_eq!(lookback_start(7, 1), 7);
    }

    #[test]
    fn lookback_clamps_at_genesis() {
        assert_eq!(lookback_start(50, 100), 0);
        assert_eq!(lookback_start(0, 100), 0);
        assert_eq!(lookback_start(0, 0), 0);
    }

    #[tokio::test]
    async fn historical_range_queries_clamped_window() {
        let client = Arc::new(MockChain::with_head(50, Vec::new()));
        let source = HistoricalRange::new(client.clone(), DEFAULT_LOOKBACK_BLOCKS);

        let entries = source.fetch(&filter()).await.unwrap();
        assert!(entries.is_empty());

        let queried = client.queried.lock().unwrap();
        assert_eq!(queried.len(), 1);
        assert_eq!(queried[0].block_range, Some((0, 50)));
        assert_eq!(queried[0].address, USDT);
        assert_eq!(queried[0].topic0, filter().topic0);
    }

    #[tokio::test]
    async fn historical_range_streams_entries_in_node_order() {
        let logs = vec![
            transfer_entry(950, ALICE, Address::ZERO, 1),
            transfer_entry(920, Address::ZERO, ALICE, 2),
        ];
        let client = Arc::new(MockChain::with_head(1_000, logs.clone()));
        let source = HistoricalRange::new(client.clone(), DEFAULT_LOOKBACK_BLOCKS);

        let streamed: Vec<_> = source
            .open(&filter())
            .await
            .unwrap()
            .map(|entry| entry.unwrap())
            .collect()
            .await;

        assert_eq!(streamed, logs);
        assert_eq!(client.queried.lock().unwrap()[0].block_range, Some((901, 1_000)));
    }

    #[tokio::test]
    async fn historical_range_failures_are_query_failed() {
        let no_head = Arc::new(MockChain::default());
        let err = HistoricalRange::new(no_head, 100)
            .open(&filter())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, MonitorError::QueryFailed(_)));

        let rejected = Arc::new(MockChain {
            latest: Some(1_000),
            ..Default::default()
        });
        let err = HistoricalRange::new(rejected, 100)
            .open(&filter())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, MonitorError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn initial_subscription_failure_is_fatal() {
        let client = Arc::new(MockChain::with_subscriptions(vec![Err(
            RpcError::Transport("403 forbidden".into()),
        )]));
        let source = LiveSubscription::new(client, quick_policy(3));

        let err = source.open(&filter()).await.err().unwrap();
        assert!(matches!(err, MonitorError::SubscriptionFailure(_)));
    }

    #[tokio::test]
    async fn fail_fast_subscription_ends_with_error() {
        let client = Arc::new(MockChain::with_subscriptions(vec![Ok(vec![
            Ok(transfer_entry(1, ALICE, ALICE, 1)),
            Ok(transfer_entry(2, ALICE, ALICE, 2)),
        ])]));
        let source = LiveSubscription::new(client.clone(), ReconnectPolicy::fail_fast());

        let items: Vec<_> = source.open(&filter()).await.unwrap().collect().await;
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_ok());
        assert!(matches!(items[2], Err(MonitorError::SubscriptionFailure(_))));
        assert_eq!(*client.subscribe_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn subscription_reconnects_until_attempts_run_out() {
        let client = Arc::new(MockChain::with_subscriptions(vec![
            Ok(vec![Ok(transfer_entry(1, ALICE, ALICE, 1))]),
            Ok(vec![
                Ok(transfer_entry(2, ALICE, ALICE, 2)),
                Err(RpcError::Transport("websocket reset".into())),
            ]),
        ]));
        let source = LiveSubscription::new(client.clone(), quick_policy(1));

        let items: Vec<_> = source.open(&filter()).await.unwrap().collect().await;
        let blocks: Vec<_> = items
            .iter()
            .filter_map(|item| item.as_ref().ok())
            .map(|entry| entry.block_number)
            .collect();

        assert_eq!(blocks, vec![Some(1), Some(2)]);
        assert!(matches!(
            items.last(),
            Some(Err(MonitorError::SubscriptionFailure(_)))
        ));
        // initial + reconnect after close + one failed reconnect after the reset
        assert_eq!(*client.subscribe_calls.lock().unwrap(), 3);
    }
}
