//! Transaction receipt polling and the completed-hash broadcast list.

use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::B256;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::TxReceipt;
use crate::errors::TxError;
use crate::ports::{ClockPort, RpcClientPort};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Receipt polling schedule. The default polls every two seconds until mined, with no cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval_ms: u64,
    pub max_attempts: Option<u32>,
    /// Interval multiplier applied after each unmined attempt; `1.0` keeps it fixed.
    pub backoff: f64,
    pub max_interval_ms: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_attempts: None,
            backoff: 1.0,
            max_interval_ms: 60_000,
        }
    }
}

impl PollPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff(mut self, factor: f64, max_interval_ms: u64) -> Self {
        self.backoff = factor.max(1.0);
        self.max_interval_ms = max_interval_ms;
        self
    }

    fn next_interval(&self, current: u64) -> u64 {
        let next = (current as f64 * self.backoff).round() as u64;
        next.clamp(self.interval_ms, self.max_interval_ms.max(self.interval_ms))
    }
}

/// Ordered list of "notify me of every completed transaction" subscribers.
#[derive(Debug, Clone, Default)]
pub struct TxBroadcast {
    subscribers: Arc<Mutex<Vec<UnboundedSender<B256>>>>,
}

impl TxBroadcast {
    pub fn subscribe(&self) -> TxSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        TxSubscription { rx }
    }

    /// Delivers `hash` to every subscriber in registration order. Subscribers whose
    /// receiver was dropped are removed here.
    pub fn notify(&self, hash: B256) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(hash).is_ok());
        subscribers.len()
    }

    pub fn len(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct TxSubscription {
    rx: UnboundedReceiver<B256>,
}

impl TxSubscription {
    pub async fn next(&mut self) -> Option<B256> {
        self.rx.recv().await
    }

    pub fn try_next(&mut self) -> Option<B256> {
        self.rx.try_recv().ok()
    }
}

/// Polls for `hash` until it is mined. A query error or a failed receipt ends the watch
/// immediately; a successful receipt notifies `broadcast` before returning.
pub async fn watch_transaction<R, C>(
    rpc: &R,
    clock: &C,
    broadcast: &TxBroadcast,
    policy: PollPolicy,
    hash: B256,
    cancel: &CancellationToken,
) -> Result<TxReceipt, TxError>
where
    R: RpcClientPort + ?Sized,
    C: ClockPort + ?Sized,
{
    let mut attempts: u32 = 0;
    let mut interval = policy.interval_ms;
    let started = clock.now_ms().ok();
    loop {
        if cancel.is_cancelled() {
            return Err(TxError::Cancelled);
        }
        attempts = attempts.saturating_add(1);
        match rpc.get_transaction_receipt(hash).await {
            Err(e) => {
                warn!(%hash, error = %e, "receipt query failed");
                return Err(TxError::Rpc(e));
            }
            Ok(Some(receipt)) if receipt.is_failed() => {
                let block_number = receipt.block_number.unwrap_or_default();
                warn!(%hash, block_number, "transaction failed");
                return Err(TxError::Reverted { hash, block_number });
            }
            Ok(Some(receipt)) if receipt.is_mined() => {
                let notified = broadcast.notify(hash);
                let elapsed_ms = started
                    .zip(clock.now_ms().ok())
                    .map(|(from, to)| to.saturating_sub(from));
                info!(
                    %hash,
                    block = ?receipt.block_number,
                    notified,
                    attempts,
                    elapsed_ms = ?elapsed_ms,
                    "transaction confirmed"
                );
                return Ok(receipt);
            }
            Ok(_) => {
                if policy.max_attempts.is_some_and(|max| attempts >= max) {
                    return Err(TxError::Exhausted { attempts });
                }
                debug!(%hash, attempts, interval, "transaction not mined yet");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(TxError::Cancelled),
                    _ = clock.sleep_ms(interval) => {}
                }
                interval = policy.next_interval(interval);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_polls_every_two_seconds_forever() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval_ms, 2_000);
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.next_interval(2_000), 2_000);
    }

    #[test]
    fn backoff_is_clamped() {
        let policy = PollPolicy::default().with_backoff(2.0, 5_000);
        assert_eq!(policy.next_interval(2_000), 4_000);
        assert_eq!(policy.next_interval(4_000), 5_000);
    }

    #[test]
    fn dropped_subscribers_are_pruned_on_notify() {
        let broadcast = TxBroadcast::default();
        let mut kept = broadcast.subscribe();
        drop(broadcast.subscribe());
        assert_eq!(broadcast.len(), 2);

        assert_eq!(broadcast.notify(B256::repeat_byte(1)), 1);
        assert_eq!(kept.try_next(), Some(B256::repeat_byte(1)));
    }
}
