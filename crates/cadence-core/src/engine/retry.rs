//! Retry policy for the message side effect.
//!
//! Each attempt is bounded by a start-to-close timeout. Failed attempts are
//! retried with exponential backoff until `max_attempts` is reached, after
//! which the run fails.

use std::time::Duration;

use cadence_types::config::WorkerConfig;
use cadence_types::execution::{SendReceipt, SendRequest};

use super::context::{DeliveryError, EngineError, MessageSender};

/// Backoff multiplier applied after every failed attempt.
pub const BACKOFF_COEFFICIENT: u32 = 2;

/// How a substrate retries a failing delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// Start-to-close timeout of a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&WorkerConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            max_attempts: config.send_max_attempts,
            initial_backoff: Duration::from_millis(config.send_initial_backoff_ms),
            attempt_timeout: Duration::from_secs(config.send_timeout_secs),
        }
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1)
    }

    /// Delay before the attempt that follows failed attempt `attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = BACKOFF_COEFFICIENT.saturating_pow(exponent);
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Deliver `request` through `sender`, retrying per `policy`.
pub async fn deliver_with_retry<M: MessageSender>(
    sender: &M,
    request: &SendRequest,
    policy: &RetryPolicy,
) -> Result<SendReceipt, EngineError> {
    let mut attempt = 1;
    loop {
        let result = match tokio::time::timeout(policy.attempt_timeout, sender.send(request)).await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(DeliveryError::Timeout),
        };

        match result {
            Ok(receipt) => return Ok(receipt),
            Err(err) if policy.should_retry(attempt) => {
                let delay = policy.backoff_for(attempt);
                tracing::warn!(
                    idempotency_key = request.idempotency_key.as_str(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "delivery attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                return Err(EngineError::Delivery {
                    key: request.idempotency_key.clone(),
                    attempts: attempt,
                    source: err,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::Utc;

    use super::*;

    /// Fails the first `failures` attempts, then succeeds.
    struct FlakySender {
        failures: u32,
        calls: AtomicU32,
        seen_keys: Mutex<Vec<String>>,
    }

    impl FlakySender {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                seen_keys: Mutex::new(Vec::new()),
            }
        }
    }

    impl MessageSender for FlakySender {
        async fn send(&self, request: &SendRequest) -> Result<SendReceipt, DeliveryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.seen_keys
                .lock()
                .unwrap()
                .push(request.idempotency_key.clone());
            if call <= self.failures {
                return Err(DeliveryError::Rejected(format!("failure {call}")));
            }
            Ok(SendReceipt {
                success: true,
                confirmation_id: format!("msg_{call}"),
                timestamp: Utc::now(),
            })
        }
    }

    struct StalledSender;

    impl MessageSender for StalledSender {
        async fn send(&self, _request: &SendRequest) -> Result<SendReceipt, DeliveryError> {
            std::future::pending().await
        }
    }

    fn request() -> SendRequest {
        SendRequest {
            to: "ada@example.com".to_string(),
            subject: "Hi".to_string(),
            body: String::new(),
            idempotency_key: "wf:0:1".to_string(),
        }
    }

    #[test]
    fn default_policy_matches_worker_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_secs(1));
        assert_eq!(policy.attempt_timeout, Duration::from_secs(30));
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
    }

    #[test]
    fn zero_attempts_still_allows_one() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(!policy.should_retry(1));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_with_same_key() {
        let sender = FlakySender::new(2);
        let receipt = deliver_with_retry(&sender, &request(), &RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(receipt.confirmation_id, "msg_3");
        let keys = sender.seen_keys.lock().unwrap().clone();
        assert_eq!(keys, vec!["wf:0:1", "wf:0:1", "wf:0:1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_policy_fails_the_delivery() {
        let sender = FlakySender::new(10);
        let err = deliver_with_retry(&sender, &request(), &RetryPolicy::default())
            .await
            .unwrap_err();
        match err {
            EngineError::Delivery { attempts, source, .. } => {
                assert_eq!(attempts, 3);
                assert!(matches!(source, DeliveryError::Rejected(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sender.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_attempt_times_out() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        let err = deliver_with_retry(&StalledSender, &request(), &policy)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Delivery {
                source: DeliveryError::Timeout,
                ..
            }
        ));
    }
}
