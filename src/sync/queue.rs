use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::env::QueueSettings;
use crate::exception::{RemoteError, RemoteResult};

/// Decides whether an error is worth retrying.
pub type ErrorClassifier = Arc<dyn Fn(&RemoteError) -> bool + Send + Sync>;

// 스프레드시트 스크립트가 동시 실행 한도를 넘겼을 때 돌려주는 메시지들
const CONCURRENCY_MARKERS: [&str; 3] = [
    "too many simultaneous invocations",
    "service invoked too many times",
    "lock timeout",
];

/// Default classifier: matches the remote's concurrency-limit messages.
pub fn is_concurrency_error(err: &RemoteError) -> bool {
    let message = err.to_string().to_lowercase();
    CONCURRENCY_MARKERS.iter().any(|marker| message.contains(marker))
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            max_concurrent: 2,
            max_retries: 2,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&QueueSettings> for QueueConfig {
    fn from(settings: &QueueSettings) -> Self {
        QueueConfig {
            max_concurrent: settings.max_concurrent.max(1),
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
        }
    }
}

/// `attempt * base` 간격으로 최대 `max_retries` 번까지.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base: Duration,
    attempt: u32,
    max_retries: u32,
}

impl LinearBackoff {
    pub fn new(base: Duration, max_retries: u32) -> LinearBackoff {
        LinearBackoff {
            base,
            attempt: 0,
            max_retries,
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Backoff for LinearBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_retries {
            return None;
        }
        self.attempt += 1;
        Some(self.base * self.attempt)
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl From<&QueueConfig> for LinearBackoff {
    fn from(config: &QueueConfig) -> Self {
        LinearBackoff::new(config.base_delay, config.max_retries)
    }
}

/// Remote store 앞단의 동시 실행 제한 + 재시도 큐.
///
/// At most `max_concurrent` operations run at once; the rest wait for
/// admission. Errors accepted by the classifier are retried with a linear
/// backoff of `attempt * base_delay`, everything else is returned as is.
pub struct RequestQueue {
    config: QueueConfig,
    permits: Semaphore,
    cancel: Mutex<CancellationToken>,
    classifier: ErrorClassifier,
    waiting: AtomicUsize,
    retries: AtomicU64,
}

impl RequestQueue {
    pub fn new(config: QueueConfig) -> RequestQueue {
        RequestQueue::with_classifier(config, Arc::new(is_concurrency_error))
    }

    pub fn with_classifier(config: QueueConfig, classifier: ErrorClassifier) -> RequestQueue {
        RequestQueue {
            permits: Semaphore::new(config.max_concurrent.max(1)),
            config,
            cancel: Mutex::new(CancellationToken::new()),
            classifier,
            waiting: AtomicUsize::new(0),
            retries: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Operations waiting for admission.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    /// Total retries performed since creation.
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    /// `operation` is called once per attempt.
    pub async fn enqueue<T, F, Fut>(&self, mut operation: F) -> RemoteResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let token = self.cancel.lock().clone();

        self.waiting.fetch_add(1, Ordering::Relaxed);
        let permit = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            permit = self.permits.acquire() => permit.ok(),
        };
        self.waiting.fetch_sub(1, Ordering::Relaxed);

        let Some(_permit) = permit else {
            debug!("queued request cancelled before admission");
            return Err(RemoteError::Cancelled);
        };

        let mut backoff_state = LinearBackoff::from(&self.config);
        loop {
            match operation().await {
                Ok(value) => break Ok(value),
                Err(err) => {
                    if !(self.classifier)(&err) {
                        break Err(err);
                    }
                    if let Some(delay) = backoff_state.next_backoff() {
                        self.retries.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            "remote busy ({}), retry {}/{} in {:?}",
                            err,
                            backoff_state.attempt(),
                            self.config.max_retries,
                            delay
                        );
                        sleep(delay).await;
                        continue;
                    } else {
                        break Err(err);
                    }
                }
            }
        }
    }

    /// Rejects every operation still waiting for admission with
    /// [`RemoteError::Cancelled`]. Running operations are not interrupted.
    pub fn clear(&self) -> usize {
        let waiting = self.waiting();
        let mut token = self.cancel.lock();
        token.cancel();
        *token = CancellationToken::new();
        if waiting > 0 {
            warn!("request queue cleared, {} pending request(s) cancelled", waiting);
        }
        waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use tokio::sync::oneshot;

    fn fast_config(max_concurrent: usize) -> QueueConfig {
        QueueConfig {
            max_concurrent,
            max_retries: 2,
            base_delay: Duration::from_millis(5),
        }
    }

    fn busy() -> RemoteError {
        RemoteError::rejected("Too many simultaneous invocations: Spreadsheets")
    }

    #[test]
    fn classifier_matches_concurrency_messages_only() {
        assert!(is_concurrency_error(&busy()));
        assert!(is_concurrency_error(&RemoteError::rejected(
            "Service invoked too many times for one day"
        )));
        assert!(!is_concurrency_error(&RemoteError::rejected("Sheet not found")));
        assert!(!is_concurrency_error(&RemoteError::Status(500)));
    }

    #[test]
    fn linear_backoff_grows_until_the_ceiling() {
        let mut backoff = LinearBackoff::new(Duration::from_millis(100), 2);
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), None);
        assert_eq!(backoff.attempt(), 2);

        backoff.reset();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));

        let mut never = LinearBackoff::new(Duration::from_millis(100), 0);
        assert_eq!(never.next_backoff(), None);
    }

    #[tokio::test]
    async fn three_operations_with_two_retries_keep_their_results() {
        let queue = RequestQueue::new(fast_config(2));
        let third_calls = AtomicU32::new(0);

        let (a, b, c) = tokio::join!(
            queue.enqueue(|| async { Ok::<_, RemoteError>(1) }),
            queue.enqueue(|| async { Ok::<_, RemoteError>(2) }),
            queue.enqueue(|| {
                let call = third_calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(busy())
                    } else {
                        Ok(3)
                    }
                }
            }),
        );

        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
        assert_eq!(c.unwrap(), 3);
        assert_eq!(queue.retries(), 2);
        assert_eq!(third_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_stop_at_the_ceiling() {
        let queue = RequestQueue::new(fast_config(2));
        let calls = AtomicU32::new(0);

        let result: RemoteResult<()> = queue
            .enqueue(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(busy()) }
            })
            .await;

        assert!(matches!(result, Err(RemoteError::Rejected { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(queue.retries(), 2);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let queue = RequestQueue::new(fast_config(2));
        let calls = AtomicU32::new(0);

        let result: RemoteResult<()> = queue
            .enqueue(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RemoteError::Status(404)) }
            })
            .await;

        assert!(matches!(result, Err(RemoteError::Status(404))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.retries(), 0);
    }

    #[tokio::test]
    async fn custom_classifier_replaces_string_matching() {
        let classifier: ErrorClassifier =
            Arc::new(|err: &RemoteError| matches!(err, RemoteError::Status(429)));
        let queue = RequestQueue::with_classifier(fast_config(1), classifier);
        let calls = AtomicU32::new(0);

        let result = queue
            .enqueue(|| {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(RemoteError::Status(429))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(queue.retries(), 1);
    }

    #[tokio::test]
    async fn admission_is_bounded() {
        let queue = Arc::new(RequestQueue::new(fast_config(2)));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let queue = queue.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(|| {
                        let in_flight = in_flight.clone();
                        let peak = peak.clone();
                        async move {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, RemoteError>(())
                        }
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn clear_cancels_waiting_operations() {
        let queue = Arc::new(RequestQueue::new(fast_config(1)));
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let mut release_rx = Some(release_rx);

        let running = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .enqueue(move || {
                        let rx = release_rx.take();
                        async move {
                            if let Some(rx) = rx {
                                let _ = rx.await;
                            }
                            Ok::<_, RemoteError>("first")
                        }
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let waiting = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.enqueue(|| async { Ok::<_, RemoteError>("second") }).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(queue.waiting(), 1);

        assert_eq!(queue.clear(), 1);
        let cancelled = waiting.await.unwrap();
        assert!(matches!(cancelled, Err(RemoteError::Cancelled)));

        release_tx.send(()).unwrap();
        assert_eq!(running.await.unwrap().unwrap(), "first");

        // 새 요청은 다시 받아준다
        let after = queue.enqueue(|| async { Ok::<_, RemoteError>("third") }).await;
        assert_eq!(after.unwrap(), "third");
    }
}
