use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::exception::RemoteResult;
use crate::sync::queue::RequestQueue;
use crate::sync::remote::{Mutation, RemoteStore};
use crate::unit::{Participant, SharedRoster};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    Keep,
    Replace,
}

/// Coarse structural comparison of two rosters.
///
/// Replace when the participant counts differ, a remote participant is
/// unknown locally, or a participant's card set differs in size or ids.
/// Contact field edits alone do not trigger a replacement.
pub fn diff_roster(local: &[Participant], remote: &[Participant]) -> MergeDecision {
    if local.len() != remote.len() {
        return MergeDecision::Replace;
    }
    for theirs in remote {
        let Some(ours) = local.iter().find(|p| p.id == theirs.id) else {
            return MergeDecision::Replace;
        };
        if ours.cards.len() != theirs.cards.len() {
            return MergeDecision::Replace;
        }
        let ids: HashSet<&str> = ours.cards.iter().map(|c| c.get_id()).collect();
        if theirs.cards.iter().any(|c| !ids.contains(c.get_id())) {
            return MergeDecision::Replace;
        }
    }
    MergeDecision::Keep
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// Another pull was still running.
    Skipped,
    Unchanged,
    Replaced { participants: usize, skipped_rows: usize },
}

struct PullGuard<'a>(&'a AtomicBool);

impl Drop for PullGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 로컬 roster 와 remote store 를 맞춰주는 역할.
///
/// Pushes are optimistic: the local roster is already updated when a
/// mutation is handed over, and a failed push only produces a log line.
/// Pulls overwrite the local roster wholesale when [`diff_roster`] says so.
pub struct SyncReconciler {
    store: Arc<dyn RemoteStore>,
    queue: Arc<RequestQueue>,
    roster: SharedRoster,
    pulling: AtomicBool,
    log_tx: mpsc::UnboundedSender<String>,
}

impl SyncReconciler {
    /// The receiver yields human-readable sync messages for the history log.
    pub fn new(
        store: Arc<dyn RemoteStore>,
        queue: Arc<RequestQueue>,
        roster: SharedRoster,
    ) -> (SyncReconciler, mpsc::UnboundedReceiver<String>) {
        let (log_tx, log_rx) = mpsc::unbounded_channel();
        let reconciler = SyncReconciler {
            store,
            queue,
            roster,
            pulling: AtomicBool::new(false),
            log_tx,
        };
        (reconciler, log_rx)
    }

    pub fn queue(&self) -> &Arc<RequestQueue> {
        &self.queue
    }

    pub fn roster(&self) -> &SharedRoster {
        &self.roster
    }

    fn report(&self, line: String) {
        // 받는 쪽이 없으면 그냥 버린다
        let _ = self.log_tx.send(line);
    }

    pub async fn pull(&self) -> RemoteResult<PullOutcome> {
        if self
            .pulling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("pull already in flight, dropping this one");
            return Ok(PullOutcome::Skipped);
        }
        let _guard = PullGuard(&self.pulling);

        let store = self.store.clone();
        let snapshot = match self
            .queue
            .enqueue(|| {
                let store = store.clone();
                async move { store.read_all().await }
            })
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("roster pull failed: {}", e);
                self.report(format!("Sync failed: {}", e));
                return Err(e);
            }
        };

        if snapshot.skipped > 0 {
            self.report(format!(
                "Sync skipped {} unreadable remote row(s)",
                snapshot.skipped
            ));
        }

        let mut roster = self.roster.write();
        match diff_roster(roster.participants(), &snapshot.participants) {
            MergeDecision::Keep => Ok(PullOutcome::Unchanged),
            MergeDecision::Replace => {
                let participants = snapshot.participants.len();
                roster.replace_all(snapshot.participants);
                drop(roster);
                info!("local roster replaced by remote ({} participants)", participants);
                self.report(format!(
                    "Roster updated from remote: {} participant(s)",
                    participants
                ));
                Ok(PullOutcome::Replaced {
                    participants,
                    skipped_rows: snapshot.skipped,
                })
            }
        }
    }

    /// Fire-and-forget push of a mutation already applied locally.
    pub fn push(&self, mutation: Mutation) -> JoinHandle<()> {
        let store = self.store.clone();
        let queue = self.queue.clone();
        let log_tx = self.log_tx.clone();

        tokio::spawn(async move {
            let description = mutation.describe();
            let result = queue
                .enqueue(|| {
                    let store = store.clone();
                    let mutation = mutation.clone();
                    async move { store.apply(&mutation).await }
                })
                .await;

            match result {
                Ok(()) => debug!("pushed: {}", description),
                Err(e) if e.is_cancelled() => {
                    debug!("push cancelled: {}", description);
                }
                Err(e) => {
                    warn!("push failed ({}): {}", description, e);
                    let _ = log_tx.send(format!("Could not {}: {}", description, e));
                }
            }
        })
    }

    /// Pulls every `interval` until `shutdown` fires. Ticks that land while
    /// a pull is still running are dropped by the reentrancy guard.
    pub fn spawn_polling(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("roster polling every {:?}", interval);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("roster polling stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let this = Arc::clone(&this);
                        tokio::spawn(async move {
                            let _ = this.pull().await;
                        });
                    }
                }
            }
        })
    }
}
