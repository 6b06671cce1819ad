use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::card::Card;
use crate::card_gen::CardGenerator;
use crate::env::Settings;
use crate::exception::{GameResult, Notice, RemoteError, RemoteResult};
use crate::game::{BingoGame, DrawOutcome, Prize, Rejection, ResetKind, Winner};
use crate::pattern::Pattern;
use crate::storage::{HostSnapshot, LocalStore};
use crate::sync::{
    HttpRemoteStore, Mutation, PullOutcome, QueueConfig, RemoteStore, RequestQueue, SyncConfig,
    SyncReconciler,
};
use crate::unit::{ContactUpdate, NewParticipant, Participant, Roster, SharedRoster};

struct SyncLink {
    reconciler: Arc<SyncReconciler>,
    log_rx: mpsc::UnboundedReceiver<String>,
}

/// 호스트 화면이 호출하는 진입점.
///
/// Owns the roster, the game state machine and the optional remote link.
/// Roster edits are applied locally first and then pushed to the remote
/// without waiting; game operations never touch the network.
pub struct BingoHost {
    roster: SharedRoster,
    game: BingoGame,
    generator: CardGenerator,
    title: String,
    subtitle: String,
    sync_config: SyncConfig,
    sync: Option<SyncLink>,
    pending_pushes: Vec<JoinHandle<()>>,
}

impl BingoHost {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> BingoHost {
        BingoHost::from_snapshot(HostSnapshot {
            title: title.into(),
            subtitle: subtitle.into(),
            ..Default::default()
        })
    }

    pub fn from_snapshot(snapshot: HostSnapshot) -> BingoHost {
        BingoHost {
            roster: Roster::from_participants(snapshot.participants).shared(),
            game: BingoGame::from_parts(snapshot.state, snapshot.winners, snapshot.prizes),
            generator: CardGenerator::new(),
            title: snapshot.title,
            subtitle: snapshot.subtitle,
            sync_config: snapshot.sync_config,
            sync: None,
            pending_pushes: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> HostSnapshot {
        HostSnapshot {
            participants: self.roster.read().participants().to_vec(),
            state: self.game.state().clone(),
            winners: self.game.winners().to_vec(),
            prizes: self.game.prizes().to_vec(),
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            sync_config: self.sync_config.clone(),
        }
    }

    /// Restores persisted state; an empty title falls back to `settings`.
    pub fn load(store: &LocalStore, settings: &Settings) -> BingoHost {
        let mut snapshot = HostSnapshot::load(store);
        if snapshot.title.is_empty() {
            snapshot.title = settings.game.title.clone();
            snapshot.subtitle = settings.game.subtitle.clone();
        }
        if !snapshot.sync_config.is_configured() {
            snapshot.sync_config = SyncConfig::from(&settings.remote);
        }
        let host = BingoHost::from_snapshot(snapshot);
        info!(
            "host loaded: {} participant(s), round {}",
            host.roster.read().len(),
            host.game.state().game_round
        );
        host
    }

    pub fn save(&self, store: &LocalStore) -> GameResult<()> {
        self.snapshot().save(store)
    }

    pub fn roster(&self) -> SharedRoster {
        self.roster.clone()
    }

    pub fn game(&self) -> &BingoGame {
        &self.game
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    pub fn set_titles(&mut self, title: impl Into<String>, subtitle: impl Into<String>) {
        self.title = title.into();
        self.subtitle = subtitle.into();
    }

    // ---- remote link ----

    pub fn sync_config(&self) -> &SyncConfig {
        &self.sync_config
    }

    /// Takes effect on the next [`BingoHost::connect`].
    pub fn set_sync_config(&mut self, config: SyncConfig) {
        self.sync_config = config;
    }

    pub fn is_connected(&self) -> bool {
        self.sync.is_some()
    }

    pub fn attach_remote(&mut self, store: Arc<dyn RemoteStore>, queue: Arc<RequestQueue>) {
        if let Some(old) = self.sync.take() {
            old.reconciler.queue().clear();
        }
        let (reconciler, log_rx) = SyncReconciler::new(store, queue, self.roster.clone());
        self.sync = Some(SyncLink {
            reconciler: Arc::new(reconciler),
            log_rx,
        });
    }

    /// Connects to the configured HTTP endpoint. Returns false when no
    /// endpoint is configured.
    pub fn connect(&mut self, settings: &Settings) -> RemoteResult<bool> {
        let Some(endpoint) = self.sync_config.endpoint.clone() else {
            return Ok(false);
        };
        let store = HttpRemoteStore::new(endpoint, settings.remote.request_timeout())?;
        let queue = RequestQueue::new(QueueConfig::from(&settings.queue));
        info!("remote store: {}", store.endpoint());
        self.attach_remote(Arc::new(store), Arc::new(queue));
        Ok(true)
    }

    pub async fn pull(&self) -> RemoteResult<PullOutcome> {
        let reconciler = self
            .sync
            .as_ref()
            .map(|link| link.reconciler.clone())
            .ok_or(RemoteError::NotConfigured)?;
        reconciler.pull().await
    }

    /// Starts periodic pulls when auto sync is on and a remote is attached.
    pub fn spawn_polling(&self, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        if !self.sync_config.auto_sync {
            return None;
        }
        let link = self.sync.as_ref()?;
        let interval = Duration::from_secs(self.sync_config.poll_interval_seconds.max(1));
        Some(link.reconciler.spawn_polling(interval, shutdown))
    }

    /// Moves sync messages into the game history. Returns how many.
    pub fn drain_sync_log(&mut self) -> usize {
        let Some(link) = self.sync.as_mut() else {
            return 0;
        };
        let mut drained = 0;
        while let Ok(line) = link.log_rx.try_recv() {
            self.game.log(line);
            drained += 1;
        }
        drained
    }

    /// Waits for every push handed to the remote so far.
    pub async fn flush(&mut self) {
        let handles: Vec<JoinHandle<()>> = self.pending_pushes.drain(..).collect();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                warn!("push task ended abnormally: {}", e);
            }
        }
    }

    fn push(&mut self, mutation: Mutation) {
        let Some(link) = self.sync.as_ref() else {
            return;
        };
        self.pending_pushes.retain(|h| !h.is_finished());
        self.pending_pushes.push(link.reconciler.push(mutation));
    }

    // ---- roster ----

    pub fn register_participant<R: Rng + ?Sized>(
        &mut self,
        info: NewParticipant,
        card_count: usize,
        rng: &mut R,
    ) -> Result<Participant, Notice> {
        let cards = self.generator.generate_cards(rng, card_count);
        let participant = self.roster.write().register(info, cards)?.clone();
        self.push(Mutation::Save(participant.clone()));
        Ok(participant)
    }

    pub fn purchase_cards<R: Rng + ?Sized>(
        &mut self,
        participant_id: &str,
        count: usize,
        rng: &mut R,
    ) -> Result<Participant, Notice> {
        let cards = self.generator.generate_cards(rng, count);
        let participant = self.roster.write().add_cards(participant_id, cards)?.clone();
        self.push(Mutation::Save(participant.clone()));
        Ok(participant)
    }

    pub fn update_contact(
        &mut self,
        participant_id: &str,
        update: ContactUpdate,
    ) -> Result<Participant, Notice> {
        let participant = self
            .roster
            .write()
            .update_contact(participant_id, update)?
            .clone();
        self.push(Mutation::Save(participant.clone()));
        Ok(participant)
    }

    pub fn delete_card(&mut self, participant_id: &str, card_id: &str) -> Result<Card, Notice> {
        if self.game.is_card_protected(card_id) {
            return Err(Notice::ProtectedCard(card_id.to_string()));
        }
        let (card, participant) = {
            let mut roster = self.roster.write();
            let card = roster.remove_card(participant_id, card_id)?;
            let participant = roster.find(participant_id).cloned();
            (card, participant)
        };
        if let Some(participant) = participant {
            self.push(Mutation::Save(participant));
        }
        Ok(card)
    }

    pub fn delete_participant(&mut self, participant_id: &str) -> Result<Participant, Notice> {
        if let Some(winner) = self
            .game
            .current_winners()
            .iter()
            .find(|w| w.participant_id == participant_id)
        {
            return Err(Notice::ProtectedCard(winner.card_id.clone()));
        }
        let removed = self.roster.write().remove(participant_id)?;
        self.push(Mutation::Delete(removed.id.clone()));
        Ok(removed)
    }

    /// Refused while a winner batch is pending.
    pub fn delete_all(&mut self) -> Result<usize, Notice> {
        if self.game.state().round_locked {
            return Err(Notice::RoundLocked);
        }
        let removed = {
            let mut roster = self.roster.write();
            let removed = roster.len();
            roster.clear();
            removed
        };
        self.push(Mutation::DeleteAll);
        Ok(removed)
    }

    // ---- game ----

    pub fn select_pattern(&mut self, pattern: Pattern) -> Result<(), Notice> {
        self.game.select_pattern(pattern)
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.game.toggle_pause()
    }

    pub fn draw_ball<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<DrawOutcome, Notice> {
        let roster = self.roster.read();
        self.game.draw_ball(roster.participants(), rng)
    }

    pub fn draw_number(&mut self, ball: u8) -> Result<DrawOutcome, Notice> {
        let roster = self.roster.read();
        self.game.draw_number(roster.participants(), ball)
    }

    pub fn confirm_round(&mut self) -> Result<Vec<Winner>, Notice> {
        self.game.confirm_round()
    }

    /// The owner is pushed again because the card's invalid flag changed.
    pub fn reject_winner(&mut self, card_id: &str) -> Result<Rejection, Notice> {
        let (rejection, owner) = {
            let mut roster = self.roster.write();
            let rejection = self.game.reject_winner(&mut roster, card_id)?;
            let owner = roster.find(&rejection.winner.participant_id).cloned();
            (rejection, owner)
        };
        if let Some(owner) = owner {
            self.push(Mutation::Save(owner));
        }
        Ok(rejection)
    }

    pub fn reset(&mut self) -> ResetKind {
        let (kind, revalidated) = {
            let mut roster = self.roster.write();
            let flagged: Vec<String> = roster
                .participants()
                .iter()
                .filter(|p| p.cards.iter().any(|c| c.is_invalid()))
                .map(|p| p.id.clone())
                .collect();
            let kind = self.game.reset(&mut roster);
            let revalidated: Vec<Participant> = match kind {
                ResetKind::Full => flagged
                    .iter()
                    .filter_map(|id| roster.find(id).cloned())
                    .collect(),
                ResetKind::Soft => Vec::new(),
            };
            (kind, revalidated)
        };
        for participant in revalidated {
            self.push(Mutation::Save(participant));
        }
        kind
    }

    pub fn add_prize(&mut self, name: impl Into<String>, description: impl Into<String>) -> Prize {
        self.game.add_prize(name, description).clone()
    }

    pub fn update_prize(
        &mut self,
        prize_id: &str,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Prize, Notice> {
        self.game
            .update_prize(prize_id, name, description)
            .map(Prize::clone)
    }

    pub fn remove_prize(&mut self, prize_id: &str) -> Result<Prize, Notice> {
        self.game.remove_prize(prize_id)
    }
}
