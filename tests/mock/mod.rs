// 원격 스프레드시트 대신 메모리에 roster 를 들고 있는 mock store.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bingo_host::exception::{RemoteError, RemoteResult};
use bingo_host::sync::{RemoteStore, RosterSnapshot};
use bingo_host::unit::Participant;
use parking_lot::Mutex;

#[derive(Default)]
pub struct MockRemoteStore {
    pub participants: Mutex<Vec<Participant>>,
    pub calls: Mutex<Vec<String>>,
    /// read_all answers "too many simultaneous invocations" this many times.
    pub busy_reads: AtomicU32,
    pub fail_saves: bool,
}

impl MockRemoteStore {
    pub fn with_participants(participants: Vec<Participant>) -> MockRemoteStore {
        MockRemoteStore {
            participants: Mutex::new(participants),
            ..Default::default()
        }
    }

    pub fn remote(&self, participant_id: &str) -> Option<Participant> {
        self.participants
            .lock()
            .iter()
            .find(|p| p.id == participant_id)
            .cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn read_all(&self) -> RemoteResult<RosterSnapshot> {
        self.calls.lock().push("readAll".into());
        if self
            .busy_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RemoteError::rejected(
                "Too many simultaneous invocations: Spreadsheets",
            ));
        }
        Ok(RosterSnapshot {
            participants: self.participants.lock().clone(),
            skipped: 0,
        })
    }

    async fn save_participant(&self, participant: &Participant) -> RemoteResult<()> {
        self.calls.lock().push(format!("saveParticipant {}", participant.id));
        if self.fail_saves {
            return Err(RemoteError::rejected("Sheet is protected"));
        }
        let mut remote = self.participants.lock();
        match remote.iter_mut().find(|p| p.id == participant.id) {
            Some(existing) => *existing = participant.clone(),
            None => remote.push(participant.clone()),
        }
        Ok(())
    }

    async fn delete_participant(&self, participant_id: &str) -> RemoteResult<()> {
        self.calls.lock().push(format!("deleteParticipant {}", participant_id));
        self.participants.lock().retain(|p| p.id != participant_id);
        Ok(())
    }

    async fn delete_all(&self) -> RemoteResult<()> {
        self.calls.lock().push("deleteAll".into());
        self.participants.lock().clear();
        Ok(())
    }
}
