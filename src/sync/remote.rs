use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::exception::{RemoteError, RemoteResult};
use crate::unit::Participant;

/// Script endpoint actions. The host itself uses the roster subset; the
/// rest belongs to the player-facing side of the same endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Register,
    SaveParticipant,
    DeleteParticipant,
    DeleteAll,
    ReadAll,
    CreateCard,
    GetUserCards,
    UpdateProfile,
    CreateRoom,
    JoinRoom,
    GetRooms,
    UpdateRoom,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Login => "login",
            Action::Register => "register",
            Action::SaveParticipant => "saveParticipant",
            Action::DeleteParticipant => "deleteParticipant",
            Action::DeleteAll => "deleteAll",
            Action::ReadAll => "readAll",
            Action::CreateCard => "createCard",
            Action::GetUserCards => "getUserCards",
            Action::UpdateProfile => "updateProfile",
            Action::CreateRoom => "createRoom",
            Action::JoinRoom => "joinRoom",
            Action::GetRooms => "getRooms",
            Action::UpdateRoom => "updateRoom",
        }
    }
}

/// Envelope every endpoint answer is wrapped in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Roster as read from the remote, with the number of rows that could not
/// be parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterSnapshot {
    pub participants: Vec<Participant>,
    pub skipped: usize,
}

/// Roster change forwarded to the remote after the local roster was updated.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Save(Participant),
    Delete(String),
    DeleteAll,
}

impl Mutation {
    pub fn describe(&self) -> String {
        match self {
            Mutation::Save(p) => format!("save participant {}", p.id),
            Mutation::Delete(id) => format!("delete participant {}", id),
            Mutation::DeleteAll => "delete all participants".to_string(),
        }
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn read_all(&self) -> RemoteResult<RosterSnapshot>;

    async fn save_participant(&self, participant: &Participant) -> RemoteResult<()>;

    async fn delete_participant(&self, participant_id: &str) -> RemoteResult<()>;

    async fn delete_all(&self) -> RemoteResult<()>;

    async fn apply(&self, mutation: &Mutation) -> RemoteResult<()> {
        match mutation {
            Mutation::Save(participant) => self.save_participant(participant).await,
            Mutation::Delete(id) => self.delete_participant(id).await,
            Mutation::DeleteAll => self.delete_all().await,
        }
    }
}

/// Accepts either a bare array of rows or `{ "participants": [...] }`.
/// Rows that do not parse are skipped and counted.
pub fn parse_roster(payload: Value) -> RemoteResult<RosterSnapshot> {
    let rows = match payload {
        Value::Null => Vec::new(),
        Value::Object(mut map) if map.contains_key("participants") => {
            let inner = map.remove("participants").unwrap_or(Value::Null);
            return parse_roster(inner);
        }
        other => serde_json::from_value::<Vec<Value>>(other)?,
    };

    let mut snapshot = RosterSnapshot::default();
    for row in rows {
        match serde_json::from_value::<Participant>(row) {
            Ok(participant) => snapshot.participants.push(participant),
            Err(e) => {
                warn!("skipping malformed remote row: {}", e);
                snapshot.skipped += 1;
            }
        }
    }
    Ok(snapshot)
}

/// JSON-over-HTTP client for the spreadsheet script endpoint.
pub struct HttpRemoteStore {
    http: Client,
    endpoint: String,
}

impl HttpRemoteStore {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> RemoteResult<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(RemoteError::NotConfigured);
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `{ "action": ..., ..payload }` and unwrap the response envelope.
    pub async fn call(&self, action: Action, payload: Value) -> RemoteResult<Option<Value>> {
        let mut body = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        body.insert("action".to_string(), Value::String(action.as_str().to_string()));

        debug!("remote call: {}", action.as_str());
        let response = self.http.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let envelope: ApiResponse = serde_json::from_str(&text)?;
        if !envelope.success {
            return Err(RemoteError::rejected(
                envelope
                    .message
                    .unwrap_or_else(|| format!("{} failed", action.as_str())),
            ));
        }
        Ok(envelope.data)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn read_all(&self) -> RemoteResult<RosterSnapshot> {
        let data = self.call(Action::ReadAll, Value::Null).await?;
        parse_roster(data.unwrap_or(Value::Null))
    }

    async fn save_participant(&self, participant: &Participant) -> RemoteResult<()> {
        self.call(Action::SaveParticipant, json!({ "participant": participant }))
            .await?;
        Ok(())
    }

    async fn delete_participant(&self, participant_id: &str) -> RemoteResult<()> {
        self.call(Action::DeleteParticipant, json!({ "id": participant_id }))
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> RemoteResult<()> {
        self.call(Action::DeleteAll, Value::Null).await?;
        Ok(())
    }
}
