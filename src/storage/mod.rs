use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::enums::{
    KEY_GAME_STATE, KEY_PRIZES, KEY_ROSTER, KEY_SUBTITLE, KEY_SYNC_CONFIG, KEY_TITLE, KEY_WINNERS,
};
use crate::exception::{GameError, GameResult};
use crate::game::{state::GameState, winner::Prize, winner::Winner};
use crate::sync::SyncConfig;
use crate::unit::Participant;

/// Key-value persistence: one JSON file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn open(dir: impl Into<PathBuf>) -> GameResult<LocalStore> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(LocalStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // key 는 파일 이름이 되므로 경로 구분자를 허용하지 않는다
    fn path(&self, key: &str) -> GameResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(GameError::internal_error(format!(
                "invalid storage key {:?}",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> GameResult<()> {
        let path = self.path(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, &path)?;
        debug!("saved {}", path.display());
        Ok(())
    }

    /// Missing records yield `T::default()`. Object records are merged
    /// key by key onto the default, so fields added later keep their
    /// defaults. Unreadable records are logged and replaced by the default.
    pub fn load_or_default<T>(&self, key: &str) -> T
    where
        T: Default + Serialize + DeserializeOwned,
    {
        let path = match self.path(key) {
            Ok(path) => path,
            Err(e) => {
                warn!("{}", e);
                return T::default();
            }
        };
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return T::default(),
            Err(e) => {
                warn!("could not read {}: {}", path.display(), e);
                return T::default();
            }
        };

        let stored: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("corrupt record {}: {}", key, e);
                return T::default();
            }
        };

        let merged = match (serde_json::to_value(T::default()), stored) {
            (Ok(Value::Object(mut base)), Value::Object(overlay)) => {
                base.extend(overlay);
                Value::Object(base)
            }
            (_, other) => other,
        };

        serde_json::from_value(merged).unwrap_or_else(|e| {
            warn!("record {} does not match its shape, using defaults: {}", key, e);
            T::default()
        })
    }

    pub fn remove(&self, key: &str) -> GameResult<()> {
        match fs::remove_file(self.path(key)?) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Everything the host persists, loaded and saved as a unit.
#[derive(Debug, Clone, Default)]
pub struct HostSnapshot {
    pub participants: Vec<Participant>,
    pub state: GameState,
    pub winners: Vec<Winner>,
    pub prizes: Vec<Prize>,
    pub title: String,
    pub subtitle: String,
    pub sync_config: SyncConfig,
}

impl HostSnapshot {
    pub fn load(store: &LocalStore) -> HostSnapshot {
        HostSnapshot {
            participants: store.load_or_default(KEY_ROSTER),
            state: store.load_or_default(KEY_GAME_STATE),
            winners: store.load_or_default(KEY_WINNERS),
            prizes: store.load_or_default(KEY_PRIZES),
            title: store.load_or_default(KEY_TITLE),
            subtitle: store.load_or_default(KEY_SUBTITLE),
            sync_config: store.load_or_default(KEY_SYNC_CONFIG),
        }
    }

    pub fn save(&self, store: &LocalStore) -> GameResult<()> {
        store.save(KEY_ROSTER, &self.participants)?;
        store.save(KEY_GAME_STATE, &self.state)?;
        store.save(KEY_WINNERS, &self.winners)?;
        store.save(KEY_PRIZES, &self.prizes)?;
        store.save(KEY_TITLE, &self.title)?;
        store.save(KEY_SUBTITLE, &self.subtitle)?;
        store.save(KEY_SYNC_CONFIG, &self.sync_config)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;
    use uuid::Uuid;

    fn temp_store() -> LocalStore {
        let dir = std::env::temp_dir().join(format!("bingo_host_{}", Uuid::new_v4()));
        LocalStore::open(dir).unwrap()
    }

    #[test]
    fn missing_record_yields_default() {
        let store = temp_store();
        let state: GameState = store.load_or_default(KEY_GAME_STATE);
        assert_eq!(state, GameState::default());
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn partial_record_keeps_new_defaults() {
        let store = temp_store();
        fs::write(
            store.dir().join("sync_config.json"),
            r#"{"endpoint":"https://example.test/exec"}"#,
        )
        .unwrap();

        let config: SyncConfig = store.load_or_default(KEY_SYNC_CONFIG);
        assert_eq!(config.endpoint.as_deref(), Some("https://example.test/exec"));
        assert_eq!(config.poll_interval_seconds, 30);
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn corrupt_record_falls_back() {
        let store = temp_store();
        fs::write(store.dir().join("winners.json"), "{ not json").unwrap();
        let winners: Vec<Winner> = store.load_or_default(KEY_WINNERS);
        assert!(winners.is_empty());
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn snapshot_survives_a_restart() {
        let store = temp_store();
        let mut snapshot = HostSnapshot {
            title: "Bingo solidario".into(),
            ..Default::default()
        };
        snapshot.state.drawn_balls = vec![3, 44];
        snapshot.state.selected_pattern = Pattern::Cross;
        snapshot.prizes.push(Prize::new("TV", ""));
        snapshot.save(&store).unwrap();

        let loaded = HostSnapshot::load(&store);
        assert_eq!(loaded.title, "Bingo solidario");
        assert_eq!(loaded.state, snapshot.state);
        assert_eq!(loaded.prizes, snapshot.prizes);

        store.remove(KEY_PRIZES).unwrap();
        store.remove(KEY_PRIZES).unwrap();
        assert!(HostSnapshot::load(&store).prizes.is_empty());
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn keys_cannot_escape_the_store() {
        let store = temp_store();
        let result = store.save("../outside", &1u8);
        assert!(matches!(result, Err(GameError::Internal { .. })));
        assert!(store.remove("").is_err());
        let loaded: Vec<Winner> = store.load_or_default("a/b");
        assert!(loaded.is_empty());
        let _ = fs::remove_dir_all(store.dir());
    }
}
