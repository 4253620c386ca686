//! Persistence for [`EconomyState`]: one pretty-printed JSON document,
//! rewritten whole on every mutation.
//!
//! Saves go through a temporary sibling file and a rename, so a crash leaves
//! either the old document or the new one, never a truncated one. Loading
//! never fails: a missing document is a fresh economy, an undecodable one is
//! renamed aside and replaced by a fresh economy.

use std::{
    collections::BTreeMap,
    fmt, fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::{
    error::StoreError,
    state::{Account, Action, EconomyState},
};

/// Serialize a state exactly as it is written to disk.
pub fn encode(state: &EconomyState) -> Result<String, StoreError> {
    let mut out = serde_json::to_string_pretty(state).map_err(StoreError::Encode)?;
    out.push('\n');
    Ok(out)
}

/// Parse a document, accepting both the current layout and the flat layout
/// written by the first version of the bot.
pub fn decode(raw: &str) -> Result<EconomyState, StoreError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(StoreError::Decode)?;

    let is_legacy = value
        .as_object()
        .is_some_and(|obj| obj.contains_key("candy") && !obj.contains_key("accounts"));

    if is_legacy {
        // Parsed from the text again: `Value` objects do not keep key order.
        let legacy: LegacyDocument = serde_json::from_str(raw).map_err(StoreError::Decode)?;
        Ok(legacy.migrate())
    } else {
        serde_json::from_value(value).map_err(StoreError::Decode)
    }
}

/// Flat document: `candy` balances plus one timestamp map per action, with
/// naive timestamps taken in UTC.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyDocument {
    candy: InDocumentOrder<i64>,
    last_daily: BTreeMap<String, NaiveDateTime>,
    last_trick: BTreeMap<String, NaiveDateTime>,
    last_random_reward: BTreeMap<String, NaiveDateTime>,
}

/// Object entries in the order they appear in the text. Legacy balances
/// were kept in insertion order, which is the account opening order.
#[derive(Debug)]
struct InDocumentOrder<V>(Vec<(String, V)>);

impl<V> Default for InDocumentOrder<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for InDocumentOrder<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(std::marker::PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = InDocumentOrder<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of user ids")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, V)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, V>()? {
                    // Later duplicates win, as they would in a map.
                    entries.retain(|(k, _)| *k != key);
                    entries.push((key, value));
                }
                Ok(InDocumentOrder(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(std::marker::PhantomData))
    }
}

impl LegacyDocument {
    fn migrate(self) -> EconomyState {
        let mut state = EconomyState::new();

        for (opened, (user, amount)) in (0u64..).zip(self.candy.0) {
            let balance = u64::try_from(amount).unwrap_or(0);
            state.restore_account(user, Account { balance, opened });
        }

        let stamps = [
            (Action::Daily, self.last_daily),
            (Action::Trick, self.last_trick),
            (Action::RandomBonus, self.last_random_reward),
        ];
        for (action, by_user) in stamps {
            for (user, naive) in by_user {
                state.mark_triggered(&user, action, Utc.from_utc_datetime(&naive));
            }
        }
        state
    }
}

/// File-backed store for the economy document.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. `Ok(None)` means there is no document yet.
    pub fn try_load(&self) -> Result<Option<EconomyState>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        decode(&raw).map(Some)
    }

    /// Read the document, falling back to an empty economy on any problem.
    pub fn load(&self) -> EconomyState {
        match self.try_load() {
            Ok(Some(state)) => {
                info!(
                    path = %self.path.display(),
                    accounts = state.accounts().count(),
                    "economy loaded"
                );
                state
            }
            Ok(None) => {
                info!(path = %self.path.display(), "no economy document yet; starting empty");
                EconomyState::new()
            }
            Err(error @ StoreError::Decode(_)) => {
                match self.quarantine() {
                    Ok(moved_to) => warn!(
                        path = %self.path.display(),
                        moved_to = %moved_to.display(),
                        %error,
                        "economy document is corrupt; kept aside, starting empty"
                    ),
                    Err(rename_error) => warn!(
                        path = %self.path.display(),
                        %error,
                        %rename_error,
                        "economy document is corrupt and could not be moved; starting empty"
                    ),
                }
                EconomyState::new()
            }
            Err(error) => {
                warn!(
                    path = %self.path.display(),
                    %error,
                    "failed to load economy document; starting empty"
                );
                EconomyState::new()
            }
        }
    }

    /// Rename an undecodable document to `<name>.corrupt-<ulid>` so the next
    /// save does not overwrite it.
    fn quarantine(&self) -> std::io::Result<PathBuf> {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".corrupt-{}", Ulid::new()));
        let target = self.path.with_file_name(name);
        fs::rename(&self.path, &target)?;
        Ok(target)
    }

    /// Atomically replace the document with `state`.
    pub fn save(&self, state: &EconomyState) -> Result<(), StoreError> {
        let payload = encode(state)?;
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let temp_path = self.path.with_extension(format!("{}.tmp", Ulid::new()));
        let written = fs::File::create(&temp_path).and_then(|mut file| {
            file.write_all(payload.as_bytes())?;
            file.sync_all()
        });
        if let Err(source) = written.and_then(|()| fs::rename(&temp_path, &self.path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(io_err(source));
        }

        debug!(path = %self.path.display(), bytes = payload.len(), "economy saved");
        Ok(())
    }
}
