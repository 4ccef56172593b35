//! Session state and its durable key-value surface
//!
//! The [`SessionStore`] is the only mutable session state. It persists three
//! fixed fields; all three must be present for a session to be resumable.

use crate::error::{ChargeClockError, Result};
use crate::logging::get_logger;
use crate::session::Session;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Persisted pickup hour (integer)
pub const KEY_PICKUP_HOURS: &str = "pickupHours";
/// Persisted target state of charge (integer percent)
pub const KEY_TARGET_SOC: &str = "targetSoc";
/// Persisted session start (ISO-8601 string)
pub const KEY_SESSION_START: &str = "sessionStartTimestamp";

const SESSION_KEYS: [&str; 3] = [KEY_PICKUP_HOURS, KEY_TARGET_SOC, KEY_SESSION_START];

/// Durable key-value surface
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`; returns whether it was present
    fn remove(&mut self, key: &str) -> Result<bool>;
}

/// In-memory store, lost on restart
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        Ok(self.values.remove(key).is_some())
    }
}

/// Key-value store backed by a JSON object file
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
    logger: crate::logging::StructuredLogger,
}

impl JsonFileStore {
    /// Open the store, reading existing contents if the file exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let logger = get_logger("store");

        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(&contents)? {
                    Value::Object(map) => map,
                    _ => {
                        return Err(ChargeClockError::Serialization {
                            message: format!("{} does not hold a JSON object", path.display()),
                        });
                    }
                }
            }
        } else {
            logger.info("No persisted session file found, starting empty");
            Map::new()
        };

        Ok(Self {
            path,
            values,
            logger,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole map through a temp file and rename over the target
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        self.logger.debug("Saved session fields to disk");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.save()
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        let removed = self.values.remove(key).is_some();
        if removed {
            self.save()?;
        }
        Ok(removed)
    }
}

/// Owner of the active session and its persisted fields
pub struct SessionStore {
    backend: Box<dyn KeyValueStore>,
    current: Option<Session>,
    logger: crate::logging::StructuredLogger,
}

impl SessionStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            current: None,
            logger: get_logger("store"),
        }
    }

    /// Store kept only in memory
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Active session, if any
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Adopt fresh parameters when given, otherwise resume a persisted session
    pub fn hydrate(&mut self, fresh: Option<Session>) -> Option<Session> {
        match fresh {
            Some(session) => {
                // On failure the session still runs, it just won't survive a restart
                if let Err(e) = self.persist(&session) {
                    self.logger
                        .error(&format!("Failed to persist fresh session: {}", e));
                }
                self.logger.info(&format!(
                    "Hydrated fresh session started {} (pickup {}:00, target {}%)",
                    session.id(),
                    session.pickup_hour,
                    session.target_soc
                ));
            }
            None => {
                self.current = self.load();
                match &self.current {
                    Some(session) => self.logger.info(&format!(
                        "Resumed persisted session started {}",
                        session.id()
                    )),
                    None => self.logger.debug("No resumable session"),
                }
            }
        }
        self.current
    }

    /// Write the session's fields and make it the active session
    pub fn persist(&mut self, session: &Session) -> Result<()> {
        self.current = Some(*session);
        self.backend
            .set(KEY_PICKUP_HOURS, Value::from(session.pickup_hour.value()))?;
        self.backend
            .set(KEY_TARGET_SOC, Value::from(session.target_soc))?;
        self.backend
            .set(KEY_SESSION_START, Value::from(session.start_iso()))?;
        Ok(())
    }

    /// Read a persisted session; partial or unparseable fields mean none
    pub fn load(&self) -> Option<Session> {
        let present: Vec<&str> = SESSION_KEYS
            .iter()
            .copied()
            .filter(|k| self.backend.get(k).is_some())
            .collect();
        if present.is_empty() {
            return None;
        }
        if present.len() != SESSION_KEYS.len() {
            self.logger.warn(&format!(
                "Ignoring partially persisted session (only {:?} present)",
                present
            ));
            return None;
        }

        match self.parse_persisted() {
            Ok(session) => Some(session),
            Err(e) => {
                self.logger
                    .warn(&format!("Ignoring persisted session: {}", e));
                None
            }
        }
    }

    fn parse_persisted(&self) -> Result<Session> {
        let pickup = read_integer(self.backend.get(KEY_PICKUP_HOURS), KEY_PICKUP_HOURS)?;
        let soc = read_integer(self.backend.get(KEY_TARGET_SOC), KEY_TARGET_SOC)?;
        let start = match self.backend.get(KEY_SESSION_START) {
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)?.with_timezone(&Utc),
            other => {
                return Err(ChargeClockError::invalid_session(format!(
                    "{} is not a timestamp string: {:?}",
                    KEY_SESSION_START, other
                )));
            }
        };
        Session::from_raw(start, pickup, soc)
    }

    /// Remove every persisted field and forget the session.
    ///
    /// Returns whether there was anything to clear; a second call is a no-op.
    /// Every key is attempted; on failure the first error is returned and the
    /// in-memory session is kept so a retry can finish the job.
    pub fn clear(&mut self) -> Result<bool> {
        let mut cleared = false;
        let mut first_err = None;
        for key in SESSION_KEYS {
            match self.backend.remove(key) {
                Ok(removed) => cleared |= removed,
                Err(e) => {
                    self.logger
                        .warn(&format!("Failed to remove {}: {}", key, e));
                    first_err.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_err {
            return Err(e);
        }

        cleared |= self.current.take().is_some();
        if cleared {
            self.logger.info("Cleared charging session");
        }
        Ok(cleared)
    }
}

/// Accept JSON numbers and numeric strings (older clients stored strings)
fn read_integer(value: Option<Value>, key: &str) -> Result<i64> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ChargeClockError::invalid_session(format!("{} is not an integer", key)))
}
