//! Injected id generation.
//!
//! Replaces the pattern of a process-global id generator (spec.md §9
//! "Global singletons in source") with an `IdFactory` built once from
//! `IdGenConfig` at startup and threaded through the publish path.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outpost's `nanoid` alphabet is alphanumeric only (no `_`/`-`), unlike
/// the crate's own default alphabet.
const NANOID_ALPHABET: [char; 62] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I',
    'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b',
    'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u',
    'v', 'w', 'x', 'y', 'z',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdGenKind {
    Uuidv4,
    Uuidv7,
    Nanoid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdGenConfig {
    pub kind: IdGenKind,
    pub event_prefix: Option<String>,
    pub destination_prefix: Option<String>,
}

impl Default for IdGenConfig {
    fn default() -> Self {
        Self {
            kind: IdGenKind::Uuidv7,
            event_prefix: None,
            destination_prefix: None,
        }
    }
}

/// Generates ids of the configured kind, joining an optional prefix with
/// `_`.
#[derive(Debug, Clone)]
pub struct IdFactory {
    config: IdGenConfig,
}

impl IdFactory {
    pub fn new(config: IdGenConfig) -> Self {
        Self { config }
    }

    pub fn generate_event_id(&self) -> String {
        self.with_prefix(self.config.event_prefix.as_deref())
    }

    pub fn generate_destination_id(&self) -> String {
        self.with_prefix(self.config.destination_prefix.as_deref())
    }

    pub fn generate_attempt_id(&self) -> String {
        self.with_prefix(None)
    }

    fn with_prefix(&self, prefix: Option<&str>) -> String {
        let raw = self.raw_id();
        match prefix {
            Some(p) if !p.is_empty() => format!("{p}_{raw}"),
            _ => raw,
        }
    }

    fn raw_id(&self) -> String {
        match self.config.kind {
            IdGenKind::Uuidv4 => Uuid::new_v4().to_string(),
            IdGenKind::Uuidv7 => Uuid::now_v7().to_string(),
            IdGenKind::Nanoid => nanoid::nanoid!(21, &NANOID_ALPHABET),
        }
    }
}

impl Default for IdFactory {
    fn default() -> Self {
        Self::new(IdGenConfig::default())
    }
}

#[cfg(test)]
#[path = "id_factory_tests.rs"]
mod tests;
