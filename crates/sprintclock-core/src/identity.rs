// Session keys used to address persisted timer state.
// Generated format: "sprint-<uuid>"

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IdentityError;

const SESSION_KEY_FILE: &str = "session_key.txt";
const SESSION_KEY_PREFIX: &str = "sprint-";

/// Environment variable that overrides the session key.
pub const SESSION_KEY_ENV: &str = "SPRINTCLOCK_USER";

/// Opaque key identifying whose timer state is being synced.
///
/// The core never interprets it; it is only the persistence key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Returns `None` for blank input.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Get or create the generated session key stored under `path`.
///
/// # Arguments
/// * `path` - Directory where session_key.txt is stored
pub fn get_or_create_session_key_at(path: &Path) -> Result<SessionKey, IdentityError> {
    let key_path = path.join(SESSION_KEY_FILE);

    if key_path.exists() {
        let content = fs::read_to_string(&key_path)?;
        let key = content.trim().to_string();

        if key.starts_with(SESSION_KEY_PREFIX) {
            return Ok(SessionKey(key));
        } else {
            return Err(IdentityError::InvalidFormat(key));
        }
    }

    let key = format!("{}{}", SESSION_KEY_PREFIX, Uuid::new_v4());

    if !path.exists() {
        fs::create_dir_all(path)?;
    }

    let mut file = fs::File::create(&key_path)?;
    writeln!(file, "{}", key)?;

    Ok(SessionKey(key))
}

/// Forget the generated session key under `path`.
///
/// Returns `false` when there was nothing to remove.
pub fn clear_session_key_at(path: &Path) -> Result<bool, IdentityError> {
    let key_path = path.join(SESSION_KEY_FILE);
    if !key_path.exists() {
        return Ok(false);
    }
    fs::remove_file(key_path)?;
    Ok(true)
}

/// Pick the session key by precedence: explicit value, then
/// `SPRINTCLOCK_USER`, then the configured key.
///
/// Returns `None` when none of them is set; callers decide whether to fall
/// back to a generated key or run without persistence.
pub fn resolve_session_key(explicit: Option<&str>, configured: Option<&str>) -> Option<SessionKey> {
    explicit
        .and_then(SessionKey::new)
        .or_else(|| std::env::var(SESSION_KEY_ENV).ok().and_then(SessionKey::new))
        .or_else(|| configured.and_then(SessionKey::new))
}
