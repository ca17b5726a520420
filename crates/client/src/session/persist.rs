// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session persistence: load/save to JSON file with atomic writes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::session::Session;

/// Current on-disk format version.
pub const VERSION: u32 = 0;

/// On-disk envelope: `{ "state": <Session>, "version": 0 }`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub state: Session,
    #[serde(default)]
    pub version: u32,
}

/// Load a persisted session. A missing file is an empty session.
pub fn load(path: &Path) -> anyhow::Result<Session> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Session::default()),
        Err(e) => return Err(e.into()),
    };
    let persisted: PersistedSession = serde_json::from_str(&contents)?;
    if persisted.version != VERSION {
        anyhow::bail!("unsupported session file version {}", persisted.version);
    }
    Ok(persisted.state)
}

/// Save a session atomically (write tmp + rename).
///
/// Uses a unique temp filename (PID + counter) so concurrent saves never share
/// a `.tmp` file, where a shorter write could leave trailing bytes from a
/// longer one.
pub fn save(path: &Path, session: &Session) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let envelope = PersistedSession { state: session.clone(), version: VERSION };
    let json = serde_json::to_string_pretty(&envelope)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
