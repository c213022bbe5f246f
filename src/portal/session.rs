//! Durable session state: the cookie store serialized to a JSON file.
//!
//! TeachAssist issues non-persistent session cookies, so the save path
//! deliberately includes those; a plain persistent-only dump would lose the
//! login on every restart.

use anyhow::{Context, Result};
use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;
use std::path::Path;
use tracing::{debug, warn};

/// Load the persisted cookie store, falling back to an empty one.
///
/// A missing file is the normal first-run case; a corrupt file is logged and
/// discarded rather than blocking startup.
pub async fn load(path: &Path) -> CookieStore {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(_) => {
            debug!(path = %path.display(), "no session state file, starting fresh");
            return CookieStore::default();
        }
    };

    match CookieStore::load_json_all(&bytes[..]) {
        Ok(store) => {
            debug!(path = %path.display(), "loaded persisted session state");
            store
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "session state unreadable, starting fresh");
            CookieStore::default()
        }
    }
}

/// Write the cookie store back to disk, session cookies included.
pub async fn save(store: &CookieStoreMutex, path: &Path) -> Result<()> {
    let mut buf = Vec::new();
    {
        let store = store
            .lock()
            .map_err(|_| anyhow::anyhow!("cookie store lock poisoned"))?;
        store
            .save_incl_expired_and_nonpersistent_json(&mut buf)
            .map_err(anyhow::Error::from_boxed)
            .context("failed to serialize session state")?;
    }
    tokio::fs::write(path, buf)
        .await
        .with_context(|| format!("failed to write session state to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_state_file_yields_empty_store() {
        let store = load(Path::new("/nonexistent/ta_state.json")).await;
        assert_eq!(store.iter_any().count(), 0);
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip_keeps_session_cookies() {
        let path = std::env::temp_dir().join("tawatch-session-round-trip.json");
        let url = url::Url::parse("https://ta.yrdsb.ca/").unwrap();

        let mut store = CookieStore::default();
        // No Expires/Max-Age: a non-persistent session cookie, the kind the
        // portal actually issues.
        store.parse("session_token=abc123", &url).unwrap();

        let mutex = CookieStoreMutex::new(store);
        save(&mutex, &path).await.unwrap();

        let loaded = load(&path).await;
        assert!(loaded.get("ta.yrdsb.ca", "/", "session_token").is_some());

        let _ = tokio::fs::remove_file(&path).await;
    }
}
