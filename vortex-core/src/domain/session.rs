//! Sticky session table.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use super::backend::BackendId;

/// Stickiness window: an entry older than this is treated as absent.
pub const STICKY_TTL_SECS: u64 = 15;

/// Current time as a Unix timestamp in seconds.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs()
}

#[derive(Debug, Clone, Copy)]
struct SessionEntry {
    backend: BackendId,
    last_used: u64,
}

/// Maps a session key (SID header value or client IP) to the backend last
/// used to serve it, with lazy TTL expiry.
///
/// Consulted and written only while the registry mutex is held; there is no
/// background eviction thread.
#[derive(Debug, Default)]
pub struct SessionTable {
    entries: HashMap<String, SessionEntry>,
}

impl SessionTable {
    /// Create an empty session table.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Return the backend bound to `key`, if the entry exists and has not
    /// expired as of `now`.
    pub fn lookup(&self, key: &str, now: u64) -> Option<BackendId> {
        let entry = self.entries.get(key)?;
        if now.saturating_sub(entry.last_used) >= STICKY_TTL_SECS {
            return None;
        }
        Some(entry.backend)
    }

    /// Bind `key` to `backend`, overwriting any prior binding and timestamp.
    pub fn update(&mut self, key: String, backend: BackendId, now: u64) {
        self.entries.insert(key, SessionEntry { backend, last_used: now });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_found() {
        let mut t = SessionTable::new();
        t.update("10.0.0.7".into(), BackendId(1), 100);
        assert_eq!(t.lookup("10.0.0.7", 105), Some(BackendId(1)));
    }

    #[test]
    fn expired_entry_is_absent() {
        let mut t = SessionTable::new();
        t.update("10.0.0.7".into(), BackendId(1), 100);
        assert_eq!(t.lookup("10.0.0.7", 100 + STICKY_TTL_SECS), None);
    }

    #[test]
    fn unknown_key_is_absent() {
        let t = SessionTable::new();
        assert_eq!(t.lookup("nope", 0), None);
    }

    #[test]
    fn overwrite_refreshes_timestamp() {
        let mut t = SessionTable::new();
        t.update("k".into(), BackendId(0), 0);
        t.update("k".into(), BackendId(2), 10);
        assert_eq!(t.lookup("k", 20), Some(BackendId(2)));
    }
}
