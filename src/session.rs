//! Session-scoped results store.
//!
//! Each browser session (identified by the `aeo_session` cookie) owns at most
//! one [`ResultsTable`]: the output of its latest run. Tables live in memory
//! only and disappear with the server process.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::models::ResultsTable;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "aeo_session";

#[derive(Default)]
pub struct ResultsStore {
    tables: RwLock<HashMap<String, Arc<ResultsTable>>>,
}

impl ResultsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest table for `session`, if any.
    pub fn get(&self, session: &str) -> Option<Arc<ResultsTable>> {
        self.tables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(session)
            .cloned()
    }

    /// Forget the session's table. Called when a run starts, so a failed
    /// run leaves nothing behind.
    pub fn clear(&self, session: &str) {
        self.tables
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session);
    }

    /// Replace the session's table with a finished run.
    pub fn publish(&self, session: &str, table: ResultsTable) -> Arc<ResultsTable> {
        let table = Arc::new(table);
        self.tables
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session.to_string(), table.clone());
        table
    }
}

/// Fresh random session id.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Extract the session id from a `Cookie` header value.
pub fn session_from_cookie_header(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|v| uuid::Uuid::parse_str(v).is_ok())
}

/// `Set-Cookie` value for a session id.
pub fn session_cookie(id: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Presence, ResultRow};

    fn table(query: &str) -> ResultsTable {
        ResultsTable::new(
            "Masaba",
            vec![ResultRow {
                query: query.to_string(),
                brand_present: Presence::No,
                ai_context: "ctx".to_string(),
            }],
        )
    }

    #[test]
    fn publish_replaces_previous_table() {
        let store = ResultsStore::new();
        store.publish("s1", table("first"));
        store.publish("s1", table("second"));
        let t = store.get("s1").unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows[0].query, "second");
    }

    #[test]
    fn sessions_are_isolated() {
        let store = ResultsStore::new();
        store.publish("s1", table("mine"));
        assert!(store.get("s2").is_none());
        store.clear("s2");
        assert!(store.get("s1").is_some());
        store.clear("s1");
        assert!(store.get("s1").is_none());
    }

    #[test]
    fn cookie_parsing_finds_valid_session() {
        let id = new_session_id();
        let header = format!("theme=dark; {}={}; other=1", SESSION_COOKIE, id);
        assert_eq!(session_from_cookie_header(&header), Some(id.clone()));
        assert!(session_cookie(&id).starts_with("aeo_session="));
    }

    #[test]
    fn cookie_parsing_rejects_garbage() {
        assert_eq!(session_from_cookie_header("aeo_session=not-a-uuid"), None);
        assert_eq!(session_from_cookie_header("foo=bar"), None);
        assert_eq!(session_from_cookie_header(""), None);
    }
}
