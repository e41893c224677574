//! Persisted conversation sessions
//!
//! A session is an append-only list of items stored under a session id.
//! `FileSession` keeps every session of a store in one JSON document:
//!
//! ```json
//! { "sessions": { "conversation_123": [ { "role": "user", ... } ] } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::llm::{ChatMessage, Role};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to access session store {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session store {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One recorded message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionItem {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl SessionItem {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl From<&SessionItem> for ChatMessage {
    fn from(item: &SessionItem) -> Self {
        ChatMessage {
            role: item.role,
            content: item.content.clone(),
        }
    }
}

/// Conversation history keyed by a session id
#[async_trait]
pub trait Session: Send + Sync {
    fn session_id(&self) -> &str;

    /// Most recent `limit` items in chronological order, or all of them
    async fn get_items(&self, limit: Option<usize>) -> Result<Vec<SessionItem>, SessionError>;

    /// Append items in order
    async fn add_items(&self, items: Vec<SessionItem>) -> Result<(), SessionError>;

    /// Remove and return the most recent item
    async fn pop_item(&self) -> Result<Option<SessionItem>, SessionError>;

    /// Remove every item of this session
    async fn clear_session(&self) -> Result<(), SessionError>;
}

fn tail(items: &[SessionItem], limit: Option<usize>) -> Vec<SessionItem> {
    let start = match limit {
        Some(limit) => items.len().saturating_sub(limit),
        None => 0,
    };
    items[start..].to_vec()
}

/// On-disk layout of a session store
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    sessions: BTreeMap<String, Vec<SessionItem>>,
}

/// Session persisted in a JSON file
///
/// Several session ids may share one file; each only sees its own items.
pub struct FileSession {
    session_id: String,
    path: PathBuf,
    // Serializes read-modify-write cycles within the process
    lock: Mutex<()>,
}

impl FileSession {
    /// Bind `session_id` to the store at `path`
    ///
    /// The file is created on first write.
    pub fn open(session_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<StoreFile, SessionError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreFile::default()),
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(StoreFile::default());
        }
        serde_json::from_slice(&bytes).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, store: &StoreFile) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let content = serde_json::to_vec_pretty(store).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        tokio::fs::write(&self.path, content).await.map_err(io_err)
    }
}

#[async_trait]
impl Session for FileSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn get_items(&self, limit: Option<usize>) -> Result<Vec<SessionItem>, SessionError> {
        let _guard = self.lock.lock().await;
        let store = self.load().await?;
        Ok(store
            .sessions
            .get(&self.session_id)
            .map(|items| tail(items, limit))
            .unwrap_or_default())
    }

    async fn add_items(&self, items: Vec<SessionItem>) -> Result<(), SessionError> {
        if items.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.lock().await;
        let mut store = self.load().await?;
        let count = items.len();
        store
            .sessions
            .entry(self.session_id.clone())
            .or_default()
            .extend(items);
        self.save(&store).await?;
        debug!(
            "Appended {} items to session {} ({})",
            count,
            self.session_id,
            self.path.display()
        );
        Ok(())
    }

    async fn pop_item(&self) -> Result<Option<SessionItem>, SessionError> {
        let _guard = self.lock.lock().await;
        let mut store = self.load().await?;
        let popped = store
            .sessions
            .get_mut(&self.session_id)
            .and_then(|items| items.pop());
        if popped.is_some() {
            self.save(&store).await?;
        }
        Ok(popped)
    }

    async fn clear_session(&self) -> Result<(), SessionError> {
        let _guard = self.lock.lock().await;
        let mut store = self.load().await?;
        if store.sessions.remove(&self.session_id).is_some() {
            self.save(&store).await?;
        }
        Ok(())
    }
}

/// Session kept in process memory
pub struct MemorySession {
    session_id: String,
    items: Mutex<Vec<SessionItem>>,
}

impl MemorySession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            items: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn get_items(&self, limit: Option<usize>) -> Result<Vec<SessionItem>, SessionError> {
        Ok(tail(&self.items.lock().await, limit))
    }

    async fn add_items(&self, items: Vec<SessionItem>) -> Result<(), SessionError> {
        self.items.lock().await.extend(items);
        Ok(())
    }

    async fn pop_item(&self) -> Result<Option<SessionItem>, SessionError> {
        Ok(self.items.lock().await.pop())
    }

    async fn clear_session(&self) -> Result<(), SessionError> {
        self.items.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn contents(items: &[SessionItem]) -> Vec<(Role, &str)> {
        items.iter().map(|i| (i.role, i.content.as_str())).collect()
    }

    #[tokio::test]
    async fn test_file_session_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        let session = FileSession::open("conversation_123", &path);

        // Missing file reads as empty
        assert!(session.get_items(None).await.unwrap().is_empty());
        assert!(!path.exists());

        session
            .add_items(vec![SessionItem::user("Hello"), SessionItem::assistant("Hi!")])
            .await
            .unwrap();
        session
            .add_items(vec![SessionItem::user("How are you?")])
            .await
            .unwrap();

        let items = session.get_items(None).await.unwrap();
        assert_eq!(
            contents(&items),
            vec![
                (Role::User, "Hello"),
                (Role::Assistant, "Hi!"),
                (Role::User, "How are you?"),
            ]
        );

        let last_two = session.get_items(Some(2)).await.unwrap();
        assert_eq!(
            contents(&last_two),
            vec![(Role::Assistant, "Hi!"), (Role::User, "How are you?")]
        );
        assert_eq!(session.get_items(Some(10)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_file_session_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");

        let first_run = FileSession::open("conversation_123", &path);
        first_run
            .add_items(vec![SessionItem::user("one"), SessionItem::assistant("1")])
            .await
            .unwrap();
        drop(first_run);

        let second_run = FileSession::open("conversation_123", &path);
        second_run
            .add_items(vec![SessionItem::user("two"), SessionItem::assistant("2")])
            .await
            .unwrap();

        let items = second_run.get_items(None).await.unwrap();
        assert_eq!(
            contents(&items),
            vec![
                (Role::User, "one"),
                (Role::Assistant, "1"),
                (Role::User, "two"),
                (Role::Assistant, "2"),
            ]
        );

        // Everything lives under a single id
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let sessions = raw["sessions"].as_object().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions["conversation_123"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_file_session_ids_are_isolated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        let a = FileSession::open("a", &path);
        let b = FileSession::open("b", &path);

        a.add_items(vec![SessionItem::user("for a")]).await.unwrap();
        b.add_items(vec![SessionItem::user("for b")]).await.unwrap();

        assert_eq!(contents(&a.get_items(None).await.unwrap()), vec![(Role::User, "for a")]);
        assert_eq!(contents(&b.get_items(None).await.unwrap()), vec![(Role::User, "for b")]);

        a.clear_session().await.unwrap();
        assert!(a.get_items(None).await.unwrap().is_empty());
        assert_eq!(b.get_items(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_session_pop_item() {
        let dir = tempdir().unwrap();
        let session = FileSession::open("s", dir.path().join("history.json"));
        assert_eq!(session.pop_item().await.unwrap(), None);

        session
            .add_items(vec![SessionItem::user("q"), SessionItem::assistant("a")])
            .await
            .unwrap();
        let popped = session.pop_item().await.unwrap().unwrap();
        assert_eq!(popped.role, Role::Assistant);
        assert_eq!(popped.content, "a");
        assert_eq!(contents(&session.get_items(None).await.unwrap()), vec![(Role::User, "q")]);
    }

    #[tokio::test]
    async fn test_file_session_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();

        let session = FileSession::open("s", &path);
        let err = session.get_items(None).await.unwrap_err();
        assert!(matches!(err, SessionError::Corrupt { .. }));
        assert!(err.to_string().contains("history.json"));
    }

    #[tokio::test]
    async fn test_memory_session() {
        let session = MemorySession::new("mem");
        assert_eq!(session.session_id(), "mem");

        session
            .add_items(vec![SessionItem::user("q1"), SessionItem::assistant("a1")])
            .await
            .unwrap();
        session.add_items(vec![SessionItem::user("q2")]).await.unwrap();

        assert_eq!(
            contents(&session.get_items(Some(1)).await.unwrap()),
            vec![(Role::User, "q2")]
        );
        assert_eq!(session.pop_item().await.unwrap().unwrap().content, "q2");
        session.clear_session().await.unwrap();
        assert!(session.get_items(None).await.unwrap().is_empty());
    }
}
