use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::models::{LedgerError, LedgerResult, User};

/// Key under which the logged-in user snapshot is kept.
pub const SESSION_KEY: &str = "current_user";

/// Persistence for the "who is logged in" snapshot, written on login,
/// registration, and successful claims, and removed on logout.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> LedgerResult<Option<User>>;
    async fn save(&self, user: &User) -> LedgerResult<()>;
    async fn clear(&self) -> LedgerResult<()>;
}

/// Session snapshot kept as a JSON file on disk so a restarted process
/// resumes the previous login.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> LedgerResult<Option<User>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LedgerError::Session(format!("Failed to read session: {}", e))),
        };

        match serde_json::from_slice::<User>(&bytes) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                // A mangled snapshot just means nobody is logged in.
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable session snapshot");
                Ok(None)
            }
        }
    }

    async fn save(&self, user: &User) -> LedgerResult<()> {
        let bytes = serde_json::to_vec(user)
            .map_err(|e| LedgerError::Session(format!("Failed to encode session: {}", e)))?;

        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| LedgerError::Session(format!("Failed to write session: {}", e)))
    }

    async fn clear(&self) -> LedgerResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LedgerError::Session(format!(
                "Failed to clear session: {}",
                e
            ))),
        }
    }
}

/// Session snapshot held in memory, for tests and embedded use.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: RwLock<Option<User>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> LedgerResult<Option<User>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, user: &User) -> LedgerResult<()> {
        *self.slot.write().await = Some(user.clone());
        Ok(())
    }

    async fn clear(&self) -> LedgerResult<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::{Role, TrustTier};

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Session Sample".to_string(),
            email: "session@example.com".to_string(),
            password_hash: "hash".to_string(),
            city: "Chicago".to_string(),
            preferred_sizes: vec!["M".to_string()],
            profile_image: None,
            role: Role::User,
            points: 75,
            trust_tier: TrustTier::BasicGiver,
            badges: vec!["First Listing".to_string()],
            total_listings: 1,
            successful_exchanges: 0,
            created_at: Utc::now(),
        }
    }

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}.json", SESSION_KEY, Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_snapshot_loads_as_none() {
        let store = FileSessionStore::new(scratch_path());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_snapshot_roundtrip() {
        let path = scratch_path();
        let store = FileSessionStore::new(&path);
        let user = sample_user();

        store.save(&user).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.id, user.id);
        assert_eq!(loaded.points, 75);

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_loads_as_none() {
        let path = scratch_path();
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = FileSessionStore::new(&path);
        assert!(store.load().await.unwrap().is_none());
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = FileSessionStore::new(scratch_path());
        store.clear().await.unwrap();
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        assert!(store.load().await.unwrap().is_none());

        let user = sample_user();
        store.save(&user).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap().id, user.id);

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
