//! Session persistence
//!
//! The user and the opaque token are kept under separate keys. Both are
//! written together and removed together; a user without a token is not a
//! session.

use std::sync::Arc;
use crate::Result;
use super::profile::{Profile, UserProfile};
use super::storage::Storage;

/// Key holding the serialized profile
pub const USER_KEY: &str = "github_user";

/// Key holding the opaque session token
pub const TOKEN_KEY: &str = "github_token";

/// Key holding the anti-forgery state of an in-flight sign-in
pub const PENDING_STATE_KEY: &str = "github_oauth_state";

/// A restored or freshly created session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub profile: Profile,
    pub token: String,
    pub persisted: bool,
}

/// Reads and writes the session in durable storage
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Persist a profile and its token
    ///
    /// On failure both keys are cleared, so storage never holds half of
    /// the new session or a mix of old and new.
    pub fn save(&self, profile: &Profile, token: &str) -> Result<()> {
        let user = serde_json::to_string(profile)?;
        let written = self.storage
            .set(TOKEN_KEY, token)
            .and_then(|_| self.storage.set(USER_KEY, &user));

        if let Err(e) = written {
            self.clear_quietly();
            return Err(e);
        }
        Ok(())
    }

    /// Load the persisted profile, if any
    ///
    /// Corrupt or partial data counts as no session and is purged.
    pub fn load(&self) -> Option<Profile> {
        self.load_session().map(|session| session.profile)
    }

    /// Load the persisted profile together with its token
    pub fn load_session(&self) -> Option<Session> {
        let user = self.read(USER_KEY);
        let token = self.read(TOKEN_KEY);

        let (user, token) = match (user, token) {
            (Some(user), Some(token)) => (user, token),
            (None, None) => return None,
            _ => {
                tracing::warn!("Discarding partial session in storage");
                self.clear_quietly();
                return None;
            }
        };

        match parse_profile(&user) {
            Ok(profile) => Some(Session {
                profile,
                token,
                persisted: true,
            }),
            Err(e) => {
                tracing::warn!("Discarding corrupt session in storage: {}", e);
                self.clear_quietly();
                None
            }
        }
    }

    /// Remove both session keys
    ///
    /// Both removals are attempted even if the first one fails.
    pub fn clear(&self) -> Result<()> {
        let user = self.storage.remove(USER_KEY);
        let token = self.storage.remove(TOKEN_KEY);
        user.and(token)
    }

    /// Remember the state token sent with an authorization request
    pub fn save_pending_state(&self, state: &str) -> Result<()> {
        self.storage.set(PENDING_STATE_KEY, state)
    }

    /// Take the remembered state token, leaving none behind
    pub fn take_pending_state(&self) -> Option<String> {
        let state = self.read(PENDING_STATE_KEY)?;
        if let Err(e) = self.storage.remove(PENDING_STATE_KEY) {
            tracing::warn!("Failed to remove pending state: {}", e);
        }
        Some(state)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to read {} from storage: {}", key, e);
                None
            }
        }
    }

    fn clear_quietly(&self) {
        if let Err(e) = self.clear() {
            tracing::warn!("Failed to purge session from storage: {}", e);
        }
    }
}

/// Tagged profile, or a bare user record as written before profiles carried
/// their source. Bare records came from the provider.
fn parse_profile(user: &str) -> serde_json::Result<Profile> {
    serde_json::from_str::<Profile>(user).or_else(|tagged_err| {
        serde_json::from_str::<UserProfile>(user)
            .map(Profile::Real)
            .map_err(|_| tagged_err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryStorage;
    use crate::error::Error;

    /// Memory storage whose writes to one key always fail
    struct FailingWrites {
        inner: MemoryStorage,
        key: &'static str,
    }

    impl Storage for FailingWrites {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if key == self.key {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "storage is read-only",
                )));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    fn store() -> (SessionStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (SessionStore::new(storage.clone()), storage)
    }

    fn real_profile() -> Profile {
        Profile::Real(UserProfile {
            id: "1".to_string(),
            login_name: "mona".to_string(),
            display_name: "Mona Lisa".to_string(),
            email: "mona@github.com".to_string(),
            avatar_url: "https://avatars.githubusercontent.com/u/1".to_string(),
        })
    }

    #[test]
    fn test_save_then_load() {
        let (store, _) = store();
        let profile = real_profile();
        store.save(&profile, "demo-token-1").unwrap();

        assert_eq!(store.load(), Some(profile.clone()));

        let session = store.load_session().unwrap();
        assert_eq!(session.token, "demo-token-1");
        assert!(session.persisted);
    }

    #[test]
    fn test_demo_flag_survives_reload() {
        let (store, _) = store();
        store.save(&Profile::demo_from_code("abc123"), "t").unwrap();
        assert!(store.load().unwrap().is_demo());
    }

    #[test]
    fn test_clear_then_load() {
        let (store, storage) = store();
        store.save(&real_profile(), "t").unwrap();
        store.clear().unwrap();

        assert_eq!(store.load(), None);
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);

        // Clearing nothing is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_user_is_purged() {
        let (store, storage) = store();
        storage.set(USER_KEY, "not json at all").unwrap();
        storage.set(TOKEN_KEY, "demo-token-1").unwrap();

        assert_eq!(store.load(), None);
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_user_without_token_is_purged() {
        let (store, storage) = store();
        storage
            .set(USER_KEY, &serde_json::to_string(&real_profile()).unwrap())
            .unwrap();

        assert_eq!(store.load(), None);
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_failed_save_leaves_no_session() {
        for key in [USER_KEY, TOKEN_KEY] {
            let storage = Arc::new(FailingWrites {
                inner: MemoryStorage::new(),
                key,
            });
            storage.inner.set(USER_KEY, &serde_json::to_string(&real_profile()).unwrap()).unwrap();
            storage.inner.set(TOKEN_KEY, "t0").unwrap();

            let store = SessionStore::new(storage.clone());
            assert!(store.save(&Profile::demo_from_code("new"), "t1").is_err());

            assert_eq!(storage.get(USER_KEY).unwrap(), None, "failing key {}", key);
            assert_eq!(storage.get(TOKEN_KEY).unwrap(), None, "failing key {}", key);
            assert_eq!(store.load(), None);
        }
    }

    #[test]
    fn test_loads_plain_user_record() {
        let (store, storage) = store();
        storage
            .set(
                USER_KEY,
                r#"{"id":"1","login":"mona","name":"Mona Lisa","email":"mona@github.com","avatar_url":"https://avatars.githubusercontent.com/u/1"}"#,
            )
            .unwrap();
        storage.set(TOKEN_KEY, "demo-token-1").unwrap();

        assert_eq!(store.load(), Some(real_profile()));
        assert!(storage.get(USER_KEY).unwrap().is_some());
    }

    #[test]
    fn test_pending_state_is_taken_once() {
        let (store, _) = store();
        assert_eq!(store.take_pending_state(), None);

        store.save_pending_state("s1").unwrap();
        assert_eq!(store.take_pending_state().as_deref(), Some("s1"));
        assert_eq!(store.take_pending_state(), None);
    }

    #[test]
    fn test_clear_keeps_pending_state() {
        let (store, _) = store();
        store.save_pending_state("s1").unwrap();
        store.clear().unwrap();
        assert_eq!(store.take_pending_state().as_deref(), Some("s1"));
    }
}
