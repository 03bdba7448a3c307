mod store;

pub use store::{CredentialStore, FileCredentialStore, InMemoryCredentialStore};

/// Store keys for client-persisted local state.
pub const TOKEN_KEY: &str = "studymate_token";
pub const USERNAME_KEY: &str = "studymate_username";
pub const GUEST_KEY: &str = "studymate_guest";

/// Snapshot of the persisted identity, read at engine construction time.
/// Absence of a token forces guest mode: nothing is persisted server-side.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub token: Option<String>,
    pub guest: bool,
}

impl Credentials {
    pub fn from_store(store: &dyn CredentialStore) -> Self {
        Self {
            username: store.get(USERNAME_KEY),
            token: store.get(TOKEN_KEY),
            guest: store.get(GUEST_KEY).as_deref() == Some("1"),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_ref().map(|t| !t.is_empty()).unwrap_or(false)
    }

    /// Clear every persisted key (the logout action).
    pub fn clear(store: &dyn CredentialStore) -> crate::error::Result<()> {
        store.remove(TOKEN_KEY)?;
        store.remove(USERNAME_KEY)?;
        store.remove(GUEST_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_without_token_is_not_authenticated() {
        let store = InMemoryCredentialStore::new();
        store.set(GUEST_KEY, "1").unwrap();
        let creds = Credentials::from_store(&store);
        assert!(creds.guest);
        assert!(!creds.is_authenticated());
    }

    #[test]
    fn token_grants_authentication() {
        let store = InMemoryCredentialStore::new();
        store.set(TOKEN_KEY, "tok").unwrap();
        store.set(USERNAME_KEY, "ada").unwrap();
        let creds = Credentials::from_store(&store);
        assert!(creds.is_authenticated());
        assert_eq!(creds.username.as_deref(), Some("ada"));
    }

    #[test]
    fn clear_removes_all_keys() {
        let store = InMemoryCredentialStore::new();
        store.set(TOKEN_KEY, "tok").unwrap();
        store.set(USERNAME_KEY, "ada").unwrap();
        store.set(GUEST_KEY, "1").unwrap();
        Credentials::clear(&store).unwrap();
        assert!(!Credentials::from_store(&store).is_authenticated());
        assert!(store.get(USERNAME_KEY).is_none());
    }
}
