//! A named group of credentials, one per username.

use crate::core::codec::{self, CodecError};
use crate::core::credential::Credential;
use crate::core::error::VaultError;
use crate::core::store::ParameterStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub struct Service {
    name: String,
    /// Configured vault root path; the service's backend prefix is
    /// derived from it by obfuscating the service name.
    root: String,
    encryption_key: Option<String>,
    obfuscation_key: String,
    store: Arc<dyn ParameterStore>,
    credentials: Mutex<HashMap<String, Credential>>,
}

impl Service {
    /// An empty service. Performs no backend I/O; credentials arrive via
    /// [`Service::add`] or [`Service::find_users`].
    pub fn new(
        name: String,
        root: String,
        encryption_key: Option<String>,
        obfuscation_key: String,
        store: Arc<dyn ParameterStore>,
    ) -> Self {
        Self {
            name,
            root,
            encryption_key,
            obfuscation_key,
            store,
            credentials: Mutex::new(HashMap::new()),
        }
    }

    /// Build a service from whatever the backend holds under its prefix.
    /// Discovered credentials are unloaded; values are fetched lazily.
    pub fn discover(
        name: String,
        root: String,
        encryption_key: Option<String>,
        obfuscation_key: String,
        store: Arc<dyn ParameterStore>,
    ) -> Result<Self, VaultError> {
        let service = Self::new(name, root, encryption_key, obfuscation_key, store);
        service.find_users()?;
        Ok(service)
    }

    pub fn num_users(&self) -> usize {
        self.lock().len()
    }

    pub fn has_user(&self, username: &str) -> bool {
        self.lock().contains_key(username)
    }

    /// The obfuscated backend prefix all of this service's credentials
    /// live under.
    fn prefix(&self) -> Result<String, CodecError> {
        codec::obfuscate_path(&self.root, &self.name, &self.obfuscation_key)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Credential>> {
        self.credentials.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a new credential, eagerly saving it to the backend. Fails if
    /// the username is already present; overwriting goes through
    /// [`Service::set_value`] instead. The lock is held across the
    /// existence check and the insert so concurrent adds of the same
    /// username cannot both succeed.
    pub fn add(&self, username: &str, value: &str) -> Result<(), VaultError> {
        let mut credentials = self.lock();
        if credentials.contains_key(username) {
            return Err(VaultError::UserExists {
                service: self.name.clone(),
                username: username.to_string(),
            });
        }
        let prefix = self.prefix()?;
        let cred = Credential::create(
            username.to_string(),
            value.to_string(),
            prefix,
            self.encryption_key.clone(),
            self.obfuscation_key.clone(),
            Arc::clone(&self.store),
        )?;
        credentials.insert(username.to_string(), cred);
        Ok(())
    }

    /// Usernames with the given prefix (`""` for all), sorted ascending.
    pub fn get_users(&self, prefix: &str) -> Vec<String> {
        let credentials = self.lock();
        let mut users: Vec<String> = credentials
            .keys()
            .filter(|u| u.starts_with(prefix))
            .cloned()
            .collect();
        users.sort();
        users
    }

    pub fn get_value(&self, username: &str) -> Result<String, VaultError> {
        let mut credentials = self.lock();
        match credentials.get_mut(username) {
            Some(cred) => cred.get_value(),
            None => Err(self.user_not_found(username)),
        }
    }

    /// Overwrite an existing credential's value and save it.
    pub fn set_value(&self, username: &str, value: &str) -> Result<(), VaultError> {
        let mut credentials = self.lock();
        match credentials.get_mut(username) {
            Some(cred) => {
                cred.set_value(value.to_string());
                cred.save()
            }
            None => Err(self.user_not_found(username)),
        }
    }

    /// Delete a credential. The map entry is taken out under the lock
    /// before the backend round-trip, so two concurrent deletes of the
    /// same username resolve to one success and one `UserNotFound`; a
    /// failed backend delete puts the entry back.
    pub fn delete(&self, username: &str) -> Result<(), VaultError> {
        let mut cred = match self.lock().remove(username) {
            Some(cred) => cred,
            None => return Err(self.user_not_found(username)),
        };
        if let Err(err) = cred.delete() {
            self.lock().insert(username.to_string(), cred);
            return Err(err);
        }
        Ok(())
    }

    /// List backend keys under this service's prefix and register one
    /// unloaded credential per discovered username. Already-known
    /// usernames are left untouched.
    pub fn find_users(&self) -> Result<(), VaultError> {
        let service_prefix = self.prefix()?;
        let list_prefix = format!("{}/", service_prefix);
        let parameters = self.store.list_by_prefix(&list_prefix)?;
        debug!(service = %self.name, found = parameters.len(), "discovered credentials");

        let mut credentials = self.lock();
        for full_key in parameters.keys() {
            let encoded = full_key.strip_prefix(&list_prefix).unwrap_or(full_key);
            let username = codec::deobfuscate(encoded, &self.obfuscation_key)?;
            credentials.entry(username.clone()).or_insert_with(|| {
                Credential::unloaded(
                    username.clone(),
                    service_prefix.clone(),
                    self.encryption_key.clone(),
                    self.obfuscation_key.clone(),
                    Arc::clone(&self.store),
                )
            });
        }
        Ok(())
    }

    fn user_not_found(&self, username: &str) -> VaultError {
        VaultError::UserNotFound {
            service: self.name.clone(),
            username: username.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use std::thread;

    fn service_with(store: &Arc<MemoryStore>) -> Service {
        Service::new(
            "gmail".into(),
            "/vault".into(),
            None,
            "obfkey".into(),
            Arc::clone(store) as Arc<dyn ParameterStore>,
        )
    }

    #[test]
    fn test_add_and_get() {
        let store = Arc::new(MemoryStore::new());
        let svc = service_with(&store);
        svc.add("alice", "pw1").unwrap();
        assert_eq!(svc.num_users(), 1);
        assert!(svc.has_user("alice"));
        assert_eq!(svc.get_value("alice").unwrap(), "pw1");
    }

    #[test]
    fn test_add_existing_user_conflicts() {
        let store = Arc::new(MemoryStore::new());
        let svc = service_with(&store);
        svc.add("alice", "pw1").unwrap();
        let err = svc.add("alice", "pw2").unwrap_err();
        assert!(matches!(err, VaultError::UserExists { .. }));
        // state unchanged: still one user, value untouched
        assert_eq!(svc.num_users(), 1);
        assert_eq!(svc.get_value("alice").unwrap(), "pw1");
    }

    #[test]
    fn test_concurrent_add_same_user_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let svc = Arc::new(service_with(&store));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let svc = Arc::clone(&svc);
            handles.push(thread::spawn(move || svc.add("alice", "pw")));
        }
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(svc.num_users(), 1);
    }

    #[test]
    fn test_get_users_sorted_with_prefix() {
        let store = Arc::new(MemoryStore::new());
        let svc = service_with(&store);
        for user in ["carol", "alice", "albert", "bob"] {
            svc.add(user, "pw").unwrap();
        }
        assert_eq!(svc.get_users(""), vec!["albert", "alice", "bob", "carol"]);
        assert_eq!(svc.get_users("al"), vec!["albert", "alice"]);
        assert!(svc.get_users("zz").is_empty());
    }

    #[test]
    fn test_set_value_saves() {
        let store = Arc::new(MemoryStore::new());
        let svc = service_with(&store);
        svc.add("alice", "old").unwrap();
        svc.set_value("alice", "new").unwrap();
        assert_eq!(svc.get_value("alice").unwrap(), "new");
        assert_eq!(store.put_count(), 2);
    }

    #[test]
    fn test_set_value_missing_user() {
        let store = Arc::new(MemoryStore::new());
        let svc = service_with(&store);
        let err = svc.set_value("ghost", "v").unwrap_err();
        assert!(matches!(err, VaultError::UserNotFound { .. }));
    }

    #[test]
    fn test_delete_updates_count() {
        let store = Arc::new(MemoryStore::new());
        let svc = service_with(&store);
        svc.add("alice", "pw").unwrap();
        svc.add("bob", "pw").unwrap();
        svc.delete("alice").unwrap();
        assert_eq!(svc.num_users(), 1);
        assert!(!svc.has_user("alice"));
    }

    #[test]
    fn test_delete_missing_user() {
        let store = Arc::new(MemoryStore::new());
        let svc = service_with(&store);
        let err = svc.delete("ghost").unwrap_err();
        assert!(matches!(err, VaultError::UserNotFound { .. }));
    }

    #[test]
    fn test_delete_gone_from_backend_still_succeeds() {
        let store = Arc::new(MemoryStore::new());
        let svc = service_with(&store);
        svc.add("alice", "pw").unwrap();
        // simulate another client deleting the parameter behind our back
        let keys: Vec<String> = store.list_by_prefix("/").unwrap().into_keys().collect();
        for key in keys {
            store.delete(&key).unwrap();
        }
        svc.delete("alice").unwrap();
        assert_eq!(svc.num_users(), 0);
    }

    #[test]
    fn test_find_users_discovers_unloaded() {
        let store = Arc::new(MemoryStore::new());
        let writer = service_with(&store);
        writer.add("alice", "pw1").unwrap();
        writer.add("bob", "pw2").unwrap();

        let reader = service_with(&store);
        reader.find_users().unwrap();
        assert_eq!(reader.get_users(""), vec!["alice", "bob"]);
        let gets_before = store.get_count();
        assert_eq!(reader.get_value("bob").unwrap(), "pw2");
        assert_eq!(store.get_count(), gets_before + 1);
    }

    #[test]
    fn test_find_users_keeps_existing_entries() {
        let store = Arc::new(MemoryStore::new());
        let svc = service_with(&store);
        svc.add("alice", "pw1").unwrap();
        svc.find_users().unwrap();
        assert_eq!(svc.num_users(), 1);
        // still readable without a fresh backend fetch
        assert_eq!(store.get_count(), 0);
        assert_eq!(svc.get_value("alice").unwrap(), "pw1");
        assert_eq!(store.get_count(), 0);
    }
}
