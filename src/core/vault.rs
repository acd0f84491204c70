//! Root registry of services for one configured backend namespace.

use crate::core::codec::{self, CodecError};
use crate::core::error::VaultError;
use crate::core::pool;
use crate::core::service::Service;
use crate::core::store::ParameterStore;
use crate::models::creds_file::FileCred;
use rand::Rng;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::ADD_JITTER_MS;

/// Construction parameters shared by every service and credential in the
/// tree. The backend client itself is injected separately.
#[derive(Debug, Clone)]
pub struct VaultSettings {
    /// Root parameter path, e.g. `/credvault`. Stored literally; only
    /// service and user names below it are obfuscated.
    pub path: String,
    /// Optional server-side encryption key id passed through on writes.
    pub encryption_key: Option<String>,
    pub obfuscation_key: String,
    /// Worker bound for bulk adds and discovery.
    pub max_concurrent_requests: usize,
}

/// Outcome of one item in a bulk add.
#[derive(Debug)]
pub struct AddCredResult {
    pub service: String,
    pub username: String,
    pub success: bool,
    pub error: Option<VaultError>,
}

pub struct Vault {
    services: Mutex<HashMap<String, Arc<Service>>>,
    path: String,
    encryption_key: Option<String>,
    obfuscation_key: String,
    max_concurrent_requests: usize,
    store: Arc<dyn ParameterStore>,
}

impl Vault {
    /// An empty vault over the given backend. Performs no backend I/O.
    pub fn new(store: Arc<dyn ParameterStore>, settings: VaultSettings) -> Result<Self, VaultError> {
        if settings.obfuscation_key.is_empty() {
            return Err(CodecError::EmptyKey.into());
        }
        Ok(Self {
            services: Mutex::new(HashMap::new()),
            path: settings.path,
            encryption_key: settings.encryption_key,
            obfuscation_key: settings.obfuscation_key,
            max_concurrent_requests: settings.max_concurrent_requests.max(1),
            store,
        })
    }

    /// A vault pre-populated with every service found in the backend.
    pub fn discover(
        store: Arc<dyn ParameterStore>,
        settings: VaultSettings,
    ) -> Result<Self, VaultError> {
        let vault = Self::new(store, settings)?;
        vault.find_services()?;
        Ok(vault)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Service>>> {
        self.services.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_service(&self, service_name: &str) -> Result<Arc<Service>, VaultError> {
        self.lock()
            .get(service_name)
            .cloned()
            .ok_or_else(|| VaultError::ServiceNotFound(service_name.to_string()))
    }

    /// Atomic get-or-insert on the services map. Service construction
    /// performs no backend I/O, so the lock is held across both the
    /// lookup and the insert.
    fn get_or_insert(&self, service_name: &str) -> Arc<Service> {
        let mut services = self.lock();
        Arc::clone(
            services
                .entry(service_name.to_string())
                .or_insert_with(|| {
                    Arc::new(Service::new(
                        service_name.to_string(),
                        self.path.clone(),
                        self.encryption_key.clone(),
                        self.obfuscation_key.clone(),
                        Arc::clone(&self.store),
                    ))
                }),
        )
    }

    /// Add a credential, creating the service on first use. A service
    /// entry created here is rolled back if the add fails and nothing
    /// else was stored under it in the meantime.
    pub fn add(&self, service_name: &str, username: &str, value: &str) -> Result<(), VaultError> {
        let service = self.get_or_insert(service_name);
        let result = service.add(username, value);
        if result.is_err() {
            let mut services = self.lock();
            if let Some(current) = services.get(service_name) {
                if Arc::ptr_eq(current, &service) && current.num_users() == 0 {
                    services.remove(service_name);
                }
            }
        }
        result
    }

    /// Add many credentials with bounded concurrency. Each worker sleeps
    /// a short random jitter before writing to spread backend load. The
    /// result has exactly one entry per input, in completion order, and
    /// a panicking worker becomes a failed entry rather than tearing the
    /// batch down.
    pub fn add_multi(&self, creds: Vec<FileCred>) -> Vec<AddCredResult> {
        pool::run_bounded(creds, self.max_concurrent_requests, |cred| {
            let jitter = rand::thread_rng().gen_range(0..ADD_JITTER_MS);
            thread::sleep(Duration::from_millis(jitter));
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.add(&cred.service, &cred.username, &cred.password)
            }));
            match outcome {
                Ok(Ok(())) => AddCredResult {
                    service: cred.service,
                    username: cred.username,
                    success: true,
                    error: None,
                },
                Ok(Err(err)) => AddCredResult {
                    service: cred.service,
                    username: cred.username,
                    success: false,
                    error: Some(err),
                },
                Err(payload) => AddCredResult {
                    service: cred.service,
                    username: cred.username,
                    success: false,
                    error: Some(VaultError::WorkerPanic(panic_message(payload.as_ref()))),
                },
            }
        })
    }

    pub fn get(&self, service_name: &str, username: &str) -> Result<String, VaultError> {
        self.get_service(service_name)?.get_value(username)
    }

    pub fn get_users_for_service(&self, service_name: &str) -> Result<Vec<String>, VaultError> {
        Ok(self.get_service(service_name)?.get_users(""))
    }

    /// Overwrite an existing credential's value.
    pub fn replace(
        &self,
        service_name: &str,
        username: &str,
        value: &str,
    ) -> Result<(), VaultError> {
        self.get_service(service_name)?.set_value(username, value)
    }

    /// Delete a credential; the service entry goes away with its last
    /// credential.
    pub fn delete(&self, service_name: &str, username: &str) -> Result<(), VaultError> {
        let service = self.get_service(service_name)?;
        service.delete(username)?;
        let mut services = self.lock();
        if let Some(current) = services.get(service_name) {
            if current.num_users() == 0 {
                services.remove(service_name);
            }
        }
        Ok(())
    }

    pub fn has_service(&self, service_name: &str) -> bool {
        self.lock().contains_key(service_name)
    }

    /// Service names with the given prefix (`""` for all), sorted
    /// ascending.
    pub fn list_services(&self, prefix: &str) -> Vec<String> {
        let services = self.lock();
        let mut names: Vec<String> = services
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Discover every service stored under the vault root. One prefix
    /// listing yields all keys; distinct service names are then loaded
    /// concurrently, each worker registering its service in the shared
    /// map. The first failure (in completion order) is returned after
    /// all workers finish; later failures are logged and discarded, and
    /// the map keeps whatever was loaded successfully.
    pub fn find_services(&self) -> Result<(), VaultError> {
        let root = format!("{}/", self.path);
        let parameters = self.store.list_by_prefix(&root)?;

        let mut names = Vec::new();
        let mut seen = HashSet::new();
        for full_key in parameters.keys() {
            let trimmed = full_key.strip_prefix(&root).unwrap_or(full_key);
            // keys are <service>/<user>; anything shallower is not ours
            let Some((encoded_service, _)) = trimmed.split_once('/') else {
                continue;
            };
            let name = codec::deobfuscate(encoded_service, &self.obfuscation_key)?;
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
        debug!(services = names.len(), "discovered services under vault root");

        let outcomes = pool::run_bounded(names, self.max_concurrent_requests, |name| {
            match Service::discover(
                name.clone(),
                self.path.clone(),
                self.encryption_key.clone(),
                self.obfuscation_key.clone(),
                Arc::clone(&self.store),
            ) {
                Ok(service) => {
                    self.lock().insert(name, Arc::new(service));
                    Ok(())
                }
                Err(err) => Err((name, err)),
            }
        });

        let mut first_err = None;
        for outcome in outcomes {
            if let Err((name, err)) = outcome {
                if first_err.is_none() {
                    first_err = Some(err);
                } else {
                    warn!(service = %name, error = %err, "additional discovery failure discarded");
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{MemoryStore, StoreError};

    fn settings() -> VaultSettings {
        VaultSettings {
            path: "/vaulttest".into(),
            encryption_key: None,
            obfuscation_key: "obfkey".into(),
            max_concurrent_requests: 3,
        }
    }

    fn vault_with(store: &Arc<MemoryStore>) -> Vault {
        Vault::new(Arc::clone(store) as Arc<dyn ParameterStore>, settings()).unwrap()
    }

    fn cred(service: &str, username: &str, password: &str) -> FileCred {
        FileCred {
            service: service.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_empty_obfuscation_key_rejected() {
        let store = Arc::new(MemoryStore::new());
        let result = Vault::new(
            store as Arc<dyn ParameterStore>,
            VaultSettings {
                obfuscation_key: String::new(),
                ..settings()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_add_get_replace_delete() {
        let store = Arc::new(MemoryStore::new());
        let vault = vault_with(&store);
        vault.add("gmail", "alice", "pw1").unwrap();
        assert!(vault.has_service("gmail"));
        assert_eq!(vault.get("gmail", "alice").unwrap(), "pw1");

        vault.replace("gmail", "alice", "pw2").unwrap();
        assert_eq!(vault.get("gmail", "alice").unwrap(), "pw2");

        vault.delete("gmail", "alice").unwrap();
        assert!(!vault.has_service("gmail"));
    }

    #[test]
    fn test_unknown_service_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let vault = vault_with(&store);
        assert!(matches!(
            vault.get("ghost", "alice"),
            Err(VaultError::ServiceNotFound(_))
        ));
        assert!(matches!(
            vault.replace("ghost", "alice", "v"),
            Err(VaultError::ServiceNotFound(_))
        ));
        assert!(matches!(
            vault.delete("ghost", "alice"),
            Err(VaultError::ServiceNotFound(_))
        ));
        assert!(vault.get_users_for_service("ghost").is_err());
    }

    #[test]
    fn test_delete_unknown_user_keeps_count() {
        let store = Arc::new(MemoryStore::new());
        let vault = vault_with(&store);
        vault.add("gmail", "alice", "pw").unwrap();
        let err = vault.delete("gmail", "ghost").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(vault.get_users_for_service("gmail").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_last_user_removes_service() {
        let store = Arc::new(MemoryStore::new());
        let vault = vault_with(&store);
        vault.add("gmail", "alice", "pw").unwrap();
        vault.add("gmail", "bob", "pw").unwrap();
        vault.delete("gmail", "alice").unwrap();
        assert_eq!(vault.list_services(""), vec!["gmail"]);
        vault.delete("gmail", "bob").unwrap();
        assert!(vault.list_services("").is_empty());
    }

    #[test]
    fn test_failed_add_rolls_back_empty_service() {
        let store = Arc::new(MemoryStore::new());
        let vault = vault_with(&store);
        vault.add("gmail", "alice", "pw").unwrap();
        // conflicting add on a fresh vault view must not leave a phantom
        // empty service behind
        let vault2 = vault_with(&store);
        vault2.find_services().unwrap();
        let err = vault2.add("gmail", "alice", "other").unwrap_err();
        assert!(matches!(err, VaultError::UserExists { .. }));
        assert_eq!(vault2.list_services(""), vec!["gmail"]);
        assert_eq!(vault2.get("gmail", "alice").unwrap(), "pw");
    }

    #[test]
    fn test_list_services_prefix_sorted() {
        let store = Arc::new(MemoryStore::new());
        let vault = vault_with(&store);
        for (svc, user) in [("slack", "a"), ("github", "b"), ("gmail", "c")] {
            vault.add(svc, user, "pw").unwrap();
        }
        assert_eq!(vault.list_services(""), vec!["github", "gmail", "slack"]);
        assert_eq!(vault.list_services("g"), vec!["github", "gmail"]);
        assert!(vault.list_services("zzz").is_empty());
    }

    #[test]
    fn test_find_services_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let writer = vault_with(&store);
        writer.add("gmail", "alice", "pw1").unwrap();
        writer.add("gmail", "bob", "pw2").unwrap();
        writer.add("slack", "carol", "pw3").unwrap();

        let reader = Vault::discover(
            Arc::clone(&store) as Arc<dyn ParameterStore>,
            settings(),
        )
        .unwrap();
        assert_eq!(reader.list_services(""), vec!["gmail", "slack"]);
        assert_eq!(
            reader.get_users_for_service("gmail").unwrap(),
            vec!["alice", "bob"]
        );
        assert_eq!(reader.get("slack", "carol").unwrap(), "pw3");
    }

    #[test]
    fn test_concurrent_add_same_new_service() {
        let store = Arc::new(MemoryStore::new());
        let vault = Arc::new(vault_with(&store));
        let mut handles = Vec::new();
        for user in ["alice", "bob", "carol", "dave"] {
            let vault = Arc::clone(&vault);
            handles.push(thread::spawn(move || vault.add("gmail", user, "pw")));
        }
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(vault.list_services(""), vec!["gmail"]);
        assert_eq!(vault.get_users_for_service("gmail").unwrap().len(), 4);
    }

    #[test]
    fn test_add_multi_reports_every_item() {
        let store = Arc::new(MemoryStore::new());
        let vault = vault_with(&store);
        vault.add("gmail", "alice", "existing").unwrap();

        let creds = vec![
            cred("gmail", "alice", "dup"),
            cred("gmail", "bob", "pw1"),
            cred("slack", "carol", "pw2"),
        ];
        let results = vault.add_multi(creds);
        assert_eq!(results.len(), 3);
        for result in &results {
            if result.success {
                assert!(result.error.is_none());
            } else {
                assert!(result.error.is_some());
            }
        }
        let failed: Vec<_> = results.iter().filter(|r| !r.success).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].username, "alice");
        // the duplicate did not clobber the existing value
        assert_eq!(vault.get("gmail", "alice").unwrap(), "existing");
        assert_eq!(vault.get("slack", "carol").unwrap(), "pw2");
    }

    #[test]
    fn test_add_multi_empty_input() {
        let store = Arc::new(MemoryStore::new());
        let vault = vault_with(&store);
        assert!(vault.add_multi(Vec::new()).is_empty());
    }

    /// Backend whose writes always fail.
    struct FailingStore;

    impl ParameterStore for FailingStore {
        fn get(&self, key: &str) -> Result<String, StoreError> {
            Err(StoreError::NotFound(key.to_string()))
        }
        fn put(&self, _: &str, _: &str, _: Option<&str>) -> Result<(), StoreError> {
            Err(StoreError::Backend("write throttled".into()))
        }
        fn delete(&self, key: &str) -> Result<(), StoreError> {
            Err(StoreError::NotFound(key.to_string()))
        }
        fn list_by_prefix(&self, _: &str) -> Result<HashMap<String, String>, StoreError> {
            Ok(HashMap::new())
        }
    }

    #[test]
    fn test_backend_failure_rolls_back_new_service() {
        let vault = Vault::new(Arc::new(FailingStore), settings()).unwrap();
        let err = vault.add("gmail", "alice", "pw").unwrap_err();
        assert!(matches!(err, VaultError::Backend(_)));
        assert!(!vault.has_service("gmail"));
    }

    /// Backend that panics on write, for exercising worker recovery.
    struct PanicStore;

    impl ParameterStore for PanicStore {
        fn get(&self, key: &str) -> Result<String, StoreError> {
            Err(StoreError::NotFound(key.to_string()))
        }
        fn put(&self, _: &str, _: &str, _: Option<&str>) -> Result<(), StoreError> {
            panic!("backend connection lost");
        }
        fn delete(&self, key: &str) -> Result<(), StoreError> {
            Err(StoreError::NotFound(key.to_string()))
        }
        fn list_by_prefix(&self, _: &str) -> Result<HashMap<String, String>, StoreError> {
            Ok(HashMap::new())
        }
    }

    #[test]
    fn test_add_multi_recovers_from_panic() {
        let vault = Vault::new(Arc::new(PanicStore), settings()).unwrap();
        let results = vault.add_multi(vec![cred("gmail", "alice", "pw")]);
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert!(matches!(
            results[0].error,
            Some(VaultError::WorkerPanic(ref message)) if message.contains("backend connection lost")
        ));
    }
}
