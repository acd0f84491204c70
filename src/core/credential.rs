//! One stored secret value, cached lazily with dirty tracking.

use crate::core::codec::{self, CodecError};
use crate::core::error::VaultError;
use crate::core::store::{ParameterStore, StoreError};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Cache state of the local copy relative to the backend.
///
/// `Unloaded` — no local value; the backend copy is authoritative.
/// `Clean`    — local value matches the backend as of the last sync.
/// `Dirty`    — local value has not been written back yet.
///
/// A "saved but never loaded" combination cannot be expressed.
#[derive(Clone)]
enum State {
    Unloaded,
    Clean(Zeroizing<String>),
    Dirty(Zeroizing<String>),
}

pub struct Credential {
    name: String,
    /// Backend prefix this credential lives under (the already-obfuscated
    /// service key, e.g. `<root>/<obf(service)>`).
    prefix: String,
    encryption_key: Option<String>,
    obfuscation_key: String,
    store: Arc<dyn ParameterStore>,
    state: State,
}

impl Credential {
    /// Create a credential with an explicit value and eagerly save it.
    pub fn create(
        name: String,
        value: String,
        prefix: String,
        encryption_key: Option<String>,
        obfuscation_key: String,
        store: Arc<dyn ParameterStore>,
    ) -> Result<Self, VaultError> {
        let mut cred = Self {
            name,
            prefix,
            encryption_key,
            obfuscation_key,
            store,
            state: State::Dirty(Zeroizing::new(value)),
        };
        cred.save()?;
        Ok(cred)
    }

    /// Create a credential whose value is fetched from the backend on
    /// first read. Used during discovery; performs no backend I/O.
    pub fn unloaded(
        name: String,
        prefix: String,
        encryption_key: Option<String>,
        obfuscation_key: String,
        store: Arc<dyn ParameterStore>,
    ) -> Self {
        Self {
            name,
            prefix,
            encryption_key,
            obfuscation_key,
            store,
            state: State::Unloaded,
        }
    }

    /// Whether a local value is present.
    pub fn is_loaded(&self) -> bool {
        !matches!(self.state, State::Unloaded)
    }

    /// Whether the backend is in sync with the local value. `Unloaded`
    /// counts as saved: the backend copy is the only copy.
    pub fn is_saved(&self) -> bool {
        !matches!(self.state, State::Dirty(_))
    }

    fn storage_key(&self) -> Result<String, CodecError> {
        codec::obfuscate_path(&self.prefix, &self.name, &self.obfuscation_key)
    }

    /// Return the value, fetching it from the backend first if no local
    /// copy exists.
    pub fn get_value(&mut self) -> Result<String, VaultError> {
        if let State::Clean(value) | State::Dirty(value) = &self.state {
            return Ok(value.as_str().to_owned());
        }
        let key = self.storage_key()?;
        let value = self.store.get(&key)?;
        self.state = State::Clean(Zeroizing::new(value.clone()));
        Ok(value)
    }

    /// Replace the local value without touching the backend.
    pub fn set_value(&mut self, value: String) {
        self.state = State::Dirty(Zeroizing::new(value));
    }

    /// Write the local value to the backend if it is out of sync.
    pub fn save(&mut self) -> Result<(), VaultError> {
        let value = match &self.state {
            State::Dirty(value) => value.clone(),
            State::Unloaded | State::Clean(_) => return Ok(()),
        };
        let key = self.storage_key()?;
        self.store
            .put(&key, &value, self.encryption_key.as_deref())?;
        self.state = State::Clean(value);
        Ok(())
    }

    /// Fetch the backend value if no local copy exists.
    pub fn load(&mut self) -> Result<(), VaultError> {
        if !matches!(self.state, State::Unloaded) {
            return Ok(());
        }
        let key = self.storage_key()?;
        let value = self.store.get(&key)?;
        self.state = State::Clean(Zeroizing::new(value));
        Ok(())
    }

    /// Delete the backend key. An already-absent key counts as success.
    /// Local state is cleared on success.
    pub fn delete(&mut self) -> Result<(), VaultError> {
        let key = self.storage_key()?;
        match self.store.delete(&key) {
            Ok(()) | Err(StoreError::NotFound(_)) => {
                self.state = State::Unloaded;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
