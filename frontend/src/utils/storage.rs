use std::{cell::RefCell, collections::HashMap, marker::PhantomData, rc::Rc};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Key under which the session snapshot is persisted.
pub const SESSION_KEY: &str = "auth-session";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation failed: {0}")]
    Backend(String),
    #[error("stored value is not valid: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store. Clones share entries, which lets a test reopen the same
/// "browser storage" from a second session store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub fn window() -> Result<web_sys::Window, StorageError> {
    web_sys::window().ok_or_else(|| StorageError::Unavailable("No window object".to_string()))
}

#[cfg(target_arch = "wasm32")]
pub fn local_storage() -> Result<web_sys::Storage, StorageError> {
    window()?
        .local_storage()
        .map_err(|_| StorageError::Unavailable("No localStorage".to_string()))?
        .ok_or_else(|| StorageError::Unavailable("No localStorage".to_string()))
}

/// Browser `localStorage`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        local_storage()?
            .get_item(key)
            .map_err(|_| StorageError::Backend(format!("Failed to read {}", key)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        local_storage()?
            .set_item(key, value)
            .map_err(|_| StorageError::Backend(format!("Failed to write {}", key)))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        local_storage()?
            .remove_item(key)
            .map_err(|_| StorageError::Backend(format!("Failed to remove {}", key)))
    }
}

/// One key holding one JSON-serialized value.
pub struct StorageSlot<T> {
    backend: Rc<dyn KeyValueStore>,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for StorageSlot<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Rc::clone(&self.backend),
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> StorageSlot<T> {
    pub fn new(backend: Rc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            backend,
            key,
            _marker: PhantomData,
        }
    }

    pub fn load(&self) -> Result<Option<T>, StorageError> {
        match self.backend.get(self.key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(self.key, &raw)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.backend.remove(self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        token: Option<String>,
    }

    fn slot(store: &MemoryStore) -> StorageSlot<Snapshot> {
        StorageSlot::new(Rc::new(store.clone()), SESSION_KEY)
    }

    #[test]
    fn absent_key_loads_as_none() {
        assert!(slot(&MemoryStore::new()).load().unwrap().is_none());
    }

    #[test]
    fn save_load_clear_cycle() {
        let store = MemoryStore::new();
        let slot = slot(&store);
        slot.save(&Snapshot {
            token: Some("t1".into()),
        })
        .unwrap();
        assert!(store.get(SESSION_KEY).unwrap().unwrap().contains("t1"));
        assert_eq!(
            slot.load().unwrap(),
            Some(Snapshot {
                token: Some("t1".into())
            })
        );
        slot.clear().unwrap();
        slot.clear().unwrap();
        assert!(slot.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_value_is_a_serialization_error() {
        let store = MemoryStore::new();
        store.set(SESSION_KEY, "{not json").unwrap();
        assert!(matches!(
            slot(&store).load(),
            Err(StorageError::Serialization(_))
        ));
    }
}
