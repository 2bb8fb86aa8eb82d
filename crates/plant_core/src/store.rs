use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CareError, Result};
use crate::storage::KeyValueStore;

/// Load a JSON array stored under `key`. A missing key is an empty collection.
pub fn load_collection<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Vec<T>> {
    let raw = store.get(key).map_err(|source| CareError::StorageRead {
        key: key.to_string(),
        source,
    })?;
    match raw {
        None => Ok(Vec::new()),
        Some(text) if text.trim().is_empty() => Ok(Vec::new()),
        Some(text) => serde_json::from_str(&text).map_err(|source| CareError::Serialization {
            key: key.to_string(),
            source,
        }),
    }
}

pub fn save_collection<T: Serialize>(store: &dyn KeyValueStore, key: &str, items: &[T]) -> Result<()> {
    let text = serde_json::to_string(items).map_err(|source| CareError::Serialization {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &text).map_err(|source| CareError::StorageWrite {
        key: key.to_string(),
        source,
    })
}

pub fn load_value<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    let raw = store.get(key).map_err(|source| CareError::StorageRead {
        key: key.to_string(),
        source,
    })?;
    raw.map(|text| {
        serde_json::from_str(&text).map_err(|source| CareError::Serialization {
            key: key.to_string(),
            source,
        })
    })
    .transpose()
}

pub fn save_value<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let text = serde_json::to_string(value).map_err(|source| CareError::Serialization {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &text).map_err(|source| CareError::StorageWrite {
        key: key.to_string(),
        source,
    })
}

pub fn remove_key(store: &dyn KeyValueStore, key: &str) -> Result<()> {
    store.remove(key).map_err(|source| CareError::StorageWrite {
        key: key.to_string(),
        source,
    })
}
