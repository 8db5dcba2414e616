use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ClimaError;

#[derive(Serialize, Deserialize, Debug, Clone)]
struct StoredEntry {
    value: serde_json::Value,
    expires_at: u64, // Unix timestamp (seconds)
}

/// Expiring key/value store kept in a JSON file.
///
/// Holds geocoding lookups keyed by city name or rounded coordinates, so
/// repeated searches skip the network.
#[derive(Debug, Default)]
pub struct Cache {
    path: Option<PathBuf>,
    entries: HashMap<String, StoredEntry>,
}

fn now_secs() -> crate::Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| ClimaError::cache(e.to_string()))
}

impl Cache {
    /// Opens the cache file, starting empty when it is missing or unreadable
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), "discarding corrupt cache: {e}");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            path: Some(path),
            entries,
        }
    }

    /// A cache that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Stores a serializable value with a time-to-live (TTL).
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T, ttl: Duration) -> crate::Result<()> {
        let expires_at = now_secs()?
            .checked_add(ttl.as_secs())
            .ok_or_else(|| ClimaError::cache("TTL overflow"))?;
        let entry = StoredEntry {
            value: serde_json::to_value(value)?,
            expires_at,
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> crate::Result<Option<T>> {
        let Some(entry) = self.entries.get(key) else {
            tracing::debug!("Key not found");
            return Ok(None);
        };

        if now_secs()? < entry.expires_at {
            tracing::debug!("Key found and still fresh");
            Ok(Some(serde_json::from_value(entry.value.clone())?))
        } else {
            tracing::debug!("Key found but expired");
            self.remove(key);
            Ok(None)
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the entries back to the cache file, dropping expired ones
    pub fn save(&mut self) -> crate::Result<()> {
        let now = now_secs()?;
        self.entries.retain(|_, entry| entry.expires_at > now);

        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(&self.entries)?)?;
        Ok(())
    }
}

/// Cache key for a city search
pub fn city_key(query: &str) -> String {
    format!("city:{}", query.trim().to_lowercase())
}

/// Cache key for a coordinate lookup, rounded to two decimals (about 1 km)
pub fn coords_key(lat: f64, lon: f64) -> String {
    format!("coords:{lat:.2},{lon:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get() {
        let mut cache = Cache::in_memory();
        cache.put("k", &vec![1, 2, 3], Duration::from_secs(60)).unwrap();
        let value: Option<Vec<i32>> = cache.get("k").unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
        let missing: Option<Vec<i32>> = cache.get("other").unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_remove() {
        let mut cache = Cache::in_memory();
        cache.put("k", &1, Duration::from_secs(60)).unwrap();
        cache.remove("k");
        let value: Option<i32> = cache.get("k").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let mut cache = Cache::in_memory();
        cache.put("k", &"v", Duration::ZERO).unwrap();
        assert_eq!(cache.len(), 1);
        let value: Option<String> = cache.get("k").unwrap();
        assert_eq!(value, None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookups.json");

        let mut cache = Cache::open(&path);
        cache.put(&city_key("  Madrid "), &"Madrid, ES", Duration::from_secs(3600)).unwrap();
        cache.put("stale", &1, Duration::ZERO).unwrap();
        cache.save().unwrap();

        let mut reopened = Cache::open(&path);
        assert_eq!(reopened.len(), 1);
        let value: Option<String> = reopened.get("city:madrid").unwrap();
        assert_eq!(value.as_deref(), Some("Madrid, ES"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookups.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Cache::open(&path).is_empty());
    }

    #[test]
    fn test_coords_key_rounds() {
        assert_eq!(coords_key(-34.61315, -58.37723), "coords:-34.61,-58.38");
        assert_eq!(coords_key(-34.6149, -58.3801), "coords:-34.61,-58.38");
    }
}
