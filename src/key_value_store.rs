//! In-process store with Redis semantics for strings, lists and expiry.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    String(Bytes),
    List(VecDeque<Bytes>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub data: DataType,
    pub expiration: Option<Instant>,
}

impl Value {
    fn string(data: Bytes, expiration: Option<Instant>) -> Self {
        Self {
            data: DataType::String(data),
            expiration,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expiration.is_some_and(|expiration| now >= expiration)
    }
}

pub type KeyValueStore = HashMap<String, Value>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    store: Mutex<KeyValueStore>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys that have not expired.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let store_guard = self.store.lock().await;
        store_guard
            .values()
            .filter(|value| !value.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// When `key` expires, if it exists and has an expiry.
    pub async fn expiration(&self, key: &str) -> Option<Instant> {
        let mut store_guard = self.store.lock().await;
        live_entry(&mut store_guard, key).and_then(|value| value.expiration)
    }
}

/// Looks up `key`, dropping it first if it has expired.
fn live_entry<'a>(store: &'a mut KeyValueStore, key: &str) -> Option<&'a mut Value> {
    if store
        .get(key)
        .is_some_and(|value| value.is_expired(Instant::now()))
    {
        store.remove(key);
    }

    store.get_mut(key)
}

/// Normalizes an inclusive LRANGE window against a list of `len` elements.
///
/// Negative indexes count from the end. Returns `None` when the window does
/// not overlap the list.
fn normalize_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    let from_end = |index: i64| if index < 0 { len + index } else { index };

    let start = from_end(start).max(0);
    let stop = from_end(stop).min(len - 1);

    (start <= stop).then_some((start as usize, stop as usize))
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let mut store_guard = self.store.lock().await;

        match live_entry(&mut store_guard, key) {
            Some(Value {
                data: DataType::String(data),
                ..
            }) => Ok(Some(data.clone())),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        let mut store_guard = self.store.lock().await;
        store_guard.insert(key.to_string(), Value::string(value, None));

        Ok(())
    }

    async fn set_ex(&self, key: &str, seconds: u64, value: Bytes) -> Result<(), StoreError> {
        if seconds == 0 {
            return Err(StoreError::InvalidExpireTime);
        }

        let expiration = Instant::now() + Duration::from_secs(seconds);

        let mut store_guard = self.store.lock().await;
        store_guard.insert(key.to_string(), Value::string(value, Some(expiration)));

        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut store_guard = self.store.lock().await;

        let Some(value) = live_entry(&mut store_guard, key) else {
            store_guard.insert(key.to_string(), Value::string(Bytes::from_static(b"1"), None));
            return Ok(1);
        };

        match value.data {
            DataType::String(ref mut stored_data) => {
                let incremented = std::str::from_utf8(stored_data)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .and_then(|int| int.checked_add(1))
                    .ok_or(StoreError::NotAnInteger)?;

                *stored_data = Bytes::from(incremented.to_string());

                Ok(incremented)
            }
            DataType::List(_) => Err(StoreError::WrongType),
        }
    }

    async fn rpush(&self, key: &str, value: Bytes) -> Result<i64, StoreError> {
        let mut store_guard = self.store.lock().await;

        if live_entry(&mut store_guard, key).is_none() {
            store_guard.insert(
                key.to_string(),
                Value {
                    data: DataType::List(VecDeque::new()),
                    expiration: None,
                },
            );
        }

        match store_guard.get_mut(key).map(|entry| &mut entry.data) {
            Some(DataType::List(list)) => {
                list.push_back(value);
                Ok(list.len() as i64)
            }
            _ => Err(StoreError::WrongType),
        }
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>, StoreError> {
        let mut store_guard = self.store.lock().await;

        let list = match live_entry(&mut store_guard, key) {
            Some(Value {
                data: DataType::List(list),
                ..
            }) => list,
            Some(_) => return Err(StoreError::WrongType),
            None => return Ok(Vec::new()),
        };

        let Some((start, end)) = normalize_range(list.len(), start, stop) else {
            return Ok(Vec::new());
        };

        Ok(list.range(start..=end).cloned().collect())
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut store_guard = self.store.lock().await;

        if live_entry(&mut store_guard, key).is_none() {
            return Ok(false);
        }

        Ok(store_guard.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut store_guard = self.store.lock().await;
        Ok(live_entry(&mut store_guard, key).is_some())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.store.lock().await.clear();
        Ok(())
    }
}
