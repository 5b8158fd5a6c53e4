//! A cache that files values under random keys and keeps a record of its
//! own method calls in the store.
//!
//! Every call to [`Cache::store`] bumps a counter kept under the method's
//! qualified name and appends the call's input and output to two lists, so
//! the history survives the process and can be replayed later:
//!
//! ```text
//! Cache.store          -> call counter
//! Cache.store:inputs   -> list of stored values
//! Cache.store:outputs  -> list of returned keys
//! ```

use std::fmt;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::{Store, StoreError};

/// Qualified name under which calls to [`Cache::store`] are tracked.
pub const STORE_METHOD: &str = "Cache.store";

#[derive(Error, Debug, PartialEq)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("value at {0} is not valid UTF-8")]
    InvalidUtf8(String),
    #[error("value at {0} is not an integer")]
    NotAnInteger(String),
}

/// The kinds of data the cache accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
}

impl StoredValue {
    /// The bytes written to the store.
    ///
    /// Floats with no fractional part keep a trailing `.0` so that `1.0`
    /// reads back as `"1.0"` rather than `"1"`.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            StoredValue::Str(s) => Bytes::copy_from_slice(s.as_bytes()),
            StoredValue::Bytes(b) => Bytes::copy_from_slice(b),
            StoredValue::Int(i) => Bytes::from(i.to_string()),
            StoredValue::Float(f) => Bytes::from(format_float(*f)),
        }
    }
}

/// Formats `f` the way Python's `repr` does, which is what the exercise's
/// client writes: shortest round-trip digits, a `.0` on whole numbers and
/// scientific notation outside `1e-4 <= |f| < 1e16`.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{:e}", f);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };

    if (-4..16).contains(&exponent) {
        let plain = f.to_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredValue::Str(s) => write!(f, "{}", s),
            StoredValue::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            StoredValue::Int(i) => write!(f, "{}", i),
            StoredValue::Float(x) => write!(f, "{}", format_float(*x)),
        }
    }
}

impl From<&str> for StoredValue {
    fn from(s: &str) -> Self {
        StoredValue::Str(s.to_string())
    }
}

impl From<String> for StoredValue {
    fn from(s: String) -> Self {
        StoredValue::Str(s)
    }
}

impl From<&[u8]> for StoredValue {
    fn from(b: &[u8]) -> Self {
        StoredValue::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for StoredValue {
    fn from(b: Vec<u8>) -> Self {
        StoredValue::Bytes(b)
    }
}

impl From<i64> for StoredValue {
    fn from(i: i64) -> Self {
        StoredValue::Int(i)
    }
}

impl From<i32> for StoredValue {
    fn from(i: i32) -> Self {
        StoredValue::Int(i64::from(i))
    }
}

impl From<f64> for StoredValue {
    fn from(f: f64) -> Self {
        StoredValue::Float(f)
    }
}

/// Recorded inputs and outputs of a tracked method, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallHistory {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

fn inputs_key(method: &str) -> String {
    format!("{}:inputs", method)
}

fn outputs_key(method: &str) -> String {
    format!("{}:outputs", method)
}

pub struct Cache<S> {
    store: S,
}

impl<S: Store> Cache<S> {
    /// Creates a cache over `store`, emptying the current database first.
    pub async fn new(store: S) -> Result<Self, CacheError> {
        store.flush().await?;
        info!("cache initialized on a flushed database");

        Ok(Self { store })
    }

    /// Creates a cache over `store` and keeps whatever it already holds.
    pub fn from_store(store: S) -> Self {
        Self { store }
    }

    pub fn store_backend(&self) -> &S {
        &self.store
    }

    /// Stores `data` under a fresh random key and returns the key.
    pub async fn store(&self, data: impl Into<StoredValue>) -> Result<String, CacheError> {
        let data = data.into();
        let key = Uuid::new_v4().to_string();

        // history is only written once the value is stored, so a failed
        // write leaves the counter and both lists untouched
        self.store.set(&key, data.to_bytes()).await?;

        self.store.incr(STORE_METHOD).await?;
        self.store
            .rpush(&inputs_key(STORE_METHOD), Bytes::from(data.to_string()))
            .await?;
        self.store
            .rpush(&outputs_key(STORE_METHOD), Bytes::from(key.clone()))
            .await?;

        debug!(%key, "stored value");

        Ok(key)
    }

    pub async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(self.store.get(key).await?)
    }

    /// Reads `key` and converts it with `convert`.
    ///
    /// `convert` only runs when the key exists.
    pub async fn get_with<T, F>(&self, key: &str, convert: F) -> Result<Option<T>, CacheError>
    where
        F: FnOnce(Bytes) -> Result<T, CacheError>,
    {
        match self.store.get(key).await? {
            Some(data) => convert(data).map(Some),
            None => Ok(None),
        }
    }

    pub async fn get_str(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.get_with(key, |data| {
            String::from_utf8(data.to_vec()).map_err(|_| CacheError::InvalidUtf8(key.to_string()))
        })
        .await
    }

    pub async fn get_int(&self, key: &str) -> Result<Option<i64>, CacheError> {
        self.get_with(key, |data| {
            std::str::from_utf8(&data)
                .ok()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .ok_or_else(|| CacheError::NotAnInteger(key.to_string()))
        })
        .await
    }

    /// How many times `method` has been called, 0 if never.
    pub async fn call_count(&self, method: &str) -> Result<i64, CacheError> {
        Ok(self.get_int(method).await?.unwrap_or(0))
    }

    pub async fn call_history(&self, method: &str) -> Result<CallHistory, CacheError> {
        let inputs = self.store.lrange(&inputs_key(method), 0, -1).await?;
        let outputs = self.store.lrange(&outputs_key(method), 0, -1).await?;

        let to_strings = |list: Vec<Bytes>| {
            list.iter()
                .map(|entry| String::from_utf8_lossy(entry).into_owned())
                .collect::<Vec<String>>()
        };

        Ok(CallHistory {
            inputs: to_strings(inputs),
            outputs: to_strings(outputs),
        })
    }

    /// Renders the call history of `method`, one line per call.
    ///
    /// ```text
    /// Cache.store was called 2 times:
    /// Cache.store(foo) -> 5c3f...
    /// Cache.store(42) -> 9e1a...
    /// ```
    pub async fn replay(&self, method: &str) -> Result<String, CacheError> {
        let count = self.call_count(method).await?;
        let history = self.call_history(method).await?;

        let mut lines = vec![format!("{} was called {} times:", method, count)];
        lines.extend(
            history
                .inputs
                .iter()
                .zip(history.outputs.iter())
                .map(|(input, output)| format!("{}({}) -> {}", method, input, output)),
        );

        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::format_float;

    #[test]
    fn test_format_float() {
        let test_cases = vec![
            (1.0, "1.0"),
            (2.75, "2.75"),
            (-2.0, "-2.0"),
            (0.5, "0.5"),
            (0.0, "0.0"),
            (0.0001, "0.0001"),
            (1e15, "1000000000000000.0"),
            (1e16, "1e+16"),
            (-1.5e16, "-1.5e+16"),
            (1e-5, "1e-05"),
            (2.5e-7, "2.5e-07"),
            (1e300, "1e+300"),
            (f64::INFINITY, "inf"),
            (f64::NEG_INFINITY, "-inf"),
            (f64::NAN, "nan"),
        ];

        for (input, expected) in test_cases {
            assert_eq!(format_float(input), expected, "formatting {}", input);
        }
    }
}
