//! The storage operations the caches are written against.
//!
//! [`RedisClient`] is the real backend. [`MemoryStore`](crate::key_value_store::MemoryStore)
//! follows the same Redis semantics in-process.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::client::{ClientError, RedisClient};

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    Client(ClientError),
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("invalid expire time")]
    InvalidExpireTime,
}

/// Server replies that have a dedicated variant are mapped onto it, so both
/// backends report type and value errors the same way.
impl From<ClientError> for StoreError {
    fn from(e: ClientError) -> Self {
        let mapped = match &e {
            ClientError::Server(message) if message.starts_with("WRONGTYPE") => {
                Some(StoreError::WrongType)
            }
            ClientError::Server(message) if message.contains("not an integer or out of range") => {
                Some(StoreError::NotAnInteger)
            }
            ClientError::Server(message) if message.contains("invalid expire time") => {
                Some(StoreError::InvalidExpireTime)
            }
            _ => None,
        };

        match mapped {
            Some(error) => error,
            None => StoreError::Client(e),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    async fn set(&self, key: &str, value: Bytes) -> Result<(), StoreError>;

    /// Sets `key` and makes it expire after `seconds`.
    async fn set_ex(&self, key: &str, seconds: u64, value: Bytes) -> Result<(), StoreError>;

    /// Increments the integer at `key`, starting from 0 when absent.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    async fn rpush(&self, key: &str, value: Bytes) -> Result<i64, StoreError>;

    /// Inclusive range; negative indexes count from the end of the list.
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>, StoreError>;

    async fn del(&self, key: &str) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Removes every key of the current database.
    async fn flush(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> Store for RedisClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        Ok(RedisClient::get(self, key).await?)
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        Ok(RedisClient::set(self, key, &value).await?)
    }

    async fn set_ex(&self, key: &str, seconds: u64, value: Bytes) -> Result<(), StoreError> {
        Ok(RedisClient::set_ex(self, key, seconds, &value).await?)
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        Ok(RedisClient::incr(self, key).await?)
    }

    async fn rpush(&self, key: &str, value: Bytes) -> Result<i64, StoreError> {
        Ok(RedisClient::rpush(self, key, &value).await?)
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>, StoreError> {
        Ok(RedisClient::lrange(self, key, start, stop).await?)
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        Ok(RedisClient::del(self, key).await? > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(RedisClient::exists(self, key).await?)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        Ok(RedisClient::flushdb(self).await?)
    }
}

#[async_trait]
impl<T> Store for Arc<T>
where
    T: Store + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn set_ex(&self, key: &str, seconds: u64, value: Bytes) -> Result<(), StoreError> {
        (**self).set_ex(key, seconds, value).await
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        (**self).incr(key).await
    }

    async fn rpush(&self, key: &str, value: Bytes) -> Result<i64, StoreError> {
        (**self).rpush(key, value).await
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>, StoreError> {
        (**self).lrange(key, start, stop).await
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        (**self).del(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        (**self).exists(key).await
    }

    async fn flush(&self) -> Result<(), StoreError> {
        (**self).flush().await
    }
}
