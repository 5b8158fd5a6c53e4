//! A small async Redis client covering the commands the caches need.

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::connection::{Connection, ConnectionError};
use crate::resp::RespValue;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:6379";

#[derive(Error, Debug, PartialEq)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("server error: {0}")]
    Server(String),
    #[error("unexpected response to {command}: {response:?}")]
    UnexpectedResponse {
        command: &'static str,
        response: RespValue,
    },
}

/// Client over a single connection.
///
/// The connection sits behind an async mutex so one client can be shared
/// between tasks; requests are serialized, which keeps every reply paired
/// with its request. Cancelling a request midway (a timeout, `select!`)
/// leaves the client out of sync and every later call fails with
/// [`ConnectionError::OutOfSync`]; build a new client to recover.
#[derive(Debug)]
pub struct RedisClient<S = TcpStream> {
    connection: Mutex<Connection<S>>,
}

impl RedisClient<TcpStream> {
    pub async fn connect(address: &str) -> Result<Self, ClientError> {
        let connection = Connection::connect(address).await?;
        info!(address, "redis client ready");

        Ok(Self::from_connection(connection))
    }
}

impl<S> RedisClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn from_connection(connection: Connection<S>) -> Self {
        Self {
            connection: Mutex::new(connection),
        }
    }

    async fn execute(&self, command: RespValue) -> Result<RespValue, ClientError> {
        let mut connection = self.connection.lock().await;

        match connection.request(&command).await? {
            RespValue::Error(message) => Err(ClientError::Server(message)),
            response => Ok(response),
        }
    }

    async fn execute_ok(&self, name: &'static str, command: RespValue) -> Result<(), ClientError> {
        match self.execute(command).await? {
            RespValue::SimpleString(s) if s == "OK" => Ok(()),
            response => Err(ClientError::UnexpectedResponse {
                command: name,
                response,
            }),
        }
    }

    async fn execute_integer(
        &self,
        name: &'static str,
        command: RespValue,
    ) -> Result<i64, ClientError> {
        match self.execute(command).await? {
            RespValue::Integer(i) => Ok(i),
            response => Err(ClientError::UnexpectedResponse {
                command: name,
                response,
            }),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.execute(RespValue::command(["PING"])).await? {
            RespValue::SimpleString(s) if s == "PONG" => Ok(()),
            response => Err(ClientError::UnexpectedResponse {
                command: "PING",
                response,
            }),
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<Bytes>, ClientError> {
        let command = RespValue::command([b"GET".as_slice(), key.as_bytes()]);

        match self.execute(command).await? {
            RespValue::BulkString(data) => Ok(Some(data)),
            RespValue::Null => Ok(None),
            response => Err(ClientError::UnexpectedResponse {
                command: "GET",
                response,
            }),
        }
    }

    pub async fn set(&self, key: &str, value: &[u8]) -> Result<(), ClientError> {
        let command = RespValue::command([b"SET".as_slice(), key.as_bytes(), value]);
        self.execute_ok("SET", command).await
    }

    /// `SETEX key seconds value`: set and expire in one step.
    pub async fn set_ex(&self, key: &str, seconds: u64, value: &[u8]) -> Result<(), ClientError> {
        let seconds = seconds.to_string();
        let command = RespValue::command([
            b"SETEX".as_slice(),
            key.as_bytes(),
            seconds.as_bytes(),
            value,
        ]);
        self.execute_ok("SETEX", command).await
    }

    pub async fn incr(&self, key: &str) -> Result<i64, ClientError> {
        let command = RespValue::command([b"INCR".as_slice(), key.as_bytes()]);
        self.execute_integer("INCR", command).await
    }

    /// Appends to the list at `key`, returning the new length.
    pub async fn rpush(&self, key: &str, value: &[u8]) -> Result<i64, ClientError> {
        let command = RespValue::command([b"RPUSH".as_slice(), key.as_bytes(), value]);
        self.execute_integer("RPUSH", command).await
    }

    pub async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>, ClientError> {
        let start = start.to_string();
        let stop = stop.to_string();
        let command = RespValue::command([
            b"LRANGE".as_slice(),
            key.as_bytes(),
            start.as_bytes(),
            stop.as_bytes(),
        ]);

        match self.execute(command).await? {
            RespValue::Array(elements) => elements
                .into_iter()
                .map(|element| match element {
                    RespValue::BulkString(data) => Ok(data),
                    response => Err(ClientError::UnexpectedResponse {
                        command: "LRANGE",
                        response,
                    }),
                })
                .collect(),
            response => Err(ClientError::UnexpectedResponse {
                command: "LRANGE",
                response,
            }),
        }
    }

    /// Returns the number of keys removed.
    pub async fn del(&self, key: &str) -> Result<i64, ClientError> {
        let command = RespValue::command([b"DEL".as_slice(), key.as_bytes()]);
        self.execute_integer("DEL", command).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, ClientError> {
        let command = RespValue::command([b"EXISTS".as_slice(), key.as_bytes()]);
        Ok(self.execute_integer("EXISTS", command).await? > 0)
    }

    pub async fn flushdb(&self) -> Result<(), ClientError> {
        debug!("flushing current database");
        self.execute_ok("FLUSHDB", RespValue::command(["FLUSHDB"])).await
    }
}
