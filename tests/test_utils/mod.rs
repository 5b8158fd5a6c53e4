#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use bytes::Bytes;
use redis_basic::{
    connection::{Connection, ConnectionError},
    key_value_store::MemoryStore,
    resp::RespValue,
    store::{Store, StoreError},
};
use tokio::{net::TcpListener, task::JoinHandle};

/// Test utilities for simplifying client tests
pub struct TestUtils;

/// A RESP server on an ephemeral port answering from a [`MemoryStore`].
pub struct FakeRedis {
    pub address: SocketAddr,
    pub store: Arc<MemoryStore>,
    handle: JoinHandle<()>,
}

impl Drop for FakeRedis {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestUtils {
    pub async fn spawn_fake_redis() -> FakeRedis {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let store = Arc::new(MemoryStore::new());

        let server_store = Arc::clone(&store);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };

                let store = Arc::clone(&server_store);
                tokio::spawn(async move {
                    let mut connection = Connection::new(stream);

                    loop {
                        let frame = match connection.read_frame().await {
                            Ok(frame) => frame,
                            Err(ConnectionError::ConnectionClosed) => break,
                            Err(e) => panic!("fake redis failed to read: {}", e),
                        };

                        let response = dispatch(&store, frame).await;
                        if connection.write_frame(&response).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        FakeRedis {
            address,
            store,
            handle,
        }
    }

    pub fn bulk(data: &str) -> Bytes {
        Bytes::copy_from_slice(data.as_bytes())
    }
}

fn store_error(e: StoreError) -> RespValue {
    match e {
        StoreError::WrongType => RespValue::Error(e.to_string()),
        _ => RespValue::Error(format!("ERR {}", e)),
    }
}

fn wrong_arguments(command: &str) -> RespValue {
    RespValue::Error(format!(
        "ERR wrong number of arguments for '{}' command",
        command.to_lowercase()
    ))
}

fn as_text(data: &Bytes) -> String {
    String::from_utf8_lossy(data).into_owned()
}

async fn dispatch(store: &MemoryStore, frame: RespValue) -> RespValue {
    let RespValue::Array(parts) = frame else {
        return RespValue::Error("ERR expected an array of bulk strings".to_string());
    };

    let mut arguments = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            RespValue::BulkString(data) => arguments.push(data),
            _ => return RespValue::Error("ERR expected an array of bulk strings".to_string()),
        }
    }

    let Some((name, arguments)) = arguments.split_first() else {
        return RespValue::Error("ERR empty command".to_string());
    };
    let name = as_text(name).to_uppercase();

    let result = match (name.as_str(), arguments) {
        ("PING", []) => Ok(RespValue::SimpleString("PONG".to_string())),
        ("GET", [key]) => store.get(&as_text(key)).await.map(|value| match value {
            Some(data) => RespValue::BulkString(data),
            None => RespValue::Null,
        }),
        ("SET", [key, value]) => store
            .set(&as_text(key), value.clone())
            .await
            .map(|_| RespValue::SimpleString("OK".to_string())),
        ("SETEX", [key, seconds, value]) => {
            let Ok(seconds) = as_text(seconds).parse::<u64>() else {
                return RespValue::Error(
                    "ERR value is not an integer or out of range".to_string(),
                );
            };
            store
                .set_ex(&as_text(key), seconds, value.clone())
                .await
                .map(|_| RespValue::SimpleString("OK".to_string()))
        }
        ("INCR", [key]) => store.incr(&as_text(key)).await.map(RespValue::Integer),
        ("RPUSH", [key, value]) => store
            .rpush(&as_text(key), value.clone())
            .await
            .map(RespValue::Integer),
        ("LRANGE", [key, start, stop]) => {
            let (Ok(start), Ok(stop)) = (
                as_text(start).parse::<i64>(),
                as_text(stop).parse::<i64>(),
            ) else {
                return RespValue::Error(
                    "ERR value is not an integer or out of range".to_string(),
                );
            };
            store.lrange(&as_text(key), start, stop).await.map(|list| {
                RespValue::Array(list.into_iter().map(RespValue::BulkString).collect())
            })
        }
        ("DEL", [key]) => store
            .del(&as_text(key))
            .await
            .map(|removed| RespValue::Integer(i64::from(removed))),
        ("EXISTS", [key]) => store
            .exists(&as_text(key))
            .await
            .map(|exists| RespValue::Integer(i64::from(exists))),
        ("FLUSHDB", []) => store
            .flush()
            .await
            .map(|_| RespValue::SimpleString("OK".to_string())),
        ("PING" | "GET" | "SET" | "SETEX" | "INCR" | "RPUSH" | "LRANGE" | "DEL" | "EXISTS"
        | "FLUSHDB", _) => return wrong_arguments(&name),
        _ => return RespValue::Error(format!("ERR unknown command '{}'", name)),
    };

    result.unwrap_or_else(store_error)
}
