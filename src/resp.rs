//! Redis Serialization Protocol (RESP2) frames.
//!
//! Every request the client sends is an array of bulk strings, and every reply
//! the server sends back is one of the frame types below. Decoding works on a
//! growing [`BytesMut`] read buffer: a frame is only consumed once all of its
//! bytes have arrived, so a reply split across several TCP reads is handled by
//! simply reading more and trying again.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

const CRLF: &[u8] = b"\r\n";

/// Errors raised while decoding RESP frames.
#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("unknown RESP type byte {0:#04x}")]
    UnknownRespType(u8),
    #[error("failed to parse integer")]
    FailedToParseInteger,
    #[error("invalid bulk string")]
    InvalidBulkString,
    #[error("invalid array")]
    InvalidArray,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    /// Binary safe: the payload may contain CR and LF.
    BulkString(Bytes),
    Array(Vec<RespValue>),
    /// Null bulk string, `$-1\r\n`.
    Null,
    /// Null array, `*-1\r\n`.
    NullArray,
}

impl RespValue {
    /// Builds a request frame: an array with one bulk string per part.
    ///
    /// # Examples
    ///
    /// ```
    /// use redis_basic::resp::RespValue;
    ///
    /// let command = RespValue::command(["GET", "grape"]);
    /// assert_eq!(&command.encode()[..], b"*2\r\n$3\r\nGET\r\n$5\r\ngrape\r\n");
    /// ```
    pub fn command<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        RespValue::Array(
            parts
                .into_iter()
                .map(|part| RespValue::BulkString(Bytes::copy_from_slice(part.as_ref())))
                .collect(),
        )
    }

    pub fn encode(&self) -> BytesMut {
        let mut buffer = BytesMut::new();
        self.encode_into(&mut buffer);
        buffer
    }

    pub fn encode_into(&self, buffer: &mut BytesMut) {
        match self {
            RespValue::SimpleString(s) => {
                buffer.put_u8(b'+');
                buffer.put_slice(s.as_bytes());
                buffer.put_slice(CRLF);
            }
            RespValue::Error(s) => {
                buffer.put_u8(b'-');
                buffer.put_slice(s.as_bytes());
                buffer.put_slice(CRLF);
            }
            RespValue::Integer(i) => {
                buffer.put_u8(b':');
                buffer.put_slice(i.to_string().as_bytes());
                buffer.put_slice(CRLF);
            }
            RespValue::BulkString(data) => {
                buffer.put_u8(b'$');
                buffer.put_slice(data.len().to_string().as_bytes());
                buffer.put_slice(CRLF);
                buffer.put_slice(data);
                buffer.put_slice(CRLF);
            }
            RespValue::Array(elements) => {
                buffer.put_u8(b'*');
                buffer.put_slice(elements.len().to_string().as_bytes());
                buffer.put_slice(CRLF);
                for element in elements {
                    element.encode_into(buffer);
                }
            }
            RespValue::Null => buffer.put_slice(b"$-1\r\n"),
            RespValue::NullArray => buffer.put_slice(b"*-1\r\n"),
        }
    }

    /// Removes one complete frame from the front of `buffer`.
    ///
    /// Returns `Ok(None)` without consuming anything when the buffer does not
    /// hold a whole frame yet.
    pub fn decode(buffer: &mut BytesMut) -> Result<Option<RespValue>, RespError> {
        match parse_frame(&buffer[..], 0)? {
            Some((value, consumed)) => {
                buffer.advance(consumed);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Drains every complete frame currently held in `buffer`.
    pub fn parse(buffer: &mut BytesMut) -> Result<Vec<RespValue>, RespError> {
        let mut values = Vec::new();

        while let Some(value) = Self::decode(buffer)? {
            values.push(value);
        }

        Ok(values)
    }
}

/// Finds the line starting at `start`, returning it without its CRLF together
/// with the offset just past the CRLF.
fn read_line(src: &[u8], start: usize) -> Option<(&[u8], usize)> {
    src[start..]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|pos| (&src[start..start + pos], start + pos + 2))
}

fn parse_integer(line: &[u8]) -> Result<i64, RespError> {
    std::str::from_utf8(line)
        .map_err(|_| RespError::InvalidUtf8)?
        .parse::<i64>()
        .map_err(|_| RespError::FailedToParseInteger)
}

fn line_to_string(line: &[u8]) -> Result<String, RespError> {
    std::str::from_utf8(line)
        .map(str::to_string)
        .map_err(|_| RespError::InvalidUtf8)
}

fn parse_frame(src: &[u8], start: usize) -> Result<Option<(RespValue, usize)>, RespError> {
    let Some(&type_byte) = src.get(start) else {
        return Ok(None);
    };

    let Some((line, next)) = read_line(src, start + 1) else {
        return Ok(None);
    };

    match type_byte {
        b'+' => Ok(Some((RespValue::SimpleString(line_to_string(line)?), next))),
        b'-' => Ok(Some((RespValue::Error(line_to_string(line)?), next))),
        b':' => Ok(Some((RespValue::Integer(parse_integer(line)?), next))),
        b'$' => {
            let length = parse_integer(line).map_err(|_| RespError::InvalidBulkString)?;

            if length == -1 {
                return Ok(Some((RespValue::Null, next)));
            }

            let Ok(length) = usize::try_from(length) else {
                return Err(RespError::InvalidBulkString);
            };

            let end = next + length;
            if src.len() < end + CRLF.len() {
                return Ok(None);
            }

            if &src[end..end + CRLF.len()] != CRLF {
                return Err(RespError::InvalidBulkString);
            }

            let data = Bytes::copy_from_slice(&src[next..end]);
            Ok(Some((RespValue::BulkString(data), end + CRLF.len())))
        }
        b'*' => {
            let length = parse_integer(line).map_err(|_| RespError::InvalidArray)?;

            if length == -1 {
                return Ok(Some((RespValue::NullArray, next)));
            }

            if length < 0 {
                return Err(RespError::InvalidArray);
            }

            let mut elements = Vec::new();
            let mut position = next;

            for _ in 0..length {
                match parse_frame(src, position)? {
                    Some((element, after)) => {
                        elements.push(element);
                        position = after;
                    }
                    None => return Ok(None),
                }
            }

            Ok(Some((RespValue::Array(elements), position)))
        }
        other => Err(RespError::UnknownRespType(other)),
    }
}
