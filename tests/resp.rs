use bytes::{Bytes, BytesMut};
use redis_basic::resp::{RespError, RespValue};

fn bulk(data: &str) -> RespValue {
    RespValue::BulkString(Bytes::copy_from_slice(data.as_bytes()))
}

#[test]
fn test_encode() {
    let test_cases = vec![
        (RespValue::SimpleString("OK".into()), "+OK\r\n"),
        (
            RespValue::Error("ERR unknown command".into()),
            "-ERR unknown command\r\n",
        ),
        (RespValue::Integer(-42), ":-42\r\n"),
        (bulk("mango"), "$5\r\nmango\r\n"),
        (bulk(""), "$0\r\n\r\n"),
        (RespValue::Null, "$-1\r\n"),
        (RespValue::NullArray, "*-1\r\n"),
        (RespValue::Array(vec![]), "*0\r\n"),
        (
            RespValue::command(["SETEX", "page", "10", "<html>"]),
            "*4\r\n$5\r\nSETEX\r\n$4\r\npage\r\n$2\r\n10\r\n$6\r\n<html>\r\n",
        ),
    ];

    for (value, expected) in test_cases {
        assert_eq!(
            &value.encode()[..],
            expected.as_bytes(),
            "encoding {:?}",
            value
        );
    }
}

#[test]
fn test_decode_complete_frames() {
    let test_cases = vec![
        ("+PONG\r\n", RespValue::SimpleString("PONG".into())),
        (
            "-WRONGTYPE Operation against a key\r\n",
            RespValue::Error("WRONGTYPE Operation against a key".into()),
        ),
        (":1000\r\n", RespValue::Integer(1000)),
        ("$5\r\napple\r\n", bulk("apple")),
        ("$-1\r\n", RespValue::Null),
        ("*-1\r\n", RespValue::NullArray),
        (
            "*3\r\n$5\r\nRPUSH\r\n$10\r\nstrawberry\r\n$5\r\napple\r\n",
            RespValue::Array(vec![bulk("RPUSH"), bulk("strawberry"), bulk("apple")]),
        ),
        (
            "*3\r\n*2\r\n$4\r\npear\r\n$10\r\nstrawberry\r\n:7\r\n$-1\r\n",
            RespValue::Array(vec![
                RespValue::Array(vec![bulk("pear"), bulk("strawberry")]),
                RespValue::Integer(7),
                RespValue::Null,
            ]),
        ),
    ];

    for (input, expected) in test_cases {
        let mut buffer = BytesMut::from(input);
        assert_eq!(
            RespValue::decode(&mut buffer),
            Ok(Some(expected)),
            "decoding {:?}",
            input
        );
        assert!(buffer.is_empty(), "leftover bytes after {:?}", input);
    }
}

#[test]
fn test_bulk_string_may_contain_crlf() {
    let mut buffer = BytesMut::from(&b"$12\r\nline\r\nline\r\n\r\n"[..]);

    assert_eq!(
        RespValue::decode(&mut buffer),
        Ok(Some(bulk("line\r\nline\r\n")))
    );
    assert!(buffer.is_empty());
}

#[test]
fn test_incomplete_frames_are_not_consumed() {
    let test_cases = vec![
        "",
        "+OK",
        "+OK\r",
        ":12",
        "$5\r\nappl",
        "$5\r\napple",
        "$5\r\napple\r",
        "*2\r\n$4\r\npear\r\n",
        "*2\r\n$4\r\npear\r\n$5\r\nmel",
    ];

    for input in test_cases {
        let mut buffer = BytesMut::from(input);
        assert_eq!(
            RespValue::decode(&mut buffer),
            Ok(None),
            "decoding {:?}",
            input
        );
        assert_eq!(&buffer[..], input.as_bytes(), "buffer changed for {:?}", input);
    }
}

#[test]
fn test_decode_leaves_following_frames() {
    let mut buffer = BytesMut::from("+OK\r\n:5\r\n$3\r\nfo");

    assert_eq!(
        RespValue::decode(&mut buffer),
        Ok(Some(RespValue::SimpleString("OK".into())))
    );
    assert_eq!(RespValue::decode(&mut buffer), Ok(Some(RespValue::Integer(5))));
    assert_eq!(RespValue::decode(&mut buffer), Ok(None));
    assert_eq!(&buffer[..], b"$3\r\nfo");

    buffer.extend_from_slice(b"o\r\n");
    assert_eq!(RespValue::decode(&mut buffer), Ok(Some(bulk("foo"))));
}

#[test]
fn test_parse_drains_all_complete_frames() {
    let mut buffer = BytesMut::from("+OK\r\n:1\r\n$-1\r\n*1\r\n");

    assert_eq!(
        RespValue::parse(&mut buffer),
        Ok(vec![
            RespValue::SimpleString("OK".into()),
            RespValue::Integer(1),
            RespValue::Null,
        ])
    );
    assert_eq!(&buffer[..], b"*1\r\n");
}

#[test]
fn test_decode_errors() {
    let test_cases = vec![
        ("!oops\r\n", RespError::UnknownRespType(b'!')),
        (":twelve\r\n", RespError::FailedToParseInteger),
        ("$abc\r\nfoo\r\n", RespError::InvalidBulkString),
        ("$-2\r\n", RespError::InvalidBulkString),
        ("$3\r\nfooX\r\n", RespError::InvalidBulkString),
        ("*x\r\n", RespError::InvalidArray),
        ("*-3\r\n", RespError::InvalidArray),
    ];

    for (input, expected) in test_cases {
        let mut buffer = BytesMut::from(input);
        assert_eq!(
            RespValue::decode(&mut buffer),
            Err(expected),
            "decoding {:?}",
            input
        );
    }

    let mut buffer = BytesMut::from(&b"+\xff\xfe\r\n"[..]);
    assert_eq!(RespValue::decode(&mut buffer), Err(RespError::InvalidUtf8));
}
