mod common;

use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use common::*;
use skv_client::{ClientError, ErrorKind, Expiry, StoreClient, Ttl};

#[test]
fn initialize_runs_liveness_check() {
    let addr = spawn_script(vec![(vec!["INFO"], bulk("role:master"))]);
    StoreClient::initialize(test_config(addr)).expect("initialize");
}

#[test]
fn initialize_reports_fatal_init_on_error_reply() {
    let addr = spawn_script(vec![(vec!["INFO"], error("ERR loading dataset"))]);
    let err = StoreClient::initialize(test_config(addr)).err().expect("must fail");
    assert_eq!(err.kind(), ErrorKind::FatalInit);
}

#[test]
fn initialize_reports_fatal_init_when_unreachable() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").to_string()
    };
    let err = StoreClient::initialize(test_config(addr)).err().expect("must fail");
    match err {
        ClientError::FatalInit { source } => assert_eq!(source.kind(), ErrorKind::Unavailable),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn new_connections_authenticate_and_select_database() {
    let addr = spawn_script(vec![
        (vec!["AUTH", "redispw"], simple("OK")),
        (vec!["SELECT", "2"], simple("OK")),
        (vec!["INFO"], bulk("role:master")),
    ]);
    let mut config = test_config(addr);
    config.password = "redispw".to_string();
    config.database = 2;
    StoreClient::initialize(config).expect("initialize");
}

#[test]
fn rejected_auth_surfaces_server_error() {
    let addr = spawn_script(vec![(vec!["AUTH", "nope"], error("WRONGPASS invalid password"))]);
    let mut config = test_config(addr);
    config.password = "nope".to_string();
    let client = StoreClient::with_config(config);
    let err = client.ping(None).unwrap_err();
    assert_eq!(err.server_code(), Some(&b"WRONGPASS"[..]));
    assert_eq!(client.pool().total_connections(), 0);
}

#[test]
fn set_without_expiry_sends_no_ttl_option() {
    let addr = spawn_script(vec![
        (vec!["SET", "key", "value"], simple("OK")),
        (vec!["SET", "key", "value"], simple("OK")),
        (vec!["GET", "key"], bulk("value")),
    ]);
    let client = client_with_addr(addr);
    client.set("key", "value", Expiry::Never).expect("set");
    client.set("key", "value", Expiry::from_secs(-1)).expect("set negative");
    assert_eq!(client.get("key").expect("get"), "value");
}

#[test]
fn set_with_ttl_uses_seconds_or_milliseconds() {
    let addr = spawn_script(vec![
        (vec!["SET", "a", "1", "EX", "30"], simple("OK")),
        (vec!["SET", "b", "2", "PX", "250"], simple("OK")),
    ]);
    let client = client_with_addr(addr);
    client.set("a", "1", Expiry::from_secs(30)).expect("set ex");
    client
        .set("b", "2", Expiry::after(Duration::from_millis(250)))
        .expect("set px");
}

#[test]
fn value_expires_after_ttl() {
    let client = client_with_addr(spawn_string_store());
    client
        .set("session", "abc", Expiry::after(Duration::from_millis(150)))
        .expect("set");
    assert_eq!(client.get("session").expect("live value"), "abc");

    thread::sleep(Duration::from_millis(250));
    assert!(matches!(client.get("session"), Err(ClientError::NotFound)));
}

#[test]
fn missing_key_is_not_found_for_every_getter() {
    let addr = spawn_script(vec![
        (vec!["GET", "gone"], null_bulk()),
        (vec!["GET", "gone"], null_bulk()),
        (vec!["GET", "gone"], null_bulk()),
    ]);
    let client = client_with_addr(addr);
    assert!(client.get("gone").unwrap_err().is_not_found());
    assert!(client.get_bytes("gone").unwrap_err().is_not_found());
    assert!(client.get_int64("gone").unwrap_err().is_not_found());
}

#[test]
fn get_int64_parses_and_rejects_text() {
    let addr = spawn_script(vec![
        (vec!["GET", "n"], bulk("-42")),
        (vec!["GET", "s"], bulk("hello")),
    ]);
    let client = client_with_addr(addr);
    assert_eq!(client.get_int64("n").expect("int"), -42);
    assert_eq!(client.get_int64("s").unwrap_err().kind(), ErrorKind::TypeMismatch);
}

#[test]
fn set_int64_writes_decimal_text() {
    let addr = spawn_script(vec![(vec!["SET", "n", "-7", "EX", "5"], simple("OK"))]);
    let client = client_with_addr(addr);
    client.set_int64("n", -7, Expiry::from_secs(5)).expect("set");
}

#[test]
fn multi_get_marks_absent_keys() {
    let addr = spawn_script(vec![(
        vec!["MGET", "a", "b", "c"],
        array(vec![bulk("1"), null_bulk(), bulk("3")]),
    )]);
    let client = client_with_addr(addr);
    let values = client.multi_get(&["a", "b", "c"]).expect("mget");
    assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
}

#[test]
fn set_if_absent_succeeds_once_and_keeps_first_value() {
    let client = client_with_addr(spawn_string_store());
    assert!(client
        .set_if_absent("k", "v1", Expiry::from_secs(10))
        .expect("first"));
    assert!(!client
        .set_if_absent("k", "v2", Expiry::from_secs(10))
        .expect("second"));
    assert_eq!(client.get("k").expect("get"), "v1");
}

#[test]
fn set_keep_ttl_and_set_with_expiry_commands() {
    let addr = spawn_script(vec![
        (vec!["SET", "k", "v", "KEEPTTL"], simple("OK")),
        (vec!["SETEX", "k", "3", "v"], simple("OK")),
        (vec!["PSETEX", "k", "1500", "v"], simple("OK")),
    ]);
    let client = client_with_addr(addr);
    client.set_keep_ttl("k", "v").expect("keepttl");
    client
        .set_with_expiry("k", "v", Duration::from_secs(3))
        .expect("setex");
    client
        .set_with_expiry("k", "v", Duration::from_millis(1_500))
        .expect("psetex");
}

#[test]
fn set_with_expiry_rejects_zero_without_round_trip() {
    let client = client_with_addr(spawn_script(vec![]));
    let err = client.set_with_expiry("k", "v", Duration::ZERO).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(client.pool().total_connections(), 0);
}

#[test]
fn increment_returns_new_value_and_flags_text() {
    let addr = spawn_script(vec![
        (vec!["INCR", "counter"], integer(1)),
        (vec!["INCR", "counter"], integer(2)),
        (
            vec!["INCR", "name"],
            error("ERR value is not an integer or out of range"),
        ),
    ]);
    let client = client_with_addr(addr);
    assert_eq!(client.increment("counter").expect("incr"), 1);
    assert_eq!(client.increment("counter").expect("incr"), 2);
    assert_eq!(client.increment("name").unwrap_err().kind(), ErrorKind::TypeMismatch);
}

#[test]
fn client_ttl_and_delete() {
    let addr = spawn_script(vec![
        (vec!["TTL", "key"], integer(5)),
        (vec!["TTL", "plain"], integer(-1)),
        (vec!["TTL", "gone"], integer(-2)),
        (vec!["DEL", "key"], integer(1)),
        (vec!["DEL", "key"], integer(0)),
    ]);
    let client = client_with_addr(addr);
    assert_eq!(client.ttl("key").expect("ttl"), Ttl::ExpiresIn(Duration::from_secs(5)));
    assert_eq!(client.ttl("plain").expect("ttl"), Ttl::NoExpiry);
    assert_eq!(client.ttl("gone").expect("ttl"), Ttl::Missing);
    assert!(client.delete("key").expect("delete"));
    assert!(!client.delete("key").expect("delete again"));
}

#[test]
fn expire_and_exists() {
    let addr = spawn_script(vec![
        (vec!["EXPIRE", "key", "60"], integer(1)),
        (vec!["PEXPIRE", "gone", "500"], integer(0)),
        (vec!["EXISTS", "key"], integer(1)),
        (vec!["EXISTS", "gone"], integer(0)),
    ]);
    let client = client_with_addr(addr);
    assert!(client.expire("key", Duration::from_secs(60)).expect("expire"));
    assert!(!client.expire("gone", Duration::from_millis(500)).expect("pexpire"));
    assert!(client.exists("key").expect("exists"));
    assert!(!client.exists("gone").expect("exists"));
}

#[test]
fn wrongtype_reply_is_type_mismatch() {
    let addr = spawn_script(vec![(
        vec!["GET", "myhash"],
        error("WRONGTYPE Operation against a key holding the wrong kind of value"),
    )]);
    let client = client_with_addr(addr);
    assert_eq!(client.get("myhash").unwrap_err().kind(), ErrorKind::TypeMismatch);
}

#[test]
fn error_reply_keeps_connection_pooled() {
    let addr = spawn_script(vec![
        (vec!["GET", "h"], error("WRONGTYPE Operation against a key holding the wrong kind of value")),
        (vec!["PING"], simple("PONG")),
    ]);
    let client = client_with_addr(addr);
    assert!(client.get("h").is_err());
    assert_eq!(client.ping(None).expect("ping"), b"PONG".to_vec());
    assert_eq!(client.pool().total_connections(), 1);
}
