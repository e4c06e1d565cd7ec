mod common;

use std::thread;
use std::time::Duration;

use common::*;
use skv_client::ErrorKind;

#[test]
fn lock_is_a_conditional_write_with_ttl() {
    let addr = spawn_script(vec![
        (vec!["SET", "lock:job1", "tok-A", "NX", "EX", "2"], simple("OK")),
        (vec!["SET", "lock:job1", "tok-B", "NX", "EX", "2"], null_bulk()),
    ]);
    let client = client_with_addr(addr);
    assert!(client.try_lock("lock:job1", "tok-A", Duration::from_secs(2)).expect("first"));
    assert!(!client.try_lock("lock:job1", "tok-B", Duration::from_secs(2)).expect("second"));
}

#[test]
fn lock_is_released_only_by_expiry() {
    let client = client_with_addr(spawn_string_store());
    let ttl = Duration::from_millis(300);

    assert!(client.try_lock("lock:job1", "tok-A", ttl).expect("acquire"));
    assert!(!client.try_lock("lock:job1", "tok-B", ttl).expect("contended"));
    assert_eq!(client.get("lock:job1").expect("holder"), "tok-A");

    thread::sleep(ttl + Duration::from_millis(100));
    assert!(client.try_lock("lock:job1", "tok-C", ttl).expect("after expiry"));
    assert_eq!(client.get("lock:job1").expect("holder"), "tok-C");
}

#[test]
fn lock_requires_positive_ttl() {
    let client = client_with_addr(spawn_script(vec![]));
    let err = client.try_lock("lock:job1", "tok", Duration::ZERO).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn timestamp_lock_stores_unix_millis() {
    let client = client_with_addr(spawn_string_store());
    assert!(client.lock_timestamp("lock:ts", Duration::from_secs(5)).expect("acquire"));
    let stored = client.get_int64("lock:ts").expect("token");
    assert!(stored > 1_600_000_000_000);
}
