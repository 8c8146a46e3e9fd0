//! Tests for the command interpreter
//!
//! These tests verify:
//! - Verb dispatch and replies
//! - Unknown verbs and arity errors leave the store untouched
//! - `del` counts only keys that existed

use verokv::interpreter::{execute, validate};
use verokv::protocol::{decode_command, Reply};
use verokv::{Store, Value, VeroError};

// =============================================================================
// Helper Functions
// =============================================================================

fn run(store: &Store, line: &str) -> Reply {
    execute(store, &decode_command(line.as_bytes())).unwrap()
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_set_get_del_scenario() {
    let store = Store::new();

    assert_eq!(run(&store, "set x hello"), Reply::Integer(1));
    assert_eq!(run(&store, "get x"), Reply::bulk("hello"));
    assert_eq!(run(&store, "del x"), Reply::Integer(1));
    assert_eq!(run(&store, "get x"), Reply::Nil);
}

#[test]
fn test_del_twice() {
    let store = Store::new();
    run(&store, "set k v");

    assert_eq!(run(&store, "del k"), Reply::Integer(1));
    assert_eq!(run(&store, "del k"), Reply::Integer(0));
}

#[test]
fn test_del_multiple_keys() {
    let store = Store::new();
    run(&store, "set a 1");
    run(&store, "set b 2");

    assert_eq!(run(&store, "del a b c"), Reply::Integer(2));
    assert!(store.is_empty());
}

#[test]
fn test_set_overwrites() {
    let store = Store::new();
    run(&store, "set k one");
    run(&store, "set k two");

    assert_eq!(run(&store, "get k"), Reply::bulk("two"));
    assert_eq!(store.get(b"k"), Some(Value::from("two")));
}

#[test]
fn test_ping_and_quit() {
    let store = Store::new();
    assert_eq!(run(&store, "ping"), Reply::bulk("PONG"));
    assert_eq!(run(&store, "QUIT"), Reply::ok());
}

#[test]
fn test_verbs_ignore_case() {
    let store = Store::new();
    assert_eq!(run(&store, "SET k v"), Reply::Integer(1));
    assert_eq!(run(&store, "Get k"), Reply::bulk("v"));
}

// =============================================================================
// Error Reply Tests
// =============================================================================

#[test]
fn test_unknown_verb() {
    let store = Store::new();
    let reply = run(&store, "incr counter");

    assert_eq!(reply, Reply::error("unknown command"));
    assert!(store.is_empty());
}

#[test]
fn test_empty_line_is_unknown() {
    let store = Store::new();
    assert_eq!(run(&store, ""), Reply::error("unknown command"));
}

#[test]
fn test_wrong_arity_is_rejected_without_effect() {
    let store = Store::new();

    for line in ["set k", "set k v extra", "get", "get a b", "del", "ping x"] {
        let reply = run(&store, line);
        assert_eq!(reply, Reply::error("wrong number of arguments"), "{}", line);
    }
    assert!(store.is_empty());
}

#[test]
fn test_validate_reports_kind() {
    assert!(validate(&decode_command(b"set k v")).is_ok());
    assert!(validate(&decode_command(b"del a b c")).is_ok());
    assert!(matches!(
        validate(&decode_command(b"set k")),
        Err(VeroError::Arity)
    ));
    assert!(matches!(
        validate(&decode_command(b"nope")),
        Err(VeroError::UnknownCommand)
    ));
}
