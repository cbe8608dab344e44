//! Integration tests for the Warp 10 HTTP client against a mock server.
//!
//! Checks endpoint paths, token header, query parameters and bodies of every
//! store operation, plus the lifecycle flows end to end.

use std::io::Cursor;

use httpmock::prelude::*;
use warp10_dlcm::lifecycle::MARKED_EMPTY_SELECTOR;
use warp10_dlcm::{
    delete_empty, mark_empty, run, Config, DispatchError, FulltextError, LifecycleError, Store,
    StoreError, Warp10Client,
};

const CELL: &str = "test";

/// Helper: config with a single cell pointing at the mock server.
fn config_for(server: &MockServer) -> Config {
    Config::from_toml_str(&format!(
        r#"
        [{cell}]
        find_endpoint = "{find}"
        fetch_endpoint = "{fetch}"
        update_endpoint = "{update}"
        delete_endpoint = "{delete}"
        meta_endpoint = "{meta}"
        "#,
        cell = CELL,
        find = server.url("/api/v0/find"),
        fetch = server.url("/api/v0/fetch"),
        update = server.url("/api/v0/update"),
        delete = server.url("/api/v0/delete"),
        meta = server.url("/api/v0/meta"),
    ))
    .expect("Failed to build test config")
}

// ===========================================================================
// Store operations
// ===========================================================================

#[test]
fn test_find_request_and_dedup() {
    let server = MockServer::start();
    let find = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v0/find")
            .header("x-warp10-token", "READ")
            .query_param("selector", "~app.*{}")
            .query_param("sortmeta", "true")
            .query_param("showattr", "true")
            .query_param("format", "fulltext");
        then.status(200)
            .body("app.cpu{host=a}{}\napp.mem{host=a}{owner=ops}\napp.cpu{host=a}{}\n");
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let series = client.find(CELL, "~app.*{}", "READ").unwrap();

    find.assert();
    assert_eq!(series.len(), 2);
    assert!(series.contains("app.cpu{host=a}{}"));
    assert!(series.contains("app.mem{host=a}{owner=ops}"));
}

#[test]
fn test_fetch_request_and_series_field() {
    let server = MockServer::start();
    let fetch = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v0/fetch")
            .header("x-warp10-token", "READ")
            .query_param("selector", "app.cpu{}")
            .query_param("now", "9223372036854775807")
            .query_param("timespan", "-1")
            .query_param("sortmeta", "true")
            .query_param("showattr", "true")
            .query_param("format", "fulltext");
        then.status(200).body(
            "1700000000000000// app.cpu{host=a}{} 12\n1700000001000000// app.cpu{host=a}{} 13\n",
        );
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let series = client.fetch(CELL, "app.cpu{}", "READ").unwrap();

    fetch.assert();
    assert_eq!(series.len(), 1);
    assert!(series.contains("app.cpu{host=a}{}"));
}

#[test]
fn test_fetch_malformed_line() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v0/fetch");
        then.status(200).body("onlyonefield\n");
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let err = client.fetch(CELL, "x{}", "READ").unwrap_err();

    assert!(matches!(
        err,
        StoreError::Response {
            source: FulltextError::MissingSeriesField { line: 1, .. },
            ..
        }
    ));
}

#[test]
fn test_delete_older_sends_numeric_end() {
    let server = MockServer::start();
    let delete = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v0/delete")
            .header("x-warp10-token", "WRITE")
            .query_param("selector", "old.*{}")
            .query_param("end", "1700000000000000")
            .query_param("start", "-9223372036854775808");
        then.status(200).body("4 datapoints deleted");
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let text = client
        .delete_older(CELL, "old.*{}", "WRITE", 1_700_000_000_000_000)
        .unwrap();

    delete.assert();
    assert_eq!(text, "4 datapoints deleted");
}

#[test]
fn test_delete_all_request() {
    let server = MockServer::start();
    let delete = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v0/delete")
            .header("x-warp10-token", "WRITE")
            .query_param("selector", "gone{}")
            .query_param("deleteall", "true");
        then.status(200).body("gone{}{}\n");
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let text = client.delete_all(CELL, "gone{}", "WRITE").unwrap();

    delete.assert();
    assert_eq!(text, "gone{}{}\n");
}

#[test]
fn test_non_success_status_is_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v0/delete");
        then.status(403).body("Invalid write token");
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let err = client.delete_all(CELL, "x{}", "BAD").unwrap_err();

    match err {
        StoreError::Status { status, body, .. } => {
            assert_eq!(status, 403);
            assert_eq!(body, "Invalid write token");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_unknown_cell_sends_nothing() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.method(GET).path("/api/v0/find");
        then.status(200);
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let err = client.find("nowhere", "x{}", "READ").unwrap_err();

    assert!(matches!(err, StoreError::UnknownCell(ref name) if name == "nowhere"));
    any.assert_hits(0);
}

#[test]
fn test_connection_refused_is_transport_error() {
    let config = Config::from_toml_str(
        r#"
        [dead]
        find_endpoint = "http://127.0.0.1:1/api/v0/find"
        "#,
    )
    .unwrap();
    let client = Warp10Client::new(&config, None).unwrap();
    let err = client.find("dead", "x{}", "READ").unwrap_err();
    assert!(matches!(err, StoreError::Transport { .. }));
}

// ===========================================================================
// Lifecycle flows
// ===========================================================================

#[test]
fn test_mark_empty_posts_meta() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v0/find");
        then.status(200).body("a{x=1}\nb{x=2}\n");
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/v0/fetch");
        then.status(200).body("1// a{x=1} 42\n");
    });
    let meta = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v0/meta")
            .header("x-warp10-token", "WRITE")
            .body("b{wdlcm=empty}");
        then.status(200);
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let marked = mark_empty(&client, CELL, "~.*{}", "READ", "WRITE").unwrap();

    assert_eq!(marked, 1);
    meta.assert();
}

#[test]
fn test_delete_empty_refuses_populated_series() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v0/fetch")
            .query_param("selector", MARKED_EMPTY_SELECTOR);
        then.status(200).body("1// late{}{wdlcm=empty} 1\n");
    });
    let delete = server.mock(|when, then| {
        when.method(GET).path("/api/v0/delete");
        then.status(200);
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let err = delete_empty(&client, CELL, "READ", "WRITE").unwrap_err();

    match err {
        LifecycleError::StillPopulated { series } => {
            assert_eq!(series, vec!["late{}{wdlcm=empty}".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    delete.assert_hits(0);
}

#[test]
fn test_delete_empty_deletes_marked_selector() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v0/fetch")
            .query_param("selector", MARKED_EMPTY_SELECTOR);
        then.status(200).body("");
    });
    let delete = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v0/delete")
            .header("x-warp10-token", "WRITE")
            .query_param("selector", MARKED_EMPTY_SELECTOR)
            .query_param("deleteall", "true");
        then.status(200).body("2 series deleted");
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let text = delete_empty(&client, CELL, "READ", "WRITE").unwrap();

    delete.assert();
    assert_eq!(text, "2 series deleted");
}

// ===========================================================================
// Dispatcher over HTTP
// ===========================================================================

#[test]
fn test_dispatch_halts_after_failed_delete_all() {
    let server = MockServer::start();
    let delete = server.mock(|when, then| {
        when.method(GET).path("/api/v0/delete");
        then.status(500).body("boom");
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let input = format!("delete_all {CELL} sel* tok123\ndelete_all {CELL} other tok123\n");
    let mut out = Vec::new();
    let result = run(&client, Cursor::new(input), &mut out);

    assert!(matches!(
        result,
        Err(DispatchError::Halted {
            command: "delete_all",
            ..
        })
    ));
    delete.assert_hits(1);
    assert!(String::from_utf8(out).unwrap().contains("boom"));
}

#[test]
fn test_dispatch_invalid_command_then_find() {
    let server = MockServer::start();
    let find = server.mock(|when, then| {
        when.method(GET).path("/api/v0/find");
        then.status(200).body("a{}{}\n");
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let input = format!("bogus_cmd x y z\nfind {CELL} a{{}} READ\n");
    let mut out = Vec::new();
    let summary = run(&client, Cursor::new(input), &mut out).unwrap();

    find.assert();
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.executed, 1);
    let output = String::from_utf8(out).unwrap();
    assert!(output.contains("invalid command: bogus_cmd"));
    assert!(output.contains("a{}{}"));
}

#[test]
fn test_dispatch_malformed_delete_all_sends_nothing() {
    let server = MockServer::start();
    let delete = server.mock(|when, then| {
        when.method(GET).path("/api/v0/delete");
        then.status(200);
    });

    let config = config_for(&server);
    let client = Warp10Client::new(&config, None).unwrap();
    let input = format!("delete_all {CELL} sel*\ndelete_all {CELL} other tok123\n");
    let mut out = Vec::new();
    let result = run(&client, Cursor::new(input), &mut out);

    assert!(matches!(result, Err(DispatchError::Malformed { ref command, .. }) if command == "delete_all"));
    delete.assert_hits(0);
}
