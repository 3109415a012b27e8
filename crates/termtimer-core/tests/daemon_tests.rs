//! End-to-end tests: a real daemon on a temporary socket, driven through
//! the IPC client.

use std::time::Duration;

use pretty_assertions::assert_eq;
use termtimer_core::ipc::{EndpointError, SHUTDOWN_SENTINEL};
use termtimer_core::{Daemon, DaemonError, IpcClient};
use termtimer_test_utils::tracing_setup::init_test_tracing;
use termtimer_test_utils::{TestConfigBuilder, TestDaemon};

/// Poll until the daemon reports something, or give up after `timeout`.
async fn poll_until_summary(client: &IpcClient, timeout: Duration) -> String {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let reply = client.poll().await.unwrap();
        if !reply.is_empty() || tokio::time::Instant::now() >= deadline {
            return reply;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[test_log::test(tokio::test)]
async fn test_health_reports_pid() {
    let daemon = TestDaemon::start().await;
    let health = daemon.client().health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.pid, std::process::id());
    daemon.stop().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_empty_list_and_poll() {
    let daemon = TestDaemon::start().await;
    let client = daemon.client();

    assert_eq!(client.send("list").await.unwrap(), "[]");
    assert_eq!(client.poll().await.unwrap(), "");
    daemon.stop().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_add_list_remove() {
    let daemon = TestDaemon::start().await;
    let client = daemon.client();

    let reply = client.send("add 2h later").await.unwrap();
    assert!(reply.starts_with("later\nduration: 2:00:00\nfinishes at: "));
    client.send("add 1h sooner").await.unwrap();

    let records = client.list().await.unwrap();
    let descriptions: Vec<&str> = records.iter().map(|r| r.description()).collect();
    assert_eq!(descriptions, vec!["sooner", "later"]);

    let id = records[1].identity().to_string();
    let reply = client.send(&format!("describe {id} much later")).await.unwrap();
    assert_eq!(reply, "updated");
    let reply = client.send(&format!("remove {}", records[0].identity())).await.unwrap();
    assert_eq!(reply, "removed");

    let records = client.list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].description(), "much later");
    daemon.stop().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_request_errors_are_replies() {
    let daemon = TestDaemon::start().await;
    let client = daemon.client();

    assert_eq!(client.send("add soon tea").await.unwrap(), "bad time format");
    assert_eq!(client.send("frobnicate").await.unwrap(), "frobnicate: unknown command");
    assert_eq!(
        client.send("remove 01ARZ3NDEKTSV4RRFFQ69G5FAV").await.unwrap(),
        "that timer doesn't exist."
    );

    // Still serving after the errors.
    assert_eq!(client.send("list").await.unwrap(), "[]");
    daemon.stop().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_expiry_summary_delivered_once() {
    let daemon = TestDaemon::start().await;
    let client = daemon.client();

    client.send("add 1s note").await.unwrap();
    let summary = poll_until_summary(&client, Duration::from_secs(5)).await;

    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 2, "unexpected summary: {summary:?}");
    assert!(lines[0].ends_with(" : note"));
    assert_eq!(lines[1], "---- end of expired timers summary ----");

    assert_eq!(client.poll().await.unwrap(), "");
    assert!(client.list().await.unwrap().is_empty());
    daemon.stop().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_alarm_rings_until_acknowledged() {
    let builder = TestConfigBuilder::new().cadence(1, 10, 30);
    let daemon = TestDaemon::start_with(builder).await;
    let client = daemon.client();

    client.send("add 0s kettle").await.unwrap();
    assert!(daemon.chime.wait_for_rings(3, Duration::from_secs(5)).await);

    let summary = client.poll().await.unwrap();
    assert!(summary.contains(" : kettle\n"));

    // Let any ring already in flight land, then expect silence.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let settled = daemon.chime.rings();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(daemon.chime.rings(), settled);
    daemon.stop().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_bye_stops_daemon_and_removes_socket() {
    let daemon = TestDaemon::start().await;
    let client = daemon.client();
    let socket_path = daemon.socket_path.clone();

    client.send("add 1h never rings").await.unwrap();
    assert_eq!(client.send("bye").await.unwrap(), SHUTDOWN_SENTINEL);

    daemon.join().await.unwrap();
    assert!(!socket_path.exists());
}

#[test_log::test(tokio::test)]
async fn test_bye_among_concurrent_requests_still_exits() {
    let daemon = TestDaemon::start().await;

    let mut requests = Vec::new();
    for n in 0..40 {
        let client = daemon.client();
        let line = if n == 7 { "bye" } else { "list" };
        requests.push(tokio::spawn(async move { client.send(line).await }));
    }

    daemon.join().await.unwrap();

    // Every client gets an answer or an error; none is left waiting.
    let mut sentinels = 0;
    for request in requests {
        let outcome = tokio::time::timeout(Duration::from_secs(5), request)
            .await
            .expect("request left hanging after shutdown")
            .unwrap();
        if matches!(outcome.as_deref(), Ok(SHUTDOWN_SENTINEL)) {
            sentinels += 1;
        }
    }
    assert!(sentinels >= 1);
}

#[test_log::test(tokio::test)]
async fn test_fast_tick_expires_promptly() {
    let builder = TestConfigBuilder::new()
        .tick_interval_ms(10)
        .alarm_command(&["true"])
        .log_level("debug");
    let daemon = TestDaemon::start_with(builder).await;
    daemon.config().validate().unwrap();
    assert_eq!(daemon.config().alarm.command, vec!["true"]);

    let client = daemon.client();
    client.send("add 0s now").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(client.list().await.unwrap().is_empty());
    assert!(client.poll().await.unwrap().contains(" : now\n"));
    daemon.stop().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_second_daemon_is_refused() {
    let daemon = TestDaemon::start().await;

    let second = Daemon::new(daemon.config().clone()).run().await;
    assert!(matches!(
        second,
        Err(DaemonError::Endpoint(EndpointError::AlreadyRunning(_)))
    ));

    // The first daemon keeps its socket and keeps serving.
    assert!(daemon.socket_path.exists());
    assert_eq!(daemon.client().send("list").await.unwrap(), "[]");
    daemon.stop().await.unwrap();
}

#[tokio::test]
async fn test_stale_socket_is_replaced() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stale.sock");
    drop(std::os::unix::net::UnixListener::bind(&path).unwrap());

    let daemon = TestDaemon::start_with(TestConfigBuilder::new().socket_path(&path)).await;
    assert_eq!(daemon.client().poll().await.unwrap(), "");
    daemon.stop().await.unwrap();
}
