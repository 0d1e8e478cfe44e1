// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

/// Bind then drop a listener so the port is known to refuse connections.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn keys() -> Arc<KeyPair> {
    Arc::new(KeyPair::generate().unwrap())
}

async fn ready_error(port: u16, timeout: Duration, cancel: &CancellationToken) -> TransportError {
    wait_ready("127.0.0.1", port, keys(), timeout, cancel)
        .await
        .unwrap_err()
}

#[tokio::test]
async fn connect_to_closed_port_is_io_error() {
    let result = connect("127.0.0.1", closed_port(), keys()).await;
    assert!(matches!(result, Err(TransportError::Io(_))));
}

#[tokio::test]
async fn wait_ready_times_out_with_not_ready() {
    let port = closed_port();
    let cancel = CancellationToken::new();
    let err = ready_error(port, Duration::from_millis(200), &cancel).await;
    match err {
        TransportError::NotReady { addr, .. } => assert_eq!(addr, format!("127.0.0.1:{}", port)),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn wait_ready_observes_cancellation() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = ready_error(closed_port(), Duration::from_secs(30), &cancel).await;
    assert!(matches!(err, TransportError::Cancelled));
}

#[tokio::test]
async fn wait_ready_cancelled_mid_wait() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });
    let start = Instant::now();
    let err = ready_error(closed_port(), Duration::from_secs(30), &cancel).await;
    assert!(matches!(err, TransportError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn connect_to_non_ssh_listener_fails() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    std::thread::spawn(move || {
        use std::io::Write;
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n");
        }
    });
    let result = connect("127.0.0.1", port, keys()).await;
    assert!(result.is_err());
}

#[test]
fn exec_lifts_io_timeout_for_long_commands() {
    let session = Session::new().unwrap();
    session.set_timeout(IO_TIMEOUT_MS);

    {
        let _untimed = TimeoutGuard::lift(&session);
        // A silent `chown -R` may run for minutes; nothing may cut it short
        assert_eq!(session.timeout(), 0);
    }

    assert_eq!(session.timeout(), IO_TIMEOUT_MS);
}

#[test]
fn timeout_is_restored_when_exec_fails() {
    let session = Session::new().unwrap();
    session.set_timeout(1_500);

    let result: Result<(), TransportError> = (|| {
        let _untimed = TimeoutGuard::lift(&session);
        Err(TransportError::Cancelled)
    })();

    assert!(result.is_err());
    assert_eq!(session.timeout(), 1_500);
}
