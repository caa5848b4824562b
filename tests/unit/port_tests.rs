//! Unit tests for port override parsing and loopback negotiation.

use std::net::TcpListener;

use dev_full::port::{backend_url, negotiate_port, parse_port_override};
use dev_full::AppError;

#[test]
fn accepts_valid_ports() {
    assert_eq!(parse_port_override("9999").expect("valid"), 9999);
    assert_eq!(parse_port_override("1").expect("valid"), 1);
    assert_eq!(parse_port_override("65535").expect("valid"), 65535);
    assert_eq!(parse_port_override(" 8080 ").expect("trimmed"), 8080);
}

#[test]
fn rejects_non_numeric_and_non_positive_ports() {
    for raw in ["abc", "", "80a", "0", "-1", "65536", "1.5"] {
        let err = parse_port_override(raw).unwrap_err();
        assert!(matches!(err, AppError::Port(_)), "{raw:?} gave {err:?}");
        assert_eq!(err.exit_code(), 2, "{raw:?} must map to exit code 2");
    }
}

#[test]
fn backend_url_uses_loopback() {
    assert_eq!(backend_url(9999), "http://127.0.0.1:9999");
}

#[tokio::test]
async fn free_preferred_port_is_returned_as_is() {
    let probe = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral");
    let free = probe.local_addr().expect("addr").port();
    drop(probe);

    let port = negotiate_port(free).await.expect("negotiate");
    assert_eq!(port, free);
}

#[tokio::test]
async fn busy_preferred_port_falls_back_to_unused_port() {
    let holder = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral");
    let busy = holder.local_addr().expect("addr").port();

    let port = negotiate_port(busy).await.expect("negotiate");

    assert_ne!(port, busy, "must not hand out an externally bound port");
    assert!(port > 0);
    let rebound = TcpListener::bind(("127.0.0.1", port));
    assert!(rebound.is_ok(), "negotiated port {port} should be free");
    drop(holder);
}

#[tokio::test]
async fn negotiated_port_is_released() {
    let port = negotiate_port(0).await.expect("negotiate");
    assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
}
