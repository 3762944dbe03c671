//! End-to-end tests for the `zap-server` binary.
//!
//! These spawn the real executable and check argument validation and that
//! a started server answers commands.

use std::process::{Command, Stdio};
use std::time::Duration;

use zap_server::client::Client;

const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn zap_server() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_zap-server"));
    cmd.env_remove("ZAP_AUTH_KEY")
        .env_remove("ZAP_CONFIG")
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    cmd
}

#[test]
fn test_no_arguments_is_fatal() {
    let output = zap_server().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr: {}", stderr);
}

#[test]
fn test_host_without_port_is_fatal() {
    let output = zap_server().arg("127.0.0.1").output().unwrap();
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_unparsable_config_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("zap.toml");
    std::fs::write(&path, "idle_timeout_secs = \"never\"\n").unwrap();

    let output = zap_server()
        .args(["--mock", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(!output.status.success());
}

/// Pick a loopback port that is free right now.
fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Connect with `key`, retrying while the server is still starting.
async fn connect_when_ready(addr: &str, key: &str) -> std::io::Result<Client> {
    let deadline = tokio::time::Instant::now() + STARTUP_TIMEOUT;
    loop {
        match Client::connect(addr, key).await {
            Err(e)
                if e.kind() == std::io::ErrorKind::ConnectionRefused
                    && tokio::time::Instant::now() < deadline =>
            {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            other => return other,
        }
    }
}

#[tokio::test]
async fn test_mock_server_answers_commands() {
    let port = free_port();
    let mut child = zap_server()
        .args(["--mock", "--auth-key", "k3y", "127.0.0.1", &port.to_string()])
        .spawn()
        .expect("failed to spawn zap-server");

    let addr = format!("127.0.0.1:{}", port);
    let client = connect_when_ready(&addr, "k3y").await;
    let wrong = Client::connect(addr.as_str(), "guess").await;
    let (reply, qr) = match client {
        Ok(mut client) => (
            client.send_command("cli||CheckPoint").await,
            client.send_command("cli||GetQrCode").await,
        ),
        Err(e) => {
            child.kill().ok();
            panic!("zap-server did not become ready: {}", e);
        }
    };
    child.kill().ok();
    child.wait().ok();

    assert_eq!(reply.unwrap(), "true");
    assert!(qr.unwrap().contains("\"file_name\""));
    let err = wrong.err().expect("wrong key must be rejected");
    assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn test_loopback_server_without_key_generates_one() {
    use std::io::BufRead;

    let port = free_port();
    let mut child = zap_server()
        .args(["--mock", "127.0.0.1", &port.to_string()])
        .spawn()
        .expect("failed to spawn zap-server");

    let stderr = child.stderr.take().expect("stderr is piped");
    let key = tokio::task::spawn_blocking(move || {
        std::io::BufReader::new(stderr)
            .lines()
            .map_while(Result::ok)
            .find_map(|line| line.strip_prefix("zap-server: auth key: ").map(str::to_string))
    })
    .await
    .unwrap();
    let Some(key) = key else {
        child.kill().ok();
        panic!("zap-server did not print a generated key");
    };

    let addr = format!("127.0.0.1:{}", port);
    let keyed = connect_when_ready(&addr, &key).await;
    let guessed = Client::connect(addr.as_str(), "").await;
    child.kill().ok();
    child.wait().ok();

    assert_eq!(key.len(), 32);
    assert!(keyed.is_ok());
    let err = guessed.err().expect("a loopback client without the key must be rejected");
    assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
}
