#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use zap_server::adapter::mock::MockAdapterFactory;
use zap_server::adapter::AdapterOptions;
use zap_server::server::{self, ServerConfig};
use zap_server::session::SessionManager;

/// Shared secret every test server is started with.
pub const TEST_KEY: &str = "test-key";

/// A server running in-process on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub manager: Arc<SessionManager>,
    pub factory: MockAdapterFactory,
    pub cancel: CancellationToken,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    /// Cancel the server and wait for it to finish draining.
    pub async fn stop(self) {
        self.cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .unwrap()
            .unwrap();
    }
}

/// Start a server backed by a fresh mock adapter family.
pub async fn start_test_server() -> TestServer {
    start_test_server_with(MockAdapterFactory::new(), ServerConfig::new(TEST_KEY)).await
}

pub async fn start_test_server_with(factory: MockAdapterFactory, config: ServerConfig) -> TestServer {
    let manager = Arc::new(SessionManager::new(
        Arc::new(factory.clone()),
        AdapterOptions::default(),
    ));
    let listener = server::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(server::serve(
        listener,
        manager.clone(),
        config,
        cancel.clone(),
    ));
    TestServer {
        addr,
        manager,
        factory,
        cancel,
        handle,
    }
}
