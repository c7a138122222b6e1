//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// A dependency whose calls fail or succeed according to a script.
///
/// Calls past the end of the script repeat its last outcome.
#[derive(Clone)]
pub struct ScriptedDependency {
    script: Arc<Vec<bool>>,
    calls: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl ScriptedDependency {
    pub fn new(script: &[bool]) -> Self {
        Self {
            script: Arc::new(script.to_vec()),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn always(ok: bool) -> Self {
        Self::new(&[ok])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn call(&self) -> Result<u32, String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let ok = self
            .script
            .get(n as usize)
            .or(self.script.last())
            .copied()
            .unwrap_or(true);
        if ok {
            Ok(n)
        } else {
            Err(format!("call {n} failed"))
        }
    }
}

/// Reserve a local port with nothing listening on it.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start accepting (and immediately dropping) connections on `addr` after `delay`,
/// like a database that is still booting.
#[allow(dead_code)]
pub fn start_mock_database_after(addr: SocketAddr, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let listener = TcpListener::bind(addr).await.unwrap();
        loop {
            match listener.accept().await {
                Ok((socket, _)) => drop(socket),
                Err(_) => break,
            }
        }
    });
}
