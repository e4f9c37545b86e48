//! Shared utilities for integration testing.

use std::time::Duration;

use flowgate::config::IngressConfig;
use flowgate::pipeline::CompletionRequest;
use flowgate::{HttpIngress, Shutdown, WorkUnit};
use tokio::sync::mpsc;

/// A config bound to an ephemeral localhost port with metrics disabled.
pub fn test_config() -> IngressConfig {
    let mut config = IngressConfig::default();
    config.listener.host = Some("127.0.0.1".to_string());
    config.listener.port = 0;
    config.observability.metrics_enabled = false;
    config
}

/// A running ingress plus the handles the tests drive it with.
pub struct TestIngress {
    pub ingress: HttpIngress,
    pub addr: std::net::SocketAddr,
    pub shutdown: Shutdown,
}

pub async fn start_ingress(config: IngressConfig) -> TestIngress {
    let shutdown = Shutdown::new();
    let ingress = HttpIngress::new(config).unwrap();
    let addr = ingress.start(&shutdown).await.unwrap();
    TestIngress {
        ingress,
        addr,
        shutdown,
    }
}

impl TestIngress {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Drive the ingest stage on a tick, forwarding emitted work units.
    ///
    /// Stands in for the downstream pipeline: the test takes work units
    /// from the receiver and issues completions itself.
    pub fn spawn_ingest_driver(&self) -> mpsc::UnboundedReceiver<WorkUnit> {
        let (tx, rx) = mpsc::unbounded_channel();
        let ingest = self.ingress.ingest_stage();
        let mut shutdown_rx = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_millis(10));
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        match ingest.run_once().await {
                            Ok(Some(unit)) => {
                                if tx.send(unit).is_err() {
                                    break;
                                }
                            }
                            // Body-read failures drop the exchange; keep draining.
                            Ok(None) | Err(_) => {}
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
        rx
    }

    /// Complete `unit` with the given status and body.
    pub fn complete(
        &self,
        unit: &WorkUnit,
        status: u16,
        body: &[u8],
    ) -> Result<(), flowgate::pipeline::CompletionError> {
        self.ingress.completion_stage().run_once(CompletionRequest {
            context_id: unit.context_id().expect("work unit missing context id"),
            status,
            headers: Vec::new(),
            body: Some(bytes::Bytes::copy_from_slice(body)),
        })
    }
}

/// Poll `condition` until it holds or two seconds elapse.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}
