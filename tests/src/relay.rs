//! Cuttable TCP relay for exercising reconnect behavior.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A TCP proxy in front of the test server whose link can be severed
/// and restored mid-session, simulating a network drop the client has
/// to recover from on its own.
pub struct TcpRelay {
    pub addr: SocketAddr,
    forwarding: Arc<AtomicBool>,
    links: Arc<Mutex<Vec<JoinHandle<()>>>>,
    accept_task: JoinHandle<()>,
}

impl TcpRelay {
    /// Start relaying to `upstream` on an ephemeral port.
    pub async fn start(upstream: SocketAddr) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind relay listener");
        let addr = listener.local_addr().expect("Failed to read relay addr");
        let forwarding = Arc::new(AtomicBool::new(true));
        let links: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::new(Mutex::new(Vec::new()));

        let accept_task = tokio::spawn({
            let forwarding = forwarding.clone();
            let links = links.clone();
            async move {
                loop {
                    let Ok((inbound, _)) = listener.accept().await else {
                        return;
                    };
                    if !forwarding.load(Ordering::SeqCst) {
                        // severed: refuse by closing immediately
                        drop(inbound);
                        continue;
                    }
                    let link = tokio::spawn(async move {
                        let mut inbound = inbound;
                        let Ok(mut outbound) = TcpStream::connect(upstream).await else {
                            return;
                        };
                        let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await;
                    });
                    links.lock().push(link);
                }
            }
        });

        Self {
            addr,
            forwarding,
            links,
            accept_task,
        }
    }

    /// The relay's WebSocket base URL.
    pub fn ws_base(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Sever the link: kill live connections and refuse new ones.
    pub fn cut(&self) {
        self.forwarding.store(false, Ordering::SeqCst);
        for link in self.links.lock().drain(..) {
            link.abort();
        }
    }

    /// Restore the link for new connections.
    pub fn restore(&self) {
        self.forwarding.store(true, Ordering::SeqCst);
    }
}

impl Drop for TcpRelay {
    fn drop(&mut self) {
        self.accept_task.abort();
        for link in self.links.lock().drain(..) {
            link.abort();
        }
    }
}
