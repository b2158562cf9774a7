// Connectivity status handling
// The monitor only reacts to platform notifications; the probe below is the
// platform side for terminals, which have no browser online/offline events.

use log::{debug, info};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::models::{ConnectivityState, StatusLine, StatusTone};

#[derive(Debug, Default)]
pub struct ConnectivityMonitor {
    state: Option<ConnectivityState>,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one platform notification. The state is recomputed from the
    /// boolean each time; nothing else is stored.
    pub fn on_signal(&mut self, online: bool, status: &mut StatusLine) -> ConnectivityState {
        let state = ConnectivityState::from(online);
        if self.state != Some(state) {
            info!("Connectivity changed to {}", state);
        }
        self.state = Some(state);

        status.label = state.label().to_string();
        status.tone = match state {
            ConnectivityState::Online => StatusTone::Success,
            ConnectivityState::Offline => StatusTone::Error,
        };
        state
    }

    pub fn state(&self) -> Option<ConnectivityState> {
        self.state
    }
}

/// Where the probe checks reachability
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
}

impl ProbeTarget {
    pub fn from_url(url: &url::Url) -> Option<Self> {
        let host = url.host_str()?.to_string();
        let port = url.port_or_known_default()?;
        Some(ProbeTarget { host, port })
    }
}

pub async fn is_reachable(target: &ProbeTarget, timeout: Duration) -> bool {
    let addr = format!("{}:{}", target.host, target.port);
    match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!("Probe to {} failed: {}", addr, e);
            false
        }
        Err(_) => {
            debug!("Probe to {} timed out", addr);
            false
        }
    }
}

/// Spawn the platform signal source. Sends the initial reachability once and
/// afterwards only on transitions. Stops when the receiver is dropped.
pub fn spawn_probe(target: ProbeTarget, interval: Duration) -> mpsc::Receiver<bool> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        let mut last = None;
        loop {
            let online = is_reachable(&target, interval).await;
            if last != Some(online) {
                last = Some(online);
                if tx.send(online).await.is_err() {
                    debug!("Connectivity receiver dropped, stopping probe");
                    break;
                }
            }
            tokio::time::sleep(interval).await;
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_update_label_and_tone() {
        let mut monitor = ConnectivityMonitor::new();
        let mut status = StatusLine::default();

        monitor.on_signal(true, &mut status);
        assert_eq!(status.label, "online");
        assert_eq!(status.tone, StatusTone::Success);

        monitor.on_signal(false, &mut status);
        assert_eq!(status.label, "offline");
        assert_eq!(status.tone, StatusTone::Error);

        assert_eq!(monitor.on_signal(true, &mut status), ConnectivityState::Online);
        assert_eq!(status.label, "online");
    }

    #[test]
    fn test_initial_state_matches_platform_boolean() {
        let mut monitor = ConnectivityMonitor::new();
        let mut status = StatusLine { label: "online".into(), tone: StatusTone::Success };
        assert!(monitor.state().is_none());
        monitor.on_signal(false, &mut status);
        assert_eq!(status.label, "offline");
        assert_eq!(monitor.state(), Some(ConnectivityState::Offline));
    }

    #[test]
    fn test_probe_target_uses_default_port() {
        let url = url::Url::parse("http://example.com/chat").unwrap();
        let target = ProbeTarget::from_url(&url).unwrap();
        assert_eq!(target.host, "example.com");
        assert_eq!(target.port, 80);
    }

    #[tokio::test]
    async fn test_probe_reports_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let target = ProbeTarget { host: "127.0.0.1".into(), port };

        let mut rx = spawn_probe(target, Duration::from_millis(50));
        assert_eq!(rx.recv().await, Some(true));

        drop(listener);
        assert_eq!(rx.recv().await, Some(false));
    }
}
