use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Answers "do we have a network right now?".
pub trait ConnectivityPort: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Cloneable online flag shared between the probe and the service.
#[derive(Debug, Clone)]
pub struct SharedConnectivity(Arc<AtomicBool>);

impl SharedConnectivity {
    pub fn new(online: bool) -> Self {
        Self(Arc::new(AtomicBool::new(online)))
    }

    pub fn set_online(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityPort for SharedConnectivity {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

/// What the service should do in response to a connectivity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Refetch,
    MarkOffline,
}

/// Online/offline state machine. Starts undetermined.
#[derive(Debug, Default)]
pub struct ConnectivityMonitor {
    state: Option<Connectivity>,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<Connectivity> {
        self.state
    }

    /// Record the connectivity a fetch attempt ended up observing.
    pub fn resolve(&mut self, connectivity: Connectivity) {
        self.state = Some(connectivity);
    }

    pub fn on_event<C: ConnectivityPort + ?Sized>(
        &mut self,
        event: ConnectivityEvent,
        port: &C,
    ) -> Transition {
        match event {
            ConnectivityEvent::Offline => {
                self.state = Some(Connectivity::Offline);
                Transition::MarkOffline
            }
            ConnectivityEvent::Online if port.is_online() => {
                self.state = Some(Connectivity::Online);
                Transition::Refetch
            }
            ConnectivityEvent::Online => {
                debug!("Online signal without connectivity, staying offline");
                self.state = Some(Connectivity::Offline);
                Transition::MarkOffline
            }
        }
    }
}

/// `host:port` to probe for the given endpoint URL.
pub fn probe_target(endpoint: &str) -> Option<String> {
    let url = reqwest::Url::parse(endpoint).ok()?;
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    Some(format!("{}:{}", host, port))
}

/// Periodically checks that the upstream host accepts TCP connections and
/// reports changes as connectivity events.
pub struct NetworkProbe {
    target: String,
    interval: Duration,
    timeout: Duration,
    connectivity: SharedConnectivity,
    events: mpsc::Sender<ConnectivityEvent>,
}

impl NetworkProbe {
    pub fn new(
        target: String,
        interval: Duration,
        timeout: Duration,
        connectivity: SharedConnectivity,
        events: mpsc::Sender<ConnectivityEvent>,
    ) -> Self {
        Self {
            target,
            interval,
            timeout,
            connectivity,
            events,
        }
    }

    pub async fn is_reachable(&self) -> bool {
        matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(&self.target)).await,
            Ok(Ok(_))
        )
    }

    /// Probe once. Returns the event to emit, if reachability changed.
    pub async fn poll_once(&self) -> Option<ConnectivityEvent> {
        let reachable = self.is_reachable().await;
        let previous = self.connectivity.is_online();
        self.connectivity.set_online(reachable);

        match (previous, reachable) {
            (false, true) => Some(ConnectivityEvent::Online),
            (true, false) => Some(ConnectivityEvent::Offline),
            _ => None,
        }
    }

    pub async fn run(self) {
        info!("Probing {} every {:?}", self.target, self.interval);
        loop {
            if let Some(event) = self.poll_once().await {
                info!("Connectivity changed: {:?}", event);
                if self.events.send(event).await.is_err() {
                    warn!("Connectivity listener gone, stopping probe");
                    return;
                }
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
