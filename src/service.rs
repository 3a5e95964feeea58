use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::OfflineCache;
use crate::connectivity::{
    Connectivity, ConnectivityEvent, ConnectivityMonitor, ConnectivityPort, Transition,
};
use crate::fetcher::StorySource;
use crate::state::StoryState;
use crate::story::normalize;
use crate::store::KeyValueStore;

/// How a call to [`StoryService::get_stories`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(usize),
    ReplayedOffline(usize),
    Failed,
    /// A newer fetch started before this one resolved; its result was dropped.
    Superseded,
}

pub struct StoryService<S, K, C> {
    source: S,
    cache: OfflineCache<K>,
    connectivity: C,
    state: RwLock<StoryState>,
    monitor: Mutex<ConnectivityMonitor>,
    latest_request: AtomicU64,
}

impl<S, K, C> StoryService<S, K, C>
where
    S: StorySource,
    K: KeyValueStore,
    C: ConnectivityPort,
{
    pub fn new(source: S, cache: OfflineCache<K>, connectivity: C) -> Self {
        Self {
            source,
            cache,
            connectivity,
            state: RwLock::new(StoryState::default()),
            monitor: Mutex::new(ConnectivityMonitor::new()),
            latest_request: AtomicU64::new(0),
        }
    }

    pub async fn state(&self) -> StoryState {
        self.state.read().await.clone()
    }

    pub async fn connectivity(&self) -> Option<Connectivity> {
        self.monitor.lock().await.state()
    }

    pub fn cache(&self) -> &OfflineCache<K> {
        &self.cache
    }

    /// Load stories, from the cache when offline or from the source otherwise.
    pub async fn get_stories(&self) -> FetchOutcome {
        if self.cache.probe().await && !self.connectivity.is_online() {
            if let Some(stories) = self.cache.read_or_none().await {
                let count = stories.len();
                info!("Offline, replaying {} cached stories", count);
                let mut state = self.state.write().await;
                // Invalidate any in-flight fetch so it cannot overwrite this.
                self.latest_request.fetch_add(1, Ordering::SeqCst);
                *state = state.offline_replayed(stories);
                drop(state);
                self.monitor.lock().await.resolve(Connectivity::Offline);
                return FetchOutcome::ReplayedOffline(count);
            }
        }

        let token = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.source.fetch_stories().await;

        // Commits are serialized by the state lock. The token is checked again
        // before every write since the cache calls below can yield.
        let mut state = self.state.write().await;
        if !self.is_latest(token) {
            return FetchOutcome::Superseded;
        }

        match result {
            Ok(raw) => {
                let stories = normalize(raw);
                let count = stories.len();
                info!("Loaded {} stories", count);

                if self.cache.probe().await {
                    if !self.is_latest(token) {
                        return FetchOutcome::Superseded;
                    }
                    if let Err(e) = self.cache.write(&stories).await {
                        warn!("Failed to cache stories: {}", e);
                    }
                }
                if !self.is_latest(token) {
                    return FetchOutcome::Superseded;
                }

                *state = state.fetch_succeeded(stories);
                drop(state);
                self.monitor.lock().await.resolve(Connectivity::Online);
                FetchOutcome::Fetched(count)
            }
            Err(e) => {
                warn!("Story fetch failed: {}", e);
                let cached = if self.cache.probe().await {
                    self.cache.read_or_none().await
                } else {
                    None
                };
                if !self.is_latest(token) {
                    return FetchOutcome::Superseded;
                }

                let fell_back = cached.is_some();
                *state = state.fetch_failed(e.to_string(), cached);
                drop(state);
                if fell_back {
                    self.monitor.lock().await.resolve(Connectivity::Offline);
                }
                FetchOutcome::Failed
            }
        }
    }

    fn is_latest(&self, token: u64) -> bool {
        let latest = self.latest_request.load(Ordering::SeqCst) == token;
        if !latest {
            debug!("Dropping result of superseded fetch #{}", token);
        }
        latest
    }

    /// Feed a browser-style connectivity signal into the service.
    pub async fn on_connectivity(&self, event: ConnectivityEvent) -> Option<FetchOutcome> {
        let transition = self
            .monitor
            .lock()
            .await
            .on_event(event, &self.connectivity);

        match transition {
            Transition::Refetch => {
                info!("Back online, refetching stories");
                Some(self.get_stories().await)
            }
            Transition::MarkOffline => {
                info!("Connection lost, marking stories offline");
                self.replace_state(StoryState::went_offline).await;
                None
            }
        }
    }

    async fn replace_state<F>(&self, transition: F)
    where
        F: FnOnce(&StoryState) -> StoryState,
    {
        let mut state = self.state.write().await;
        *state = transition(&state);
    }
}

/// Drain connectivity events into the service until the sender goes away.
pub async fn start_connectivity_listener<S, K, C>(
    service: Arc<StoryService<S, K, C>>,
    mut events: mpsc::Receiver<ConnectivityEvent>,
) where
    S: StorySource,
    K: KeyValueStore,
    C: ConnectivityPort,
{
    while let Some(event) = events.recv().await {
        service.on_connectivity(event).await;
    }
    info!("Connectivity channel closed");
}
