// src/cache/mod.rs - Per-channel emote and badge tables with lazy background population

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

/// Emote code -> image url
pub type EmoteTable = HashMap<String, String>;

/// Badge set name -> set
pub type BadgeSets = HashMap<String, BadgeSet>;

type ChannelTables<V> = Arc<RwLock<HashMap<String, TableState<HashMap<String, V>>>>>;

/// One badge set, e.g. all subscriber tiers of a channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BadgeSet {
    /// Keyed by the version string the API uses ("0", "3", "12", ...)
    pub versions: HashMap<String, BadgeVersion>,
}

impl BadgeSet {
    pub fn image_url(&self, version: &str) -> Option<&str> {
        self.versions.get(version).map(|v| v.image_url_2x.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BadgeVersion {
    #[serde(default)]
    pub image_url_1x: String,
    pub image_url_2x: String,
    #[serde(default)]
    pub image_url_4x: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Emotes,
    Badges,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Emotes => write!(f, "emotes"),
            ResourceKind::Badges => write!(f, "badges"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheScope {
    Global,
    Channel(String),
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheScope::Global => write!(f, "global"),
            CacheScope::Channel(channel) => write!(f, "#{}", channel),
        }
    }
}

/// Events broadcasted when a population request finishes
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Populated { scope: CacheScope, kind: ResourceKind, entries: usize },
    PopulationFailed { scope: CacheScope, kind: ResourceKind, error: String },
}

/// Typed failures of the fetch collaborator
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Network side of the cache; implementations do the actual HTTP calls
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch_channel_badges(&self, channel_id: &str) -> Result<BadgeSets>;

    async fn fetch_channel_emotes(&self, channel_id: &str) -> Result<EmoteTable>;

    async fn fetch_global_badges(&self) -> Result<BadgeSets>;

    async fn fetch_global_emotes(&self) -> Result<EmoteTable>;
}

/// Cache entry lifecycle; `Loading` doubles as the in-flight marker
#[derive(Debug)]
enum TableState<T> {
    Loading,
    Ready(Arc<T>),
    Failed,
}

impl<V> TableState<HashMap<String, V>> {
    fn snapshot(&self) -> Arc<HashMap<String, V>> {
        match self {
            TableState::Ready(table) => Arc::clone(table),
            TableState::Loading | TableState::Failed => Arc::new(HashMap::new()),
        }
    }
}

/// Process-wide emote and badge tables
///
/// Channel tables are created on first lookup and filled by a background task;
/// until then (and forever, if the fetch fails) lookups see an empty table.
/// Nothing is ever evicted or refreshed.
pub struct ResourceCache {
    fetcher: Arc<dyn ResourceFetcher>,
    channel_emotes: ChannelTables<String>,
    channel_badges: ChannelTables<BadgeSet>,
    global_emotes: Arc<RwLock<Option<Arc<EmoteTable>>>>,
    global_badges: Arc<RwLock<Option<Arc<BadgeSets>>>>,
    event_sender: broadcast::Sender<CacheEvent>,
}

impl ResourceCache {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        let (tx, _) = broadcast::channel(100);

        Self {
            fetcher,
            channel_emotes: Arc::new(RwLock::new(HashMap::new())),
            channel_badges: Arc::new(RwLock::new(HashMap::new())),
            global_emotes: Arc::new(RwLock::new(None)),
            global_badges: Arc::new(RwLock::new(None)),
            event_sender: tx,
        }
    }

    /// Get a receiver for population events
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.event_sender.subscribe()
    }

    /// Current emote table of a channel, requesting it on first use
    pub async fn lookup_emotes(&self, channel: &str, channel_id: Option<&str>) -> Arc<EmoteTable> {
        self.lookup(
            &self.channel_emotes,
            channel,
            channel_id,
            ResourceKind::Emotes,
            |fetcher, id| async move { fetcher.fetch_channel_emotes(&id).await },
        )
        .await
    }

    /// Current badge sets of a channel, requesting them on first use
    pub async fn lookup_badges(&self, channel: &str, channel_id: Option<&str>) -> Arc<BadgeSets> {
        self.lookup(
            &self.channel_badges,
            channel,
            channel_id,
            ResourceKind::Badges,
            |fetcher, id| async move { fetcher.fetch_channel_badges(&id).await },
        )
        .await
    }

    pub async fn global_emotes(&self) -> Option<Arc<EmoteTable>> {
        self.global_emotes.read().await.clone()
    }

    pub async fn global_badges(&self) -> Option<Arc<BadgeSets>> {
        self.global_badges.read().await.clone()
    }

    /// Fetch the global tables in the background; messages classified before
    /// they arrive simply see no global emotes or badges
    pub fn spawn_load_globals(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move { cache.load_globals().await })
    }

    /// Fetch the global tables and wait for both requests to finish
    pub async fn load_globals(&self) {
        let (emotes, badges) = tokio::join!(
            self.fetcher.fetch_global_emotes(),
            self.fetcher.fetch_global_badges()
        );

        match emotes {
            Ok(table) => {
                let entries = table.len();
                *self.global_emotes.write().await = Some(Arc::new(table));
                info!("Loaded {} global emotes", entries);
                self.notify(CacheEvent::Populated {
                    scope: CacheScope::Global,
                    kind: ResourceKind::Emotes,
                    entries,
                });
            }
            Err(e) => self.report_failure(CacheScope::Global, ResourceKind::Emotes, &e),
        }

        match badges {
            Ok(table) => {
                let entries = table.len();
                *self.global_badges.write().await = Some(Arc::new(table));
                info!("Loaded {} global badge sets", entries);
                self.notify(CacheEvent::Populated {
                    scope: CacheScope::Global,
                    kind: ResourceKind::Badges,
                    entries,
                });
            }
            Err(e) => self.report_failure(CacheScope::Global, ResourceKind::Badges, &e),
        }
    }

    /// Whether a channel table has been requested but not yet resolved
    pub async fn is_loading(&self, channel: &str, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Emotes => matches!(
                self.channel_emotes.read().await.get(channel),
                Some(TableState::Loading)
            ),
            ResourceKind::Badges => matches!(
                self.channel_badges.read().await.get(channel),
                Some(TableState::Loading)
            ),
        }
    }

    async fn lookup<V, F, Fut>(
        &self,
        tables: &ChannelTables<V>,
        channel: &str,
        channel_id: Option<&str>,
        kind: ResourceKind,
        fetch: F,
    ) -> Arc<HashMap<String, V>>
    where
        V: Send + Sync + 'static,
        F: FnOnce(Arc<dyn ResourceFetcher>, String) -> Fut,
        Fut: Future<Output = Result<HashMap<String, V>>> + Send + 'static,
    {
        if let Some(state) = tables.read().await.get(channel) {
            return state.snapshot();
        }

        let channel_id = match channel_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                debug!("No room id for #{}, skipping {} request", channel, kind);
                return Arc::new(HashMap::new());
            }
        };

        // Check-and-set under the write lock so only one request goes out per channel
        {
            let mut guard = tables.write().await;
            if let Some(state) = guard.get(channel) {
                return state.snapshot();
            }
            guard.insert(channel.to_string(), TableState::Loading);
        }

        debug!("Requesting {} for #{} (room {})", kind, channel, channel_id);

        let request = fetch(Arc::clone(&self.fetcher), channel_id);
        let tables = Arc::clone(tables);
        let sender = self.event_sender.clone();
        let channel = channel.to_string();

        tokio::spawn(async move {
            let scope = CacheScope::Channel(channel.clone());
            match request.await {
                Ok(table) => {
                    let entries = table.len();
                    tables.write().await.insert(channel, TableState::Ready(Arc::new(table)));
                    info!("Loaded {} {} for {}", entries, kind, scope);
                    let _ = sender.send(CacheEvent::Populated { scope, kind, entries });
                }
                Err(e) => {
                    tables.write().await.insert(channel, TableState::Failed);
                    error!("Failed to load {} for {}: {:#}", kind, scope, e);
                    let _ = sender.send(CacheEvent::PopulationFailed {
                        scope,
                        kind,
                        error: format!("{:#}", e),
                    });
                }
            }
        });

        Arc::new(HashMap::new())
    }

    fn report_failure(&self, scope: CacheScope, kind: ResourceKind, e: &anyhow::Error) {
        error!("Failed to load {} for {}: {:#}", kind, scope, e);
        self.notify(CacheEvent::PopulationFailed {
            scope,
            kind,
            error: format!("{:#}", e),
        });
    }

    fn notify(&self, event: CacheEvent) {
        if self.event_sender.receiver_count() == 0 {
            return;
        }
        if let Err(e) = self.event_sender.send(event) {
            warn!("Failed to broadcast cache event: {}", e);
        }
    }
}
