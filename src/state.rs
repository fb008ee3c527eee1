use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::chat::Answer;
use crate::cite::LocatorConfig;
use crate::docs::types::DocId;
use crate::docs::DocumentTree;
use crate::highlight::view::DocumentView;
use crate::highlight::{HighlightConfig, HighlightCoordinator, Renderer};
use crate::llm::LlmClient;

/// Citation tuning (admins can modify at runtime).
#[derive(Debug, Clone, Default)]
pub struct CiteConfig {
    pub locator: LocatorConfig,
    pub highlight: HighlightConfig,
}

impl CiteConfig {
    pub fn from_env() -> Self {
        Self {
            locator: LocatorConfig::from_env(),
            highlight: HighlightConfig::from_env(),
        }
    }
}

pub type Viewer = HighlightCoordinator<DocumentView>;

/// Sessions untouched for this long are dropped when a new one is created.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Per-channel reading state: the last answer and the document viewport.
pub struct ChannelSession {
    pub last_answer: Option<Answer>,
    pub viewer: Arc<Viewer>,
    pub last_used: Instant,
}

pub struct AppState {
    pub tree: Arc<RwLock<DocumentTree>>,
    pub llm: Arc<LlmClient>,
    pub admin_ids: HashSet<u64>,
    pub cite_config: Arc<RwLock<CiteConfig>>,
    pub sessions: Arc<RwLock<HashMap<u64, ChannelSession>>>,
}

impl AppState {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// The channel's viewer, created on first use.
    pub async fn viewer(&self, channel_id: u64) -> Arc<Viewer> {
        let window = self.cite_config.read().await.highlight.viewport_blocks;
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&channel_id) {
            evict_idle(&mut sessions, now);
        }
        let session = sessions
            .entry(channel_id)
            .or_insert_with(|| ChannelSession {
                last_answer: None,
                viewer: Arc::new(HighlightCoordinator::new(
                    self.tree.clone(),
                    DocumentView::new(window),
                )),
                last_used: now,
            });
        session.last_used = now;
        session.viewer.clone()
    }

    /// The document open in the channel's viewer, if the channel has a session.
    pub async fn active_document(&self, channel_id: u64) -> Option<DocId> {
        let viewer = self.sessions.read().await.get(&channel_id)?.viewer.clone();
        let renderer = viewer.renderer().lock().await;
        renderer.active_document().map(str::to_string)
    }

    pub async fn set_answer(&self, channel_id: u64, answer: Answer) {
        // Make sure the session exists before storing into it.
        self.viewer(channel_id).await;
        if let Some(session) = self.sessions.write().await.get_mut(&channel_id) {
            session.last_answer = Some(answer);
        }
    }

    pub async fn last_answer(&self, channel_id: u64) -> Option<Answer> {
        self.sessions
            .read()
            .await
            .get(&channel_id)
            .and_then(|s| s.last_answer.clone())
    }
}

fn evict_idle(sessions: &mut HashMap<u64, ChannelSession>, now: Instant) {
    let before = sessions.len();
    sessions.retain(|_, s| now.duration_since(s.last_used) < SESSION_IDLE_TTL);
    if sessions.len() < before {
        debug!(evicted = before - sessions.len(), "idle channel sessions dropped");
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
