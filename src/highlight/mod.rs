//! Citation activation: switch document, locate the quote, highlight it.
//!
//! Only the newest request is allowed to touch the renderer after a
//! suspension point. Each request takes a generation number; anything that
//! wakes up and finds a newer generation returns [`NavigationOutcome::Superseded`].

pub mod view;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cite::{LocatorConfig, MatchResult, PreparedDocument};
use crate::docs::types::{Block, DocId};
use crate::docs::DocumentTree;

/// What the coordinator needs from a presentation layer.
pub trait Renderer: Send {
    /// Show a document. Rendering may complete later; see [`Renderer::has_block`].
    fn open_document(&mut self, doc_id: &str, blocks: Vec<Block>);
    fn active_document(&self) -> Option<&str>;
    fn has_block(&self, block_id: &str) -> bool;
    fn highlight(&mut self, block_id: &str, start: usize, end: usize);
    fn clear_highlight(&mut self);
    fn scroll_into_view(&mut self, block_id: &str);
    fn scroll_to_top(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightConfig {
    /// Wait between switching documents and locating the quote.
    pub settle_delay: Duration,
    pub retry_interval: Duration,
    pub max_attempts: u32,
    /// Blocks shown around the focused block by the text viewport.
    pub viewport_blocks: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(600),
            retry_interval: Duration::from_millis(100),
            max_attempts: 10,
            viewport_blocks: 7,
        }
    }
}

impl HighlightConfig {
    pub fn from_env() -> Self {
        fn millis(key: &str, default: Duration) -> Duration {
            dotenv::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        }
        let d = Self::default();
        Self {
            settle_delay: millis("HIGHLIGHT_SETTLE_MS", d.settle_delay),
            retry_interval: millis("HIGHLIGHT_RETRY_MS", d.retry_interval),
            max_attempts: dotenv::var("HIGHLIGHT_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.max_attempts),
            viewport_blocks: dotenv::var("HIGHLIGHT_VIEWPORT_BLOCKS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.viewport_blocks),
        }
    }
}

/// A citation marker was activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub doc_id: DocId,
    pub quote: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Highlighted(MatchResult),
    /// Document shown from the top. Carries the miss when a quote was searched.
    NoHighlight(Option<MatchResult>),
    /// The quote was found but its block never rendered.
    BlockMissing(MatchResult),
    /// A newer request took over.
    Superseded,
}

pub struct HighlightCoordinator<R> {
    tree: Arc<RwLock<DocumentTree>>,
    renderer: Mutex<R>,
    generation: AtomicU64,
    /// Last prepared document, reused while the same document stays active.
    prepared: Mutex<Option<(DocId, Arc<PreparedDocument>)>>,
}

impl<R: Renderer> HighlightCoordinator<R> {
    pub fn new(tree: Arc<RwLock<DocumentTree>>, renderer: R) -> Self {
        Self {
            tree,
            renderer: Mutex::new(renderer),
            generation: AtomicU64::new(0),
            prepared: Mutex::new(None),
        }
    }

    pub fn renderer(&self) -> &Mutex<R> {
        &self.renderer
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Drop the active highlight and cancel anything in flight.
    pub async fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.renderer.lock().await.clear_highlight();
    }

    pub async fn navigate(
        &self,
        request: NavigationRequest,
        locator: &LocatorConfig,
        timing: &HighlightConfig,
    ) -> NavigationOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let blocks = self.tree.read().await.blocks(&request.doc_id);

        let quote = request
            .quote
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        {
            let mut renderer = self.renderer.lock().await;
            if !self.is_current(generation) {
                return NavigationOutcome::Superseded;
            }
            renderer.clear_highlight();
            renderer.open_document(&request.doc_id, blocks.clone().unwrap_or_default());
            if quote.is_none() || blocks.is_none() {
                renderer.scroll_to_top();
                return NavigationOutcome::NoHighlight(None);
            }
        }
        let (Some(quote), Some(blocks)) = (quote, blocks) else {
            return NavigationOutcome::NoHighlight(None);
        };

        let prepared = self.prepare(&request.doc_id, blocks).await;

        tokio::time::sleep(timing.settle_delay).await;
        if !self.is_current(generation) {
            debug!(doc_id = %request.doc_id, "highlight superseded during settle");
            return NavigationOutcome::Superseded;
        }

        let result = prepared.locate(quote, locator);
        if !result.found {
            let mut renderer = self.renderer.lock().await;
            if !self.is_current(generation) {
                return NavigationOutcome::Superseded;
            }
            renderer.scroll_to_top();
            info!(doc_id = %request.doc_id, "citation quote not found, showing document top");
            return NavigationOutcome::NoHighlight(Some(result));
        }

        let attempts = timing.max_attempts.max(1);
        for attempt in 1..=attempts {
            {
                let mut renderer = self.renderer.lock().await;
                if !self.is_current(generation)
                    || renderer.active_document() != Some(request.doc_id.as_str())
                {
                    return NavigationOutcome::Superseded;
                }
                if renderer.has_block(&result.containing_block_id) {
                    renderer.clear_highlight();
                    renderer.highlight(
                        &result.containing_block_id,
                        result.start_offset,
                        result.end_offset,
                    );
                    renderer.scroll_into_view(&result.containing_block_id);
                    debug!(
                        block = %result.containing_block_id,
                        attempt,
                        strategy = result.strategy.as_str(),
                        "highlight applied"
                    );
                    return NavigationOutcome::Highlighted(result);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(timing.retry_interval).await;
            }
        }

        warn!(
            doc_id = %request.doc_id,
            block = %result.containing_block_id,
            attempts,
            "target block never rendered, leaving document without highlight"
        );
        NavigationOutcome::BlockMissing(result)
    }

    async fn prepare(&self, doc_id: &str, blocks: Vec<Block>) -> Arc<PreparedDocument> {
        let mut cache = self.prepared.lock().await;
        if let Some((id, doc)) = cache.as_ref() {
            if id == doc_id && doc.blocks().eq(blocks.iter()) {
                return doc.clone();
            }
        }
        let doc = Arc::new(PreparedDocument::new(blocks));
        *cache = Some((doc_id.to_string(), doc.clone()));
        doc
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::cite::MatchStrategy;
    use crate::docs::tests::{folder, text_node};

    /// Records calls; blocks appear only after `render_after` has_block checks.
    #[derive(Default)]
    struct RecordingRenderer {
        doc: Option<String>,
        blocks: Vec<Block>,
        render_after: u32,
        checks: Cell<u32>,
        highlight: Option<(String, usize, usize)>,
        scrolled_to: Option<String>,
        log: Vec<String>,
    }

    impl Renderer for RecordingRenderer {
        fn open_document(&mut self, doc_id: &str, blocks: Vec<Block>) {
            self.doc = Some(doc_id.to_string());
            self.blocks = blocks;
            self.checks.set(0);
            self.log.push(format!("open {}", doc_id));
        }
        fn active_document(&self) -> Option<&str> {
            self.doc.as_deref()
        }
        fn has_block(&self, block_id: &str) -> bool {
            let seen = self.checks.get();
            self.checks.set(seen + 1);
            seen >= self.render_after && self.blocks.iter().any(|b| b.id == block_id)
        }
        fn highlight(&mut self, block_id: &str, start: usize, end: usize) {
            self.highlight = Some((block_id.to_string(), start, end));
            self.log.push(format!("highlight {}", block_id));
        }
        fn clear_highlight(&mut self) {
            self.highlight = None;
            self.log.push("clear".to_string());
        }
        fn scroll_into_view(&mut self, block_id: &str) {
            self.scrolled_to = Some(block_id.to_string());
        }
        fn scroll_to_top(&mut self) {
            self.scrolled_to = Some("top".to_string());
        }
    }

    fn tree() -> (Arc<RwLock<DocumentTree>>, DocId, DocId) {
        let tree = DocumentTree::new(vec![folder(
            "kb",
            vec![
                text_node("指南.md", "# 指南\n流程中请务必检查所有字段。"),
                text_node("其他.md", "别的内容"),
            ],
        )]);
        let a = tree.resolve_by_name("指南.md").unwrap().id.clone();
        let b = tree.resolve_by_name("其他.md").unwrap().id.clone();
        (Arc::new(RwLock::new(tree)), a, b)
    }

    fn request(doc_id: &str, quote: Option<&str>) -> NavigationRequest {
        NavigationRequest {
            doc_id: doc_id.to_string(),
            quote: quote.map(|q| q.to_string()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_highlights_exact_quote() {
        let (tree, a, _) = tree();
        let coordinator = HighlightCoordinator::new(tree, RecordingRenderer::default());
        let outcome = coordinator
            .navigate(
                request(&a, Some(" 请务必检查 ")),
                &LocatorConfig::default(),
                &HighlightConfig::default(),
            )
            .await;

        let NavigationOutcome::Highlighted(m) = outcome else {
            panic!("expected highlight, got {:?}", outcome);
        };
        assert_eq!(m.strategy, MatchStrategy::Exact);
        let r = coordinator.renderer().lock().await;
        assert_eq!(r.highlight, Some(("block-1".to_string(), m.start_offset, m.end_offset)));
        assert_eq!(r.scrolled_to.as_deref(), Some("block-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_quote_opens_top_without_match() {
        let (tree, a, _) = tree();
        let coordinator = HighlightCoordinator::new(tree, RecordingRenderer::default());
        let outcome = coordinator
            .navigate(request(&a, None), &LocatorConfig::default(), &HighlightConfig::default())
            .await;
        assert_eq!(outcome, NavigationOutcome::NoHighlight(None));
        let r = coordinator.renderer().lock().await;
        assert_eq!(r.scrolled_to.as_deref(), Some("top"));
        assert!(r.highlight.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_quote_falls_back_to_top() {
        let (tree, a, _) = tree();
        let coordinator = HighlightCoordinator::new(tree, RecordingRenderer::default());
        let outcome = coordinator
            .navigate(
                request(&a, Some("这句话不存在于任何地方")),
                &LocatorConfig::default(),
                &HighlightConfig::default(),
            )
            .await;
        let NavigationOutcome::NoHighlight(Some(m)) = outcome else {
            panic!("expected miss, got {:?}", outcome);
        };
        assert_eq!(m.strategy, MatchStrategy::None);
        assert_eq!(
            coordinator.renderer().lock().await.scrolled_to.as_deref(),
            Some("top")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_request_supersedes_older() {
        let (tree, a, b) = tree();
        let coordinator = Arc::new(HighlightCoordinator::new(tree, RecordingRenderer::default()));
        let locator = LocatorConfig::default();
        let timing = HighlightConfig::default();

        let first = {
            let c = coordinator.clone();
            let (locator, timing, a) = (locator.clone(), timing.clone(), a.clone());
            tokio::spawn(async move {
                c.navigate(request(&a, Some("请务必检查")), &locator, &timing)
                    .await
            })
        };
        // Let the first request reach its settle delay.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = coordinator
            .navigate(request(&b, Some("别的内容")), &locator, &timing)
            .await;

        assert_eq!(first.await.unwrap(), NavigationOutcome::Superseded);
        assert!(matches!(second, NavigationOutcome::Highlighted(_)));
        let r = coordinator.renderer().lock().await;
        assert_eq!(r.active_document(), Some(b.as_str()));
        assert_eq!(r.highlight.as_ref().map(|h| h.0.as_str()), Some("block-0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_missing_after_retries() {
        let (tree, a, _) = tree();
        let renderer = RecordingRenderer {
            render_after: u32::MAX,
            ..Default::default()
        };
        let coordinator = HighlightCoordinator::new(tree, renderer);
        let timing = HighlightConfig {
            max_attempts: 3,
            ..Default::default()
        };
        let started = tokio::time::Instant::now();
        let outcome = coordinator
            .navigate(request(&a, Some("请务必检查")), &LocatorConfig::default(), &timing)
            .await;
        assert!(matches!(outcome, NavigationOutcome::BlockMissing(_)));
        // Settle, then two waits between three checks; no wait after the last one.
        let expected = timing.settle_delay + timing.retry_interval * 2;
        let elapsed = started.elapsed();
        assert!(elapsed >= expected && elapsed < expected + timing.retry_interval);
        assert_eq!(coordinator.renderer().lock().await.checks.get(), 3);
        assert!(coordinator.renderer().lock().await.highlight.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_block_renders() {
        let (tree, a, _) = tree();
        let renderer = RecordingRenderer {
            render_after: 3,
            ..Default::default()
        };
        let coordinator = HighlightCoordinator::new(tree, renderer);
        let outcome = coordinator
            .navigate(
                request(&a, Some("请务必检查")),
                &LocatorConfig::default(),
                &HighlightConfig::default(),
            )
            .await;
        assert!(matches!(outcome, NavigationOutcome::Highlighted(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_active_highlight() {
        let (tree, a, _) = tree();
        let coordinator = HighlightCoordinator::new(tree, RecordingRenderer::default());
        let locator = LocatorConfig::default();
        let timing = HighlightConfig::default();
        coordinator
            .navigate(request(&a, Some("请务必检查")), &locator, &timing)
            .await;
        coordinator
            .navigate(request(&a, Some("指南")), &locator, &timing)
            .await;

        let r = coordinator.renderer().lock().await;
        assert_eq!(r.highlight.as_ref().map(|h| h.0.as_str()), Some("heading-0"));
        // Every highlight is preceded by a clear.
        let highlights: Vec<_> = r.log.iter().enumerate().filter(|(_, l)| l.starts_with("highlight")).collect();
        for (idx, _) in highlights {
            assert_eq!(r.log[idx - 1], "clear");
        }
    }
}
