use super::Renderer;
use crate::docs::types::{Block, BlockKind, DocId};

/// Plain-text document viewport for chat surfaces.
///
/// "Scrolling" moves a window of blocks so the focused block sits in the
/// middle; the highlight is drawn with Discord underline markers.
#[derive(Debug, Clone)]
pub struct DocumentView {
    doc_id: Option<DocId>,
    blocks: Vec<Block>,
    highlight: Option<(String, usize, usize)>,
    focus: Option<String>,
    window: usize,
}

impl DocumentView {
    pub fn new(window: usize) -> Self {
        Self {
            doc_id: None,
            blocks: Vec::new(),
            highlight: None,
            focus: None,
            window: window.max(1),
        }
    }

    pub fn set_window(&mut self, window: usize) {
        self.window = window.max(1);
    }

    pub fn highlighted_text(&self) -> Option<&str> {
        let (id, start, end) = self.highlight.as_ref()?;
        let block = self.blocks.iter().find(|b| &b.id == id)?;
        block.raw_text.get(*start..*end)
    }

    /// Render the visible window.
    pub fn render(&self) -> String {
        if self.blocks.is_empty() {
            return "*(nothing to show)*".to_string();
        }

        let center = self
            .focus
            .as_ref()
            .and_then(|id| self.blocks.iter().position(|b| &b.id == id))
            .unwrap_or(0);
        let (start, end) = window_bounds(center, self.window, self.blocks.len());

        let mut out = String::new();
        if start > 0 {
            out.push_str("…\n");
        }
        for block in &self.blocks[start..end] {
            out.push_str(&self.render_block(block));
            out.push('\n');
        }
        if end < self.blocks.len() {
            out.push_str("…\n");
        }
        out
    }

    fn render_block(&self, block: &Block) -> String {
        let text = match &self.highlight {
            Some((id, s, e)) if *id == block.id => match (
                block.raw_text.get(..*s),
                block.raw_text.get(*s..*e),
                block.raw_text.get(*e..),
            ) {
                (Some(before), Some(mid), Some(after)) => {
                    format!("▶ {}__{}__{}", before, mid, after)
                }
                _ => block.raw_text.clone(),
            },
            _ => block.raw_text.clone(),
        };

        match block.kind {
            BlockKind::Heading { level } => format!("{} {}", "#".repeat(level as usize), text),
            BlockKind::ListItem => format!("- {}", text),
            BlockKind::Media => format!("🖼 {}", text),
            BlockKind::Paragraph => text,
        }
    }
}

/// Window of `size` items centered on `center`, shifted to stay inside `[0, len)`.
fn window_bounds(center: usize, size: usize, len: usize) -> (usize, usize) {
    let size = size.min(len);
    let start = center.saturating_sub(size / 2).min(len - size);
    (start, start + size)
}

impl Renderer for DocumentView {
    fn open_document(&mut self, doc_id: &str, blocks: Vec<Block>) {
        self.doc_id = Some(doc_id.to_string());
        self.blocks = blocks;
        self.highlight = None;
        self.focus = None;
    }

    fn active_document(&self) -> Option<&str> {
        self.doc_id.as_deref()
    }

    fn has_block(&self, block_id: &str) -> bool {
        self.blocks.iter().any(|b| b.id == block_id)
    }

    fn highlight(&mut self, block_id: &str, start: usize, end: usize) {
        self.highlight = Some((block_id.to_string(), start, end));
    }

    fn clear_highlight(&mut self) {
        self.highlight = None;
    }

    fn scroll_into_view(&mut self, block_id: &str) {
        self.focus = Some(block_id.to_string());
    }

    fn scroll_to_top(&mut self) {
        self.focus = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::blocks::split_blocks;

    fn view_with(content: &str, window: usize) -> DocumentView {
        let mut view = DocumentView::new(window);
        view.open_document("doc", split_blocks(content));
        view
    }

    #[test]
    fn test_window_bounds() {
        assert_eq!(window_bounds(0, 3, 10), (0, 3));
        assert_eq!(window_bounds(5, 3, 10), (4, 7));
        assert_eq!(window_bounds(9, 3, 10), (7, 10));
        assert_eq!(window_bounds(1, 7, 4), (0, 4));
    }

    #[test]
    fn test_render_highlight_centered() {
        let content = "# 标题\n一\n二\n流程中请务必检查所有字段\n三\n四\n五";
        let mut view = view_with(content, 3);
        let start = "流程中".len();
        view.highlight("block-3", start, start + "请务必检查".len());
        view.scroll_into_view("block-3");

        assert_eq!(view.highlighted_text(), Some("请务必检查"));
        let out = view.render();
        assert_eq!(out, "…\n二\n▶ 流程中__请务必检查__所有字段\n三\n…\n");
    }

    #[test]
    fn test_render_top_with_kinds() {
        let view = view_with("# 标题\n- 列表\n![图](x.png)\n正文", 10);
        assert_eq!(view.render(), "# 标题\n- 列表\n🖼 图\n正文\n");
    }

    #[test]
    fn test_open_document_resets_state() {
        let mut view = view_with("甲\n乙", 5);
        view.highlight("block-0", 0, "甲".len());
        view.open_document("other", split_blocks("丙"));
        assert!(view.highlighted_text().is_none());
        assert_eq!(view.active_document(), Some("other"));
        assert!(!view.has_block("block-1"));
    }

    #[test]
    fn test_empty_document() {
        let view = DocumentView::new(5);
        assert_eq!(view.render(), "*(nothing to show)*");
    }
}
