//! Line-oriented block splitting for text documents.
//!
//! Every non-empty source line becomes one [`Block`]. Block ids are keyed by the
//! 0-based source line so they stay in step with the table of contents:
//! headings get `heading-{line}`, everything else `block-{line}`.

use super::types::{Block, BlockKind, Heading};

/// Split a text body into renderable blocks, in document order.
pub fn split_blocks(content: &str) -> Vec<Block> {
    content
        .split('\n')
        .enumerate()
        .filter_map(|(line_no, line)| classify_line(line_no, line))
        .collect()
}

/// Extract `#`, `##` and `###` headings for the table of contents.
pub fn headings(content: &str) -> Vec<Heading> {
    split_blocks(content)
        .into_iter()
        .filter_map(|block| match block.kind {
            BlockKind::Heading { level } => Some(Heading {
                id: block.id,
                level,
                text: block.raw_text.trim().to_string(),
            }),
            _ => None,
        })
        .collect()
}

fn classify_line(line_no: usize, line: &str) -> Option<Block> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return None;
    }

    if let Some((level, text)) = heading(line) {
        return Some(Block {
            id: format!("heading-{}", line_no),
            kind: BlockKind::Heading { level },
            raw_text: text.to_string(),
        });
    }

    let id = format!("block-{}", line_no);

    if let Some(alt) = image_alt(line) {
        return Some(Block {
            id,
            kind: BlockKind::Media,
            raw_text: alt.to_string(),
        });
    }
    if line.starts_with("[VIDEO:") && line.ends_with(']') {
        return Some(Block {
            id,
            kind: BlockKind::Media,
            raw_text: String::new(),
        });
    }

    if let Some(text) = list_item(line) {
        return Some(Block {
            id,
            kind: BlockKind::ListItem,
            raw_text: text.to_string(),
        });
    }

    Some(Block {
        id,
        kind: BlockKind::Paragraph,
        raw_text: line.to_string(),
    })
}

/// `# text`, `## text`, `### text`; deeper levels render as paragraphs.
fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=3).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    let text = rest.trim_start();
    if text.len() == rest.len() || text.is_empty() {
        // No whitespace after the hashes, or nothing after it.
        return None;
    }
    Some((hashes as u8, text))
}

/// `- text` or `12. text`.
fn list_item(line: &str) -> Option<&str> {
    let rest = if let Some(rest) = line.strip_prefix('-') {
        rest
    } else {
        let digits = line.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        line[digits..].strip_prefix('.')?
    };
    let text = rest.trim_start();
    if text.len() == rest.len() || text.is_empty() {
        return None;
    }
    Some(text)
}

/// `![alt](url)` on its own line.
fn image_alt(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("![")?;
    let close = rest.find("](")?;
    if !rest.ends_with(')') {
        return None;
    }
    Some(&rest[..close])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# 数字文艺复兴\n\n引言段落，**重点**在这里。\n## 第一节\n- 列表项一\n2. 列表项二\n![封面](https://example.com/a.png)\n[VIDEO:https://www.bilibili.com/video/BV1mei7BSEkx]\n#### 太深的标题";

    #[test]
    fn test_split_blocks_kinds_and_ids() {
        let blocks = split_blocks(SAMPLE);
        let summary: Vec<(&str, BlockKind, &str)> = blocks
            .iter()
            .map(|b| (b.id.as_str(), b.kind, b.raw_text.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("heading-0", BlockKind::Heading { level: 1 }, "数字文艺复兴"),
                ("block-2", BlockKind::Paragraph, "引言段落，**重点**在这里。"),
                ("heading-3", BlockKind::Heading { level: 2 }, "第一节"),
                ("block-4", BlockKind::ListItem, "列表项一"),
                ("block-5", BlockKind::ListItem, "列表项二"),
                ("block-6", BlockKind::Media, "封面"),
                ("block-7", BlockKind::Media, ""),
                ("block-8", BlockKind::Paragraph, "#### 太深的标题"),
            ]
        );
    }

    #[test]
    fn test_headings_toc() {
        let toc = headings(SAMPLE);
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].id, "heading-0");
        assert_eq!(toc[0].level, 1);
        assert_eq!(toc[1].text, "第一节");
        assert_eq!(toc[1].level, 2);
    }

    #[test]
    fn test_hash_without_space_is_paragraph() {
        let blocks = split_blocks("#tag line\n-not a list");
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
        assert_eq!(blocks[1].kind, BlockKind::Paragraph);
        assert_eq!(blocks[1].raw_text, "-not a list");
    }

    #[test]
    fn test_crlf_lines() {
        let blocks = split_blocks("第一行\r\n第二行\r\n");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].raw_text, "第一行");
        assert_eq!(blocks[1].id, "block-1");
    }
}
