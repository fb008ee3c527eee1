//! `[[name]]` / `[[name:quote]]` citation tokens in assistant text.
//!
//! Parsing is permissive: anything that isn't a complete token on a single
//! line stays literal text. There is no escape for `]]` inside a quote.

use crate::docs::types::DocId;
use crate::docs::DocumentTree;

const OPEN: &str = "[[";
const CLOSE: &str = "]]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationToken {
    /// 1-based, in order of appearance within one message.
    pub sequence_index: usize,
    pub source_name: String,
    pub quoted_span: Option<String>,
}

impl CitationToken {
    /// The token as it appeared in the source text.
    pub fn to_raw(&self) -> String {
        match &self.quoted_span {
            Some(quote) => format!("{}{}:{}{}", OPEN, self.source_name, quote, CLOSE),
            None => format!("{}{}{}", OPEN, self.source_name, CLOSE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Citation(CitationToken),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    pub segments: Vec<Segment>,
}

/// A token paired with the document it points at, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCitation {
    pub token: CitationToken,
    pub target: Option<DocId>,
}

impl ResolvedCitation {
    pub fn is_actionable(&self) -> bool {
        self.target.is_some()
    }
}

impl ParsedMessage {
    pub fn citations(&self) -> impl Iterator<Item = &CitationToken> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Citation(token) => Some(token),
            Segment::Text(_) => None,
        })
    }

    pub fn citation(&self, sequence_index: usize) -> Option<&CitationToken> {
        self.citations().find(|t| t.sequence_index == sequence_index)
    }

    /// Concatenate segments back into the original text.
    pub fn reassemble(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Citation(token) => out.push_str(&token.to_raw()),
            }
        }
        out
    }

    /// Resolve every token's source name against the tree. Unknown names keep
    /// their number but carry no target.
    pub fn resolve(&self, tree: &DocumentTree) -> Vec<ResolvedCitation> {
        self.citations()
            .map(|token| ResolvedCitation {
                token: token.clone(),
                target: tree
                    .resolve_by_name(&token.source_name)
                    .map(|node| node.id.clone()),
            })
            .collect()
    }
}

/// Split a message into text and citation segments.
pub fn parse_citations(text: &str) -> ParsedMessage {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;
    let mut next_index = 1;

    while let Some(rel) = text[cursor..].find(OPEN) {
        let open_at = cursor + rel;
        let inner_start = open_at + OPEN.len();
        let close_at = text[inner_start..].find(CLOSE).map(|i| inner_start + i);

        let Some(close_at) = close_at.filter(|&c| !text[inner_start..c].contains('\n')) else {
            // Unterminated on this line: the `[` is literal, keep scanning after it.
            cursor = open_at + 1;
            continue;
        };

        if literal_start < open_at {
            segments.push(Segment::Text(text[literal_start..open_at].to_string()));
        }
        segments.push(Segment::Citation(split_token(
            &text[inner_start..close_at],
            next_index,
        )));
        next_index += 1;

        cursor = close_at + CLOSE.len();
        literal_start = cursor;
    }

    if literal_start < text.len() {
        segments.push(Segment::Text(text[literal_start..].to_string()));
    }

    ParsedMessage { segments }
}

fn split_token(inner: &str, sequence_index: usize) -> CitationToken {
    match inner.find(':') {
        Some(colon) if colon > 0 => CitationToken {
            sequence_index,
            source_name: inner[..colon].to_string(),
            quoted_span: Some(inner[colon + 1..].to_string()),
        },
        _ => CitationToken {
            sequence_index,
            source_name: inner.to_string(),
            quoted_span: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::tests::sample_tree;
    use proptest::prelude::*;

    fn token(index: usize, name: &str, quote: Option<&str>) -> Segment {
        Segment::Citation(CitationToken {
            sequence_index: index,
            source_name: name.to_string(),
            quoted_span: quote.map(|q| q.to_string()),
        })
    }

    #[test]
    fn test_parse_mixed_tokens() {
        let parsed = parse_citations("见 [[指南.md:请务必检查]]。另见[[词汇.md]]");
        assert_eq!(
            parsed.segments,
            vec![
                Segment::Text("见 ".to_string()),
                token(1, "指南.md", Some("请务必检查")),
                Segment::Text("。另见".to_string()),
                token(2, "词汇.md", None),
            ]
        );
    }

    #[test]
    fn test_quote_keeps_later_colons() {
        let parsed = parse_citations("[[a.md:时间: 50分钟]]");
        let t = parsed.citation(1).unwrap();
        assert_eq!(t.source_name, "a.md");
        assert_eq!(t.quoted_span.as_deref(), Some("时间: 50分钟"));
    }

    #[test]
    fn test_leading_colon_is_part_of_name() {
        let parsed = parse_citations("[[:quote]]");
        let t = parsed.citation(1).unwrap();
        assert_eq!(t.source_name, ":quote");
        assert!(t.quoted_span.is_none());
    }

    #[test]
    fn test_empty_quote_after_colon() {
        let parsed = parse_citations("[[a.md:]]");
        assert_eq!(parsed.citation(1).unwrap().quoted_span.as_deref(), Some(""));
        assert_eq!(parsed.reassemble(), "[[a.md:]]");
    }

    #[test]
    fn test_unterminated_is_literal() {
        let text = "开头 [[a.md:没有结束";
        let parsed = parse_citations(text);
        assert_eq!(parsed.segments, vec![Segment::Text(text.to_string())]);
    }

    #[test]
    fn test_token_cannot_span_lines() {
        let text = "[[a.md:第一行\n第二行]] 然后 [[b.md]]";
        let parsed = parse_citations(text);
        assert_eq!(parsed.citations().count(), 1);
        assert_eq!(parsed.citation(1).unwrap().source_name, "b.md");
        assert_eq!(parsed.reassemble(), text);
    }

    #[test]
    fn test_non_greedy_and_extra_bracket() {
        let parsed = parse_citations("[[[a]] [[b]]]");
        let names: Vec<_> = parsed.citations().map(|t| t.source_name.as_str()).collect();
        assert_eq!(names, vec!["[a", "b"]);
        assert_eq!(parsed.reassemble(), "[[[a]] [[b]]]");
    }

    #[test]
    fn test_resolve_marks_unknown_names() {
        let tree = sample_tree();
        let parsed = parse_citations("[[指南.md:检查]] [[不存在.md:x]]");
        let resolved = parsed.resolve(&tree);
        assert_eq!(resolved.len(), 2);
        assert!(resolved[0].is_actionable());
        assert_eq!(
            resolved[0].target.as_deref(),
            Some(tree.resolve_by_name("指南.md").unwrap().id.as_str())
        );
        assert!(!resolved[1].is_actionable());
        assert_eq!(resolved[1].token.sequence_index, 2);
    }

    proptest! {
        #[test]
        fn proptest_reassemble_restores_original(text in "([a-z\\[\\]:\n 检查]{0,40})") {
            let parsed = parse_citations(&text);
            prop_assert_eq!(parsed.reassemble(), text);
        }

        #[test]
        fn proptest_sequence_indexes_stable(text in "([a-z\\[\\]: ]{0,40})") {
            let first: Vec<usize> = parse_citations(&text).citations().map(|t| t.sequence_index).collect();
            let second: Vec<usize> = parse_citations(&text).citations().map(|t| t.sequence_index).collect();
            let expected: Vec<usize> = (1..=first.len()).collect();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first, expected);
        }
    }
}
