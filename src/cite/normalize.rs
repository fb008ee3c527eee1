//! Normalized views of block text that remember where every byte came from.
//!
//! A [`NormalizedText`] is built once per block and level. Matches found in the
//! normalized text map back to raw byte offsets through the stored table, so
//! the raw slice never starts or ends inside a stripped marker.

/// Inline emphasis markers removed at [`Level::Markup`] and above.
pub const EMPHASIS_MARKERS: &[&str] = &["**"];

/// Characters removed at [`Level::Punctuation`], in addition to whitespace.
pub const PUNCTUATION: &[char] = &[
    '，', '。', '、', '；', '：', '？', '！', '“', '”', '‘', '’', '（', '）', '《', '》', '【', '】',
    '「', '」', '…', '—', ',', '.', ';', ':', '?', '!', '"', '\'', '(', ')', '[', ']', '-',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Emphasis markers stripped.
    Markup,
    /// Emphasis markers, punctuation and whitespace stripped.
    Punctuation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    text: String,
    /// Raw byte range of the source char, one entry per normalized byte.
    origin: Vec<(usize, usize)>,
    raw_len: usize,
}

impl NormalizedText {
    pub fn new(raw: &str, level: Level) -> Self {
        let mut text = String::with_capacity(raw.len());
        let mut origin = Vec::with_capacity(raw.len());
        let mut i = 0;

        while i < raw.len() {
            let rest = &raw[i..];
            if let Some(marker) = EMPHASIS_MARKERS.iter().find(|m| rest.starts_with(**m)) {
                i += marker.len();
                continue;
            }
            // Loop invariant: `i` is on a char boundary and `rest` is non-empty.
            let Some(c) = rest.chars().next() else { break };
            let len = c.len_utf8();
            let drop = level == Level::Punctuation && (c.is_whitespace() || PUNCTUATION.contains(&c));
            if !drop {
                text.push(c);
                origin.extend(std::iter::repeat((i, i + len)).take(len));
            }
            i += len;
        }

        Self {
            text,
            origin,
            raw_len: raw.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Translate a normalized byte range `[start, end)` into a raw byte range.
    ///
    /// `start` and `end` must be char boundaries of the normalized text. The
    /// result begins at the first kept char and ends after the last one.
    pub fn to_raw(&self, start: usize, end: usize) -> (usize, usize) {
        if start >= end {
            let at = self.origin.get(start).map(|&(s, _)| s).unwrap_or(self.raw_len);
            return (at, at);
        }
        (self.origin[start].0, self.origin[end - 1].1)
    }
}

/// Strip emphasis markers from a string.
pub fn strip_markup(s: &str) -> String {
    NormalizedText::new(s, Level::Markup).text
}
