//! Fuzzy location of a quoted span inside a document's blocks.
//!
//! Strategies are tried in order and the first one with any hit wins:
//! exact substring, markup-stripped, punctuation-stripped, then a prefix/suffix
//! window match for long quotes. Offsets in the result are byte offsets into
//! the winning block's `raw_text`.

use std::cmp::Reverse;

use tracing::debug;

use super::normalize::{Level, NormalizedText};
use crate::docs::types::Block;

/// Tuning for the fallback strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorConfig {
    /// Prefix/suffix window length, in chars.
    pub window_len: usize,
    /// Minimum partial-match score, out of 100.
    pub score_floor: u32,
    /// A partial span may be at most this many times the cleaned quote length.
    pub max_span_ratio: usize,
    /// Punctuation-stripped matching needs a cleaned quote longer than this.
    pub min_punct_len: usize,
    /// Partial matching needs a cleaned quote longer than this.
    pub min_partial_len: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            window_len: 10,
            score_floor: 30,
            max_span_ratio: 2,
            min_punct_len: 5,
            min_partial_len: 10,
        }
    }
}

impl LocatorConfig {
    /// Defaults overridden by `CITE_*` env vars.
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(key: &str, default: T) -> T {
            dotenv::var(key)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
        let d = Self::default();
        Self {
            window_len: var("CITE_WINDOW_LEN", d.window_len),
            score_floor: var("CITE_SCORE_FLOOR", d.score_floor),
            max_span_ratio: var("CITE_MAX_SPAN_RATIO", d.max_span_ratio),
            min_punct_len: var("CITE_MIN_PUNCT_LEN", d.min_punct_len),
            min_partial_len: var("CITE_MIN_PARTIAL_LEN", d.min_partial_len),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    MarkupNormalized,
    PunctuationNormalized,
    PrefixSuffixPartial,
    None,
}

impl MatchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::MarkupNormalized => "markup_normalized",
            MatchStrategy::PunctuationNormalized => "punctuation_normalized",
            MatchStrategy::PrefixSuffixPartial => "prefix_suffix_partial",
            MatchStrategy::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub found: bool,
    pub strategy: MatchStrategy,
    pub containing_block_id: String,
    pub start_offset: usize,
    pub end_offset: usize,
    /// 100 for the substring strategies, the window confidence for partial matches.
    pub score: u32,
}

impl MatchResult {
    pub fn not_found() -> Self {
        Self {
            found: false,
            strategy: MatchStrategy::None,
            containing_block_id: String::new(),
            start_offset: 0,
            end_offset: 0,
            score: 0,
        }
    }

    /// The matched slice of the block's raw text.
    pub fn slice<'a>(&self, raw_text: &'a str) -> Option<&'a str> {
        if !self.found {
            return None;
        }
        raw_text.get(self.start_offset..self.end_offset)
    }
}

/// A block with its normalized views built once up front.
#[derive(Debug, Clone)]
struct PreparedBlock {
    block: Block,
    markup: NormalizedText,
    punct: NormalizedText,
}

/// Candidate hit inside one block.
struct Hit {
    block_idx: usize,
    start: usize,
    end: usize,
    score: u32,
    /// Distance from the quote length; smaller is tighter.
    slack: usize,
}

impl Hit {
    /// Higher score first, then tighter, then earlier in the document.
    fn beats(&self, other: &Hit) -> bool {
        (Reverse(self.score), self.slack, self.block_idx)
            < (Reverse(other.score), other.slack, other.block_idx)
    }
}

/// A document's blocks ready for repeated lookups.
#[derive(Debug, Clone, Default)]
pub struct PreparedDocument {
    blocks: Vec<PreparedBlock>,
}

impl PreparedDocument {
    pub fn new(blocks: Vec<Block>) -> Self {
        let blocks = blocks
            .into_iter()
            .map(|block| PreparedBlock {
                markup: NormalizedText::new(&block.raw_text, Level::Markup),
                punct: NormalizedText::new(&block.raw_text, Level::Punctuation),
                block,
            })
            .collect();
        Self { blocks }
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().map(|b| &b.block)
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks().find(|b| b.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Find the best region for `quote`. Never fails; a miss is `found: false`.
    pub fn locate(&self, quote: &str, config: &LocatorConfig) -> MatchResult {
        if quote.trim().is_empty() {
            return MatchResult::not_found();
        }

        let result = self
            .exact(quote)
            .or_else(|| self.markup_normalized(quote))
            .or_else(|| self.punctuation_normalized(quote, config))
            .or_else(|| self.prefix_suffix(quote, config))
            .unwrap_or_else(MatchResult::not_found);

        debug!(
            strategy = result.strategy.as_str(),
            block = %result.containing_block_id,
            score = result.score,
            "citation located"
        );
        result
    }

    fn exact(&self, quote: &str) -> Option<MatchResult> {
        // Closeness is measured on markup-stripped lengths, like the later steps.
        let quote_len = NormalizedText::new(quote, Level::Markup).char_len();
        let best = self.best_hit(|idx, b| {
            let start = b.block.raw_text.find(quote)?;
            Some(Hit {
                block_idx: idx,
                start,
                end: start + quote.len(),
                score: 100,
                slack: b.markup.char_len().abs_diff(quote_len),
            })
        })?;
        Some(self.result(best, MatchStrategy::Exact))
    }

    fn markup_normalized(&self, quote: &str) -> Option<MatchResult> {
        let q = NormalizedText::new(quote, Level::Markup);
        if q.as_str().is_empty() {
            return None;
        }
        let best = self.best_hit(|idx, b| substring_hit(idx, &b.markup, &q))?;
        Some(self.mapped_result(best, MatchStrategy::MarkupNormalized, |b| &b.markup))
    }

    fn punctuation_normalized(&self, quote: &str, config: &LocatorConfig) -> Option<MatchResult> {
        let q = NormalizedText::new(quote, Level::Punctuation);
        if q.char_len() <= config.min_punct_len {
            return None;
        }
        let best = self.best_hit(|idx, b| substring_hit(idx, &b.punct, &q))?;
        Some(self.mapped_result(best, MatchStrategy::PunctuationNormalized, |b| &b.punct))
    }

    fn prefix_suffix(&self, quote: &str, config: &LocatorConfig) -> Option<MatchResult> {
        let q = NormalizedText::new(quote, Level::Punctuation);
        let q_len = q.char_len();
        if q_len <= config.min_partial_len || config.window_len == 0 {
            return None;
        }
        let window = config.window_len.min(q_len);
        let prefix = char_prefix(q.as_str(), window);
        let suffix = char_suffix(q.as_str(), window);

        let matched = (2 * window).min(q_len);
        let score = (matched * 100 / q_len) as u32;
        if score < config.score_floor {
            return None;
        }
        let max_span = config.max_span_ratio * q_len;

        // The suffix may not start before it does in the quote; when the two
        // windows overlap that is inside the prefix, otherwise after it.
        let suffix_offset = (q.as_str().len() - suffix.len()).min(prefix.len());

        let best = self.best_hit(|idx, b| {
            let text = b.punct.as_str();
            for ps in occurrences(text, prefix, 0) {
                for ss in occurrences(text, suffix, ps + suffix_offset) {
                    let se = ss + suffix.len();
                    let span = text[ps..se].chars().count();
                    if span > max_span {
                        // Later suffix occurrences only get longer.
                        break;
                    }
                    return Some(Hit {
                        block_idx: idx,
                        start: ps,
                        end: se,
                        score,
                        slack: span.abs_diff(q_len),
                    });
                }
            }
            None
        })?;
        Some(self.mapped_result(best, MatchStrategy::PrefixSuffixPartial, |b| &b.punct))
    }

    fn best_hit(&self, mut hit: impl FnMut(usize, &PreparedBlock) -> Option<Hit>) -> Option<Hit> {
        let mut best: Option<Hit> = None;
        for (idx, block) in self.blocks.iter().enumerate() {
            let Some(candidate) = hit(idx, block) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                best = Some(candidate);
            }
        }
        best
    }

    fn result(&self, hit: Hit, strategy: MatchStrategy) -> MatchResult {
        MatchResult {
            found: true,
            strategy,
            containing_block_id: self.blocks[hit.block_idx].block.id.clone(),
            start_offset: hit.start,
            end_offset: hit.end,
            score: hit.score,
        }
    }

    fn mapped_result(
        &self,
        hit: Hit,
        strategy: MatchStrategy,
        view: impl Fn(&PreparedBlock) -> &NormalizedText,
    ) -> MatchResult {
        let (start, end) = view(&self.blocks[hit.block_idx]).to_raw(hit.start, hit.end);
        self.result(
            Hit {
                start,
                end,
                ..hit
            },
            strategy,
        )
    }
}

fn substring_hit(idx: usize, text: &NormalizedText, quote: &NormalizedText) -> Option<Hit> {
    let start = text.as_str().find(quote.as_str())?;
    Some(Hit {
        block_idx: idx,
        start,
        end: start + quote.as_str().len(),
        score: 100,
        slack: text.char_len().abs_diff(quote.char_len()),
    })
}

/// Start offsets of `pat` in `text` at or after `from`, overlaps included.
fn occurrences<'a>(text: &'a str, pat: &'a str, from: usize) -> impl Iterator<Item = usize> + 'a {
    let mut pos = from;
    std::iter::from_fn(move || {
        let at = pos + text.get(pos..)?.find(pat)?;
        pos = at + text[at..].chars().next().map_or(1, char::len_utf8);
        Some(at)
    })
}

fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn char_suffix(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if n >= count {
        return s;
    }
    match s.char_indices().nth(count - n) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// One-shot lookup over a block list.
pub fn locate(quote: &str, blocks: &[Block], config: &LocatorConfig) -> MatchResult {
    PreparedDocument::new(blocks.to_vec()).locate(quote, config)
}
