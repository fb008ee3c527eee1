pub mod locate;
pub mod normalize;
pub mod parser;
pub mod tooltip;

pub use locate::{locate, LocatorConfig, MatchResult, MatchStrategy, PreparedDocument};
pub use parser::{parse_citations, CitationToken, ParsedMessage, ResolvedCitation, Segment};
