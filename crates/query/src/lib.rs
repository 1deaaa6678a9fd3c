pub mod ranker;
pub mod search;
pub mod suggest;

pub use ranker::{Boosts, Candidate, HybridRanker, RankedResult, RankingContext, RankingFactors, SearchMode};
pub use search::{HybridSearchEngine, SearchQuery, SearchResponse, SearchSettings};
pub use suggest::{DEFAULT_SUGGESTION_LIMIT, Suggestion, SuggestionKind, suggest};
