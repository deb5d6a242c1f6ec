//! Classification cache, classifier (AI + rule fallback), and stats
//! aggregation for the alert classification & publishing service.

pub mod cache;
pub mod classifier;
pub mod provider;
pub mod rules;
pub mod stats;

pub use cache::{ClassificationCache, DEFAULT_RESULT_TTL};
pub use classifier::{ClassifierService, ClassifyOptions, DEFAULT_CLASSIFY_TIMEOUT};
pub use provider::{ClassificationProvider, HangingProvider, HttpClassificationProvider, UnavailableProvider};
pub use rules::classify_fallback;
pub use stats::{
    CacheStats, ClassifierCounters, ErrorStats, FallbackStats, LlmStats, SeverityCounts,
    SeverityStats, StatsAggregator, StatsResponse, zeroed_stats_response,
};
