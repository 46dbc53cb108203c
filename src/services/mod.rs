pub mod candidates;
pub mod genre_stats;
pub mod heuristic;
pub mod preferences;
pub mod profiles;
pub mod providers;
pub mod recommendations;
pub mod similarity;
pub mod watch_history;

pub use preferences::PreferenceService;
pub use profiles::ProfileService;
pub use recommendations::{RankingOptions, RecommendationService, Recommendations, Strategy};
pub use similarity::SimilarityRanker;
pub use watch_history::{SweeperHandle, WatchHistory, WatchState};
