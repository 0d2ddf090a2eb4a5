// stats.nba.com client: configuration, transport, request parameters and the
// aggregation operations built on top of them.

pub mod aggregate;
pub mod config;
pub mod http;
pub mod matchups;
pub mod params;
pub mod response;
pub mod schedule;
pub mod source;

pub use aggregate::{season_label, AggregateError, Aggregator};
pub use config::{load_config, Config, ConfigError, JobKind};
pub use http::{FetchError, NbaStatsClient};
pub use matchups::MatchupResults;
pub use params::{
    EntityType, SeasonType, ShotEntity, ShotFilter, ShotFilters, ShotRequest, TrackingFilters,
    TrackingRequest,
};
pub use schedule::{season_from_game_id, season_type_from_game_id};
pub use source::{GameDayMetadata, GameResolver, StatsSource};
