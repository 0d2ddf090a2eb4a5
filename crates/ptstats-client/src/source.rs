// Collaborator seams for the aggregation layer.
//
// `StatsSource` fetches raw dashboard rows; `GameResolver` maps a calendar day
// to the games played on it. `NbaStatsClient` implements both over HTTP and
// tests substitute in-memory fakes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use ptstats_core::RawRow;
use tracing::debug;

use crate::http::{FetchError, NbaStatsClient};
use crate::params::{ShotRequest, TrackingRequest};
use crate::response::result_set_rows;

pub const TRACKING_ENDPOINT: &str = "leaguedashptstats";

#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Rows of one `leaguedashptstats` request.
    async fn fetch_tracking(&self, request: &TrackingRequest) -> Result<Vec<RawRow>, FetchError>;

    /// Rows of one shot dashboard request.
    async fn fetch_shots(&self, request: &ShotRequest) -> Result<Vec<RawRow>, FetchError>;
}

#[async_trait]
pub trait GameResolver: Send + Sync {
    async fn resolve(&self, date: NaiveDate) -> Result<GameDayMetadata, FetchError>;
}

#[async_trait]
impl StatsSource for NbaStatsClient {
    async fn fetch_tracking(&self, request: &TrackingRequest) -> Result<Vec<RawRow>, FetchError> {
        let body = self
            .get_json(TRACKING_ENDPOINT, &request.query(self.league_id()))
            .await?;
        let rows = result_set_rows(TRACKING_ENDPOINT, body, 0)?;
        debug!(
            category = %request.category,
            season = %request.season,
            rows = rows.len(),
            "fetched tracking rows"
        );
        Ok(rows)
    }

    async fn fetch_shots(&self, request: &ShotRequest) -> Result<Vec<RawRow>, FetchError> {
        let endpoint = request.entity.endpoint();
        let body = self
            .get_json(endpoint, &request.query(self.league_id()))
            .await?;
        let rows = result_set_rows(endpoint, body, 0)?;
        debug!(endpoint, season = %request.season, rows = rows.len(), "fetched shot rows");
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// GameDayMetadata
// ---------------------------------------------------------------------------

/// Who played whom on one day, and which team each player suited up for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameDayMetadata {
    /// Game ids in scoreboard order.
    pub game_ids: Vec<String>,
    pub team_game_ids: HashMap<i64, String>,
    pub team_opponents: HashMap<i64, i64>,
    pub player_teams: HashMap<i64, i64>,
}

impl GameDayMetadata {
    pub fn add_game(&mut self, game_id: &str, home_team_id: i64, away_team_id: i64) {
        self.game_ids.push(game_id.to_string());
        self.team_game_ids.insert(home_team_id, game_id.to_string());
        self.team_game_ids.insert(away_team_id, game_id.to_string());
        self.team_opponents.insert(home_team_id, away_team_id);
        self.team_opponents.insert(away_team_id, home_team_id);
    }

    pub fn add_player(&mut self, player_id: i64, team_id: i64) {
        self.player_teams.insert(player_id, team_id);
    }

    pub fn has_games(&self) -> bool {
        self.first_game_id().is_some()
    }

    /// First scoreboard game, or the lowest game id in `team_game_ids` when
    /// only the team maps were filled in.
    pub fn first_game_id(&self) -> Option<&str> {
        match self.game_ids.first() {
            Some(game_id) => Some(game_id.as_str()),
            None => self.team_game_ids.values().min().map(String::as_str),
        }
    }

    /// `(game_id, opponent_team_id)` for a team playing that day.
    pub fn game_for_team(&self, team_id: i64) -> Option<(&str, i64)> {
        let game_id = self.team_game_ids.get(&team_id)?;
        let opponent = self.team_opponents.get(&team_id)?;
        Some((game_id.as_str(), *opponent))
    }
}
