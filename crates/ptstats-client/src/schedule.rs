// Day schedules and game-id helpers.
//
// Game ids look like `0021900001`: the third digit is the season type and the
// fourth and fifth are the last two digits of the year the season started.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::http::{FetchError, NbaStatsClient};
use crate::params::SeasonType;
use crate::source::{GameDayMetadata, GameResolver};

pub const SCOREBOARD_ENDPOINT: &str = "scoreboardV3";
pub const BOXSCORE_ENDPOINT: &str = "boxscoretraditionalv3";

// ---------------------------------------------------------------------------
// Game-id helpers
// ---------------------------------------------------------------------------

/// Season label for a game id: `"0021900001"` is `"2019-20"`.
pub fn season_from_game_id(game_id: &str) -> Option<String> {
    let digits = game_id.as_bytes();
    if digits.len() < 5 || !digits[..5].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let start = u32::from(digits[3] - b'0') * 10 + u32::from(digits[4] - b'0');
    let end = (start + 1) % 100;
    Some(format!("20{start:02}-{end:02}"))
}

/// Season type for a game id: `2` regular season, `4` playoffs, `5` play-in.
pub fn season_type_from_game_id(game_id: &str) -> Option<SeasonType> {
    match game_id.as_bytes().get(2)? {
        b'2' => Some(SeasonType::RegularSeason),
        b'4' => Some(SeasonType::Playoffs),
        b'5' => Some(SeasonType::PlayIn),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ScoreboardEnvelope {
    scoreboard: Scoreboard,
}

#[derive(Debug, Deserialize)]
struct Scoreboard {
    #[serde(default)]
    games: Vec<ScoreboardGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreboardGame {
    game_id: String,
    home_team: TeamRef,
    away_team: TeamRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamRef {
    team_id: i64,
}

#[derive(Debug, Deserialize)]
struct BoxscoreEnvelope {
    #[serde(rename = "boxScoreTraditional")]
    box_score: Boxscore,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Boxscore {
    home_team: BoxscoreTeam,
    away_team: BoxscoreTeam,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoxscoreTeam {
    team_id: i64,
    #[serde(default)]
    players: Vec<BoxscorePlayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoxscorePlayer {
    person_id: i64,
}

fn decode<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    body: serde_json::Value,
) -> Result<T, FetchError> {
    serde_json::from_value(body).map_err(|e| FetchError::Shape {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

/// Games on the scoreboard, in order.
fn scoreboard_games(body: serde_json::Value) -> Result<Vec<(String, i64, i64)>, FetchError> {
    let envelope: ScoreboardEnvelope = decode(SCOREBOARD_ENDPOINT, body)?;
    Ok(envelope
        .scoreboard
        .games
        .into_iter()
        .map(|g| (g.game_id, g.home_team.team_id, g.away_team.team_id))
        .collect())
}

/// `(player_id, team_id)` for everyone listed in a boxscore.
fn boxscore_players(body: serde_json::Value) -> Result<Vec<(i64, i64)>, FetchError> {
    let envelope: BoxscoreEnvelope = decode(BOXSCORE_ENDPOINT, body)?;
    let b = envelope.box_score;
    Ok([b.away_team, b.home_team]
        .into_iter()
        .flat_map(|team| {
            let team_id = team.team_id;
            team.players.into_iter().map(move |p| (p.person_id, team_id))
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Resolver over HTTP
// ---------------------------------------------------------------------------

#[async_trait]
impl GameResolver for NbaStatsClient {
    async fn resolve(&self, date: NaiveDate) -> Result<GameDayMetadata, FetchError> {
        let game_date = date.format("%Y-%m-%d").to_string();
        let body = self
            .get_json(
                SCOREBOARD_ENDPOINT,
                &[("GameDate", game_date.as_str()), ("LeagueID", self.league_id())],
            )
            .await?;

        let mut day = GameDayMetadata::default();
        for (game_id, home, away) in scoreboard_games(body)? {
            day.add_game(&game_id, home, away);
        }

        for game_id in day.game_ids.clone() {
            let body = self
                .get_json(
                    BOXSCORE_ENDPOINT,
                    &[
                        ("GameID", game_id.as_str()),
                        ("StartPeriod", "0"),
                        ("EndPeriod", "10"),
                        ("RangeType", "2"),
                        ("StartRange", "0"),
                        ("EndRange", "55800"),
                        ("LeagueID", self.league_id()),
                    ],
                )
                .await?;
            for (player_id, team_id) in boxscore_players(body)? {
                day.add_player(player_id, team_id);
            }
        }

        debug!(
            %date,
            games = day.game_ids.len(),
            players = day.player_teams.len(),
            "resolved game day"
        );
        Ok(day)
    }
}
