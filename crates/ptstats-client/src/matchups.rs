// Per-game defensive matchups from `boxscorematchupsv3`.
//
// Each team lists its offensive players; every player's `matchups` are the
// defenders who guarded them, with the possessions and shots they shared.

use ptstats_core::schema::ratio;
use serde::Deserialize;
use tracing::debug;

use crate::http::{FetchError, NbaStatsClient};

pub const MATCHUPS_ENDPOINT: &str = "boxscorematchupsv3";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupStatistics {
    /// `"M:SS"` as displayed upstream.
    #[serde(rename = "matchupMinutes")]
    pub minutes: String,
    /// Shared time on court in seconds.
    #[serde(rename = "matchupMinutesSort")]
    pub seconds: f64,
    pub partial_possessions: f64,
    pub percentage_defender_total_time: f64,
    pub percentage_offensive_total_time: f64,
    pub percentage_total_time_both_on: f64,
    pub switches_on: u32,
    pub player_points: u32,
    pub team_points: u32,
    #[serde(rename = "matchupAssists")]
    pub assists: u32,
    #[serde(rename = "matchupPotentialAssists")]
    pub potential_assists: u32,
    #[serde(rename = "matchupTurnovers")]
    pub turnovers: u32,
    #[serde(rename = "matchupBlocks")]
    pub blocks: u32,
    #[serde(rename = "matchupFieldGoalsMade")]
    pub fgm: u32,
    #[serde(rename = "matchupFieldGoalsAttempted")]
    pub fga: u32,
    #[serde(rename = "matchupThreePointersMade")]
    pub fg3m: u32,
    #[serde(rename = "matchupThreePointersAttempted")]
    pub fg3a: u32,
    pub help_blocks: u32,
    #[serde(rename = "helpFieldGoalsMade")]
    pub help_fgm: u32,
    #[serde(rename = "helpFieldGoalsAttempted")]
    pub help_fga: u32,
    #[serde(rename = "matchupFreeThrowsMade")]
    pub ftm: u32,
    #[serde(rename = "matchupFreeThrowsAttempted")]
    pub fta: u32,
    pub shooting_fouls: u32,
}

impl MatchupStatistics {
    pub fn fg_pct(&self) -> f64 {
        ratio(self.fgm.into(), self.fga.into())
    }

    pub fn fg3_pct(&self) -> f64 {
        ratio(self.fg3m.into(), self.fg3a.into())
    }
}

/// A defender who guarded the enclosing player.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
    #[serde(rename = "personId")]
    pub player_id: i64,
    pub first_name: String,
    pub family_name: String,
    #[serde(rename = "nameI")]
    pub name_initial: String,
    pub player_slug: String,
    pub jersey_num: String,
    pub statistics: MatchupStatistics,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupPlayer {
    #[serde(rename = "personId")]
    pub player_id: Option<i64>,
    pub first_name: Option<String>,
    pub family_name: Option<String>,
    #[serde(rename = "nameI")]
    pub name_initial: Option<String>,
    pub player_slug: Option<String>,
    pub position: Option<String>,
    pub comment: Option<String>,
    pub jersey_num: Option<String>,
    #[serde(default)]
    pub matchups: Vec<Matchup>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupTeam {
    pub team_id: Option<i64>,
    pub team_city: Option<String>,
    pub team_name: Option<String>,
    pub team_tricode: Option<String>,
    pub team_slug: Option<String>,
    #[serde(default)]
    pub players: Vec<MatchupPlayer>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupResults {
    pub game_id: String,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_team: MatchupTeam,
    pub away_team: MatchupTeam,
}

impl MatchupResults {
    fn players(&self) -> impl Iterator<Item = &MatchupPlayer> {
        self.home_team
            .players
            .iter()
            .chain(self.away_team.players.iter())
    }

    /// The offensive player entry for `player_id`, on either team.
    pub fn player(&self, player_id: i64) -> Option<&MatchupPlayer> {
        self.players().find(|p| p.player_id == Some(player_id))
    }

    /// Every offensive player `defender_id` guarded, with the shared stats.
    pub fn matchups_for_defender(&self, defender_id: i64) -> Vec<(&MatchupPlayer, &Matchup)> {
        self.players()
            .flat_map(|player| {
                player
                    .matchups
                    .iter()
                    .filter(move |m| m.player_id == defender_id)
                    .map(move |m| (player, m))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct MatchupsEnvelope {
    #[serde(rename = "boxScoreMatchups")]
    box_score_matchups: MatchupResults,
}

fn parse_matchups(body: serde_json::Value) -> Result<MatchupResults, FetchError> {
    serde_json::from_value::<MatchupsEnvelope>(body)
        .map(|envelope| envelope.box_score_matchups)
        .map_err(|e| FetchError::Shape {
            endpoint: MATCHUPS_ENDPOINT.to_string(),
            message: e.to_string(),
        })
}

impl NbaStatsClient {
    pub async fn matchups(&self, game_id: &str) -> Result<MatchupResults, FetchError> {
        let body = self
            .get_json(
                MATCHUPS_ENDPOINT,
                &[
                    ("GameID", game_id),
                    ("startPeriod", "0"),
                    ("endPeriod", "10"),
                    ("rangeType", "0"),
                    ("startRange", "0"),
                    ("endRange", "55800"),
                ],
            )
            .await?;
        let results = parse_matchups(body)?;
        debug!(
            game_id,
            home_players = results.home_team.players.len(),
            away_players = results.away_team.players.len(),
            "fetched matchups"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn statistics(fgm: u32, fga: u32) -> Value {
        json!({
            "matchupMinutes": "0:31",
            "matchupMinutesSort": 31.0,
            "partialPossessions": 1.2,
            "percentageDefenderTotalTime": 0.8,
            "percentageOffensiveTotalTime": 0.9,
            "percentageTotalTimeBothOn": 1.0,
            "switchesOn": 0,
            "playerPoints": fgm * 2,
            "teamPoints": 4,
            "matchupAssists": 0,
            "matchupPotentialAssists": 1,
            "matchupTurnovers": 0,
            "matchupBlocks": 0,
            "matchupFieldGoalsMade": fgm,
            "matchupFieldGoalsAttempted": fga,
            "matchupThreePointersMade": 0,
            "matchupThreePointersAttempted": 0,
            "helpBlocks": 0,
            "helpFieldGoalsMade": 0,
            "helpFieldGoalsAttempted": 0,
            "matchupFreeThrowsMade": 0,
            "matchupFreeThrowsAttempted": 0,
            "shootingFouls": 0,
        })
    }

    fn defender(id: i64, stats: Value) -> Value {
        json!({
            "personId": id,
            "firstName": "Steven",
            "familyName": "Adams",
            "nameI": "S. Adams",
            "playerSlug": "steven-adams",
            "jerseyNum": "4",
            "statistics": stats,
        })
    }

    fn sample() -> Value {
        json!({
            "meta": { "version": 1 },
            "boxScoreMatchups": {
                "gameId": "0022100831",
                "awayTeamId": 1610612763,
                "homeTeamId": 1610612765,
                "homeTeam": {
                    "teamId": 1610612765,
                    "teamCity": "Detroit",
                    "teamName": "Pistons",
                    "teamTricode": "DET",
                    "teamSlug": "pistons",
                    "players": [
                        {
                            "personId": 1630180,
                            "firstName": "Saddiq",
                            "familyName": "Bey",
                            "nameI": "S. Bey",
                            "playerSlug": "saddiq-bey",
                            "position": "F",
                            "comment": "",
                            "jerseyNum": "41",
                            "matchups": [defender(203500, statistics(1, 1))],
                        },
                        {
                            "personId": 1630595,
                            "firstName": "Cade",
                            "familyName": "Cunningham",
                            "nameI": "C. Cunningham",
                            "playerSlug": "cade-cunningham",
                            "position": "G",
                            "comment": null,
                            "jerseyNum": "2",
                            "matchups": [
                                defender(1628991, statistics(0, 0)),
                                defender(203500, statistics(2, 5)),
                            ],
                        },
                    ],
                },
                "awayTeam": {
                    "teamId": 1610612763,
                    "teamCity": "Memphis",
                    "teamName": "Grizzlies",
                    "teamTricode": "MEM",
                    "teamSlug": "grizzlies",
                    "players": [],
                },
            },
        })
    }

    #[test]
    fn parses_teams_players_and_matchups() {
        let results = parse_matchups(sample()).unwrap();
        assert_eq!(results.game_id, "0022100831");
        assert_eq!(results.home_team_id, 1610612765);
        assert_eq!(results.home_team.players.len(), 2);

        let first = &results.home_team.players[0];
        assert_eq!(first.player_id, Some(1630180));
        assert_eq!(first.matchups[0].player_id, 203500);
        assert_eq!(first.matchups[0].statistics.minutes, "0:31");
        assert_eq!(first.matchups[0].statistics.seconds, 31.0);
        assert_eq!(results.home_team.players[1].comment, None);
    }

    #[test]
    fn defender_lookup_spans_all_offensive_players() {
        let results = parse_matchups(sample()).unwrap();
        let guarded = results.matchups_for_defender(203500);
        let ids: Vec<_> = guarded.iter().map(|(p, _)| p.player_id).collect();
        assert_eq!(ids, vec![Some(1630180), Some(1630595)]);
        assert_eq!(guarded[1].1.statistics.fga, 5);
        assert!(results.matchups_for_defender(1).is_empty());
    }

    #[test]
    fn player_lookup() {
        let results = parse_matchups(sample()).unwrap();
        let cade = results.player(1630595).unwrap();
        assert_eq!(cade.family_name.as_deref(), Some("Cunningham"));
        assert!(results.player(203500).is_none());
    }

    #[test]
    fn matchup_fg_pct_is_zero_without_attempts() {
        let results = parse_matchups(sample()).unwrap();
        let cade = results.player(1630595).unwrap();
        assert_eq!(cade.matchups[0].statistics.fg_pct(), 0.0);
        assert_eq!(cade.matchups[0].statistics.fg3_pct(), 0.0);
        assert!((cade.matchups[1].statistics.fg_pct() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn missing_envelope_is_a_shape_error() {
        let err = parse_matchups(json!({ "boxScore": {} })).unwrap_err();
        assert!(matches!(err, FetchError::Shape { ref endpoint, .. } if endpoint == MATCHUPS_ENDPOINT));
    }
}
