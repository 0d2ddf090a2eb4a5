// Runs the aggregation job described by `[job]` and writes it as CSV.

use std::io::Write;

use anyhow::Context;
use ptstats_client::config::JobConfig;
use ptstats_client::{Aggregator, EntityType, JobKind, StatsSource};
use ptstats_core::StatCategory;
use tracing::info;

use crate::output::{write_shot_records, write_stat_records};

fn category(job: &JobConfig) -> anyhow::Result<StatCategory> {
    job.category.context("job.category is required for tracking jobs")
}

fn tracking_entity(job: &JobConfig) -> anyhow::Result<EntityType> {
    EntityType::try_from(job.entity).context("tracking jobs support player or team only")
}

fn date_range(job: &JobConfig) -> anyhow::Result<(chrono::NaiveDate, chrono::NaiveDate)> {
    let from = job.date_from.context("job.date_from is required for game logs")?;
    let to = job.date_to.context("job.date_to is required for game logs")?;
    Ok((from, to))
}

/// Run `job` and write its rows to `out`. Season and shot jobs end with the
/// league total row. Returns the number of data rows written.
pub async fn run_job<S: StatsSource, W: Write>(
    aggregator: &Aggregator<S>,
    job: &JobConfig,
    out: W,
) -> anyhow::Result<usize> {
    info!(kind = ?job.kind, "running job");
    let rows = match job.kind {
        JobKind::Season => {
            let category = category(job)?;
            let (mut records, league) = aggregator
                .aggregate_full_season(
                    category,
                    &job.seasons,
                    &job.season_types,
                    tracking_entity(job)?,
                    &job.tracking_filters(),
                )
                .await?;
            records.extend(league);
            write_stat_records(out, category, &records).context("failed to write CSV")?;
            records.len()
        }
        JobKind::GameLogs => {
            let category = category(job)?;
            let (from, to) = date_range(job)?;
            let records = aggregator
                .generate_game_logs(
                    category,
                    tracking_entity(job)?,
                    from,
                    to,
                    &job.tracking_filters(),
                    None,
                )
                .await?;
            write_stat_records(out, category, &records).context("failed to write CSV")?;
            records.len()
        }
        JobKind::Shots => {
            let (mut records, league) = aggregator
                .aggregate_full_season_shots(
                    job.entity,
                    &job.seasons,
                    &job.season_types,
                    &job.shot_filters(),
                )
                .await?;
            records.push(league);
            write_shot_records(out, &records).context("failed to write CSV")?;
            records.len()
        }
        JobKind::ShotGameLogs => {
            let (from, to) = date_range(job)?;
            let records = aggregator
                .generate_shot_game_logs(job.entity, from, to, &job.shot_filters(), None)
                .await?;
            write_shot_records(out, &records).context("failed to write CSV")?;
            records.len()
        }
    };
    info!(rows, "job finished");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use ptstats_client::config::parse_config;
    use ptstats_client::{FetchError, ShotRequest, TrackingRequest};
    use ptstats_core::RawRow;
    use serde_json::json;

    /// Answers every request with the same rows.
    struct CannedSource {
        rows: Vec<RawRow>,
        requests: Mutex<usize>,
    }

    impl CannedSource {
        fn new(rows: Vec<serde_json::Value>) -> Self {
            Self {
                rows: rows
                    .into_iter()
                    .map(|v| v.as_object().cloned().unwrap())
                    .collect(),
                requests: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl StatsSource for CannedSource {
        async fn fetch_tracking(&self, _: &TrackingRequest) -> Result<Vec<RawRow>, FetchError> {
            *self.requests.lock().unwrap() += 1;
            Ok(self.rows.clone())
        }

        async fn fetch_shots(&self, _: &ShotRequest) -> Result<Vec<RawRow>, FetchError> {
            *self.requests.lock().unwrap() += 1;
            Ok(self.rows.clone())
        }
    }

    fn job(toml: &str) -> JobConfig {
        let text = format!("[api]\nbase_url = \"http://localhost\"\n\n[job]\n{toml}");
        parse_config(&text).unwrap().job
    }

    #[tokio::test]
    async fn season_job_writes_entities_then_league() {
        let source = CannedSource::new(vec![
            json!({ "TEAM_ID": 1, "TEAM_ABBREVIATION": "ATL", "DRIVES": 10, "DRIVE_PTS": 8 }),
            json!({ "TEAM_ID": 2, "TEAM_ABBREVIATION": "BOS", "DRIVES": 20, "DRIVE_PTS": 12 }),
        ]);
        let aggregator = Aggregator::new(source, Duration::ZERO);
        let job = job(
            r#"kind = "season"
category = "drives"
entity = "team"
seasons = ["2018-19", "2019-20"]
season_types = ["Regular Season"]
output = "out.csv"
"#,
        );

        let mut out = Vec::new();
        let rows = run_job(&aggregator, &job, &mut out).await.unwrap();
        assert_eq!(rows, 3);
        assert_eq!(*aggregator.source().requests.lock().unwrap(), 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("ATL"));
        assert!(lines[3].contains("LEAGUE"));
    }

    #[tokio::test]
    async fn shot_job_appends_league_row() {
        let source = CannedSource::new(vec![json!({
            "PLAYER_ID": 2544,
            "PLAYER_NAME": "LeBron James",
            "PLAYER_LAST_TEAM_ID": 1610612747,
            "FGM": 5, "FGA": 10, "FG2M": 4, "FG2A": 6, "FG3M": 1, "FG3A": 4,
        })]);
        let aggregator = Aggregator::new(source, Duration::ZERO);
        let job = job(
            r#"kind = "shots"
entity = "player"
seasons = ["2019-20"]
season_types = ["Playoffs"]
output = "shots.csv"
"#,
        );

        let mut out = Vec::new();
        let rows = run_job(&aggregator, &job, &mut out).await.unwrap();
        assert_eq!(rows, 2);
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("2544,LeBron James,1610612747"));
    }

    #[tokio::test]
    async fn tracking_job_rejects_opponent_entity() {
        let aggregator = Aggregator::new(CannedSource::new(vec![]), Duration::ZERO);
        let job = job(
            r#"kind = "season"
category = "passing"
entity = "opponent"
seasons = ["2019-20"]
season_types = ["Regular Season"]
output = "out.csv"
"#,
        );
        assert!(run_job(&aggregator, &job, Vec::new()).await.is_err());
        assert_eq!(*aggregator.source().requests.lock().unwrap(), 0);
    }
}
