// Cross-season, cross-filter and per-day aggregation.
//
// Each operation issues its requests one at a time through a `StatsSource`,
// waiting the configured delay between consecutive requests, and folds the
// results with the core summation engine. A failed request aborts the whole
// operation and nothing fetched so far is returned.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use ptstats_core::{
    sum_shot_totals, sum_totals, EntityIdentity, GroupingMode, RawRow, RecordContext,
    RecordError, ShotCounts, ShotStatRecord, StatCategory, StatRecord, SummationError,
};
use tracing::{debug, info};

use crate::http::FetchError;
use crate::params::{
    EntityType, PerMode, SeasonType, ShotEntity, ShotFilters, ShotRequest, TrackingFilters,
    TrackingRequest,
};
use crate::schedule::{season_from_game_id, season_type_from_game_id};
use crate::source::{GameDayMetadata, GameResolver, StatsSource};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Summation(#[from] SummationError),

    #[error("{season}: entity {entity_id} has filtered shots but no overall shot totals")]
    MissingOverallDenominator { season: String, entity_id: i64 },

    #[error("no game on {date} for team {team_id:?}")]
    MissingGameMetadata {
        date: NaiveDate,
        team_id: Option<i64>,
    },

    #[error("date range starts after it ends: {from} > {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },

    #[error("cannot derive season or season type from game id {game_id:?}")]
    UnrecognizedGameId { game_id: String },

    #[error("game logs need a game resolver or pre-resolved game metadata")]
    MissingResolver,
}

/// Label stamped on every record of one `(season, season_type)` fetch.
pub fn season_label(season: &str, season_type: SeasonType) -> String {
    format!("{season} {season_type}")
}

// ---------------------------------------------------------------------------
// Request pacing
// ---------------------------------------------------------------------------

/// Sleeps before every request of an operation except the first.
struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    async fn wait(&mut self) {
        if self.started && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

pub struct Aggregator<S> {
    source: S,
    resolver: Option<Arc<dyn GameResolver>>,
    delay: Duration,
}

impl<S: StatsSource> Aggregator<S> {
    pub fn new(source: S, delay: Duration) -> Self {
        Self {
            source,
            resolver: None,
            delay,
        }
    }

    /// Resolver used by game-log generation to look up each day's games.
    pub fn with_resolver(mut self, resolver: Arc<dyn GameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    // -- Tracking stats -----------------------------------------------------

    /// One record collection per `(season, season_type)` pair, in request
    /// order, each record tagged with its season label.
    pub async fn tracking_stats(
        &self,
        category: StatCategory,
        seasons: &[String],
        season_types: &[SeasonType],
        entity: EntityType,
        filters: &TrackingFilters,
    ) -> Result<Vec<Vec<StatRecord>>, AggregateError> {
        let mut pacer = Pacer::new(self.delay);
        let mut collections = Vec::with_capacity(seasons.len() * season_types.len());
        for season in seasons {
            for &season_type in season_types {
                let mut request = TrackingRequest::new(category, season, season_type, entity);
                request.filters = filters.clone();
                collections.push(self.fetch_tracking(&mut pacer, &request).await?);
            }
        }
        Ok(collections)
    }

    /// Entity totals and the league total over every requested season.
    /// The league total is `None` only when no rows came back at all.
    pub async fn aggregate_full_season(
        &self,
        category: StatCategory,
        seasons: &[String],
        season_types: &[SeasonType],
        entity: EntityType,
        filters: &TrackingFilters,
    ) -> Result<(Vec<StatRecord>, Option<StatRecord>), AggregateError> {
        info!(%category, ?seasons, ?season_types, entity = entity.as_str(), "aggregating tracking stats");
        let collections = self
            .tracking_stats(category, seasons, season_types, entity, filters)
            .await?;
        let refs: Vec<&[StatRecord]> = collections.iter().map(Vec::as_slice).collect();

        let entities = sum_totals(entity.grouping_mode(), &refs)?.into_vec();
        let league = sum_totals(GroupingMode::League, &refs)?.into_league();
        info!(entities = entities.len(), "tracking aggregation done");
        Ok((entities, league))
    }

    /// Per-day tracking records between two dates, inclusive, stamped with
    /// each entity's game id and opponent. Days without games produce no
    /// rows. `preresolved` is used for every day instead of asking the
    /// resolver.
    pub async fn generate_game_logs(
        &self,
        category: StatCategory,
        entity: EntityType,
        date_from: NaiveDate,
        date_to: NaiveDate,
        filters: &TrackingFilters,
        preresolved: Option<&GameDayMetadata>,
    ) -> Result<Vec<StatRecord>, AggregateError> {
        check_range(date_from, date_to)?;
        info!(%category, %date_from, %date_to, entity = entity.as_str(), "generating game logs");

        let mode = entity.grouping_mode();
        let mut pacer = Pacer::new(self.delay);
        let mut logs = Vec::new();
        for day in days(date_from, date_to) {
            let metadata = self.day_metadata(day, preresolved).await?;
            let Some((season, season_type)) = season_of_day(&metadata)? else {
                debug!(%day, "no games; skipping");
                continue;
            };

            let mut request = TrackingRequest::new(category, &season, season_type, entity);
            request.per_mode = PerMode::PerGame;
            request.filters = TrackingFilters {
                date_from: Some(day),
                date_to: Some(day),
                ..filters.clone()
            };
            let records = self.fetch_tracking(&mut pacer, &request).await?;

            for mut record in sum_totals(mode, &[records.as_slice()])?.into_vec() {
                stamp_game(&mut record.identity, &mut record.context, mode, &metadata, day)?;
                logs.push(record);
            }
        }
        info!(rows = logs.len(), "game logs done");
        Ok(logs)
    }

    // -- Shot stats ---------------------------------------------------------

    /// Per-season shot totals with overall denominators joined in. Every
    /// filter combination is fetched and summed, then one unfiltered request
    /// per season supplies `overall_*`.
    pub async fn shot_stats(
        &self,
        entity: ShotEntity,
        seasons: &[String],
        season_types: &[SeasonType],
        filters: &ShotFilters,
    ) -> Result<Vec<ShotStatRecord>, AggregateError> {
        let mut pacer = Pacer::new(self.delay);
        let mut stats = Vec::new();
        for season in seasons {
            for &season_type in season_types {
                stats.extend(
                    self.season_shot_stats(&mut pacer, entity, season, season_type, filters)
                        .await?,
                );
            }
        }
        Ok(stats)
    }

    /// Shot totals per entity over every requested season, plus the league
    /// total, which always exists.
    pub async fn aggregate_full_season_shots(
        &self,
        entity: ShotEntity,
        seasons: &[String],
        season_types: &[SeasonType],
        filters: &ShotFilters,
    ) -> Result<(Vec<ShotStatRecord>, ShotStatRecord), AggregateError> {
        info!(?entity, ?seasons, ?season_types, "aggregating shot stats");
        let stats = self
            .shot_stats(entity, seasons, season_types, filters)
            .await?;

        let entities = sum_shot_totals(entity.grouping_mode(), &[stats.as_slice()])?.into_vec();
        let league = sum_shot_totals(GroupingMode::League, &[stats.as_slice()])?
            .into_league()
            .unwrap_or_else(|| ShotStatRecord::new(EntityIdentity::league(), ShotCounts::default()));
        info!(entities = entities.len(), "shot aggregation done");
        Ok((entities, league))
    }

    /// Per-day shot records between two dates, inclusive. Same day handling
    /// as [`Aggregator::generate_game_logs`].
    pub async fn generate_shot_game_logs(
        &self,
        entity: ShotEntity,
        date_from: NaiveDate,
        date_to: NaiveDate,
        filters: &ShotFilters,
        preresolved: Option<&GameDayMetadata>,
    ) -> Result<Vec<ShotStatRecord>, AggregateError> {
        check_range(date_from, date_to)?;
        info!(?entity, %date_from, %date_to, "generating shot game logs");

        let mode = entity.grouping_mode();
        let mut pacer = Pacer::new(self.delay);
        let mut logs = Vec::new();
        for day in days(date_from, date_to) {
            let metadata = self.day_metadata(day, preresolved).await?;
            let Some((season, season_type)) = season_of_day(&metadata)? else {
                debug!(%day, "no games; skipping");
                continue;
            };

            let day_stats = self
                .season_shot_stats(&mut pacer, entity, &season, season_type, &filters.for_day(day))
                .await?;

            for mut record in sum_shot_totals(mode, &[day_stats.as_slice()])?.into_vec() {
                stamp_game(&mut record.identity, &mut record.context, mode, &metadata, day)?;
                logs.push(record);
            }
        }
        info!(rows = logs.len(), "shot game logs done");
        Ok(logs)
    }

    // -- Internals ----------------------------------------------------------

    async fn fetch_tracking(
        &self,
        pacer: &mut Pacer,
        request: &TrackingRequest,
    ) -> Result<Vec<StatRecord>, AggregateError> {
        pacer.wait().await;
        let rows = self.source.fetch_tracking(request).await?;
        let label = season_label(&request.season, request.season_type);
        debug!(season = %label, rows = rows.len(), "tracking rows");
        let records = rows
            .iter()
            .map(|row| StatRecord::from_row(request.category, row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records
            .into_iter()
            .map(|mut record| {
                record.context.season = Some(label.clone());
                record
            })
            .collect())
    }

    async fn fetch_shots(
        &self,
        pacer: &mut Pacer,
        request: &ShotRequest,
    ) -> Result<Vec<ShotStatRecord>, AggregateError> {
        pacer.wait().await;
        let rows = self.source.fetch_shots(request).await?;
        debug!(season = %request.season, rows = rows.len(), filter = ?request.filter, "shot rows");
        Ok(parse_shot_rows(&rows)?)
    }

    async fn season_shot_stats(
        &self,
        pacer: &mut Pacer,
        entity: ShotEntity,
        season: &str,
        season_type: SeasonType,
        filters: &ShotFilters,
    ) -> Result<Vec<ShotStatRecord>, AggregateError> {
        let mode = entity.grouping_mode();
        let label = season_label(season, season_type);

        let mut collections = Vec::new();
        for filter in filters.combinations() {
            let request = ShotRequest::filtered(entity, season, season_type, filter, filters);
            collections.push(self.fetch_shots(pacer, &request).await?);
        }
        let refs: Vec<&[ShotStatRecord]> = collections.iter().map(Vec::as_slice).collect();
        let totals = sum_shot_totals(mode, &refs)?.into_vec();

        let overall_request = ShotRequest::overall(entity, season, season_type, filters);
        let overall: HashMap<i64, ShotCounts> = self
            .fetch_shots(pacer, &overall_request)
            .await?
            .into_iter()
            .filter_map(|r| mode.entity_key(&r.identity).map(|key| (key, r.counts)))
            .collect();

        totals
            .into_iter()
            .map(|record| -> Result<ShotStatRecord, AggregateError> {
                let entity_id =
                    mode.entity_key(&record.identity)
                        .ok_or(SummationError::MissingEntityKey {
                            mode,
                            key: mode.key_column().unwrap_or_default(),
                        })?;
                let counts = overall.get(&entity_id).ok_or_else(|| {
                    AggregateError::MissingOverallDenominator {
                        season: label.clone(),
                        entity_id,
                    }
                })?;
                let mut joined = record.with_overall(counts);
                joined.context.season = Some(label.clone());
                Ok(joined)
            })
            .collect()
    }

    async fn day_metadata(
        &self,
        day: NaiveDate,
        preresolved: Option<&GameDayMetadata>,
    ) -> Result<GameDayMetadata, AggregateError> {
        if let Some(metadata) = preresolved {
            return Ok(metadata.clone());
        }
        let resolver = self.resolver.as_ref().ok_or(AggregateError::MissingResolver)?;
        Ok(resolver.resolve(day).await?)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_shot_rows(rows: &[RawRow]) -> Result<Vec<ShotStatRecord>, RecordError> {
    rows.iter().map(ShotStatRecord::from_row).collect()
}

fn check_range(from: NaiveDate, to: NaiveDate) -> Result<(), AggregateError> {
    if from > to {
        return Err(AggregateError::InvalidDateRange { from, to });
    }
    Ok(())
}

fn days(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |day| *day <= to)
}

/// Season and season type of a day, read from its first game. `None` when no
/// games were played.
fn season_of_day(
    metadata: &GameDayMetadata,
) -> Result<Option<(String, SeasonType)>, AggregateError> {
    let Some(game_id) = metadata.first_game_id() else {
        return Ok(None);
    };
    let unrecognized = || AggregateError::UnrecognizedGameId {
        game_id: game_id.to_string(),
    };
    let season = season_from_game_id(game_id).ok_or_else(unrecognized)?;
    let season_type = season_type_from_game_id(game_id).ok_or_else(unrecognized)?;
    Ok(Some((season, season_type)))
}

/// Fill in a day record's game id and opponent. Player rows carry the
/// player's latest team, so the boxscore team wins when there is one.
fn stamp_game(
    identity: &mut EntityIdentity,
    context: &mut RecordContext,
    mode: GroupingMode,
    metadata: &GameDayMetadata,
    date: NaiveDate,
) -> Result<(), AggregateError> {
    if mode == GroupingMode::Player {
        if let Some(&team_id) = identity
            .player_id
            .and_then(|player_id| metadata.player_teams.get(&player_id))
        {
            identity.team_id = Some(team_id);
        }
    }

    let team_id = identity
        .team_id
        .ok_or(AggregateError::MissingGameMetadata {
            date,
            team_id: None,
        })?;
    let (game_id, opponent) =
        metadata
            .game_for_team(team_id)
            .ok_or(AggregateError::MissingGameMetadata {
                date,
                team_id: Some(team_id),
            })?;
    context.game_id = Some(game_id.to_string());
    context.opponent_team_id = Some(opponent);
    Ok(())
}
