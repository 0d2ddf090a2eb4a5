// Query parameters for the stats.nba.com dashboard endpoints.
//
// Every enum here maps one-to-one onto the exact string the upstream API
// expects. `""` is the upstream spelling of "no filter".

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use ptstats_core::{GroupingMode, StatCategory};
use serde::{Deserialize, Deserializer};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value: {value:?}")]
pub struct ParamError {
    pub kind: &'static str,
    pub value: String,
}

/// Format used for `DateFrom` / `DateTo`.
pub const QUERY_DATE_FORMAT: &str = "%m/%d/%Y";

pub fn format_query_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(QUERY_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Upstream value enums
// ---------------------------------------------------------------------------

/// Declare an enum whose variants serialize to fixed upstream strings, with
/// `as_str`, `ALL`, `Display`, `FromStr` and string `Deserialize`.
macro_rules! upstream_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $variant:ident => $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $value ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParamError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| ParamError {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

upstream_enum! {
    PerMode, "PerMode" {
        Totals => "Totals",
        PerGame => "PerGame",
    }
}

upstream_enum! {
    Location, "Location" {
        Any => "",
        Home => "Home",
        Road => "Road",
    }
}

upstream_enum! {
    /// Distance of the closest defender at the time of the shot.
    CloseDefDist, "CloseDefDistRange" {
        All => "",
        VeryTight => "0-2 Feet - Very Tight",
        Tight => "2-4 Feet - Tight",
        Open => "4-6 Feet - Open",
        WideOpen => "6+ Feet - Wide Open",
    }
}

upstream_enum! {
    ShotClock, "ShotClockRange" {
        All => "",
        Clock24To22 => "24-22",
        VeryEarly => "22-18 Very Early",
        Early => "18-15 Early",
        Average => "15-7 Average",
        Late => "7-4 Late",
        VeryLate => "4-0 Very Late",
        Off => "ShotClock Off",
    }
}

upstream_enum! {
    ShotDist, "ShotDistRange" {
        All => "",
        TenFeetOrMore => ">=10.0",
    }
}

upstream_enum! {
    TouchTime, "TouchTimeRange" {
        All => "",
        UnderTwoSeconds => "Touch < 2 Seconds",
        TwoToSixSeconds => "Touch 2-6 Seconds",
        SixPlusSeconds => "Touch 6+ Seconds",
    }
}

upstream_enum! {
    Dribbles, "DribbleRange" {
        All => "",
        Zero => "0 Dribbles",
        One => "1 Dribble",
        Two => "2 Dribbles",
        ThreeToSix => "3-6 Dribbles",
        SevenPlus => "7+ Dribbles",
    }
}

upstream_enum! {
    GeneralRange, "GeneralRange" {
        Overall => "Overall",
        CatchAndShoot => "Catch and Shoot",
        Pullups => "Pullups",
        UnderTenFeet => "Less Than 10 ft",
    }
}

// ---------------------------------------------------------------------------
// Season types and entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeasonType {
    RegularSeason,
    Playoffs,
    PlayIn,
}

impl SeasonType {
    pub fn as_str(self) -> &'static str {
        match self {
            SeasonType::RegularSeason => "Regular Season",
            SeasonType::Playoffs => "Playoffs",
            SeasonType::PlayIn => "PlayIn",
        }
    }
}

impl fmt::Display for SeasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeasonType {
    type Err = ParamError;

    /// Accepts the upstream spelling, ignoring case and spaces, so
    /// `"Play In"` and `"regular season"` both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squashed: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match squashed.as_str() {
            "regularseason" => Ok(SeasonType::RegularSeason),
            "playoffs" => Ok(SeasonType::Playoffs),
            "playin" => Ok(SeasonType::PlayIn),
            _ => Err(ParamError {
                kind: "SeasonType",
                value: s.to_string(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for SeasonType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `PlayerOrTeam` for the tracking endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Player,
    Team,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Player => "Player",
            EntityType::Team => "Team",
        }
    }

    pub fn grouping_mode(self) -> GroupingMode {
        match self {
            EntityType::Player => GroupingMode::Player,
            EntityType::Team => GroupingMode::Team,
        }
    }
}

impl TryFrom<ShotEntity> for EntityType {
    type Error = ParamError;

    fn try_from(entity: ShotEntity) -> Result<Self, Self::Error> {
        match entity {
            ShotEntity::Player => Ok(EntityType::Player),
            ShotEntity::Team => Ok(EntityType::Team),
            ShotEntity::Opponent => Err(ParamError {
                kind: "PlayerOrTeam",
                value: "opponent".to_string(),
            }),
        }
    }
}

/// Which shot dashboard to query. Each has its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShotEntity {
    Player,
    Team,
    Opponent,
}

impl ShotEntity {
    pub fn endpoint(self) -> &'static str {
        match self {
            ShotEntity::Player => "leaguedashplayerptshot",
            ShotEntity::Team => "leaguedashteamptshot",
            ShotEntity::Opponent => "leaguedashoppptshot",
        }
    }

    pub fn grouping_mode(self) -> GroupingMode {
        match self {
            ShotEntity::Player => GroupingMode::Player,
            ShotEntity::Team => GroupingMode::Team,
            ShotEntity::Opponent => GroupingMode::Opponent,
        }
    }
}

// ---------------------------------------------------------------------------
// Tracking requests
// ---------------------------------------------------------------------------

/// Optional filters shared by every tracking request of one aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingFilters {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub opponent_team_id: Option<i64>,
    pub location: Option<Location>,
}

/// One `leaguedashptstats` request.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingRequest {
    pub category: StatCategory,
    pub season: String,
    pub season_type: SeasonType,
    pub entity: EntityType,
    pub per_mode: PerMode,
    pub filters: TrackingFilters,
}

impl TrackingRequest {
    pub fn new(
        category: StatCategory,
        season: &str,
        season_type: SeasonType,
        entity: EntityType,
    ) -> Self {
        Self {
            category,
            season: season.to_string(),
            season_type,
            entity,
            per_mode: PerMode::Totals,
            filters: TrackingFilters::default(),
        }
    }

    /// Full query string, including the keys the endpoint rejects requests
    /// without.
    pub fn query(&self, league_id: &str) -> Vec<(&'static str, String)> {
        let f = &self.filters;
        vec![
            ("PlayerOrTeam", self.entity.as_str().to_string()),
            ("PtMeasureType", self.category.measure_type().to_string()),
            ("Season", self.season.clone()),
            ("SeasonType", self.season_type.to_string()),
            ("PerMode", self.per_mode.to_string()),
            ("LeagueID", league_id.to_string()),
            ("DateFrom", format_query_date(f.date_from)),
            ("DateTo", format_query_date(f.date_to)),
            ("OpponentTeamID", f.opponent_team_id.unwrap_or(0).to_string()),
            ("Location", f.location.unwrap_or(Location::Any).to_string()),
            ("GameScope", String::new()),
            ("LastNGames", "0".to_string()),
            ("Month", "0".to_string()),
            ("Outcome", String::new()),
            ("PlayerExperience", String::new()),
            ("PlayerPosition", String::new()),
            ("SeasonSegment", String::new()),
            ("StarterBench", String::new()),
            ("VsConference", String::new()),
            ("VsDivision", String::new()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Shot requests
// ---------------------------------------------------------------------------

/// One point in the shot filter space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShotFilter {
    pub close_def_dist: CloseDefDist,
    pub shot_clock: ShotClock,
    pub shot_dist: ShotDist,
    pub touch_time: TouchTime,
    pub dribbles: Dribbles,
    pub general_range: GeneralRange,
    pub period: Option<u8>,
}

impl Default for ShotFilter {
    fn default() -> Self {
        Self {
            close_def_dist: CloseDefDist::All,
            shot_clock: ShotClock::All,
            shot_dist: ShotDist::All,
            touch_time: TouchTime::All,
            dribbles: Dribbles::All,
            general_range: GeneralRange::Overall,
            period: None,
        }
    }
}

/// Requested values per shot filter dimension. Each aggregation issues one
/// request per element of the cartesian product. An empty dimension is
/// treated as "no filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShotFilters {
    pub close_def_dist: Vec<CloseDefDist>,
    pub shot_clock: Vec<ShotClock>,
    pub shot_dist: Vec<ShotDist>,
    pub touch_time: Vec<TouchTime>,
    pub dribbles: Vec<Dribbles>,
    pub general_range: Vec<GeneralRange>,
    pub period: Vec<u8>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub location: Option<Location>,
}

fn or_default<T: Copy>(values: &[T], default: T) -> Vec<T> {
    if values.is_empty() {
        vec![default]
    } else {
        values.to_vec()
    }
}

impl ShotFilters {
    /// Every filter combination, in nested dimension order.
    pub fn combinations(&self) -> Vec<ShotFilter> {
        let base = ShotFilter::default();
        let periods: Vec<Option<u8>> = if self.period.is_empty() {
            vec![None]
        } else {
            self.period.iter().copied().map(Some).collect()
        };

        let mut combos = Vec::new();
        for close_def_dist in or_default(&self.close_def_dist, base.close_def_dist) {
            for shot_clock in or_default(&self.shot_clock, base.shot_clock) {
                for shot_dist in or_default(&self.shot_dist, base.shot_dist) {
                    for touch_time in or_default(&self.touch_time, base.touch_time) {
                        for dribbles in or_default(&self.dribbles, base.dribbles) {
                            for general_range in
                                or_default(&self.general_range, base.general_range)
                            {
                                for &period in &periods {
                                    combos.push(ShotFilter {
                                        close_def_dist,
                                        shot_clock,
                                        shot_dist,
                                        touch_time,
                                        dribbles,
                                        general_range,
                                        period,
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
        combos
    }

    /// Same filters narrowed to a single day.
    pub fn for_day(&self, day: NaiveDate) -> Self {
        Self {
            date_from: Some(day),
            date_to: Some(day),
            ..self.clone()
        }
    }
}

/// One shot dashboard request.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotRequest {
    pub entity: ShotEntity,
    pub season: String,
    pub season_type: SeasonType,
    pub filter: ShotFilter,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub location: Option<Location>,
}

impl ShotRequest {
    pub fn filtered(
        entity: ShotEntity,
        season: &str,
        season_type: SeasonType,
        filter: ShotFilter,
        filters: &ShotFilters,
    ) -> Self {
        Self {
            entity,
            season: season.to_string(),
            season_type,
            filter,
            date_from: filters.date_from,
            date_to: filters.date_to,
            location: filters.location,
        }
    }

    /// The unfiltered request that supplies overall attempt denominators:
    /// general range Overall over the same date window, nothing else.
    pub fn overall(
        entity: ShotEntity,
        season: &str,
        season_type: SeasonType,
        filters: &ShotFilters,
    ) -> Self {
        Self {
            entity,
            season: season.to_string(),
            season_type,
            filter: ShotFilter::default(),
            date_from: filters.date_from,
            date_to: filters.date_to,
            location: None,
        }
    }

    pub fn query(&self, league_id: &str) -> Vec<(&'static str, String)> {
        let f = &self.filter;
        vec![
            ("Season", self.season.clone()),
            ("SeasonType", self.season_type.to_string()),
            ("PerMode", PerMode::Totals.to_string()),
            ("LeagueID", league_id.to_string()),
            ("CloseDefDistRange", f.close_def_dist.to_string()),
            ("ShotClockRange", f.shot_clock.to_string()),
            ("ShotDistRange", f.shot_dist.to_string()),
            ("TouchTimeRange", f.touch_time.to_string()),
            ("DribbleRange", f.dribbles.to_string()),
            ("GeneralRange", f.general_range.to_string()),
            ("DateFrom", format_query_date(self.date_from)),
            ("DateTo", format_query_date(self.date_to)),
            (
                "Period",
                f.period.map(|p| p.to_string()).unwrap_or_default(),
            ),
            (
                "Location",
                self.location.unwrap_or(Location::Any).to_string(),
            ),
        ]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
