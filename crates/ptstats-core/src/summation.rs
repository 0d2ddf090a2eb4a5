// Entity summation engine.
//
// Folds any number of record collections into one total per entity, or into
// a single league-wide total. The fold is immutable-in / immutable-out: every
// merge returns a fresh accumulator value.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::record::{EntityIdentity, RecordContext, StatRecord};
use crate::schema::StatCategory;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SummationError {
    #[error("cannot sum {found} records into {expected} totals")]
    CategoryMismatch {
        expected: StatCategory,
        found: StatCategory,
    },

    #[error("record has no {key} to group by {mode}")]
    MissingEntityKey { mode: GroupingMode, key: &'static str },

    #[error("{column} total does not fit in a shot count")]
    CountOverflow { column: &'static str },
}

// ---------------------------------------------------------------------------
// Grouping modes
// ---------------------------------------------------------------------------

/// How records are grouped before summing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupingMode {
    Player,
    Team,
    /// Opponent result sets are keyed by the opposing team's id.
    Opponent,
    League,
}

impl GroupingMode {
    /// Wire column the mode groups by. `None` for league totals.
    pub fn key_column(self) -> Option<&'static str> {
        match self {
            GroupingMode::Player => Some("PLAYER_ID"),
            GroupingMode::Team | GroupingMode::Opponent => Some("TEAM_ID"),
            GroupingMode::League => None,
        }
    }

    /// The id `identity` is grouped under, if it has one.
    pub fn entity_key(self, identity: &EntityIdentity) -> Option<i64> {
        match self {
            GroupingMode::Player => identity.player_id,
            GroupingMode::Team | GroupingMode::Opponent => identity.team_id,
            GroupingMode::League => None,
        }
    }
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupingMode::Player => "player",
            GroupingMode::Team => "team",
            GroupingMode::Opponent => "opponent",
            GroupingMode::League => "league",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grouping mode: {0}")]
pub struct UnknownGroupingMode(pub String);

impl FromStr for GroupingMode {
    type Err = UnknownGroupingMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "player" => Ok(GroupingMode::Player),
            "team" => Ok(GroupingMode::Team),
            "opponent" => Ok(GroupingMode::Opponent),
            "league" => Ok(GroupingMode::League),
            _ => Err(UnknownGroupingMode(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Result of a summation pass: one total per entity, or a single league total.
#[derive(Debug, Clone, PartialEq)]
pub enum Totals<R> {
    Entities(Vec<R>),
    League(R),
}

impl<R> Totals<R> {
    /// Flatten into a list; a league total becomes a one-element list.
    pub fn into_vec(self) -> Vec<R> {
        match self {
            Totals::Entities(records) => records,
            Totals::League(record) => vec![record],
        }
    }

    pub fn into_league(self) -> Option<R> {
        match self {
            Totals::League(record) => Some(record),
            Totals::Entities(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Totals::Entities(records) => records.len(),
            Totals::League(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Summable
// ---------------------------------------------------------------------------

/// A record type the summation fold can combine.
pub trait Summable: Clone {
    fn identity(&self) -> &EntityIdentity;

    /// A new record holding `self + other`. Identity and context come from
    /// `self`.
    fn merged(&self, other: &Self) -> Result<Self, SummationError>;

    /// A copy of `self` relabelled as the league-wide total.
    fn as_league(&self) -> Self;

    /// Starting accumulator for league totals that does not borrow from any
    /// input. Types without one seed from their first input instead.
    fn league_zero() -> Option<Self> {
        None
    }
}

impl Summable for StatRecord {
    fn identity(&self) -> &EntityIdentity {
        &self.identity
    }

    fn merged(&self, other: &Self) -> Result<Self, SummationError> {
        StatRecord::merged(self, other)
    }

    fn as_league(&self) -> Self {
        let mut league = self.clone();
        league.identity = EntityIdentity::league();
        league.context = RecordContext::default();
        league
    }
}

/// Fold every record of every collection under `mode`.
///
/// Entity totals come out in first-seen key order, but callers that need a
/// stable order should sort explicitly.
pub fn fold<R: Summable>(
    mode: GroupingMode,
    collections: &[&[R]],
) -> Result<Totals<R>, SummationError> {
    let records = collections.iter().flat_map(|c| c.iter());

    let Some(key_column) = mode.key_column() else {
        let mut total = R::league_zero();
        for record in records {
            total = Some(match total {
                None => record.as_league(),
                Some(acc) => acc.merged(record)?,
            });
        }
        debug!(mode = %mode, "folded league total");
        return Ok(match total {
            Some(total) => Totals::League(total),
            None => Totals::Entities(Vec::new()),
        });
    };

    let mut totals: Vec<R> = Vec::new();
    let mut index_by_key: HashMap<i64, usize> = HashMap::new();
    for record in records {
        let key = mode
            .entity_key(record.identity())
            .ok_or(SummationError::MissingEntityKey {
                mode,
                key: key_column,
            })?;
        match index_by_key.get(&key) {
            Some(&i) => totals[i] = totals[i].merged(record)?,
            None => {
                index_by_key.insert(key, totals.len());
                totals.push(record.clone());
            }
        }
    }
    debug!(mode = %mode, entities = totals.len(), "folded entity totals");
    Ok(Totals::Entities(totals))
}

// ---------------------------------------------------------------------------
// Tracking stat entry points
// ---------------------------------------------------------------------------

/// Sum tracking records by `mode`. Every record must share one category.
pub fn sum_totals(
    mode: GroupingMode,
    collections: &[&[StatRecord]],
) -> Result<Totals<StatRecord>, SummationError> {
    let mut categories = collections.iter().flat_map(|c| c.iter()).map(|r| r.category);
    if let Some(expected) = categories.next() {
        if let Some(found) = categories.find(|c| *c != expected) {
            return Err(SummationError::CategoryMismatch { expected, found });
        }
    }
    fold(mode, collections)
}

/// String-keyed variant of [`sum_totals`]. An unrecognized mode yields an
/// empty result rather than an error.
pub fn sum_totals_named(
    mode: &str,
    collections: &[&[StatRecord]],
) -> Result<Totals<StatRecord>, SummationError> {
    match mode.parse::<GroupingMode>() {
        Ok(mode) => sum_totals(mode, collections),
        Err(err) => {
            warn!("{err}; returning no totals");
            Ok(Totals::Entities(Vec::new()))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
