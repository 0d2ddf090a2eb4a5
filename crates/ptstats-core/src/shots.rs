// Shot-frequency engine.
//
// Shot records have a fixed schema: filtered make/attempt counts plus the
// entity's overall attempt counts for the same window, which are only known
// after a separate unfiltered fetch is joined in.

use serde_json::Value;
use tracing::warn;

use crate::record::{EntityIdentity, RawRow, RecordContext, RecordError};
use crate::schema::ratio;
use crate::summation::{self, GroupingMode, Summable, SummationError, Totals};

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

/// Additive shot counts. `overall_*` are the unfiltered denominators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShotCounts {
    pub games_played: u32,
    pub fgm: u32,
    pub fga: u32,
    pub fg2m: u32,
    pub fg2a: u32,
    pub fg3m: u32,
    pub fg3a: u32,
    pub overall_fga: u32,
    pub overall_fg2a: u32,
    pub overall_fg3a: u32,
}

impl ShotCounts {
    fn plus(&self, other: &ShotCounts) -> Result<ShotCounts, SummationError> {
        let add = |a: u32, b: u32, column: &'static str| {
            a.checked_add(b)
                .ok_or(SummationError::CountOverflow { column })
        };
        Ok(ShotCounts {
            games_played: add(self.games_played, other.games_played, "GP")?,
            fgm: add(self.fgm, other.fgm, "FGM")?,
            fga: add(self.fga, other.fga, "FGA")?,
            fg2m: add(self.fg2m, other.fg2m, "FG2M")?,
            fg2a: add(self.fg2a, other.fg2a, "FG2A")?,
            fg3m: add(self.fg3m, other.fg3m, "FG3M")?,
            fg3a: add(self.fg3a, other.fg3a, "FG3A")?,
            overall_fga: add(self.overall_fga, other.overall_fga, "OVERALL_FGA")?,
            overall_fg2a: add(self.overall_fg2a, other.overall_fg2a, "OVERALL_FG2A")?,
            overall_fg3a: add(self.overall_fg3a, other.overall_fg3a, "OVERALL_FG3A")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Derived rates
// ---------------------------------------------------------------------------

pub fn fg_pct(c: &ShotCounts) -> f64 {
    ratio(c.fgm.into(), c.fga.into())
}

pub fn fg2_pct(c: &ShotCounts) -> f64 {
    ratio(c.fg2m.into(), c.fg2a.into())
}

pub fn fg3_pct(c: &ShotCounts) -> f64 {
    ratio(c.fg3m.into(), c.fg3a.into())
}

/// `(fg2m + 1.5 * fg3m) / (fg2a + fg3a)`.
pub fn efg_pct(c: &ShotCounts) -> f64 {
    ratio(
        f64::from(c.fg2m) + 1.5 * f64::from(c.fg3m),
        f64::from(c.fg2a) + f64::from(c.fg3a),
    )
}

/// Share of all the entity's attempts that fell in the filtered bucket.
pub fn fga_frequency(c: &ShotCounts) -> f64 {
    ratio(c.fga.into(), c.overall_fga.into())
}

pub fn fg2a_frequency(c: &ShotCounts) -> f64 {
    ratio(c.fg2a.into(), c.overall_fga.into())
}

pub fn fg3a_frequency(c: &ShotCounts) -> f64 {
    ratio(c.fg3a.into(), c.overall_fga.into())
}

/// Share of the entity's two-point attempts that fell in the filtered bucket.
pub fn frequency_of_fg2a(c: &ShotCounts) -> f64 {
    ratio(c.fg2a.into(), c.overall_fg2a.into())
}

pub fn frequency_of_fg3a(c: &ShotCounts) -> f64 {
    ratio(c.fg3a.into(), c.overall_fg3a.into())
}

/// Every derived shot rate, computed from one counts snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotRates {
    pub fg_pct: f64,
    pub fg2_pct: f64,
    pub fg3_pct: f64,
    pub efg_pct: f64,
    pub fga_frequency: f64,
    pub fg2a_frequency: f64,
    pub fg3a_frequency: f64,
    pub frequency_of_fg2a: f64,
    pub frequency_of_fg3a: f64,
}

impl From<&ShotCounts> for ShotRates {
    fn from(c: &ShotCounts) -> Self {
        Self {
            fg_pct: fg_pct(c),
            fg2_pct: fg2_pct(c),
            fg3_pct: fg3_pct(c),
            efg_pct: efg_pct(c),
            fga_frequency: fga_frequency(c),
            fg2a_frequency: fg2a_frequency(c),
            fg3a_frequency: fg3a_frequency(c),
            frequency_of_fg2a: frequency_of_fg2a(c),
            frequency_of_fg3a: frequency_of_fg3a(c),
        }
    }
}

// ---------------------------------------------------------------------------
// ShotStatRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ShotStatRecord {
    pub identity: EntityIdentity,
    pub context: RecordContext,
    pub counts: ShotCounts,
}

impl ShotStatRecord {
    pub fn new(identity: EntityIdentity, counts: ShotCounts) -> Self {
        Self {
            identity,
            context: RecordContext::default(),
            counts,
        }
    }

    /// Build from an upstream row. Null or missing counts read as 0 and
    /// whole-valued floats such as `5.0` are accepted; the overall
    /// denominators are never on the wire and start at 0.
    pub fn from_row(row: &RawRow) -> Result<Self, RecordError> {
        let counts = ShotCounts {
            games_played: count(row, "GP")?,
            fgm: count(row, "FGM")?,
            fga: count(row, "FGA")?,
            fg2m: count(row, "FG2M")?,
            fg2a: count(row, "FG2A")?,
            fg3m: count(row, "FG3M")?,
            fg3a: count(row, "FG3A")?,
            ..ShotCounts::default()
        };
        Ok(Self {
            identity: EntityIdentity::from_row(row)?,
            context: RecordContext::from_row(row)?,
            counts,
        })
    }

    /// Copy with the overall denominators taken from an unfiltered record.
    pub fn with_overall(&self, overall: &ShotCounts) -> Self {
        let mut joined = self.clone();
        joined.counts.overall_fga = overall.fga;
        joined.counts.overall_fg2a = overall.fg2a;
        joined.counts.overall_fg3a = overall.fg3a;
        joined
    }

    pub fn rates(&self) -> ShotRates {
        ShotRates::from(&self.counts)
    }
}

impl Summable for ShotStatRecord {
    fn identity(&self) -> &EntityIdentity {
        &self.identity
    }

    fn merged(&self, other: &Self) -> Result<Self, SummationError> {
        Ok(Self {
            identity: self.identity.clone(),
            context: self.context.clone(),
            counts: self.counts.plus(&other.counts)?,
        })
    }

    fn as_league(&self) -> Self {
        Self {
            identity: EntityIdentity::league(),
            context: RecordContext::default(),
            counts: self.counts,
        }
    }

    fn league_zero() -> Option<Self> {
        Some(Self::new(EntityIdentity::league(), ShotCounts::default()))
    }
}

fn count(row: &RawRow, column: &str) -> Result<u32, RecordError> {
    let invalid = |value: &Value| RecordError::InvalidField {
        column: column.to_string(),
        value: value.clone(),
    };
    match row.get(column) {
        None | Some(Value::Null) => Ok(0),
        Some(value @ Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u32)
            })
            .ok_or_else(|| invalid(value)),
        Some(value) => Err(invalid(value)),
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Sum shot records by `mode`. League totals always exist, even over no
/// input.
pub fn sum_shot_totals(
    mode: GroupingMode,
    collections: &[&[ShotStatRecord]],
) -> Result<Totals<ShotStatRecord>, SummationError> {
    summation::fold(mode, collections)
}

/// String-keyed variant of [`sum_shot_totals`]. An unrecognized mode yields
/// an empty result rather than an error.
pub fn sum_shot_totals_named(
    mode: &str,
    collections: &[&[ShotStatRecord]],
) -> Result<Totals<ShotStatRecord>, SummationError> {
    match mode.parse::<GroupingMode>() {
        Ok(mode) => sum_shot_totals(mode, collections),
        Err(err) => {
            warn!("{err}; returning no shot totals");
            Ok(Totals::Entities(Vec::new()))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
