// Typed rows for tracking stat categories.

use serde_json::Value;

use crate::schema::{CategorySchema, StatCategory};
use crate::summation::SummationError;

/// One upstream result row: column header to scalar value.
pub type RawRow = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("column {column} has unexpected value {value}")]
    InvalidField { column: String, value: Value },
}

// ---------------------------------------------------------------------------
// Identity and context
// ---------------------------------------------------------------------------

pub const LEAGUE_ABBREVIATION: &str = "LEAGUE";

/// Who a row describes. Player rows carry both player and team fields; team
/// rows only the team fields. The team association is only valid for the
/// filter context the row was fetched under.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityIdentity {
    pub player_id: Option<i64>,
    pub player_name: Option<String>,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
    pub team_abbreviation: Option<String>,
}

impl EntityIdentity {
    /// Synthetic identity for league-wide totals.
    pub fn league() -> Self {
        Self {
            team_id: Some(0),
            team_abbreviation: Some(LEAGUE_ABBREVIATION.to_string()),
            ..Self::default()
        }
    }

    pub fn from_row(row: &RawRow) -> Result<Self, RecordError> {
        let team_id = match optional_id(row, "TEAM_ID")? {
            Some(id) => Some(id),
            None => optional_id(row, "PLAYER_LAST_TEAM_ID")?,
        };
        let team_abbreviation = match optional_text(row, "TEAM_ABBREVIATION")? {
            Some(abbr) => Some(abbr),
            None => optional_text(row, "PLAYER_LAST_TEAM_ABBREVIATION")?,
        };
        Ok(Self {
            player_id: optional_id(row, "PLAYER_ID")?,
            player_name: optional_text(row, "PLAYER_NAME")?,
            team_id,
            team_name: optional_text(row, "TEAM_NAME")?,
            team_abbreviation,
        })
    }
}

/// Tags attached by the orchestration layer, never by summation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordContext {
    /// `"{season} {season_type}"`, e.g. `"2019-20 Regular Season"`.
    pub season: Option<String>,
    pub game_id: Option<String>,
    pub opponent_team_id: Option<i64>,
}

impl RecordContext {
    pub fn from_row(row: &RawRow) -> Result<Self, RecordError> {
        Ok(Self {
            season: optional_text(row, "SEASON")?,
            game_id: optional_text(row, "GAME_ID")?,
            opponent_team_id: optional_id(row, "OPPONENT_TEAM_ID")?,
        })
    }
}

// ---------------------------------------------------------------------------
// StatRecord
// ---------------------------------------------------------------------------

/// One row of a tracking category for one entity under one set of filters.
///
/// `counting` and `averages` are aligned with the category schema's
/// `counting` and `reset_on_merge` column lists. Derived ratios are not
/// stored; they are computed from the counting values whenever read.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    pub category: StatCategory,
    pub identity: EntityIdentity,
    pub context: RecordContext,
    counting: Vec<f64>,
    averages: Vec<f64>,
}

impl StatRecord {
    /// An all-zero record for the category.
    pub fn empty(category: StatCategory, identity: EntityIdentity) -> Self {
        let schema = category.schema();
        Self {
            category,
            identity,
            context: RecordContext::default(),
            counting: vec![0.0; schema.counting.len()],
            averages: vec![0.0; schema.reset_on_merge.len()],
        }
    }

    /// Build a record from an upstream row. Missing or null stat columns read
    /// as 0; derived columns on the wire are ignored.
    pub fn from_row(category: StatCategory, row: &RawRow) -> Result<Self, RecordError> {
        let schema = category.schema();
        let counting = schema
            .counting
            .iter()
            .map(|column| number(row, column))
            .collect::<Result<Vec<_>, _>>()?;
        let averages = schema
            .reset_on_merge
            .iter()
            .map(|column| number(row, column))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            category,
            identity: EntityIdentity::from_row(row)?,
            context: RecordContext::from_row(row)?,
            counting,
            averages,
        })
    }

    pub fn schema(&self) -> &'static CategorySchema {
        self.category.schema()
    }

    /// Builder-style setter for a counting or average column. Unknown
    /// columns are ignored.
    pub fn with_value(mut self, column: &str, value: f64) -> Self {
        let schema = self.schema();
        if let Some(i) = schema.counting_index(column) {
            self.counting[i] = value;
        } else if let Some(i) = schema.average_index(column) {
            self.averages[i] = value;
        }
        self
    }

    pub fn counting(&self, column: &str) -> Option<f64> {
        self.schema()
            .counting_index(column)
            .map(|i| self.counting[i])
    }

    pub fn average(&self, column: &str) -> Option<f64> {
        self.schema().average_index(column).map(|i| self.averages[i])
    }

    /// Compute a derived ratio from the current counting values.
    pub fn derived(&self, name: &str) -> Option<f64> {
        self.schema()
            .derived_stat(name)
            .map(|stat| stat.formula.evaluate(|column| self.counting(column)))
    }

    /// Every derived ratio for the category, in schema order.
    pub fn derived_values(&self) -> Vec<(&'static str, f64)> {
        self.schema()
            .derived
            .iter()
            .map(|stat| {
                (
                    stat.name,
                    stat.formula.evaluate(|column| self.counting(column)),
                )
            })
            .collect()
    }

    /// Look up any stat column: counting, average, or derived.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.counting(column)
            .or_else(|| self.average(column))
            .or_else(|| self.derived(column))
    }

    /// Add `other`'s counting values into a copy of `self`, resetting every
    /// average column to 0. Identity and context come from `self`.
    pub fn merged(&self, other: &StatRecord) -> Result<StatRecord, SummationError> {
        if self.category != other.category {
            return Err(SummationError::CategoryMismatch {
                expected: self.category,
                found: other.category,
            });
        }
        let counting = self
            .counting
            .iter()
            .zip(&other.counting)
            .map(|(a, b)| a + b)
            .collect();
        Ok(StatRecord {
            category: self.category,
            identity: self.identity.clone(),
            context: self.context.clone(),
            counting,
            averages: vec![0.0; self.averages.len()],
        })
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn number(row: &RawRow, column: &str) -> Result<f64, RecordError> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| RecordError::InvalidField {
            column: column.to_string(),
            value: Value::Number(n.clone()),
        }),
        Some(other) => Err(RecordError::InvalidField {
            column: column.to_string(),
            value: other.clone(),
        }),
    }
}

/// Ids arrive as integers, but some endpoints send them as numeric strings.
pub(crate) fn optional_id(row: &RawRow, column: &str) -> Result<Option<i64>, RecordError> {
    let invalid = |value: &Value| RecordError::InvalidField {
        column: column.to_string(),
        value: value.clone(),
    };
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| invalid(value)),
        Some(value @ Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid(value)),
        Some(value) => Err(invalid(value)),
    }
}

pub(crate) fn optional_text(row: &RawRow, column: &str) -> Result<Option<String>, RecordError> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(value) => Err(RecordError::InvalidField {
            column: column.to_string(),
            value: value.clone(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RawRow {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn team_row_parses_identity_and_counting() {
        let raw = row(json!({
            "TEAM_ID": 1610612737,
            "TEAM_NAME": "Atlanta Hawks",
            "TEAM_ABBREVIATION": "ATL",
            "GP": 67,
            "W": 20,
            "L": 47,
            "MIN": 16150.0,
            "CATCH_SHOOT_FGM": 611,
            "CATCH_SHOOT_FGA": 1745,
            "CATCH_SHOOT_FG_PCT": 0.35,
            "CATCH_SHOOT_PTS": 1776,
            "CATCH_SHOOT_FG3M": 554,
            "CATCH_SHOOT_FG3A": 1609,
        }));
        let record = StatRecord::from_row(StatCategory::CatchShoot, &raw).unwrap();

        assert_eq!(record.identity.team_id, Some(1610612737));
        assert_eq!(record.identity.team_abbreviation.as_deref(), Some("ATL"));
        assert_eq!(record.identity.player_id, None);
        assert_eq!(record.counting("MIN"), Some(16150.0));
        assert_eq!(record.counting("CATCH_SHOOT_FGA"), Some(1745.0));
        // The wire value is ignored; the ratio comes from the counts.
        let fg_pct = record.derived("CATCH_SHOOT_FG_PCT").unwrap();
        assert!((fg_pct - 611.0 / 1745.0).abs() < 1e-12);
    }

    #[test]
    fn missing_and_null_columns_read_as_zero() {
        let raw = row(json!({
            "PLAYER_ID": 203932,
            "PLAYER_NAME": "Aaron Gordon",
            "TEAM_ID": 1610612753,
            "TEAM_ABBREVIATION": "ORL",
            "DIST_FEET": null,
        }));
        let record = StatRecord::from_row(StatCategory::SpeedDistance, &raw).unwrap();

        assert_eq!(record.counting("DIST_FEET"), Some(0.0));
        assert_eq!(record.counting("GP"), Some(0.0));
        assert_eq!(record.average("AVG_SPEED"), Some(0.0));
    }

    #[test]
    fn non_numeric_stat_is_rejected() {
        let raw = row(json!({ "TEAM_ID": 1, "DRIVES": "many" }));
        let err = StatRecord::from_row(StatCategory::Drives, &raw).unwrap_err();
        assert!(matches!(err, RecordError::InvalidField { ref column, .. } if column == "DRIVES"));
    }

    #[test]
    fn player_last_team_fills_team_association() {
        let raw = row(json!({
            "PLAYER_ID": 2544,
            "PLAYER_NAME": "LeBron James",
            "PLAYER_LAST_TEAM_ID": 1610612747,
            "PLAYER_LAST_TEAM_ABBREVIATION": "LAL",
        }));
        let identity = EntityIdentity::from_row(&raw).unwrap();
        assert_eq!(identity.team_id, Some(1610612747));
        assert_eq!(identity.team_abbreviation.as_deref(), Some("LAL"));
    }

    #[test]
    fn string_ids_are_accepted() {
        let raw = row(json!({ "TEAM_ID": "1610612737", "OPPONENT_TEAM_ID": "1610612738" }));
        assert_eq!(optional_id(&raw, "TEAM_ID").unwrap(), Some(1610612737));
        let context = RecordContext::from_row(&raw).unwrap();
        assert_eq!(context.opponent_team_id, Some(1610612738));
    }

    #[test]
    fn derived_values_follow_schema_order() {
        let record = StatRecord::empty(StatCategory::Passing, EntityIdentity::default())
            .with_value("PASSES_MADE", 40.0)
            .with_value("AST", 8.0)
            .with_value("POTENTIAL_AST", 12.0)
            .with_value("AST_POINTS_CREATED", 19.0);

        let names: Vec<&str> = record.derived_values().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["PTS_PER_AST", "AST_PER_PASS", "POTENTIAL_AST_PER_PASS"]);
        assert!((record.value("PTS_PER_AST").unwrap() - 19.0 / 8.0).abs() < 1e-12);
        assert!((record.value("AST_PER_PASS").unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn zero_denominators_yield_zero_for_every_derived_field() {
        for category in StatCategory::ALL {
            // Numerators set, every denominator left at 0.
            let mut record = StatRecord::empty(category, EntityIdentity::default());
            for stat in category.schema().derived {
                if let crate::schema::RatioFormula::Ratio { numerator, .. } = stat.formula {
                    record = record.with_value(numerator, 7.0);
                }
            }
            for stat in category.schema().derived {
                let denominator = match stat.formula {
                    crate::schema::RatioFormula::Ratio { denominator, .. } => denominator,
                    crate::schema::RatioFormula::EffectiveFg { fga, .. } => fga,
                };
                let zeroed = record.clone().with_value(denominator, 0.0);
                let value = zeroed.derived(stat.name).unwrap();
                assert_eq!(value, 0.0, "{} with zero {denominator}", stat.name);
                assert!(!value.is_nan());
            }
        }
    }

    #[test]
    fn merged_sums_counting_and_resets_averages() {
        let identity = EntityIdentity {
            player_id: Some(1),
            ..EntityIdentity::default()
        };
        let a = StatRecord::empty(StatCategory::Possessions, identity.clone())
            .with_value("TOUCHES", 50.0)
            .with_value("POINTS", 20.0)
            .with_value("AVG_SEC_PER_TOUCH", 2.4);
        let b = StatRecord::empty(StatCategory::Possessions, identity)
            .with_value("TOUCHES", 30.0)
            .with_value("POINTS", 4.0)
            .with_value("AVG_SEC_PER_TOUCH", 5.1);

        let merged = a.merged(&b).unwrap();
        assert_eq!(merged.counting("TOUCHES"), Some(80.0));
        assert_eq!(merged.average("AVG_SEC_PER_TOUCH"), Some(0.0));
        assert!((merged.derived("PTS_PER_TOUCH").unwrap() - 24.0 / 80.0).abs() < 1e-12);
        // Inputs are untouched.
        assert_eq!(a.counting("TOUCHES"), Some(50.0));
        assert_eq!(a.average("AVG_SEC_PER_TOUCH"), Some(2.4));
    }

    #[test]
    fn merging_different_categories_fails() {
        let a = StatRecord::empty(StatCategory::Drives, EntityIdentity::default());
        let b = StatRecord::empty(StatCategory::Passing, EntityIdentity::default());
        let err = a.merged(&b).unwrap_err();
        assert!(matches!(
            err,
            SummationError::CategoryMismatch {
                expected: StatCategory::Drives,
                found: StatCategory::Passing,
            }
        ));
    }

    #[test]
    fn league_identity_is_synthetic() {
        let league = EntityIdentity::league();
        assert_eq!(league.team_id, Some(0));
        assert_eq!(league.team_abbreviation.as_deref(), Some("LEAGUE"));
        assert!(league.player_id.is_none());
    }

    #[test]
    fn unknown_columns_are_not_values() {
        let record = StatRecord::empty(StatCategory::Defense, EntityIdentity::default());
        assert_eq!(record.value("DRIVES"), None);
        assert_eq!(record.derived("DEF_RIM_FGM"), None);
    }
}
