// Record schemas for the tracking stat categories.
//
// Each category declares which upstream columns are additive counting stats,
// which are per-touch / per-second averages that lose their meaning once
// summed, and which ratios are derived from the counting stats at read time.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// A player-tracking statistical category (the upstream `PtMeasureType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatCategory {
    CatchShoot,
    Defense,
    Drives,
    Passing,
    PullUp,
    Rebounding,
    Efficiency,
    SpeedDistance,
    ElbowTouch,
    PaintTouch,
    PostTouch,
    Possessions,
}

impl StatCategory {
    pub const ALL: [StatCategory; 12] = [
        StatCategory::CatchShoot,
        StatCategory::Defense,
        StatCategory::Drives,
        StatCategory::Passing,
        StatCategory::PullUp,
        StatCategory::Rebounding,
        StatCategory::Efficiency,
        StatCategory::SpeedDistance,
        StatCategory::ElbowTouch,
        StatCategory::PaintTouch,
        StatCategory::PostTouch,
        StatCategory::Possessions,
    ];

    /// The `PtMeasureType` query value for this category.
    pub fn measure_type(self) -> &'static str {
        match self {
            StatCategory::CatchShoot => "CatchShoot",
            StatCategory::Defense => "Defense",
            StatCategory::Drives => "Drives",
            StatCategory::Passing => "Passing",
            StatCategory::PullUp => "PullUpShot",
            StatCategory::Rebounding => "Rebounding",
            StatCategory::Efficiency => "Efficiency",
            StatCategory::SpeedDistance => "SpeedDistance",
            StatCategory::ElbowTouch => "ElbowTouch",
            StatCategory::PaintTouch => "PaintTouch",
            StatCategory::PostTouch => "PostTouch",
            StatCategory::Possessions => "Possessions",
        }
    }

    /// Look up the schema descriptor for this category.
    pub fn schema(self) -> &'static CategorySchema {
        match self {
            StatCategory::CatchShoot => &CATCH_SHOOT,
            StatCategory::Defense => &DEFENSE,
            StatCategory::Drives => &DRIVES,
            StatCategory::Passing => &PASSING,
            StatCategory::PullUp => &PULL_UP,
            StatCategory::Rebounding => &REBOUNDING,
            StatCategory::Efficiency => &EFFICIENCY,
            StatCategory::SpeedDistance => &SPEED_DISTANCE,
            StatCategory::ElbowTouch => &ELBOW_TOUCH,
            StatCategory::PaintTouch => &PAINT_TOUCH,
            StatCategory::PostTouch => &POST_TOUCH,
            StatCategory::Possessions => &POSSESSIONS,
        }
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.measure_type())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stat category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for StatCategory {
    type Err = UnknownCategory;

    /// Accepts either the upstream measure type (`PullUpShot`) or the
    /// snake_case config spelling (`pull_up`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        StatCategory::ALL
            .into_iter()
            .find(|c| {
                c.measure_type().eq_ignore_ascii_case(trimmed)
                    || c.snake_name() == trimmed.to_ascii_lowercase()
            })
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl StatCategory {
    fn snake_name(self) -> &'static str {
        match self {
            StatCategory::CatchShoot => "catch_shoot",
            StatCategory::Defense => "defense",
            StatCategory::Drives => "drives",
            StatCategory::Passing => "passing",
            StatCategory::PullUp => "pull_up",
            StatCategory::Rebounding => "rebounding",
            StatCategory::Efficiency => "efficiency",
            StatCategory::SpeedDistance => "speed_distance",
            StatCategory::ElbowTouch => "elbow_touch",
            StatCategory::PaintTouch => "paint_touch",
            StatCategory::PostTouch => "post_touch",
            StatCategory::Possessions => "possessions",
        }
    }
}

// ---------------------------------------------------------------------------
// Derived stat formulas
// ---------------------------------------------------------------------------

/// Divide, defining the result as 0 when the denominator is 0.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// `(fgm + 0.5 * fg3m) / fga`, 0 when there were no attempts.
pub fn effective_fg_pct(fgm: f64, fg3m: f64, fga: f64) -> f64 {
    ratio(fgm + 0.5 * fg3m, fga)
}

/// How a derived column is computed from counting columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatioFormula {
    Ratio {
        numerator: &'static str,
        denominator: &'static str,
    },
    EffectiveFg {
        fgm: &'static str,
        fg3m: &'static str,
        fga: &'static str,
    },
}

impl RatioFormula {
    /// Evaluate the formula, reading counting values through `get`.
    /// Columns the lookup does not know count as 0.
    pub fn evaluate<F>(&self, get: F) -> f64
    where
        F: Fn(&str) -> Option<f64>,
    {
        let value = |name: &str| get(name).unwrap_or(0.0);
        match *self {
            RatioFormula::Ratio {
                numerator,
                denominator,
            } => ratio(value(numerator), value(denominator)),
            RatioFormula::EffectiveFg { fgm, fg3m, fga } => {
                effective_fg_pct(value(fgm), value(fg3m), value(fga))
            }
        }
    }
}

/// A named derived column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedStat {
    pub name: &'static str,
    pub formula: RatioFormula,
}

const fn per(
    name: &'static str,
    numerator: &'static str,
    denominator: &'static str,
) -> DerivedStat {
    DerivedStat {
        name,
        formula: RatioFormula::Ratio {
            numerator,
            denominator,
        },
    }
}

const fn efg(
    name: &'static str,
    fgm: &'static str,
    fg3m: &'static str,
    fga: &'static str,
) -> DerivedStat {
    DerivedStat {
        name,
        formula: RatioFormula::EffectiveFg { fgm, fg3m, fga },
    }
}

// ---------------------------------------------------------------------------
// Schema descriptor
// ---------------------------------------------------------------------------

/// Field classification for one category.
#[derive(Debug)]
pub struct CategorySchema {
    pub category: StatCategory,
    /// Additive counting columns, in output order.
    pub counting: &'static [&'static str],
    /// Average columns that are reset to 0 whenever two records merge.
    pub reset_on_merge: &'static [&'static str],
    /// Ratio columns recomputed from the counting columns on read.
    pub derived: &'static [DerivedStat],
}

impl CategorySchema {
    pub fn counting_index(&self, field: &str) -> Option<usize> {
        self.counting.iter().position(|f| *f == field)
    }

    pub fn average_index(&self, field: &str) -> Option<usize> {
        self.reset_on_merge.iter().position(|f| *f == field)
    }

    pub fn derived_stat(&self, name: &str) -> Option<&'static DerivedStat> {
        self.derived.iter().find(|d| d.name == name)
    }

    /// All stat columns in output order: counting, then averages, then derived.
    pub fn stat_columns(&self) -> Vec<&'static str> {
        self.counting
            .iter()
            .chain(self.reset_on_merge.iter())
            .copied()
            .chain(self.derived.iter().map(|d| d.name))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Category tables
// ---------------------------------------------------------------------------

static CATCH_SHOOT: CategorySchema = CategorySchema {
    category: StatCategory::CatchShoot,
    counting: &[
        "GP",
        "W",
        "L",
        "MIN",
        "CATCH_SHOOT_FGM",
        "CATCH_SHOOT_FGA",
        "CATCH_SHOOT_PTS",
        "CATCH_SHOOT_FG3M",
        "CATCH_SHOOT_FG3A",
    ],
    reset_on_merge: &[],
    derived: &[
        per("CATCH_SHOOT_FG_PCT", "CATCH_SHOOT_FGM", "CATCH_SHOOT_FGA"),
        per("CATCH_SHOOT_FG3_PCT", "CATCH_SHOOT_FG3M", "CATCH_SHOOT_FG3A"),
        efg(
            "CATCH_SHOOT_EFG_PCT",
            "CATCH_SHOOT_FGM",
            "CATCH_SHOOT_FG3M",
            "CATCH_SHOOT_FGA",
        ),
    ],
};

static DEFENSE: CategorySchema = CategorySchema {
    category: StatCategory::Defense,
    counting: &[
        "GP",
        "W",
        "L",
        "MIN",
        "STL",
        "BLK",
        "DREB",
        "DEF_RIM_FGM",
        "DEF_RIM_FGA",
    ],
    reset_on_merge: &[],
    derived: &[per("DEF_RIM_FG_PCT", "DEF_RIM_FGM", "DEF_RIM_FGA")],
};

static DRIVES: CategorySchema = CategorySchema {
    category: StatCategory::Drives,
    counting: &[
        "GP",
        "W",
        "L",
        "MIN",
        "DRIVES",
        "DRIVE_FGM",
        "DRIVE_FGA",
        "DRIVE_FTM",
        "DRIVE_FTA",
        "DRIVE_PTS",
        "DRIVE_PASSES",
        "DRIVE_AST",
        "DRIVE_TOV",
        "DRIVE_PF",
    ],
    reset_on_merge: &[],
    derived: &[
        per("DRIVE_FG_PCT", "DRIVE_FGM", "DRIVE_FGA"),
        per("DRIVE_PASSES_PCT", "DRIVE_PASSES", "DRIVES"),
        per("DRIVE_AST_PCT", "DRIVE_AST", "DRIVES"),
        per("DRIVE_TOV_PCT", "DRIVE_TOV", "DRIVES"),
        per("DRIVE_PF_PCT", "DRIVE_PF", "DRIVES"),
        per("DRIVE_PTS_PER_DRIVE", "DRIVE_PTS", "DRIVES"),
    ],
};

static PASSING: CategorySchema = CategorySchema {
    category: StatCategory::Passing,
    counting: &[
        "GP",
        "W",
        "L",
        "MIN",
        "PASSES_MADE",
        "PASSES_RECEIVED",
        "AST",
        "FT_AST",
        "SECONDARY_AST",
        "POTENTIAL_AST",
        "AST_ADJ",
        "AST_POINTS_CREATED",
    ],
    reset_on_merge: &[],
    derived: &[
        per("PTS_PER_AST", "AST_POINTS_CREATED", "AST"),
        per("AST_PER_PASS", "AST", "PASSES_MADE"),
        per("POTENTIAL_AST_PER_PASS", "POTENTIAL_AST", "PASSES_MADE"),
    ],
};

static PULL_UP: CategorySchema = CategorySchema {
    category: StatCategory::PullUp,
    counting: &[
        "GP",
        "W",
        "L",
        "MIN",
        "PULL_UP_FGM",
        "PULL_UP_FGA",
        "PULL_UP_PTS",
        "PULL_UP_FG3M",
        "PULL_UP_FG3A",
    ],
    reset_on_merge: &[],
    derived: &[
        per("PULL_UP_FG_PCT", "PULL_UP_FGM", "PULL_UP_FGA"),
        per("PULL_UP_FG3_PCT", "PULL_UP_FG3M", "PULL_UP_FG3A"),
        efg("PULL_UP_EFG_PCT", "PULL_UP_FGM", "PULL_UP_FG3M", "PULL_UP_FGA"),
    ],
};

static REBOUNDING: CategorySchema = CategorySchema {
    category: StatCategory::Rebounding,
    counting: &[
        "GP",
        "W",
        "L",
        "MIN",
        "OREB",
        "OREB_CONTEST",
        "OREB_UNCONTEST",
        "OREB_CHANCES",
        "OREB_CHANCE_DEFER",
        "DREB",
        "DREB_CONTEST",
        "DREB_UNCONTEST",
        "DREB_CHANCES",
        "DREB_CHANCE_DEFER",
    ],
    reset_on_merge: &[],
    derived: &[
        per("OREB_CONTEST_PCT", "OREB_CONTEST", "OREB"),
        per("DREB_CONTEST_PCT", "DREB_CONTEST", "DREB"),
        per("OREB_CHANCE_PCT", "OREB", "OREB_CHANCES"),
        per("DREB_CHANCE_PCT", "DREB", "DREB_CHANCES"),
    ],
};

static EFFICIENCY: CategorySchema = CategorySchema {
    category: StatCategory::Efficiency,
    counting: &[
        "GP",
        "W",
        "L",
        "MIN",
        "POINTS",
        "DRIVE_PTS",
        "CATCH_SHOOT_PTS",
        "PULL_UP_PTS",
        "PAINT_TOUCH_PTS",
        "POST_TOUCH_PTS",
        "ELBOW_TOUCH_PTS",
    ],
    reset_on_merge: &[],
    derived: &[],
};

static SPEED_DISTANCE: CategorySchema = CategorySchema {
    category: StatCategory::SpeedDistance,
    counting: &[
        "GP",
        "W",
        "L",
        "MIN",
        "DIST_FEET",
        "DIST_MILES",
        "DIST_MILES_OFF",
        "DIST_MILES_DEF",
    ],
    reset_on_merge: &["AVG_SPEED", "AVG_SPEED_OFF", "AVG_SPEED_DEF"],
    derived: &[],
};

static ELBOW_TOUCH: CategorySchema = CategorySchema {
    category: StatCategory::ElbowTouch,
    counting: &[
        "GP",
        "W",
        "L",
        "MIN",
        "TOUCHES",
        "ELBOW_TOUCHES",
        "ELBOW_TOUCH_FGM",
        "ELBOW_TOUCH_FGA",
        "ELBOW_TOUCH_FTM",
        "ELBOW_TOUCH_FTA",
        "ELBOW_TOUCH_PTS",
        "ELBOW_TOUCH_PASSES",
        "ELBOW_TOUCH_AST",
        "ELBOW_TOUCH_TOV",
        "ELBOW_TOUCH_FOULS",
    ],
    reset_on_merge: &[],
    derived: &[
        per("ELBOW_TOUCH_FG_PCT", "ELBOW_TOUCH_FGM", "ELBOW_TOUCH_FGA"),
        per("ELBOW_TOUCH_PASSES_PCT", "ELBOW_TOUCH_PASSES", "ELBOW_TOUCHES"),
        per("ELBOW_TOUCH_AST_PCT", "ELBOW_TOUCH_AST", "ELBOW_TOUCHES"),
        per("ELBOW_TOUCH_TOV_PCT", "ELBOW_TOUCH_TOV", "ELBOW_TOUCHES"),
        per("ELBOW_TOUCH_FOULS_PCT", "ELBOW_TOUCH_FOULS", "ELBOW_TOUCHES"),
        per("ELBOW_TOUCH_PTS_PER_TOUCH", "ELBOW_TOUCH_PTS", "ELBOW_TOUCHES"),
    ],
};

static PAINT_TOUCH: CategorySchema = CategorySchema {
    category: StatCategory::PaintTouch,
    counting: &[
        "GP",
        "W",
        "L",
        "MIN",
        "TOUCHES",
        "PAINT_TOUCHES",
        "PAINT_TOUCH_FGM",
        "PAINT_TOUCH_FGA",
        "PAINT_TOUCH_FTM",
        "PAINT_TOUCH_FTA",
        "PAINT_TOUCH_PTS",
        "PAINT_TOUCH_PASSES",
        "PAINT_TOUCH_AST",
        "PAINT_TOUCH_TOV",
        "PAINT_TOUCH_FOULS",
    ],
    reset_on_merge: &[],
    derived: &[
        per("PAINT_TOUCH_FG_PCT", "PAINT_TOUCH_FGM", "PAINT_TOUCH_FGA"),
        per("PAINT_TOUCH_PASSES_PCT", "PAINT_TOUCH_PASSES", "PAINT_TOUCHES"),
        per("PAINT_TOUCH_AST_PCT", "PAINT_TOUCH_AST", "PAINT_TOUCHES"),
        per("PAINT_TOUCH_TOV_PCT", "PAINT_TOUCH_TOV", "PAINT_TOUCHES"),
        per("PAINT_TOUCH_FOULS_PCT", "PAINT_TOUCH_FOULS", "PAINT_TOUCHES"),
        per("PAINT_TOUCH_PTS_PER_TOUCH", "PAINT_TOUCH_PTS", "PAINT_TOUCHES"),
    ],
};

static POST_TOUCH: CategorySchema = CategorySchema {
    category: StatCategory::PostTouch,
    counting: &[
        "GP",
        "W",
        "L",
        "MIN",
        "TOUCHES",
        "POST_TOUCHES",
        "POST_TOUCH_FGM",
        "POST_TOUCH_FGA",
        "POST_TOUCH_FTM",
        "POST_TOUCH_FTA",
        "POST_TOUCH_PTS",
        "POST_TOUCH_PASSES",
        "POST_TOUCH_AST",
        "POST_TOUCH_TOV",
        "POST_TOUCH_FOULS",
    ],
    reset_on_merge: &[],
    derived: &[
        per("POST_TOUCH_FG_PCT", "POST_TOUCH_FGM", "POST_TOUCH_FGA"),
        per("POST_TOUCH_PASSES_PCT", "POST_TOUCH_PASSES", "POST_TOUCHES"),
        per("POST_TOUCH_AST_PCT", "POST_TOUCH_AST", "POST_TOUCHES"),
        per("POST_TOUCH_TOV_PCT", "POST_TOUCH_TOV", "POST_TOUCHES"),
        per("POST_TOUCH_FOULS_PCT", "POST_TOUCH_FOULS", "POST_TOUCHES"),
        per("POST_TOUCH_PTS_PER_TOUCH", "POST_TOUCH_PTS", "POST_TOUCHES"),
    ],
};

static POSSESSIONS: CategorySchema = CategorySchema {
    category: StatCategory::Possessions,
    counting: &[
        "GP",
        "W",
        "L",
        "MIN",
        "POINTS",
        "TOUCHES",
        "FRONT_CT_TOUCHES",
        "TIME_OF_POSS",
        "ELBOW_TOUCHES",
        "POST_TOUCHES",
        "PAINT_TOUCHES",
    ],
    reset_on_merge: &["AVG_SEC_PER_TOUCH", "AVG_DRIB_PER_TOUCH"],
    derived: &[per("PTS_PER_TOUCH", "POINTS", "TOUCHES")],
};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_category_maps_to_its_own_schema() {
        for category in StatCategory::ALL {
            assert_eq!(category.schema().category, category);
        }
    }

    #[test]
    fn every_schema_starts_with_shared_counters() {
        for category in StatCategory::ALL {
            assert_eq!(
                &category.schema().counting[..4],
                &["GP", "W", "L", "MIN"],
                "{category} should start with GP/W/L/MIN"
            );
        }
    }

    #[test]
    fn columns_are_unique_within_a_schema() {
        for category in StatCategory::ALL {
            let columns = category.schema().stat_columns();
            let unique: HashSet<_> = columns.iter().collect();
            assert_eq!(unique.len(), columns.len(), "duplicate column in {category}");
        }
    }

    #[test]
    fn derived_formulas_only_reference_counting_columns() {
        for category in StatCategory::ALL {
            let schema = category.schema();
            for stat in schema.derived {
                let referenced: Vec<&str> = match stat.formula {
                    RatioFormula::Ratio {
                        numerator,
                        denominator,
                    } => vec![numerator, denominator],
                    RatioFormula::EffectiveFg { fgm, fg3m, fga } => vec![fgm, fg3m, fga],
                };
                for column in referenced {
                    assert!(
                        schema.counting_index(column).is_some(),
                        "{} references unknown column {column}",
                        stat.name
                    );
                }
            }
        }
    }

    #[test]
    fn reset_fields_are_declared_where_averages_live() {
        assert_eq!(
            StatCategory::SpeedDistance.schema().reset_on_merge,
            &["AVG_SPEED", "AVG_SPEED_OFF", "AVG_SPEED_DEF"]
        );
        assert_eq!(
            StatCategory::Possessions.schema().reset_on_merge,
            &["AVG_SEC_PER_TOUCH", "AVG_DRIB_PER_TOUCH"]
        );
        assert!(StatCategory::Drives.schema().reset_on_merge.is_empty());
    }

    #[test]
    fn ratio_with_zero_denominator_is_zero() {
        assert_eq!(ratio(5.0, 0.0), 0.0);
        assert_eq!(ratio(0.0, 0.0), 0.0);
        assert!((ratio(6.0, 11.0) - 6.0 / 11.0).abs() < f64::EPSILON);
    }

    #[test]
    fn effective_fg_counts_threes_as_one_and_a_half() {
        // 4 makes, 2 of them threes, 10 attempts -> (4 + 1) / 10
        assert!((effective_fg_pct(4.0, 2.0, 10.0) - 0.5).abs() < f64::EPSILON);
        assert_eq!(effective_fg_pct(3.0, 1.0, 0.0), 0.0);
    }

    #[test]
    fn formula_treats_unknown_columns_as_zero() {
        let formula = RatioFormula::Ratio {
            numerator: "DRIVE_PTS",
            denominator: "DRIVES",
        };
        let value = formula.evaluate(|name| (name == "DRIVE_PTS").then_some(12.0));
        assert_eq!(value, 0.0);
    }

    #[test]
    fn parses_measure_type_and_snake_case() {
        assert_eq!("PullUpShot".parse::<StatCategory>().unwrap(), StatCategory::PullUp);
        assert_eq!("pull_up".parse::<StatCategory>().unwrap(), StatCategory::PullUp);
        assert_eq!(
            "speeddistance".parse::<StatCategory>().unwrap(),
            StatCategory::SpeedDistance
        );
        assert!("Hustle".parse::<StatCategory>().is_err());
    }

    #[test]
    fn display_uses_measure_type() {
        assert_eq!(StatCategory::Efficiency.to_string(), "Efficiency");
        assert_eq!(StatCategory::PullUp.to_string(), "PullUpShot");
    }
}
