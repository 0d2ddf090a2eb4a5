// Configuration loading and parsing (config/ptstats.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use ptstats_core::StatCategory;
use serde::Deserialize;
use thiserror::Error;

use crate::params::{
    CloseDefDist, Dribbles, GeneralRange, Location, SeasonType, ShotClock, ShotDist, ShotEntity,
    ShotFilters, TouchTime, TrackingFilters,
};

pub const CONFIG_FILE: &str = "ptstats.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub requests: RequestsConfig,
    pub job: JobConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_league_id")]
    pub league_id: String,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: default_timeout_secs(),
            league_id: default_league_id(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestsConfig {
    /// Pause before every request after the first, in seconds.
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,
}

impl RequestsConfig {
    /// Validated configs convert exactly. Otherwise negative or NaN reads as
    /// no delay and an oversized value saturates.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Full-season tracking totals plus the league total.
    Season,
    /// Full-season shot dashboard totals.
    Shots,
    /// Per-game tracking rows for a date range.
    GameLogs,
    /// Per-game shot dashboard rows for a date range.
    ShotGameLogs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub kind: JobKind,
    #[serde(default)]
    pub category: Option<StatCategory>,
    pub entity: ShotEntity,
    #[serde(default)]
    pub seasons: Vec<String>,
    #[serde(default)]
    pub season_types: Vec<SeasonType>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub opponent_team_id: Option<i64>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub shot_filters: ShotFilterConfig,
    pub output: String,
}

/// Shot filter dimensions; every omitted dimension is unfiltered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShotFilterConfig {
    #[serde(default)]
    pub close_def_dist: Vec<CloseDefDist>,
    #[serde(default)]
    pub shot_clock: Vec<ShotClock>,
    #[serde(default)]
    pub shot_dist: Vec<ShotDist>,
    #[serde(default)]
    pub touch_time: Vec<TouchTime>,
    #[serde(default)]
    pub dribbles: Vec<Dribbles>,
    #[serde(default)]
    pub general_range: Vec<GeneralRange>,
    #[serde(default)]
    pub period: Vec<u8>,
}

impl JobConfig {
    pub fn tracking_filters(&self) -> TrackingFilters {
        TrackingFilters {
            date_from: self.date_from,
            date_to: self.date_to,
            opponent_team_id: self.opponent_team_id,
            location: self.location,
        }
    }

    pub fn shot_filters(&self) -> ShotFilters {
        let s = &self.shot_filters;
        ShotFilters {
            close_def_dist: s.close_def_dist.clone(),
            shot_clock: s.shot_clock.clone(),
            shot_dist: s.shot_dist.clone(),
            touch_time: s.touch_time.clone(),
            dribbles: s.dribbles.clone(),
            general_range: s.general_range.clone(),
            period: s.period.clone(),
            date_from: self.date_from,
            date_to: self.date_to,
            location: self.location,
        }
    }
}

const DEFAULT_BASE_URL: &str = "https://stats.nba.com/stats";

fn default_timeout_secs() -> u64 {
    10
}

fn default_league_id() -> String {
    "00".to_string()
}

fn default_delay_secs() -> f64 {
    2.0
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/ptstats.toml` relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config = parse_config(&text).map_err(|source| ConfigError::ParseError {
        path: path.clone(),
        source,
    })?;
    validate(&config)?;
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}

/// Seed `config/ptstats.toml` from `defaults/ptstats.toml` when it is
/// missing. Returns the path written, or `None` when the config already
/// exists. An existing config is never overwritten.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.is_file() {
        return Ok(None);
    }

    let default = base_dir.join("defaults").join(CONFIG_FILE);
    if !default.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no {} and no {} to seed it from",
                target.display(),
                default.display()
            ),
        });
    }

    let copy_error = |action: &str, e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to {action}: {e}"),
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| copy_error("create config directory", e))?;
    }
    std::fs::copy(&default, &target)
        .map_err(|e| copy_error(&format!("copy {}", default.display()), e))?;
    Ok(Some(target))
}

/// Loads config relative to the current working directory, copying default
/// files first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// `YYYY-YY` with the second year following the first.
fn is_season_label(season: &str) -> bool {
    let Some((start, end)) = season.split_once('-') else {
        return false;
    };
    if start.len() != 4 || end.len() != 2 {
        return false;
    }
    match (start.parse::<u32>(), end.parse::<u32>()) {
        (Ok(start), Ok(end)) => (start + 1) % 100 == end,
        _ => false,
    }
}

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.api.base_url.trim().is_empty() {
        return Err(invalid("api.base_url", "must not be empty"));
    }
    if config.api.timeout_secs == 0 {
        return Err(invalid("api.timeout_secs", "must be > 0"));
    }
    let delay = config.requests.delay_secs;
    if Duration::try_from_secs_f64(delay).is_err() {
        return Err(invalid(
            "requests.delay_secs",
            format!("must be a non-negative number of seconds, got {delay}"),
        ));
    }

    let job = &config.job;
    if job.output.trim().is_empty() {
        return Err(invalid("job.output", "must not be empty"));
    }

    match job.kind {
        JobKind::Season | JobKind::Shots => {
            if job.seasons.is_empty() {
                return Err(invalid("job.seasons", "at least one season is required"));
            }
            if job.season_types.is_empty() {
                return Err(invalid(
                    "job.season_types",
                    "at least one season type is required",
                ));
            }
        }
        JobKind::GameLogs | JobKind::ShotGameLogs => match (job.date_from, job.date_to) {
            (Some(from), Some(to)) if from > to => {
                return Err(invalid(
                    "job.date_from",
                    format!("{from} is after date_to {to}"),
                ));
            }
            (Some(_), Some(_)) => {}
            _ => {
                return Err(invalid(
                    "job.date_from",
                    "game log jobs need both date_from and date_to",
                ));
            }
        },
    }

    if let Some(season) = job.seasons.iter().find(|s| !is_season_label(s)) {
        return Err(invalid(
            "job.seasons",
            format!("expected YYYY-YY, got {season:?}"),
        ));
    }

    if matches!(job.kind, JobKind::Season | JobKind::GameLogs) {
        if job.category.is_none() {
            return Err(invalid("job.category", "required for tracking jobs"));
        }
        if job.entity == ShotEntity::Opponent {
            return Err(invalid(
                "job.entity",
                "tracking jobs support player or team only",
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: locate the workspace root that holds `defaults/`
    /// (works whether `cargo test` runs from the crate or the workspace).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        for candidate in [cwd.clone(), cwd.join("../.."), cwd.join("..")] {
            if candidate.join("defaults").join(CONFIG_FILE).exists() {
                return candidate;
            }
        }
        panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
    }

    const MINIMAL: &str = r#"
[api]
base_url = "https://stats.nba.com/stats"

[job]
kind = "season"
category = "drives"
entity = "team"
seasons = ["2019-20"]
season_types = ["Regular Season"]
output = "out.csv"
"#;

    #[test]
    fn load_default_config_file() {
        let root = project_root();
        let tmp = std::env::temp_dir().join("ptstats_config_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            root.join("defaults").join(CONFIG_FILE),
            tmp.join("defaults").join(CONFIG_FILE),
        )
        .unwrap();

        let copied = ensure_config_file(&tmp).expect("should seed the config");
        assert_eq!(copied, Some(tmp.join("config").join(CONFIG_FILE)));
        let config = load_config_from(&tmp).expect("should load default config");

        assert_eq!(config.api.base_url, "https://stats.nba.com/stats");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.api.league_id, "00");
        assert!((config.requests.delay_secs - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.job.kind, JobKind::Season);

        // Second run leaves the existing copy alone.
        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let config = parse_config(MINIMAL).unwrap();
        validate(&config).unwrap();
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
        assert_eq!(config.requests.delay(), Duration::from_secs(2));
        assert_eq!(config.job.category, Some(StatCategory::Drives));
        assert_eq!(config.job.season_types, vec![SeasonType::RegularSeason]);
        assert_eq!(config.job.shot_filters().combinations().len(), 1);
    }

    #[test]
    fn shot_filters_parse_upstream_values() {
        let text = MINIMAL.replace("kind = \"season\"", "kind = \"shots\"")
            + r#"
[job.shot_filters]
close_def_dist = ["0-2 Feet - Very Tight", "2-4 Feet - Tight"]
general_range = ["Catch and Shoot"]
period = [4]
"#;
        let config = parse_config(&text).unwrap();
        let filters = config.job.shot_filters();
        assert_eq!(
            filters.close_def_dist,
            vec![CloseDefDist::VeryTight, CloseDefDist::Tight]
        );
        assert_eq!(filters.general_range, vec![GeneralRange::CatchAndShoot]);
        assert_eq!(filters.combinations().len(), 2);
    }

    #[test]
    fn unknown_filter_value_is_a_parse_error() {
        let text = MINIMAL.to_string()
            + r#"
[job.shot_filters]
dribbles = ["12 Dribbles"]
"#;
        assert!(parse_config(&text).is_err());
    }

    #[test]
    fn rejects_bad_season_label() {
        let text = MINIMAL.replace("\"2019-20\"", "\"2019-2020\"");
        let config = parse_config(&text).unwrap();
        match validate(&config).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "job.seasons"),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn rejects_out_of_range_delay() {
        for delay in ["1e30", "-1.0", "nan"] {
            let text = format!("{MINIMAL}\n[requests]\ndelay_secs = {delay}\n");
            let config = parse_config(&text).unwrap();
            match validate(&config).unwrap_err() {
                ConfigError::ValidationError { field, .. } => {
                    assert_eq!(field, "requests.delay_secs")
                }
                other => panic!("expected ValidationError, got: {other}"),
            }
        }

        let huge = RequestsConfig { delay_secs: 1e30 };
        assert_eq!(huge.delay(), Duration::MAX);
        let negative = RequestsConfig { delay_secs: -1.0 };
        assert_eq!(negative.delay(), Duration::ZERO);
    }

    #[test]
    fn rejects_tracking_job_without_category() {
        let text = MINIMAL.replace("category = \"drives\"\n", "");
        let config = parse_config(&text).unwrap();
        match validate(&config).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "job.category"),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn rejects_reversed_game_log_dates() {
        let text = MINIMAL.replace("kind = \"season\"", "kind = \"game_logs\"").replace(
            "output = \"out.csv\"",
            "output = \"out.csv\"\ndate_from = \"2020-01-10\"\ndate_to = \"2020-01-05\"",
        );
        let config = parse_config(&text).unwrap();
        match validate(&config).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "job.date_from"),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn rejects_opponent_tracking_job() {
        let text = MINIMAL.replace("entity = \"team\"", "entity = \"opponent\"");
        let config = parse_config(&text).unwrap();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn season_labels() {
        assert!(is_season_label("2019-20"));
        assert!(is_season_label("1999-00"));
        assert!(!is_season_label("2019-21"));
        assert!(!is_season_label("19-20"));
    }

    #[test]
    fn seeding_without_defaults_fails() {
        let tmp = std::env::temp_dir().join("ptstats_config_no_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_config_file(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));

        // An existing config needs no defaults.
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE), MINIMAL).unwrap();
        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_reports_path() {
        let tmp = std::env::temp_dir().join("ptstats_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("config/ptstats.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }
    }
}
