//! Configuration loading and typed config structures for the climate club.
//!
//! The canonical configuration lives in `club-config.yaml` at the project
//! root. Every section and every field has a default, so an empty file (or
//! no file at all) yields the documented game constants.

use std::path::Path;

use club_types::GameState;
use club_types::state::{
    DEFAULT_CREDIBILITY, DEFAULT_FLOOR, DEFAULT_FLOOR_STEP, DEFAULT_INFLATION, DEFAULT_MARKET,
    DEFAULT_PRIVATE_SHARE, DEFAULT_SENTIMENT, DEFAULT_START_YEAR,
};
use serde::Deserialize;

use crate::clock::Calendar;
use crate::weighting::TieBreak;

/// Upper bound on the number of history entries kept in the state document.
pub const MAX_HISTORY: usize = 20;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of its valid range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level club configuration, mirroring `club-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ClubConfig {
    /// Calendar and round settings.
    #[serde(default)]
    pub game: GameConfig,

    /// Values of a freshly reset state document.
    #[serde(default)]
    pub initial: InitialConfig,

    /// Vote aggregation settings.
    #[serde(default)]
    pub voting: VotingConfig,

    /// Floor forward-guidance rule.
    #[serde(default)]
    pub guidance: GuidanceConfig,

    /// Per-turn swing clamps.
    #[serde(default)]
    pub clamps: ClampConfig,

    /// Market move and floor defense.
    #[serde(default)]
    pub market: MarketConfig,

    /// Private capital reaction.
    #[serde(default)]
    pub capital: CapitalConfig,

    /// Coalition mechanics.
    #[serde(default)]
    pub coalition: CoalitionConfig,

    /// File locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Bot-played session settings (runner binary only).
    #[serde(default)]
    pub session: SessionConfig,
}

impl ClubConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for file locations:
    /// - `CLUB_STATE_PATH` overrides `storage.state_path`
    /// - `CLUB_CATALOG_PATH` overrides `storage.catalog_path`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.storage.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.voting.supermajority_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Invalid {
                reason: format!("voting.supermajority_threshold {threshold} must be in (0, 1]"),
            });
        }
        if !(self.initial.floor_step.is_finite() && self.initial.floor_step > 0.0) {
            return Err(ConfigError::Invalid {
                reason: "initial.floor_step must be positive".to_owned(),
            });
        }
        if self.game.end_year < self.game.start_year {
            return Err(ConfigError::Invalid {
                reason: "game.end_year is before game.start_year".to_owned(),
            });
        }
        if self.game.history_limit == 0 || self.game.history_limit > MAX_HISTORY {
            return Err(ConfigError::Invalid {
                reason: format!("game.history_limit must be between 1 and {MAX_HISTORY}"),
            });
        }
        let bounds = [
            ("clamps.sentiment_step", self.clamps.sentiment_step),
            ("clamps.private_share_step", self.clamps.private_share_step),
            ("clamps.inflation_step", self.clamps.inflation_step),
            ("clamps.credibility_max", self.clamps.credibility_max),
            ("market.supply_cap", self.market.supply_cap),
            ("guidance.min_floor", self.guidance.min_floor),
        ];
        for (name, value) in bounds {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid {
                    reason: format!("{name} {value} must be finite and non-negative"),
                });
            }
        }
        Ok(())
    }

    /// Calendar bounded by the configured years.
    pub const fn calendar(&self) -> Calendar {
        Calendar::from_config(&self.game)
    }

    /// A fresh state document built from the `initial` section.
    ///
    /// Project offers are left empty; the engine draws them.
    pub fn initial_state(&self) -> GameState {
        let mut state = GameState {
            floor: self.initial.floor,
            market: self.initial.market,
            inflation: self.initial.inflation,
            private_share: self.initial.private_share,
            sentiment: self.initial.sentiment,
            credibility: self.initial.credibility,
            floor_step: self.initial.floor_step,
            ..GameState::default()
        };
        self.calendar().sync_period(&mut state);
        state
    }
}

/// Calendar and round settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Year of turn 1.
    #[serde(default = "default_start_year")]
    pub start_year: u32,

    /// Last playable year.
    #[serde(default = "default_end_year")]
    pub end_year: u32,

    /// Project offers drawn per round.
    #[serde(default = "default_projects_per_round")]
    pub projects_per_round: usize,

    /// Maximum history entries kept.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// RNG seed; absent means seeded from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            end_year: default_end_year(),
            projects_per_round: default_projects_per_round(),
            history_limit: default_history_limit(),
            seed: None,
        }
    }
}

/// Values of a freshly reset state document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InitialConfig {
    /// Price floor.
    #[serde(default = "default_floor")]
    pub floor: f64,

    /// Market price.
    #[serde(default = "default_market")]
    pub market: f64,

    /// Inflation.
    #[serde(default = "default_inflation")]
    pub inflation: f64,

    /// Private share of demand.
    #[serde(default = "default_private_share")]
    pub private_share: f64,

    /// Sentiment.
    #[serde(default = "default_sentiment")]
    pub sentiment: f64,

    /// Credibility.
    #[serde(default = "default_credibility")]
    pub credibility: f64,

    /// Floor step for honored raises and lowers.
    #[serde(default = "default_floor_step")]
    pub floor_step: f64,
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            floor: default_floor(),
            market: default_market(),
            inflation: default_inflation(),
            private_share: default_private_share(),
            sentiment: default_sentiment(),
            credibility: default_credibility(),
            floor_step: default_floor_step(),
        }
    }
}

/// Vote aggregation settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VotingConfig {
    /// Winning share needed for a supermajority.
    #[serde(default = "default_supermajority_threshold")]
    pub supermajority_threshold: f64,

    /// How equal bucket totals are broken.
    #[serde(default)]
    pub tie_break: TieBreak,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            supermajority_threshold: default_supermajority_threshold(),
            tie_break: TieBreak::default(),
        }
    }
}

/// Floor forward-guidance rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GuidanceConfig {
    /// Turns that must pass between honored floor changes.
    #[serde(default = "default_cooldown_turns")]
    pub cooldown_turns: u32,

    /// Credibility lost when guidance is broken.
    #[serde(default = "default_credibility_penalty")]
    pub credibility_penalty: f64,

    /// Private share lost when guidance is broken.
    #[serde(default = "default_private_share_penalty")]
    pub private_share_penalty: f64,

    /// Lowest allowed floor.
    #[serde(default = "default_min_floor")]
    pub min_floor: f64,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            cooldown_turns: default_cooldown_turns(),
            credibility_penalty: default_credibility_penalty(),
            private_share_penalty: default_private_share_penalty(),
            min_floor: default_min_floor(),
        }
    }
}

/// Per-turn swing clamps against client-observed values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClampConfig {
    /// Maximum sentiment move either way.
    #[serde(default = "default_sentiment_step")]
    pub sentiment_step: f64,

    /// Maximum private share move either way.
    #[serde(default = "default_private_share_step")]
    pub private_share_step: f64,

    /// Maximum upward inflation move.
    #[serde(default = "default_inflation_step")]
    pub inflation_step: f64,

    /// Credibility ceiling.
    #[serde(default = "default_credibility_max")]
    pub credibility_max: f64,
}

impl Default for ClampConfig {
    fn default() -> Self {
        Self {
            sentiment_step: default_sentiment_step(),
            private_share_step: default_private_share_step(),
            inflation_step: default_inflation_step(),
            credibility_max: default_credibility_max(),
        }
    }
}

/// Market move and floor defense coefficients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketConfig {
    /// Market drift per unit of sentiment.
    #[serde(default = "default_market_sentiment_coefficient")]
    pub sentiment_coefficient: f64,

    /// Incoming supply above this is ignored.
    #[serde(default = "default_supply_cap")]
    pub supply_cap: f64,

    /// Market drop per unit of incoming supply.
    #[serde(default = "default_supply_coefficient")]
    pub supply_coefficient: f64,

    /// Inflation added per unit of CQE purchase.
    #[serde(default = "default_cqe_inflation_coefficient")]
    pub cqe_inflation_coefficient: f64,

    /// Scale the move by the coordination index effects.
    #[serde(default)]
    pub apply_coordination_effects: bool,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            sentiment_coefficient: default_market_sentiment_coefficient(),
            supply_cap: default_supply_cap(),
            supply_coefficient: default_supply_coefficient(),
            cqe_inflation_coefficient: default_cqe_inflation_coefficient(),
            apply_coordination_effects: false,
        }
    }
}

/// Private capital reaction coefficients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CapitalConfig {
    /// Share gained per unit of sentiment.
    #[serde(default = "default_capital_sentiment_coefficient")]
    pub sentiment_coefficient: f64,

    /// Share lost per unit of inflation.
    #[serde(default = "default_capital_inflation_coefficient")]
    pub inflation_coefficient: f64,

    /// Share gained per unit of credibility above the pivot.
    #[serde(default = "default_capital_credibility_coefficient")]
    pub credibility_coefficient: f64,

    /// Credibility at which the credibility term is neutral.
    #[serde(default = "default_credibility_pivot")]
    pub credibility_pivot: f64,
}

impl Default for CapitalConfig {
    fn default() -> Self {
        Self {
            sentiment_coefficient: default_capital_sentiment_coefficient(),
            inflation_coefficient: default_capital_inflation_coefficient(),
            credibility_coefficient: default_capital_credibility_coefficient(),
            credibility_pivot: default_credibility_pivot(),
        }
    }
}

/// Coalition mechanics.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoalitionConfig {
    /// Supermajority dividend.
    #[serde(default)]
    pub dividend: DividendConfig,

    /// Sector R&D surges.
    #[serde(default)]
    pub rnd: RndConfig,

    /// Minimum distinct countries for a joint MRV agreement.
    #[serde(default = "default_mrv_min_members")]
    pub mrv_min_members: usize,
}

impl Default for CoalitionConfig {
    fn default() -> Self {
        Self {
            dividend: DividendConfig::default(),
            rnd: RndConfig::default(),
            mrv_min_members: default_mrv_min_members(),
        }
    }
}

/// Supermajority dividend settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DividendConfig {
    /// Credibility granted at full effectiveness.
    #[serde(default = "default_credibility_boost")]
    pub credibility_boost: f64,

    /// Intervention multiplier at full effectiveness.
    #[serde(default = "default_intervention_multiplier")]
    pub intervention_multiplier: f64,

    /// Milestone bonus at full effectiveness, in percent.
    #[serde(default = "default_milestone_bonus_pct")]
    pub milestone_bonus_pct: f64,

    /// Turns the dividend lasts.
    #[serde(default = "default_dividend_duration")]
    pub duration_turns: u32,
}

impl Default for DividendConfig {
    fn default() -> Self {
        Self {
            credibility_boost: default_credibility_boost(),
            intervention_multiplier: default_intervention_multiplier(),
            milestone_bonus_pct: default_milestone_bonus_pct(),
            duration_turns: default_dividend_duration(),
        }
    }
}

/// Sector R&D surge settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RndConfig {
    /// Base cost reduction in percent.
    #[serde(default = "default_cost_reduction_pct")]
    pub cost_reduction_pct: f64,

    /// Turns a surge lasts.
    #[serde(default = "default_rnd_duration")]
    pub duration_turns: u32,

    /// Members below this count make a solo surge.
    #[serde(default = "default_rnd_min_members")]
    pub min_members: usize,
}

impl Default for RndConfig {
    fn default() -> Self {
        Self {
            cost_reduction_pct: default_cost_reduction_pct(),
            duration_turns: default_rnd_duration(),
            min_members: default_rnd_min_members(),
        }
    }
}

/// File locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON state document.
    #[serde(default = "default_state_path")]
    pub state_path: String,

    /// Path of the YAML project/event/country catalog.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
}

impl StorageConfig {
    /// Override file locations with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CLUB_STATE_PATH") {
            self.state_path = val;
        }
        if let Ok(val) = std::env::var("CLUB_CATALOG_PATH") {
            self.catalog_path = val;
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            catalog_path: default_catalog_path(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Bot-played session settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Rounds to play.
    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// Countries seated as bot players.
    #[serde(default = "default_countries")]
    pub countries: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            countries: default_countries(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_start_year() -> u32 {
    DEFAULT_START_YEAR
}

const fn default_end_year() -> u32 {
    2050
}

const fn default_projects_per_round() -> usize {
    3
}

const fn default_history_limit() -> usize {
    MAX_HISTORY
}

const fn default_floor() -> f64 {
    DEFAULT_FLOOR
}

const fn default_market() -> f64 {
    DEFAULT_MARKET
}

const fn default_inflation() -> f64 {
    DEFAULT_INFLATION
}

const fn default_private_share() -> f64 {
    DEFAULT_PRIVATE_SHARE
}

const fn default_sentiment() -> f64 {
    DEFAULT_SENTIMENT
}

const fn default_credibility() -> f64 {
    DEFAULT_CREDIBILITY
}

const fn default_floor_step() -> f64 {
    DEFAULT_FLOOR_STEP
}

const fn default_supermajority_threshold() -> f64 {
    0.66
}

const fn default_cooldown_turns() -> u32 {
    3
}

const fn default_credibility_penalty() -> f64 {
    0.1
}

const fn default_private_share_penalty() -> f64 {
    0.05
}

const fn default_min_floor() -> f64 {
    10.0
}

const fn default_sentiment_step() -> f64 {
    0.04
}

const fn default_private_share_step() -> f64 {
    0.03
}

const fn default_inflation_step() -> f64 {
    0.02
}

const fn default_credibility_max() -> f64 {
    100.0
}

const fn default_market_sentiment_coefficient() -> f64 {
    5.0
}

const fn default_supply_cap() -> f64 {
    500_000.0
}

const fn default_supply_coefficient() -> f64 {
    0.000_01
}

const fn default_cqe_inflation_coefficient() -> f64 {
    0.001
}

const fn default_capital_sentiment_coefficient() -> f64 {
    0.02
}

const fn default_capital_inflation_coefficient() -> f64 {
    0.02
}

const fn default_capital_credibility_coefficient() -> f64 {
    0.03
}

const fn default_credibility_pivot() -> f64 {
    0.5
}

const fn default_credibility_boost() -> f64 {
    10.0
}

const fn default_intervention_multiplier() -> f64 {
    0.8
}

const fn default_milestone_bonus_pct() -> f64 {
    10.0
}

const fn default_dividend_duration() -> u32 {
    4
}

const fn default_cost_reduction_pct() -> f64 {
    12.5
}

const fn default_rnd_duration() -> u32 {
    2
}

const fn default_rnd_min_members() -> usize {
    3
}

const fn default_mrv_min_members() -> usize {
    3
}

fn default_state_path() -> String {
    "game-state.json".to_owned()
}

fn default_catalog_path() -> String {
    "data/catalog.yaml".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_rounds() -> u32 {
    8
}

fn default_countries() -> Vec<String> {
    ["USA", "CHN", "EU", "IND"]
        .iter()
        .map(|c| (*c).to_owned())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ClubConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.game.start_year, 2025);
        assert_eq!(config.game.history_limit, 20);
        assert_eq!(config.guidance.cooldown_turns, 3);
        assert_eq!(config.voting.tie_break, TieBreak::DeclarationOrder);
        assert!(!config.market.apply_coordination_effects);
        assert_eq!(config.coalition.dividend.duration_turns, 4);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
game:
  start_year: 2025
  end_year: 2040
  projects_per_round: 4
  history_limit: 10
  seed: 99

initial:
  floor: 60
  floor_step: 2.5

voting:
  supermajority_threshold: 0.75
  tie_break: heaviest_member

guidance:
  cooldown_turns: 2

market:
  apply_coordination_effects: true

coalition:
  dividend:
    credibility_boost: 5
  rnd:
    cost_reduction_pct: 20

logging:
  level: debug
  format: json

session:
  rounds: 3
  countries: [USA, BRA]
";
        let config = ClubConfig::parse(yaml).unwrap();
        assert_eq!(config.game.end_year, 2040);
        assert_eq!(config.game.seed, Some(99));
        assert!((config.initial.floor - 60.0).abs() < f64::EPSILON);
        assert!((config.initial.market - 82.0).abs() < f64::EPSILON);
        assert_eq!(config.voting.tie_break, TieBreak::HeaviestMember);
        assert_eq!(config.guidance.cooldown_turns, 2);
        assert!(config.market.apply_coordination_effects);
        assert!((config.coalition.dividend.credibility_boost - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.coalition.dividend.duration_turns, 4);
        assert!((config.coalition.rnd.cost_reduction_pct - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.session.countries, vec!["USA", "BRA"]);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = ClubConfig::parse("game:\n  seed: 7\n").unwrap();
        assert_eq!(config.game.seed, Some(7));
        assert_eq!(config.game.projects_per_round, 3);
        assert!((config.voting.supermajority_threshold - 0.66).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(ClubConfig::parse("").is_ok());
    }

    #[test]
    fn default_matches_empty_yaml() {
        let parsed = ClubConfig::parse("").unwrap();
        let mut expected = ClubConfig::default();
        expected.storage = parsed.storage.clone();
        assert_eq!(parsed, expected);

        let sectionless: ClubConfig = serde_yml::from_str("game:\n  seed: 1\n").unwrap();
        assert_eq!(sectionless.coalition, CoalitionConfig::default());
        assert_eq!(sectionless.clamps, ClampConfig::default());
    }

    #[test]
    fn section_defaults_use_default_functions() {
        let config = ClubConfig::default();
        assert_eq!(config.coalition.mrv_min_members, default_mrv_min_members());
        assert_eq!(config.coalition.mrv_min_members, 3);
        assert_eq!(config.coalition.rnd.min_members, default_rnd_min_members());
        assert_eq!(config.game.history_limit, default_history_limit());
        assert_eq!(config.guidance.cooldown_turns, default_cooldown_turns());
        assert!((config.clamps.sentiment_step - default_sentiment_step()).abs() < f64::EPSILON);
        assert!((config.market.supply_cap - default_supply_cap()).abs() < f64::EPSILON);
        assert!(
            (config.coalition.dividend.credibility_boost - default_credibility_boost()).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn rejects_unusable_bounds() {
        for yaml in [
            "clamps:\n  sentiment_step: -0.01\n",
            "clamps:\n  private_share_step: .nan\n",
            "clamps:\n  credibility_max: -1\n",
            "market:\n  supply_cap: -5\n",
            "guidance:\n  min_floor: .inf\n",
            "game:\n  history_limit: 21\n",
        ] {
            let result = ClubConfig::parse(yaml);
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "accepted {yaml:?}"
            );
        }
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let result = ClubConfig::parse("voting:\n  supermajority_threshold: 1.5\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn initial_state_uses_initial_section() {
        let config = ClubConfig::parse("initial:\n  floor: 50\n").unwrap();
        let state = config.initial_state();
        assert!((state.floor - 50.0).abs() < f64::EPSILON);
        assert_eq!(state.turn, 1);
        assert_eq!(state.year, 2025);
        assert_eq!(state.phase, 1);
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("club-config.yaml");
        if path.exists() {
            let config = ClubConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
