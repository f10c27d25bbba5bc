//! Configuration types for the imputation benchmark.
//!
//! The scenario matrix and the dataset-to-column mapping are plain values
//! passed into [`BenchmarkRunner`](crate::pipeline::BenchmarkRunner); nothing
//! here is process-wide state. Use [`BenchmarkConfig::builder()`] for a fluent
//! setup or [`BenchmarkConfig::from_json_file`] to load one from disk.

use crate::error::{BenchError, Result, ResultExt};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Block length used by the burst mechanism.
pub const DEFAULT_BURST_LENGTH: usize = 5;

/// Seed shared by the injector and the seeded strategies.
pub const DEFAULT_SEED: u64 = 42;

/// How missing cells are positioned in the target columns.
///
/// Deserializes leniently: an unknown name becomes [`MissingMechanism::Random`]
/// with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingMechanism {
    /// Cells removed independently, uniformly over rows and target columns
    #[default]
    Random,
    /// Contiguous row blocks removed within a single column
    Burst,
}

impl MissingMechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Burst => "burst",
        }
    }

    /// Parse `name`, falling back to [`MissingMechanism::Random`] with a warning.
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!(
                "Unknown missing type '{}'. Using default '{}'.",
                name,
                Self::default()
            );
            Self::default()
        })
    }
}

impl<'de> Deserialize<'de> for MissingMechanism {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name_or_default(&name))
    }
}

impl fmt::Display for MissingMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissingMechanism {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "burst" => Ok(Self::Burst),
            other => Err(BenchError::UnknownMechanism(other.to_string())),
        }
    }
}

/// Percentage range `[min, max]` the injector draws its missing fraction from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentRange {
    pub min: f64,
    pub max: f64,
}

impl PercentRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Both bounds inside `[0, 100]` and `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && (0.0..=100.0).contains(&self.min)
            && (0.0..=100.0).contains(&self.max)
            && self.min <= self.max
    }
}

impl fmt::Display for PercentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}%", self.min, self.max)
    }
}

/// One cell of the scenario matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub percent_range: PercentRange,
    pub mechanism: MissingMechanism,
}

impl Scenario {
    pub fn new(min: f64, max: f64, mechanism: MissingMechanism) -> Self {
        Self {
            percent_range: PercentRange::new(min, max),
            mechanism,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.percent_range, self.mechanism)
    }
}

/// A dataset file and the columns that receive gaps and get scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub path: PathBuf,
    pub target_columns: Vec<String>,
    /// Column parsed as a date; absent columns are tolerated.
    #[serde(default = "default_date_column")]
    pub date_column: Option<String>,
}

fn default_date_column() -> Option<String> {
    Some("date".to_string())
}

impl DatasetSpec {
    pub fn new(path: impl Into<PathBuf>, target_columns: &[&str]) -> Self {
        Self {
            path: path.into(),
            target_columns: target_columns.iter().map(|c| c.to_string()).collect(),
            date_column: default_date_column(),
        }
    }

    /// File name used to label this dataset in reports.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Summary statistic used by the univariate strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FillStatistic {
    /// Mean of observed values
    #[default]
    Mean,
    /// Median of observed values
    Median,
    /// Most frequent observed value (smallest on ties)
    MostFrequent,
}

impl FillStatistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::MostFrequent => "most_frequent",
        }
    }
}

/// Which cells the evaluator scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// Only the cells the injector nulled
    #[default]
    InjectedCells,
    /// Every row where both ground truth and candidate are non-null
    ObservedCells,
}

/// Column visiting order for the iterative strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImputationOrder {
    /// Fewest missing values first
    #[default]
    Ascending,
    /// Seeded shuffle, redrawn every round
    Random,
}

/// Settings for [`IterativeImputer`](crate::imputers::IterativeImputer).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterativeSettings {
    pub max_iter: usize,
    pub tol: f64,
    pub ridge_alpha: f64,
    pub order: ImputationOrder,
}

impl Default for IterativeSettings {
    fn default() -> Self {
        Self {
            max_iter: 10,
            tol: 1e-3,
            ridge_alpha: 1.0,
            order: ImputationOrder::default(),
        }
    }
}

/// Settings for [`SoftImputer`](crate::imputers::SoftImputer).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftImputeSettings {
    pub max_iters: usize,
    pub convergence_threshold: f64,
    /// Fixed shrinkage; `None` derives it from the largest singular value.
    pub shrinkage_value: Option<f64>,
    pub max_rank: Option<usize>,
}

impl Default for SoftImputeSettings {
    fn default() -> Self {
        Self {
            max_iters: 100,
            convergence_threshold: 1e-3,
            shrinkage_value: None,
            max_rank: None,
        }
    }
}

/// Configuration for a benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Datasets and their target columns, visited in order.
    pub datasets: Vec<DatasetSpec>,

    /// Scenario matrix applied to every dataset, in order.
    pub scenarios: Vec<Scenario>,

    /// Seed for injection and seeded strategies.
    /// Default: 42
    pub seed: u64,

    /// Rows per burst.
    /// Default: 5
    pub burst_length: usize,

    /// Statistic for the univariate strategy.
    /// Default: Mean
    pub statistic: FillStatistic,

    pub iterative: IterativeSettings,

    pub soft_impute: SoftImputeSettings,

    /// Cells included in MAE / RMSE.
    /// Default: InjectedCells
    pub scoring: ScoringPolicy,

    /// Block for acknowledgment between scenarios.
    /// Default: true
    pub pause_between_scenarios: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            datasets: vec![
                DatasetSpec::new(
                    "seattle-weather.csv",
                    &["precipitation", "temp_max", "temp_min", "wind"],
                ),
                DatasetSpec::new(
                    "south-korean-pollution-data.csv",
                    &["pm10", "pm25", "o3", "no2"],
                ),
            ],
            scenarios: vec![
                Scenario::new(10.0, 15.0, MissingMechanism::Random),
                Scenario::new(10.0, 15.0, MissingMechanism::Burst),
                Scenario::new(20.0, 25.0, MissingMechanism::Random),
                Scenario::new(20.0, 25.0, MissingMechanism::Burst),
            ],
            seed: DEFAULT_SEED,
            burst_length: DEFAULT_BURST_LENGTH,
            statistic: FillStatistic::default(),
            iterative: IterativeSettings::default(),
            soft_impute: SoftImputeSettings::default(),
            scoring: ScoringPolicy::default(),
            pause_between_scenarios: true,
        }
    }
}

impl BenchmarkConfig {
    /// Create a new configuration builder.
    pub fn builder() -> BenchmarkConfigBuilder {
        BenchmarkConfigBuilder::default()
    }

    /// Load and validate a JSON configuration file.
    ///
    /// Fields missing from the file take their default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .context(format!("Reading config '{}'", path.display()))?;
        let config: BenchmarkConfig = serde_json::from_str(&raw)
            .map_err(|e| BenchError::Json(e).with_context(format!("Parsing config '{}'", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if self.scenarios.is_empty() {
            return Err(ConfigValidationError::NoScenarios);
        }

        for scenario in &self.scenarios {
            if !scenario.percent_range.is_valid() {
                return Err(ConfigValidationError::InvalidPercentRange {
                    min: scenario.percent_range.min,
                    max: scenario.percent_range.max,
                });
            }
        }

        if let Some(dataset) = self.datasets.iter().find(|d| d.target_columns.is_empty()) {
            return Err(ConfigValidationError::NoTargetColumns(
                dataset.path.display().to_string(),
            ));
        }

        if self.burst_length == 0 {
            return Err(ConfigValidationError::InvalidBurstLength(self.burst_length));
        }

        if self.iterative.max_iter == 0 {
            return Err(ConfigValidationError::InvalidIterationBudget {
                field: "iterative.max_iter".to_string(),
            });
        }

        if self.soft_impute.max_iters == 0 {
            return Err(ConfigValidationError::InvalidIterationBudget {
                field: "soft_impute.max_iters".to_string(),
            });
        }

        let positive = [
            ("iterative.tol", self.iterative.tol),
            ("soft_impute.convergence_threshold", self.soft_impute.convergence_threshold),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigValidationError::NonPositive {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if !(self.iterative.ridge_alpha.is_finite() && self.iterative.ridge_alpha >= 0.0) {
            return Err(ConfigValidationError::NonPositive {
                field: "iterative.ridge_alpha".to_string(),
                value: self.iterative.ridge_alpha,
            });
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid percent range {min}-{max} (need 0 <= min <= max <= 100)")]
    InvalidPercentRange { min: f64, max: f64 },

    #[error("Invalid burst length: {0} (must be at least 1)")]
    InvalidBurstLength(usize),

    #[error("Iteration budget '{field}' must be at least 1")]
    InvalidIterationBudget { field: String },

    #[error("Invalid value for '{field}': {value} (must be positive)")]
    NonPositive { field: String, value: f64 },

    #[error("No scenarios configured")]
    NoScenarios,

    #[error("Dataset '{0}' has no target columns")]
    NoTargetColumns(String),
}

/// Builder for [`BenchmarkConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct BenchmarkConfigBuilder {
    datasets: Option<Vec<DatasetSpec>>,
    scenarios: Option<Vec<Scenario>>,
    seed: Option<u64>,
    burst_length: Option<usize>,
    statistic: Option<FillStatistic>,
    iterative: Option<IterativeSettings>,
    soft_impute: Option<SoftImputeSettings>,
    scoring: Option<ScoringPolicy>,
    pause_between_scenarios: Option<bool>,
}

impl BenchmarkConfigBuilder {
    /// Replace the dataset list.
    pub fn datasets(mut self, datasets: Vec<DatasetSpec>) -> Self {
        self.datasets = Some(datasets);
        self
    }

    /// Append one dataset.
    pub fn dataset(mut self, dataset: DatasetSpec) -> Self {
        self.datasets.get_or_insert_with(Vec::new).push(dataset);
        self
    }

    /// Replace the scenario matrix.
    pub fn scenarios(mut self, scenarios: Vec<Scenario>) -> Self {
        self.scenarios = Some(scenarios);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn burst_length(mut self, length: usize) -> Self {
        self.burst_length = Some(length);
        self
    }

    pub fn statistic(mut self, statistic: FillStatistic) -> Self {
        self.statistic = Some(statistic);
        self
    }

    pub fn iterative(mut self, settings: IterativeSettings) -> Self {
        self.iterative = Some(settings);
        self
    }

    pub fn soft_impute(mut self, settings: SoftImputeSettings) -> Self {
        self.soft_impute = Some(settings);
        self
    }

    pub fn scoring(mut self, policy: ScoringPolicy) -> Self {
        self.scoring = Some(policy);
        self
    }

    /// Enable or disable the acknowledgment pause between scenarios.
    pub fn pause_between_scenarios(mut self, pause: bool) -> Self {
        self.pause_between_scenarios = Some(pause);
        self
    }

    /// Build the configuration.
    ///
    /// Unset fields fall back to [`BenchmarkConfig::default()`].
    pub fn build(self) -> std::result::Result<BenchmarkConfig, ConfigValidationError> {
        let defaults = BenchmarkConfig::default();
        let config = BenchmarkConfig {
            datasets: self.datasets.unwrap_or(defaults.datasets),
            scenarios: self.scenarios.unwrap_or(defaults.scenarios),
            seed: self.seed.unwrap_or(defaults.seed),
            burst_length: self.burst_length.unwrap_or(defaults.burst_length),
            statistic: self.statistic.unwrap_or(defaults.statistic),
            iterative: self.iterative.unwrap_or(defaults.iterative),
            soft_impute: self.soft_impute.unwrap_or(defaults.soft_impute),
            scoring: self.scoring.unwrap_or(defaults.scoring),
            pause_between_scenarios: self
                .pause_between_scenarios
                .unwrap_or(defaults.pause_between_scenarios),
        };

        config.validate()?;
        Ok(config)
    }
}
