//! Configuration system
//!
//! Solver tolerances, working-set padding and pool sizes. Defaults match
//! the values the collision code has always been tuned with, so a missing
//! file behaves exactly like the built-in constants.

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_str_with_format(&contents, ConfigFormat::from_path(path)?)
    }

    /// Parse configuration text in the given format
    fn from_str_with_format(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = self.to_string_with_format(ConfigFormat::from_path(path)?)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Serialize configuration in the given format
    fn to_string_with_format(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string())),
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
    }
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// Rusty Object Notation
    Ron,
}

impl ConfigFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            Ok(Self::Toml)
        } else if path.ends_with(".ron") {
            Ok(Self::Ron)
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of range
    #[error("Invalid value: {0}")]
    Invalid(String),
}

/// Tuning for the GJK distance / intersection solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Upper bound on simplex updates per query
    pub max_iterations: u32,
    /// Relative error at which the distance estimate counts as converged
    pub relative_error: f32,
    /// Absolute distance below which shapes are treated as touching
    pub distance_tolerance: f32,
    /// Squared length below which the search vector counts as zero
    pub zero_length_squared: f32,
    /// Restart each query from the previous answer held in the state
    pub warm_start: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            relative_error: 1e-5,
            distance_tolerance: 1e-3,
            zero_length_squared: 1e-20,
            warm_start: true,
        }
    }
}

/// Padding used when refreshing working lists and state lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingSetConfig {
    /// Worst-case speed change per second added to the current speed
    pub max_acceleration: f32,
    /// Multiplier applied to the per-tick travel distance
    pub growth: f32,
    /// Constant added to the per-tick padding
    pub bias: f32,
    /// Extra padding of the cached query box, in multiples of the per-tick padding
    pub query_margin_factor: f32,
    /// Padding of the box that decides which working-list entries get a collision state
    pub state_box_margin: f32,
}

impl Default for WorkingSetConfig {
    fn default() -> Self {
        Self {
            max_acceleration: 10.0,
            growth: 1.1,
            bias: 0.1,
            query_margin_factor: 2.0,
            state_box_margin: 1.0,
        }
    }
}

/// Initial pool sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Shapes reserved up front
    pub shapes: usize,
    /// Working-list links reserved up front
    pub working_links: usize,
    /// Collision states reserved up front
    pub states: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            shapes: 256,
            working_links: 512,
            states: 256,
        }
    }
}

/// Top-level configuration of a collision world
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Solver tuning
    pub solver: SolverConfig,
    /// Working-set padding
    pub working_set: WorkingSetConfig,
    /// Pool sizes
    pub pool: PoolConfig,
}

impl Config for CollisionConfig {}

impl CollisionConfig {
    /// Check that every tolerance and padding is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let solver = &self.solver;
        let positive = [
            ("solver.relative_error", solver.relative_error),
            ("solver.distance_tolerance", solver.distance_tolerance),
            ("solver.zero_length_squared", solver.zero_length_squared),
            ("working_set.growth", self.working_set.growth),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }

        let ws = &self.working_set;
        let non_negative = [
            ("working_set.max_acceleration", ws.max_acceleration),
            ("working_set.bias", ws.bias),
            ("working_set.query_margin_factor", ws.query_margin_factor),
            ("working_set.state_box_margin", ws.state_box_margin),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must not be negative, got {value}")));
            }
        }
        Ok(())
    }
}
