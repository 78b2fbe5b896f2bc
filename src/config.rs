use serde::Deserialize;

/// Config file read when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

// ============================================================
// Input Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "default_input_path")]
    pub path: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
        }
    }
}

fn default_input_path() -> String {
    "data/transactions.json".to_string()
}

// ============================================================
// Output Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_scores_path")]
    pub scores_path: String,
    #[serde(default = "default_analysis_path")]
    pub analysis_path: String,
    /// Where to write the fitted scaler + forest, if anywhere.
    pub model_path: Option<String>,
    #[serde(default)]
    pub include_features: bool,
    #[serde(default = "default_true")]
    pub include_raw_score: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            scores_path: default_scores_path(),
            analysis_path: default_analysis_path(),
            model_path: None,
            include_features: false,
            include_raw_score: true,
        }
    }
}

fn default_scores_path() -> String {
    "outputs/wallet_scores.csv".to_string()
}

fn default_analysis_path() -> String {
    "analysis.md".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================
// Model Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_samples: default_max_samples(),
            seed: default_seed(),
        }
    }
}

fn default_n_estimators() -> usize {
    200
}

fn default_max_samples() -> usize {
    256
}

fn default_seed() -> u64 {
    42
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config from an optional command-line path. An explicit
    /// path must exist. Without one, `config.toml` is used if present,
    /// otherwise the defaults.
    pub fn from_arg(path: Option<&str>) -> eyre::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load(DEFAULT_CONFIG_PATH)
            }
            None => {
                tracing::info!(path = DEFAULT_CONFIG_PATH, "No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.model.n_estimators == 0 {
            return Err(eyre::eyre!("model.n_estimators must be at least 1"));
        }
        if self.model.max_samples < 2 {
            return Err(eyre::eyre!(
                "model.max_samples must be at least 2, got {}",
                self.model.max_samples
            ));
        }
        if self.input.path.trim().is_empty() {
            return Err(eyre::eyre!("input.path must not be empty"));
        }
        if self.output.scores_path.trim().is_empty() {
            return Err(eyre::eyre!("output.scores_path must not be empty"));
        }
        if self.output.analysis_path.trim().is_empty() {
            return Err(eyre::eyre!("output.analysis_path must not be empty"));
        }
        Ok(())
    }
}
