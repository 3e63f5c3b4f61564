//! Environment-driven configuration.
//!
//! A malformed numeric or boolean environment variable is a deployment mistake and
//! fails loudly at startup (`ConfigError`); a *missing* backing store is a runtime
//! condition the search path degrades around instead (see `lex_retrieve::handles`).

use std::env;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for {}: {:?}", self.var, self.value)
    }
}

impl std::error::Error for ConfigError {}

/// Runtime configuration, loaded once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub index_dir: PathBuf,
    pub vector_db_path: PathBuf,
    pub graph_db_path: PathBuf,
    pub statutes_db_path: PathBuf,

    pub llm_expansion_enabled: bool,
    pub llm_expansion_timeout_ms: u64,

    pub vector_weight: f64,
    pub vector_k: usize,
    pub vector_signal_weight: f64,

    pub sparse_k: usize,
    pub sparse_rrf_weight: f64,
    pub sparse_signal_weight: f64,

    pub cross_encoder_enabled: bool,
    pub cross_encoder_weight: f64,

    pub graph_signals_enabled: bool,

    /// Pass-through for the transport adapter; the core never reads this itself.
    pub auth_token: Option<String>,
    /// Pass-through for the transport adapter; the core never reads this itself.
    pub cors_origins: Option<String>,
}

impl Config {
    /// Load configuration from the process environment, applying documented
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            index_dir: path_var("LEX_INDEX_DIR", "."),
            vector_db_path: path_var("LEX_VECTOR_DB_PATH", "vectors.db"),
            graph_db_path: path_var("LEX_GRAPH_DB_PATH", "reference_graph.db"),
            statutes_db_path: path_var("LEX_STATUTES_DB_PATH", "statutes.db"),

            llm_expansion_enabled: bool_var("LLM_EXPANSION_ENABLED", true)?,
            llm_expansion_timeout_ms: u64_var("LLM_EXPANSION_TIMEOUT_MS", 2000)?,

            vector_weight: f64_var("VECTOR_WEIGHT", 1.0)?,
            vector_k: usize_var("VECTOR_K", 50)?,
            vector_signal_weight: f64_var("VECTOR_SIGNAL_WEIGHT", 3.0)?,

            sparse_k: usize_var("SPARSE_K", 100)?,
            sparse_rrf_weight: f64_var("SPARSE_RRF_WEIGHT", 1.2)?,
            sparse_signal_weight: f64_var("SPARSE_SIGNAL_WEIGHT", 2.5)?,

            cross_encoder_enabled: bool_var("CROSS_ENCODER_ENABLED", false)?,
            cross_encoder_weight: f64_var("CROSS_ENCODER_WEIGHT", 1.4)?,

            graph_signals_enabled: bool_var("GRAPH_SIGNALS_ENABLED", true)?,

            auth_token: env::var("AUTH_TOKEN").ok(),
            cors_origins: env::var("CORS_ORIGINS").ok(),
        })
    }
}

fn path_var(name: &'static str, default: &str) -> PathBuf {
    env::var(name).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

fn bool_var(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError { var: name, value: raw }),
        },
    }
}

fn f64_var(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|_| ConfigError { var: name, value: raw }),
    }
}

fn u64_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|_| ConfigError { var: name, value: raw }),
    }
}

fn usize_var(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|_| ConfigError { var: name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_var_rejects_garbage() {
        std::env::set_var("LEX_TEST_BOOL", "maybe");
        let err = bool_var("LEX_TEST_BOOL", true).unwrap_err();
        assert_eq!(err.var, "LEX_TEST_BOOL");
        std::env::remove_var("LEX_TEST_BOOL");
    }

    #[test]
    fn missing_var_uses_default() {
        std::env::remove_var("LEX_TEST_MISSING");
        assert_eq!(f64_var("LEX_TEST_MISSING", 1.4).unwrap(), 1.4);
    }
}
