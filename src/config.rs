use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.ideogram.ai/v1/ideogram-v3/generate";
pub const DEFAULT_OUTPUT_DIR: &str = "backgrounds";
/// Requests in flight never exceed this; it is also the default.
pub const MAX_WORKERS: usize = 4;

const API_KEY_VAR: &str = "IDEOGRAM_API_KEY";
const API_URL_VAR: &str = "IDEOGRAM_API_URL";
const OUTPUT_DIR_VAR: &str = "ASSETS_OUTPUT_DIR";
const WORKERS_VAR: &str = "ASSETS_WORKERS";
const TIMEOUT_VAR: &str = "ASSETS_TIMEOUT_SECS";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Batch configuration loaded from environment variables.
///
/// | Env Var               | Default                                           |
/// |-----------------------|---------------------------------------------------|
/// | `IDEOGRAM_API_KEY`    | required                                          |
/// | `IDEOGRAM_API_URL`    | `https://api.ideogram.ai/v1/ideogram-v3/generate` |
/// | `ASSETS_OUTPUT_DIR`   | `backgrounds`                                     |
/// | `ASSETS_WORKERS`      | `4` (1 to 4)                                      |
/// | `ASSETS_TIMEOUT_SECS` | unset (HTTP client default)                       |
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    pub output_dir: PathBuf,
    pub workers: usize,
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar(API_KEY_VAR))?;

        let api_url = lookup(API_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let output_dir = lookup(OUTPUT_DIR_VAR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let workers = match lookup(WORKERS_VAR) {
            Some(raw) => parse_workers(WORKERS_VAR, &raw)?,
            None => MAX_WORKERS,
        };

        let timeout = match lookup(TIMEOUT_VAR) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: TIMEOUT_VAR,
                    value: raw.clone(),
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            api_key,
            api_url,
            output_dir,
            workers,
            timeout,
        })
    }

    pub fn with_overrides(mut self, output_dir: Option<PathBuf>, workers: Option<usize>) -> Result<Self, ConfigError> {
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
        if let Some(n) = workers {
            self.workers = check_workers("--workers", n, &n.to_string())?;
        }
        Ok(self)
    }
}

fn parse_workers(var: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) => check_workers(var, n, raw),
        Err(_) => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
        }),
    }
}

fn check_workers(var: &'static str, n: usize, raw: &str) -> Result<usize, ConfigError> {
    if (1..=MAX_WORKERS).contains(&n) {
        Ok(n)
    } else {
        Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
        })
    }
}
