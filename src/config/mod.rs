pub mod cli;
pub mod toml_config;

use crate::domain::model::DesignRequest;
use crate::utils::error::{DesignError, Result};
use crate::utils::validation::{
    validate_minimum, validate_non_empty_string, validate_path, validate_positive_finite,
    validate_url, Validate,
};
#[cfg(feature = "cli")]
use clap::Parser;
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use toml_config::FileConfig;

pub const API_KEY_ENV: &str = "DASHSCOPE_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const DEFAULT_MODEL: &str = "qwq-32b";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_OUTPUT_DIR: &str = "results";
pub const DEFAULT_NETLIST_FILE: &str = "rc_bandpass.sp";

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub echo_stream: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            echo_stream: true,
        }
    }
}

impl Validate for ServiceSettings {
    fn validate(&self) -> Result<()> {
        validate_url("service.base_url", &self.base_url)?;
        validate_non_empty_string("service.model", &self.model)?;
        validate_minimum("service.timeout_seconds", self.timeout_seconds, 1)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub directory: String,
    pub file_name: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: DEFAULT_OUTPUT_DIR.to_string(),
            file_name: DEFAULT_NETLIST_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub input_amplitude: f64,
    pub points_per_decade: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            input_amplitude: 1.0,
            points_per_decade: crate::domain::model::AcSweep::DEFAULT_POINTS_PER_DECADE,
        }
    }
}

/// Fully resolved settings for one design run.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub request: DesignRequest,
    pub service: ServiceSettings,
    pub output: OutputSettings,
    pub render: RenderSettings,
}

impl Validate for AgentConfig {
    fn validate(&self) -> Result<()> {
        self.request.validate()?;
        self.service.validate()?;
        validate_path("output.directory", &self.output.directory)?;
        validate_path("output.file_name", &self.output.file_name)?;
        validate_positive_finite("sweep.input_amplitude", self.render.input_amplitude)?;
        validate_minimum("sweep.points_per_decade", self.render.points_per_decade, 1)?;
        Ok(())
    }
}

/// Loads `.env` from the working directory or one of its parents into the
/// process environment. Variables that are already set are left untouched.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(e) if e.not_found() => None,
        Err(e) => {
            tracing::warn!("⚠️ Ignoring unreadable .env file: {}", e);
            None
        }
    }
}

/// Reads the credential variable from a dotenv file without touching the
/// process environment.
pub fn api_key_from_env_file(path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = path.as_ref();
    let entries = dotenvy::from_path_iter(path).map_err(|e| DesignError::ConfigError {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    for entry in entries {
        let (key, value) = entry.map_err(|e| DesignError::ConfigError {
            message: format!("Invalid entry in {}: {}", path.display(), e),
        })?;
        if key == API_KEY_ENV {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// First non-blank credential in precedence order.
pub fn resolve_api_key<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "rc-filter-agent")]
#[command(about = "Design an RC bandpass filter with a language model and emit a SPICE netlist")]
pub struct CliConfig {
    #[arg(long, default_value_t = 100.0, help = "Target center frequency in Hz")]
    pub center_freq: f64,

    #[arg(long, default_value_t = 40.0, help = "Target bandwidth in Hz")]
    pub bandwidth: f64,

    #[arg(long, help = "API key for the inference service (overrides DASHSCOPE_API_KEY)")]
    pub api_key: Option<String>,

    #[arg(short, long, help = "Path to a TOML settings file")]
    pub config: Option<String>,

    #[arg(long, help = "Base URL of the OpenAI-compatible service")]
    pub base_url: Option<String>,

    #[arg(long, help = "Model identifier")]
    pub model: Option<String>,

    #[arg(long, help = "Request timeout in seconds")]
    pub timeout_secs: Option<u64>,

    #[arg(long, help = "Directory the netlist is written to")]
    pub output_dir: Option<String>,

    #[arg(short, long, help = "Do not echo streamed model output to stderr")]
    pub quiet: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Reads the optional settings file and the credential environment
    /// variable. Call [`load_dotenv`] first for `.env` support.
    pub fn load(&self) -> Result<AgentConfig> {
        let file = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading settings from: {}", path);
                FileConfig::from_file(path)?
            }
            None => FileConfig::default(),
        };
        Ok(self.resolve(file, std::env::var(API_KEY_ENV).ok()))
    }

    /// Precedence: command line, then settings file, then defaults. The
    /// credential falls back to `env_api_key` last.
    pub fn resolve(&self, file: FileConfig, env_api_key: Option<String>) -> AgentConfig {
        let file_key = file.api_key();
        let service_file = file.service.unwrap_or_default();
        let output_file = file.output.unwrap_or_default();
        let sweep_file = file.sweep.unwrap_or_default();
        let defaults = ServiceSettings::default();
        let render_defaults = RenderSettings::default();

        let service = ServiceSettings {
            base_url: self
                .base_url
                .clone()
                .or(service_file.base_url)
                .unwrap_or(defaults.base_url),
            model: self
                .model
                .clone()
                .or(service_file.model)
                .unwrap_or(defaults.model),
            api_key: resolve_api_key([self.api_key.clone(), file_key, env_api_key]),
            timeout_seconds: self
                .timeout_secs
                .or(service_file.timeout_seconds)
                .unwrap_or(defaults.timeout_seconds),
            echo_stream: !self.quiet && service_file.echo_stream.unwrap_or(defaults.echo_stream),
        };

        let output = OutputSettings {
            directory: self
                .output_dir
                .clone()
                .or(output_file.directory)
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            file_name: output_file
                .file_name
                .unwrap_or_else(|| DEFAULT_NETLIST_FILE.to_string()),
        };

        let render = RenderSettings {
            input_amplitude: sweep_file
                .input_amplitude
                .unwrap_or(render_defaults.input_amplitude),
            points_per_decade: sweep_file
                .points_per_decade
                .unwrap_or(render_defaults.points_per_decade),
        };

        AgentConfig {
            request: DesignRequest::new(self.center_freq, self.bandwidth),
            service,
            output,
            render,
        }
    }
}
