use crate::utils::error::{DesignError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env reference pattern is valid"));

/// Optional settings file. Every field may be omitted.
///
/// ```toml
/// [service]
/// base_url = "https://dashscope.aliyuncs.com/compatible-mode/v1"
/// model = "qwq-32b"
/// api_key = "${DASHSCOPE_API_KEY}"
/// timeout_seconds = 300
///
/// [output]
/// directory = "results"
/// file_name = "rc_bandpass.sp"
///
/// [sweep]
/// points_per_decade = 100
/// input_amplitude = 1.0
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub service: Option<ServiceSection>,
    pub output: Option<OutputSection>,
    pub sweep: Option<SweepSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceSection {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub echo_stream: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSection {
    pub directory: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepSection {
    pub points_per_decade: Option<u32>,
    pub input_amplitude: Option<f64>,
}

impl FileConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| DesignError::ConfigError {
            message: format!("cannot read '{}': {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| DesignError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value. Unset variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_REFERENCE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// The file's api_key, unless it is still an unresolved `${VAR}` reference.
    pub fn api_key(&self) -> Option<String> {
        self.service
            .as_ref()
            .and_then(|s| s.api_key.clone())
            .filter(|key| !ENV_REFERENCE.is_match(key))
    }
}
