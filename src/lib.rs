pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::chat_completion::ChatCompletionClient;
pub use config::{cli::LocalStorage, AgentConfig, ServiceSettings};
pub use core::{acquirer::DesignAcquirer, engine::DesignEngine};
pub use domain::model::{ComponentValues, DesignRequest, DesignResult, DesignSource};
pub use utils::error::{DesignError, Result};
