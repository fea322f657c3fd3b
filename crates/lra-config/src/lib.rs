//! Harness configuration (`config.toml`) and prompt/spec loading.

pub mod config;
pub mod paths;
pub mod prompts;

pub use config::{
    BackendConfig, BrowserConfig, HarnessConfig, ModelsConfig, PromptsConfig, RetryConfig,
};
pub use prompts::PromptLibrary;
