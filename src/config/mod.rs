//! Configuration
//!
//! Precedence, highest first:
//! 1. CLI flags
//! 2. Environment variables (`TEMPLATER_*`)
//! 3. Project config (`.templater.toml` / `.templater.yaml`, nearest ancestor)
//! 4. User config (`~/.config/templater/config.toml`)
//! 5. Built-in defaults

mod loader;
mod types;

pub use loader::{
    discover_project_config, load_layered, load_with_warnings, user_config_path,
    with_env_overrides, ConfigWarning, PROJECT_CONFIG_NAMES,
};
pub use types::{
    BatchConfig, CacheConfig, Config, DefaultsConfig, ReliabilityConfig, SecurityConfig,
};
