//! Configuration discovery, layering and environment overrides

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{TemplaterError, TemplaterResult};

use super::types::Config;

/// Project config file names, checked in order in each directory
pub const PROJECT_CONFIG_NAMES: &[&str] = &[".templater.toml", ".templater.yaml", ".templater.yml"];

/// Non-fatal configuration warning surfaced to CLI users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown config key '{}' in {}", self.key, self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{}'?)", suggestion)?;
        }
        Ok(())
    }
}

impl Config {
    /// Load a single config file over the defaults
    pub fn load(path: &Path) -> TemplaterResult<Self> {
        let (config, _) = load_layered(&[path.to_path_buf()])?;
        Ok(config)
    }
}

/// `~/.config/templater/config.toml`, honouring `XDG_CONFIG_HOME`
pub fn user_config_path() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|dir| dir.join("templater").join("config.toml"))
}

/// Nearest project config at or above `start`
pub fn discover_project_config(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        PROJECT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Defaults < user config < project config < `TEMPLATER_*` environment
pub fn load_with_warnings(cwd: &Path) -> TemplaterResult<(Config, Vec<ConfigWarning>)> {
    let layers: Vec<PathBuf> = user_config_path()
        .filter(|p| p.is_file())
        .into_iter()
        .chain(discover_project_config(cwd))
        .collect();

    let (config, warnings) = load_layered(&layers)?;
    Ok((with_env_overrides(config, |key| std::env::var(key).ok()), warnings))
}

/// Merge config files in order, later files overriding earlier ones key by key
pub fn load_layered(paths: &[PathBuf]) -> TemplaterResult<(Config, Vec<ConfigWarning>)> {
    let mut merged = toml::Value::Table(toml::map::Map::new());
    let mut warnings = Vec::new();

    for path in paths {
        let content =
            std::fs::read_to_string(path).map_err(|e| TemplaterError::io(path, e))?;
        let value = parse_value(path, &content)?;

        // each layer is checked alone so warnings point at the right file
        let mut unknown = Vec::new();
        let _: Config = serde_ignored::deserialize(value.clone(), |p| unknown.push(p.to_string()))
            .map_err(|e| config_error(path, e))?;
        warnings.extend(unknown.into_iter().map(|key_path| warning(path, &content, &key_path)));

        debug!(path = %path.display(), "loaded config layer");
        merge(&mut merged, value);
    }

    let config = merged.try_into::<Config>().map_err(|e| TemplaterError::Config {
        path: paths.last().cloned().unwrap_or_default(),
        message: e.to_string(),
    })?;
    Ok((config, warnings))
}

fn parse_value(path: &Path, content: &str) -> TemplaterResult<toml::Value> {
    if content.trim().is_empty() {
        return Ok(toml::Value::Table(toml::map::Map::new()));
    }
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        serde_yaml_ng::from_str(content).map_err(|e| config_error(path, e))
    } else {
        toml::from_str(content).map_err(|e| config_error(path, e))
    }
}

fn config_error(path: &Path, err: impl std::fmt::Display) -> TemplaterError {
    TemplaterError::Config {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply `TEMPLATER_*` overrides; unparsable values are ignored with a warning
pub fn with_env_overrides(
    mut config: Config,
    var: impl Fn(&str) -> Option<String>,
) -> Config {
    if let Some(dir) = var("TEMPLATER_OUTPUT_DIR") {
        config.defaults.output_dir = Some(PathBuf::from(dir));
    }
    if let Some(val) = var("TEMPLATER_BACKUP") {
        config.defaults.backup = !matches!(val.to_lowercase().as_str(), "false" | "0" | "no");
    }
    if let Some(dir) = var("TEMPLATER_BACKUP_DIR") {
        config.reliability.backup_dir = Some(PathBuf::from(dir));
    }
    if let Some(n) = parse_env(&var, "TEMPLATER_WATCH_INTERVAL_MS") {
        config.defaults.watch_interval_ms = n;
    }
    if let Some(n) = parse_env(&var, "TEMPLATER_CACHE_CAPACITY") {
        config.cache.capacity = n;
    }
    if let Some(n) = parse_env(&var, "TEMPLATER_CACHE_TTL_SECS") {
        config.cache.ttl_secs = n;
    }
    if let Some(n) = parse_env(&var, "TEMPLATER_WORKERS") {
        config.batch.workers = Some(n);
    }
    config
}

fn parse_env<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

fn warning(file: &Path, content: &str, key_path: &str) -> ConfigWarning {
    let key = key_path
        .split('.')
        .next_back()
        .unwrap_or(key_path)
        .to_string();
    ConfigWarning {
        line: find_line_number(content, &key),
        suggestion: suggest_key(&key),
        key,
        file: file.to_path_buf(),
    }
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|i| i + 1)
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "defaults",
        "output_dir",
        "watch_interval_ms",
        "backup",
        "language",
        "cache",
        "capacity",
        "ttl_secs",
        "sweep_interval_secs",
        "batch",
        "workers",
        "extensions",
        "reliability",
        "backup_dir",
        "retention_days",
        "security",
        "allowed_dirs",
    ];

    CANDIDATES
        .iter()
        .map(|candidate| (*candidate, levenshtein(unknown, candidate)))
        .min_by_key(|(_, dist)| *dist)
        .filter(|(_, dist)| *dist <= 2)
        .map(|(candidate, _)| candidate.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b = b.as_bytes();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ac) in a.as_bytes().iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b.iter().enumerate() {
            let cost = usize::from(ac != bc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
