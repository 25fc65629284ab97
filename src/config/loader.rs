use std::path::{Path, PathBuf};

use crate::error::RingError;

use super::env::expand_config;
use super::types::RingNsConfig;

pub const CONFIG_ENV: &str = "RING_NS_CONFIG";

/// Strip JSONC comments (// line comments and /* */ block comments) from input.
pub fn strip_jsonc_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(ch) = chars.next() {
        if escape_next {
            escape_next = false;
            result.push(ch);
            continue;
        }

        if in_string {
            result.push(ch);
            if ch == '\\' {
                escape_next = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
            result.push(ch);
            continue;
        }

        if ch != '/' {
            result.push(ch);
            continue;
        }

        match chars.peek() {
            Some(&'/') => {
                chars.next();
                for c in chars.by_ref() {
                    if c == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    // Keep line numbers stable for parse errors
                    if c == '\n' {
                        result.push('\n');
                    }
                    prev = c;
                }
            }
            _ => result.push(ch),
        }
    }

    result
}

/// Candidate config files in precedence order (highest first).
///
/// Precedence:
/// 1. `--config` CLI flag
/// 2. `RING_NS_CONFIG` env var
/// 3. `./config/ring-ns.json` (project-level)
/// 4. `~/.ring-ns/config.json` or `~/.ring-ns/config.jsonc` (home-level)
pub fn discover_config_files(cli_config: Option<&str>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut push = |p: PathBuf| {
        if p.exists() && !files.contains(&p) {
            files.push(p);
        }
    };

    if let Some(path) = cli_config {
        push(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        push(PathBuf::from(env_path));
    }

    push(PathBuf::from("./config/ring-ns.json"));

    if let Some(home) = dirs::home_dir() {
        let home_json = home.join(".ring-ns").join("config.json");
        if home_json.exists() {
            push(home_json);
        } else {
            push(home.join(".ring-ns").join("config.jsonc"));
        }
    }

    files
}

/// Load a single config file, stripping JSONC comments before parsing.
pub fn load_config_file(path: &Path) -> Result<RingNsConfig, RingError> {
    let content = std::fs::read_to_string(path).map_err(|e| RingError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Cannot read file: {e}"),
    })?;

    let stripped = strip_jsonc_comments(&content);
    let mut config =
        serde_json::from_str::<RingNsConfig>(&stripped).map_err(|e| RingError::ConfigError {
            path: path.to_path_buf(),
            detail: format!("Invalid JSON: {e}"),
        })?;
    config.source = Some(path.to_path_buf());
    Ok(config)
}

/// Load the highest-precedence config file and expand environment variables.
///
/// An explicit `--config` that does not exist is an error rather than a
/// silent fallback to another file.
pub fn load_config(cli_config: Option<&str>) -> Result<RingNsConfig, RingError> {
    if let Some(path) = cli_config {
        let path = Path::new(path);
        if !path.exists() {
            return Err(RingError::ConfigError {
                path: path.to_path_buf(),
                detail: "File not found".to_string(),
            });
        }
    }

    let files = discover_config_files(cli_config);
    let Some(path) = files.first() else {
        return Err(RingError::ConfigError {
            path: PathBuf::from("./config/ring-ns.json"),
            detail: format!("No config file found (use --config or set {CONFIG_ENV})"),
        });
    };
    tracing::debug!("Loading config from {}", path.display());

    let mut config = load_config_file(path)?;
    expand_config(&mut config)?;
    Ok(config)
}
