use crate::error::RingError;

use super::types::RingNsConfig;

/// Expand environment variable references in a string.
///
/// Supported syntaxes:
/// - `${VAR}` - replaced with env var value; error if unset
/// - `${VAR:-fallback}` - replaced with env var value, or fallback if unset or empty
/// - `$env:VAR` - same as `${VAR}`
pub fn expand_env_vars(input: &str) -> Result<String, RingError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        if chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            let mut found_close = false;
            for c in chars.by_ref() {
                if c == '}' {
                    found_close = true;
                    break;
                }
                var_expr.push(c);
            }
            if !found_close {
                return Err(env_error(&format!(
                    "Unclosed variable reference: ${{{var_expr}"
                )));
            }

            match var_expr.split_once(":-") {
                Some((name, fallback)) => match std::env::var(name) {
                    Ok(val) if !val.is_empty() => result.push_str(&val),
                    _ => result.push_str(fallback),
                },
                None => result.push_str(&lookup(&var_expr)?),
            }
            continue;
        }

        let rest: String = chars.clone().take(4).collect();
        if rest == "env:" {
            for _ in 0..4 {
                chars.next();
            }
            let mut var_name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    var_name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if var_name.is_empty() {
                return Err(env_error("Empty variable name in $env: reference"));
            }
            result.push_str(&lookup(&var_name)?);
            continue;
        }

        // Not a recognized pattern, output the '$' literally
        result.push('$');
    }

    Ok(result)
}

fn lookup(name: &str) -> Result<String, RingError> {
    std::env::var(name)
        .map_err(|_| env_error(&format!("Environment variable '{name}' is not set")))
}

/// Expand every string inside a JSON value, keys excluded.
pub fn expand_value(value: &mut serde_json::Value) -> Result<(), RingError> {
    match value {
        serde_json::Value::String(s) => *s = expand_env_vars(s)?,
        serde_json::Value::Array(items) => {
            for item in items {
                expand_value(item)?;
            }
        }
        serde_json::Value::Object(map) => {
            for item in map.values_mut() {
                expand_value(item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Expand environment variables in all string fields of the runner config.
pub fn expand_config(config: &mut RingNsConfig) -> Result<(), RingError> {
    config.hub.uuid = expand_env_vars(&config.hub.uuid)?;
    config.hub.store = expand_env_vars(&config.hub.store)?;
    expand_value(&mut config.oauth)?;
    for value in config.custom_params.values_mut() {
        *value = expand_env_vars(value)?;
    }
    if let Some(url) = config.postback_url.as_mut() {
        *url = expand_env_vars(url)?;
    }
    if let Some(url) = config.api_base_url.as_mut() {
        *url = expand_env_vars(url)?;
    }
    if let Some(path) = config.state_file.as_mut() {
        let expanded = expand_env_vars(&path.to_string_lossy())?;
        *path = expanded.into();
    }
    Ok(())
}

fn env_error(detail: &str) -> RingError {
    RingError::ConfigError {
        path: std::path::PathBuf::from("<env>"),
        detail: detail.to_string(),
    }
}
