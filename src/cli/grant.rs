use std::io::Read;
use std::path::Path;

use crate::config::load_config;
use crate::error::RingError;
use crate::oauth::TokenBundle;
use crate::runner::{HubEvent, Runner};

/// Read a grant from a file, or from stdin when `source` is `-`.
pub fn read_grant(source: &str) -> Result<serde_json::Value, RingError> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(Path::new(source)).map_err(|e| RingError::ConfigError {
            path: source.into(),
            detail: format!("Cannot read grant: {e}"),
        })?
    };
    serde_json::from_str(&content)
        .map_err(|e| RingError::ProtocolError(format!("Grant is not valid JSON: {e}")))
}

/// Deliver an OAuth grant as the hub would after the user authorized.
///
/// The tokens are saved before discovery runs; a discovery failure is reported
/// but does not undo the grant.
pub async fn run_grant(cli_config: Option<&str>, source: &str) -> Result<(), RingError> {
    let config = load_config(cli_config)?;
    let grant = read_grant(source)?;
    TokenBundle::from_grant(grant.clone())?;

    let mut runner = Runner::new(config)?;
    runner.start()?;
    match runner.dispatch(HubEvent::OAuthGrant(grant)).await {
        Ok(()) => {
            println!(
                "Tokens saved, {} node(s) registered",
                runner.plugin().registry().len()
            );
        }
        Err(e) => {
            println!("Tokens saved");
            eprintln!("Discovery failed: {e}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_grant_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grant.json");
        std::fs::write(&path, r#"{"access_token": "A", "expires_in": 3600}"#).unwrap();
        let grant = read_grant(path.to_str().unwrap()).unwrap();
        assert_eq!(grant["access_token"], "A");
    }

    #[test]
    fn read_grant_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grant.json");
        std::fs::write(&path, "not json").unwrap();
        let err = read_grant(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err.code(), "parse_error");
    }

    #[test]
    fn read_grant_missing_file() {
        let err = read_grant("/nonexistent/grant.json").unwrap_err();
        assert_eq!(err.code(), "config_error");
    }
}
