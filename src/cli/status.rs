use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::config::load_config;
use crate::error::RingError;
use crate::hub::LocalHub;
use crate::oauth::AuthState;
use crate::ring::RingClient;

use super::output::{auth_state_label, print_json};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub address: String,
    pub name: String,
    pub node_def_id: String,
    pub drivers: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub auth_state: AuthState,
    pub expiry: Option<DateTime<Utc>>,
    pub has_refresh_token: bool,
    pub notices: BTreeMap<String, String>,
    pub nodes: Vec<NodeStatus>,
}

/// Summarize the persisted state without touching the network.
pub fn build_report(hub: Arc<LocalHub>, now: DateTime<Utc>) -> StatusReport {
    let ring = RingClient::new(hub.clone());
    let bundle = ring.oauth().store().get();

    let nodes = hub
        .node_addresses()
        .into_iter()
        .filter_map(|address| {
            let node = hub.node(&address)?;
            Some(NodeStatus {
                address,
                name: node.name,
                node_def_id: node.node_def_id,
                drivers: node
                    .drivers
                    .into_iter()
                    .map(|(name, d)| (name, d.value))
                    .collect(),
            })
        })
        .collect();

    StatusReport {
        auth_state: ring.oauth().state_at(now),
        expiry: bundle.and_then(|b| b.expiry),
        has_refresh_token: bundle.is_some_and(|b| b.refresh_token.is_some()),
        notices: hub.notices(),
        nodes,
    }
}

pub async fn run_status(cli_config: Option<&str>, json: bool) -> Result<(), RingError> {
    let config = load_config(cli_config)?;
    let hub = Arc::new(LocalHub::open(config.hub.clone(), &config.state_path())?);
    let report = build_report(hub, Utc::now());

    if json {
        print_json(&report);
        return Ok(());
    }

    let is_tty = std::io::stdout().is_terminal();
    println!("Auth:    {}", auth_state_label(report.auth_state, is_tty));
    match report.expiry {
        Some(expiry) => println!("Expiry:  {}", expiry.to_rfc3339()),
        None => println!("Expiry:  unknown"),
    }
    for (key, message) in &report.notices {
        let line = format!("Notice [{key}]: {message}");
        if is_tty {
            println!("{}", line.yellow());
        } else {
            println!("{line}");
        }
    }
    if report.nodes.is_empty() {
        println!("No nodes registered.");
    }
    for node in &report.nodes {
        let head = format!("{} ({}, {})", node.address, node.name, node.node_def_id);
        if is_tty {
            println!("{}", head.bold());
        } else {
            println!("{head}");
        }
        for (name, value) in &node.drivers {
            println!("  {name} = {value}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{Hub, HubConfig, AUTH_NOTICE, AUTH_NOTICE_KEY};
    use crate::nodes::Controller;
    use crate::oauth::TOKEN_NAMESPACE;

    fn hub() -> Arc<LocalHub> {
        Arc::new(LocalHub::in_memory(HubConfig {
            uuid: "u".into(),
            profile_num: 1,
            store: "local".into(),
        }))
    }

    #[test]
    fn report_without_tokens() {
        let hub = hub();
        hub.set_notice(AUTH_NOTICE_KEY, AUTH_NOTICE);
        let report = build_report(hub, Utc::now());
        assert_eq!(report.auth_state, AuthState::Unauthenticated);
        assert!(report.expiry.is_none());
        assert_eq!(report.notices.get(AUTH_NOTICE_KEY).map(String::as_str), Some(AUTH_NOTICE));
    }

    #[test]
    fn report_with_tokens_and_nodes() {
        let hub = hub();
        hub.save_custom_data(
            TOKEN_NAMESPACE,
            serde_json::json!({
                "access_token": "A",
                "refresh_token": "R",
                "expires_in": 3600,
                "expiry": "2099-01-01T00:00:00Z"
            }),
        )
        .unwrap();
        hub.add_node(Controller::definition());

        let report = build_report(hub, Utc::now());
        assert_eq!(report.auth_state, AuthState::Authenticated);
        assert!(report.has_refresh_token);
        assert_eq!(report.nodes.len(), 1);
        assert_eq!(report.nodes[0].node_def_id, "CTL");
        assert_eq!(report.nodes[0].drivers.get("ST"), Some(&0.0));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["authState"], "authenticated");
    }
}
