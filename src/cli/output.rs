use colored::Colorize;
use serde::Serialize;

use crate::error::RingError;
use crate::oauth::AuthState;
use crate::ring::Device;

pub fn print_error(err: &RingError, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&err.to_json()).unwrap_or_default());
    } else {
        eprintln!("{err}");
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

pub fn auth_state_label(state: AuthState, is_tty: bool) -> String {
    let label = match state {
        AuthState::Unauthenticated => "not authenticated",
        AuthState::Authenticated => "authenticated",
        AuthState::RefreshDue => "refresh due",
        AuthState::Degraded => "degraded (last refresh failed)",
    };
    if !is_tty {
        return label.to_string();
    }
    match state {
        AuthState::Authenticated => label.green().to_string(),
        AuthState::RefreshDue => label.yellow().to_string(),
        AuthState::Unauthenticated | AuthState::Degraded => label.red().to_string(),
    }
}

pub fn format_device_line(device: &Device, category: &str, is_tty: bool) -> String {
    let online = if device.is_online() { "online" } else { "offline" };
    let online = match (is_tty, device.is_online()) {
        (false, _) => online.to_string(),
        (true, true) => online.green().to_string(),
        (true, false) => online.red().to_string(),
    };
    let mut line = format!("{:<12} {:<16} {} ({online})", device.id, category, device.description);
    if let Some(level) = device.battery_life {
        line.push_str(&format!(" battery {level}%"));
    }
    if device.has_light() {
        line.push_str(" light");
    }
    line
}
