use std::io::IsTerminal;

use crate::config::load_config;
use crate::error::RingError;
use crate::ring::Devices;
use crate::runner::Runner;

use super::output::{format_device_line, print_json};

/// One line per device, grouped the way Ring reports them.
pub fn device_lines(devices: &Devices, is_tty: bool) -> Vec<String> {
    let groups = [
        ("doorbell", &devices.doorbells),
        ("shared doorbell", &devices.authorized_doorbells),
        ("camera", &devices.stickup_cams),
    ];
    groups
        .iter()
        .flat_map(|(category, list)| {
            list.iter()
                .map(move |device| format_device_line(device, category, is_tty))
        })
        .collect()
}

/// List the devices visible to the authorized account.
pub async fn run_devices(cli_config: Option<&str>, json: bool) -> Result<(), RingError> {
    let config = load_config(cli_config)?;
    let mut runner = Runner::new(config)?;
    runner.start()?;
    let devices = runner.plugin_mut().ring_mut().all_devices().await?;

    if json {
        print_json(&devices);
        return Ok(());
    }

    if devices.is_empty() {
        eprintln!("No devices found.");
        return Ok(());
    }
    for line in device_lines(&devices, std::io::stdout().is_terminal()) {
        println!("{line}");
    }
    Ok(())
}
