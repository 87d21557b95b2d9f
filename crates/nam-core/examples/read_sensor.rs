//! Example: Reading a Nettigo Air Monitor
//!
//! Connects to the device, reads its sensor data once and prints the normalized
//! values together with the CAQI of every particulate sensor.
//!
//! Run with: `cargo run --example read_sensor -- <HOST> [USERNAME PASSWORD]`
//!
//! Set `NAM_CONFIG` to a TOML file to override retry and fallback settings,
//! and `RUST_LOG=nam_core=debug` to watch the requests.

use std::env;
use std::sync::Arc;

use nam_core::{
    ClientConfig, ConnectionOptions, NettigoAirMonitor, ParticulateSensor, ReqwestTransport,
    SensorKey,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(host) = args.get(1) else {
        eprintln!("Usage: {} <HOST> [USERNAME PASSWORD]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} 192.168.172.12", args[0]);
        eprintln!("  {} nam.local admin secret", args[0]);
        std::process::exit(1);
    };

    let options =
        ConnectionOptions::with_credentials(host, args.get(2).cloned(), args.get(3).cloned())?;

    let config = match env::var("NAM_CONFIG") {
        Ok(path) => ClientConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        Err(_) => ClientConfig::default(),
    };

    println!("Connecting to {}...", host);
    let transport = Arc::new(ReqwestTransport::default());
    let nam = NettigoAirMonitor::create_with_config(transport, options, config).await?;
    println!("Connected!");
    if let Some(mac) = nam.mac() {
        println!("  MAC:          {}", mac);
    }
    println!("  Auth enabled: {}", nam.auth_enabled());

    println!();
    println!("Reading sensor values...");
    let snapshot = nam.async_update().await?;

    println!();
    println!("Firmware: {}", snapshot.software_version);
    if let Some(uptime) = snapshot.sensors.uptime {
        println!("Uptime:   {}s", uptime);
    }
    if let Some(location) = snapshot.location {
        println!(
            "Location: {:.5}, {:.5}",
            location.latitude, location.longitude
        );
    }

    println!();
    println!("Current Readings:");
    for key in SensorKey::ALL {
        if let Some(value) = snapshot.sensors.get(key) {
            println!("  {:<24} {}", key, value);
        }
    }
    for (key, value) in &snapshot.sensors.other {
        println!("  {:<24} {}", key, value);
    }

    for family in ParticulateSensor::ALL {
        if let Some(caqi) = snapshot.sensors.caqi(family) {
            println!();
            println!("CAQI ({}): {} ({})", family.prefix(), caqi.index, caqi.level);
        }
    }

    Ok(())
}
