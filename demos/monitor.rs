// SPDX-License-Identifier: MPL-2.0

//! Test program: Expose a Daichi account and print every characteristic change.
//!
//! This example demonstrates:
//! - Starting a [`Bridge`] from a JSON platform configuration
//! - Subscribing to characteristic changes on every accessory
//! - Following push updates over the shared push connection
//! - Optionally writing one characteristic to the first accessory
//!
//! # Usage
//!
//! ```bash
//! cargo run --example monitor -- <username> <password> [device title] [active 0|1]
//! ```
//!
//! # Example
//!
//! ```bash
//! RUST_LOG=daichi_bridge=debug cargo run --example monitor -- user@example.com secret Bedroom 1
//! ```

use std::env;

use daichi_bridge::subscription::Subscribable;
use daichi_bridge::types::Characteristic;
use daichi_bridge::{Bridge, BridgeConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <username> <password> [device title] [active 0|1]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --example monitor -- user@example.com secret Bedroom 1");
        std::process::exit(1);
    }

    let mut config = BridgeConfig::new("Daichi", &args[1], &args[2]);
    if let Some(title) = args.get(3) {
        config = config.with_device(title);
    }

    println!("Logging in as {}...", args[1]);
    let mut bridge = Bridge::start(config).await?;

    if bridge.accessories().is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    for accessory in bridge.accessories() {
        let info = accessory.info();
        println!(
            "{} ({} {}, serial {})",
            info.name, info.manufacturer, info.model, info.serial_number
        );
        for spec in accessory.characteristics() {
            println!(
                "  {:<28} {}{}",
                spec.characteristic.to_string(),
                accessory.get(spec.characteristic),
                if spec.writable { "  [rw]" } else { "" }
            );
        }

        let name = info.name.clone();
        accessory.on_change(move |change| {
            println!("{name}: {} -> {}", change.characteristic, change.value);
        });
    }

    if let Some(active) = args.get(4).and_then(|a| a.parse::<f64>().ok())
        && let Some(accessory) = bridge.accessories().first()
    {
        println!("Setting Active to {active} on {}...", accessory.info().name);
        accessory.set(Characteristic::Active, active).await;
    }

    let Some(push_loop) = bridge.connect_push().await? else {
        println!("Push credentials unavailable, exiting.");
        return Ok(());
    };

    println!("Listening for push updates. Press Ctrl+C to exit.");
    tokio::select! {
        _ = push_loop => println!("Push channel closed."),
        _ = tokio::signal::ctrl_c() => {
            println!("\nDisconnecting...");
            bridge.shutdown().await?;
        }
    }

    Ok(())
}
