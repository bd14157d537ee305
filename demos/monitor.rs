//! Health thermometer monitor example
//!
//! Connects to the first thermometer found and prints every measurement
//! it reports until the peer disconnects or Ctrl+C is pressed.
//!
//! Run with: cargo run --example monitor
//!
//! Show readings in Fahrenheit:
//!   cargo run --example monitor -- --fahrenheit

use health_thermometer_ble::{
    ConnectionConfig, PeripheralLink, Result, SessionEvent, ThermometerConnection,
    ThermometerScanner,
};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,health_thermometer_ble=info".into()),
        )
        .init();

    println!("Health Thermometer Monitor");
    println!("==========================\n");

    let fahrenheit = std::env::args().any(|arg| arg == "--fahrenheit");

    println!("Scanning for a thermometer...\n");
    let scanner = ThermometerScanner::new().await?;
    let peripheral = scanner.find_first(Duration::from_secs(15)).await?;

    let config = ConnectionConfig::default().with_connect_timeout(Duration::from_secs(15));
    let (connection, mut events) =
        ThermometerConnection::start(PeripheralLink::new(peripheral), config);
    println!("Connecting to {}...\n", connection.identifier());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nDisconnecting...");
                if let Err(e) = connection.disconnect().await {
                    eprintln!("Disconnect failed: {}", e);
                }
                break;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Connected) => println!("Connected, waiting for measurements"),
                Ok(SessionEvent::MeasurementReceived(m)) => {
                    if fahrenheit {
                        println!("{:>8.2}°F  {}", m.fahrenheit(), m);
                    } else {
                        println!("{:>8.2}°C  {}", m.celsius(), m);
                    }
                }
                Ok(SessionEvent::Error(e)) => eprintln!("Error: {}", e),
                Ok(SessionEvent::Disconnected) => {
                    println!("Thermometer disconnected");
                    break;
                }
                Err(RecvError::Lagged(n)) => eprintln!("Missed {} events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    connection.wait().await
}
