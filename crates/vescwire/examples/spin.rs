//! Spin the motor at a fixed current for a few seconds, then release it.
//!
//! Run with:
//!   cargo run --example spin -- tcp://192.168.4.1:65102 2.0
//!
//! The keep-alive thread keeps the command in effect while the main thread
//! sleeps; without it the controller would stop the motor on its own.

use std::time::Duration;

use vescwire::{DriverConfig, Endpoint, Vesc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let endpoint: Endpoint = args
        .next()
        .unwrap_or_else(|| "tcp://127.0.0.1:65102".to_string())
        .parse()?;
    let amps: f64 = args.next().map(|a| a.parse()).transpose()?.unwrap_or(1.0);

    let mut vesc = Vesc::connect(&endpoint, DriverConfig::default())?;
    vesc.set_current(amps)?;
    for _ in 0..5 {
        std::thread::sleep(Duration::from_secs(1));
        eprintln!("rpm: {}", vesc.get_rpm()?);
    }
    vesc.halt()?;
    vesc.close()?;
    Ok(())
}
