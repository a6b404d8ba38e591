//! Connect to a controller and print one measurement snapshot.
//!
//! Run with:
//!   cargo run --example read-values -- tcp://192.168.4.1:65102
//!
//! A serial adapter exposed through a TCP or Unix socket bridge works the
//! same way (`unix:/tmp/vesc.sock`).

use vescwire::{DriverConfig, Endpoint, Vesc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let endpoint: Endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tcp://127.0.0.1:65102".to_string())
        .parse()?;

    let mut vesc = Vesc::connect(&endpoint, DriverConfig::default())?;
    eprintln!(
        "Firmware {} ({:?} layout)",
        vesc.firmware_version(),
        vesc.field_set()
    );

    let values = vesc.get_measurements()?;
    println!("rpm:           {}", values.rpm()?);
    println!("duty cycle:    {}", values.duty_cycle()?);
    println!("input voltage: {} V", values.v_in()?);
    println!("motor current: {} A", values.motor_current()?);

    vesc.close()?;
    Ok(())
}
