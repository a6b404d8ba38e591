use serde::Serialize;
use vescwire_driver::Vesc;

use crate::cmd::{hold, release, usage, SetArgs, Setpoint};
use crate::exit::{driver_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct SetOutput {
    setpoint: Setpoint,
    value: f64,
    held_ms: Option<u64>,
}

pub fn run(args: SetArgs, format: OutputFormat) -> CliResult<i32> {
    check_range(args.setpoint, args.value)?;

    let endpoint = args.connect.endpoint()?;
    let mut config = args.connect.driver_config();
    config.erpm_per_mph = args.erpm_per_mph;
    let mut vesc = Vesc::connect(&endpoint, config)
        .map_err(|err| driver_error("connect failed", err))?;

    apply(&vesc, args.setpoint, args.value)?;
    match args.hold {
        Some(duration) => {
            let held = hold(duration);
            release(vesc, held)?;
        }
        None => vesc.close().map_err(|err| driver_error("close failed", err))?,
    }

    let out = SetOutput {
        setpoint: args.setpoint,
        value: args.value,
        held_ms: args.hold.map(|d| d.as_millis() as u64),
    };
    let rows = vec![
        ("setpoint".to_string(), format!("{:?}", out.setpoint).to_lowercase()),
        ("value".to_string(), out.value.to_string()),
        (
            "held".to_string(),
            args.hold.map_or_else(|| "no".to_string(), |d| format!("{d:?}")),
        ),
    ];
    print_record(&out, &rows, format);
    Ok(SUCCESS)
}

fn apply(vesc: &Vesc, setpoint: Setpoint, value: f64) -> CliResult<()> {
    let result = match setpoint {
        Setpoint::Current => vesc.set_current(value),
        Setpoint::Brake => vesc.set_current_brake(value),
        Setpoint::Duty => vesc.set_duty_cycle(value),
        Setpoint::Rpm => vesc.set_rpm(value),
        Setpoint::Speed => vesc.set_speed_mph(value),
        Setpoint::Servo => vesc.set_servo(value),
    };
    result.map_err(|err| driver_error("set failed", err))
}

fn check_range(setpoint: Setpoint, value: f64) -> CliResult<()> {
    let ok = match setpoint {
        Setpoint::Duty => (-1.0..=1.0).contains(&value),
        Setpoint::Servo => (0.0..=1.0).contains(&value),
        Setpoint::Brake => value >= 0.0,
        _ => value.is_finite(),
    };
    if ok {
        Ok(())
    } else {
        Err(usage(format!("{setpoint:?} value {value} is out of range").to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::USAGE;

    #[test]
    fn range_checks() {
        assert!(check_range(Setpoint::Duty, 0.5).is_ok());
        assert_eq!(check_range(Setpoint::Duty, 1.5).unwrap_err().code, USAGE);
        assert!(check_range(Setpoint::Servo, 1.5).is_err());
        assert!(check_range(Setpoint::Brake, -1.0).is_err());
        assert!(check_range(Setpoint::Current, -2.0).is_ok());
        assert!(check_range(Setpoint::Rpm, f64::NAN).is_err());
    }
}
