use serde::Serialize;

use crate::cmd::{hold, release, EngageArgs};
use crate::exit::{driver_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct EngageOutput {
    current: f64,
    frequency: f64,
    erpm: i64,
    held_ms: Option<u64>,
}

pub fn run(args: EngageArgs, format: OutputFormat) -> CliResult<i32> {
    let mut vesc = args.connect.connect()?;
    vesc.engage(args.current, args.frequency)
        .map_err(|err| driver_error("engage failed", err))?;

    match args.hold {
        Some(duration) => release(vesc, hold(duration))?,
        // Without a hold the firmware stops the open-loop drive on its own timeout.
        None => vesc.close().map_err(|err| driver_error("close failed", err))?,
    }

    let out = EngageOutput {
        current: args.current,
        frequency: args.frequency,
        erpm: (args.frequency * 60.0) as i64,
        held_ms: args.hold.map(|d| d.as_millis() as u64),
    };
    let rows = vec![
        ("current".to_string(), format!("{} A", out.current)),
        ("frequency".to_string(), format!("{} Hz", out.frequency)),
        ("erpm".to_string(), out.erpm.to_string()),
    ];
    print_record(&out, &rows, format);
    Ok(SUCCESS)
}
