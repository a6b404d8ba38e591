use serde::Serialize;

use crate::cmd::HaltArgs;
use crate::exit::{driver_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct HaltOutput {
    halted: bool,
}

pub fn run(args: HaltArgs, format: OutputFormat) -> CliResult<i32> {
    let mut vesc = args.connect.connect()?;
    vesc.halt().map_err(|err| driver_error("halt failed", err))?;
    vesc.close().map_err(|err| driver_error("close failed", err))?;

    print_record(
        &HaltOutput { halted: true },
        &[("halted".to_string(), "true".to_string())],
        format,
    );
    Ok(SUCCESS)
}
