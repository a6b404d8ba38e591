use crate::cmd::ValuesArgs;
use crate::exit::{driver_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ValuesArgs, format: OutputFormat) -> CliResult<i32> {
    let mut vesc = args.connect.connect()?;
    let values = vesc
        .get_measurements()
        .map_err(|err| driver_error("reading values failed", err))?;
    vesc.close().map_err(|err| driver_error("close failed", err))?;

    tracing::debug!(field_set = ?values.field_set(), "snapshot decoded");
    print_message(values.message(), format);
    Ok(SUCCESS)
}
