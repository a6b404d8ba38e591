use serde::Serialize;
use vescwire_frame::frame;
use vescwire_schema::{catalog, pack, Message};

use crate::cmd::TerminalArgs;
use crate::exit::{driver_error, frame_error, schema_error, CliResult, SUCCESS};
use crate::output::{print_message, print_record, OutputFormat};

#[derive(Serialize)]
struct TerminalOutput<'a> {
    command: &'a str,
    sent: bool,
}

pub fn run(args: TerminalArgs, format: OutputFormat) -> CliResult<i32> {
    let command = args.command.join(" ");
    let mut vesc = args.connect.connect()?;

    if !args.wait {
        vesc.send_terminal_cmd(&command)
            .map_err(|err| driver_error("terminal command failed", err))?;
        vesc.close().map_err(|err| driver_error("close failed", err))?;
        print_record(
            &TerminalOutput {
                command: &command,
                sent: true,
            },
            &[("command".to_string(), command.clone())],
            format,
        );
        return Ok(SUCCESS);
    }

    let message = Message::with(catalog::TERMINAL_CMD, [("cmd", command.as_str())])
        .map_err(|err| schema_error("invalid command", err))?;
    let payload = pack(&message, false).map_err(|err| schema_error("invalid command", err))?;
    let wire = frame(&payload).map_err(|err| frame_error("invalid command", err))?;

    // Wait for at least an id byte and one character of output.
    let response = vesc
        .send(&wire, Some(2))
        .map_err(|err| driver_error("terminal command failed", err))?;
    vesc.close().map_err(|err| driver_error("close failed", err))?;

    if let Some(response) = response {
        print_message(&response, format);
    }
    Ok(SUCCESS)
}
