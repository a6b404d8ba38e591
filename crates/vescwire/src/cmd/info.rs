use serde::Serialize;
use vescwire_driver::{ConnectionState, FirmwareVersion};
use vescwire_schema::FieldSet;

use crate::cmd::InfoArgs;
use crate::exit::{driver_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat, Row};

#[derive(Serialize)]
struct InfoOutput {
    endpoint: String,
    firmware: String,
    firmware_major: u8,
    firmware_minor: u8,
    field_set: FieldSet,
    values_length: usize,
    state: ConnectionState,
}

impl InfoOutput {
    fn new(
        endpoint: String,
        firmware: FirmwareVersion,
        values_length: usize,
        state: ConnectionState,
    ) -> Self {
        Self {
            endpoint,
            firmware: firmware.to_string(),
            firmware_major: firmware.major,
            firmware_minor: firmware.minor,
            field_set: firmware.field_set(),
            values_length,
            state,
        }
    }

    fn rows(&self) -> Vec<Row> {
        vec![
            ("endpoint".to_string(), self.endpoint.clone()),
            ("firmware".to_string(), self.firmware.clone()),
            ("field set".to_string(), format!("{:?}", self.field_set)),
            ("values length".to_string(), self.values_length.to_string()),
            ("state".to_string(), self.state.to_string()),
        ]
    }
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = args.connect.endpoint()?;
    let mut vesc = args.connect.connect()?;

    let out = InfoOutput::new(
        endpoint.to_string(),
        vesc.firmware_version(),
        vesc.get_values_request().1,
        vesc.state(),
    );
    vesc.close().map_err(|err| driver_error("close failed", err))?;

    print_record(&out, &out.rows(), format);
    Ok(SUCCESS)
}
