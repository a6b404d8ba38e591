//! Message ids used by the driver.
//!
//! Values follow the controller firmware's command enumeration; only the
//! commands this crate speaks are listed.

/// Firmware version query/response.
pub const FW_VERSION: u8 = 0;

/// Measurement snapshot query/response.
pub const GET_VALUES: u8 = 4;

pub const SET_DUTY: u8 = 5;
pub const SET_CURRENT: u8 = 6;
pub const SET_CURRENT_BRAKE: u8 = 7;
pub const SET_RPM: u8 = 8;
pub const SET_POS: u8 = 9;

/// Rotor position display/feedback mode.
pub const SET_DETECT: u8 = 11;

pub const SET_SERVO_POS: u8 = 12;

/// Terminal command passthrough.
pub const TERMINAL_CMD: u8 = 20;

/// Text printed by the device, usually terminal output.
pub const PRINT: u8 = 21;

/// Keep-alive; resets the device's command timeout.
pub const ALIVE: u8 = 30;

pub const GPD_SET_FSW: u8 = 38;
pub const GPD_BUFFER_NOTIFY: u8 = 39;
pub const GPD_BUFFER_SIZE_LEFT: u8 = 40;
pub const GPD_FILL_BUFFER: u8 = 41;
pub const GPD_OUTPUT_SAMPLE: u8 = 42;
pub const GPD_SET_MODE: u8 = 43;
pub const GPD_FILL_BUFFER_INT8: u8 = 44;
pub const GPD_FILL_BUFFER_INT16: u8 = 45;
pub const GPD_SET_BUFFER_INT_SCALE: u8 = 46;

/// Returns a human-readable name for a message id.
pub fn message_name(id: u8) -> &'static str {
    match id {
        FW_VERSION => "FW_VERSION",
        GET_VALUES => "GET_VALUES",
        SET_DUTY => "SET_DUTY",
        SET_CURRENT => "SET_CURRENT",
        SET_CURRENT_BRAKE => "SET_CURRENT_BRAKE",
        SET_RPM => "SET_RPM",
        SET_POS => "SET_POS",
        SET_DETECT => "SET_DETECT",
        SET_SERVO_POS => "SET_SERVO_POS",
        TERMINAL_CMD => "TERMINAL_CMD",
        PRINT => "PRINT",
        ALIVE => "ALIVE",
        GPD_SET_FSW => "GPD_SET_FSW",
        GPD_BUFFER_NOTIFY => "GPD_BUFFER_NOTIFY",
        GPD_BUFFER_SIZE_LEFT => "GPD_BUFFER_SIZE_LEFT",
        GPD_FILL_BUFFER => "GPD_FILL_BUFFER",
        GPD_OUTPUT_SAMPLE => "GPD_OUTPUT_SAMPLE",
        GPD_SET_MODE => "GPD_SET_MODE",
        GPD_FILL_BUFFER_INT8 => "GPD_FILL_BUFFER_INT8",
        GPD_FILL_BUFFER_INT16 => "GPD_FILL_BUFFER_INT16",
        GPD_SET_BUFFER_INT_SCALE => "GPD_SET_BUFFER_INT_SCALE",
        _ => "UNKNOWN",
    }
}
