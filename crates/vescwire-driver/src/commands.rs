//! Typed operations built on [`Vesc`]'s command and query paths.

use tracing::debug;
use vescwire_schema::{catalog, Message, MessageSchema, Value};

use crate::connection::Vesc;
use crate::error::Result;
use crate::firmware::FirmwareVersion;
use crate::measurements::Measurements;

/// Rotor position feedback mode for SET_DETECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum RotorPositionMode {
    Off = 0,
    Encoder = 3,
    PidPos = 4,
    PidPosError = 5,
}

impl Vesc {
    fn set_one(&self, schema: MessageSchema, field: &str, value: impl Into<Value>) -> Result<()> {
        let message = Message::with(schema, [(field, value)])?;
        self.command(&message)
    }

    /// Spin the motor open loop through the terminal `foc_openloop` command.
    ///
    /// `frequency` is in Hz and goes out as whole ERPM (`frequency × 60`, truncated).
    pub fn engage(&self, current: f64, frequency: f64) -> Result<()> {
        let erpm = (frequency * 60.0) as i64;
        self.send_terminal_cmd(&format!("foc_openloop {current} {erpm}"))
    }

    /// Release the motor by commanding zero current.
    pub fn halt(&self) -> Result<()> {
        self.set_current(0.0)
    }

    pub fn send_terminal_cmd(&self, cmd: &str) -> Result<()> {
        debug!(cmd, "terminal command");
        self.set_one(catalog::TERMINAL_CMD, "cmd", cmd)
    }

    /// Motor current in amps.
    pub fn set_current(&self, amps: f64) -> Result<()> {
        self.set_one(catalog::SET_CURRENT, "current", amps)
    }

    /// Braking current in amps.
    pub fn set_current_brake(&self, amps: f64) -> Result<()> {
        self.set_one(catalog::SET_CURRENT_BRAKE, "current_brake", amps)
    }

    /// Duty cycle as a fraction in [-1, 1].
    pub fn set_duty_cycle(&self, duty: f64) -> Result<()> {
        self.set_one(catalog::SET_DUTY, "duty_cycle", duty)
    }

    /// Electrical RPM.
    pub fn set_rpm(&self, erpm: f64) -> Result<()> {
        self.set_one(catalog::SET_RPM, "rpm", erpm)
    }

    /// Speed in miles per hour, converted with `erpm_per_mph`.
    pub fn set_speed_mph(&self, mph: f64) -> Result<()> {
        self.set_rpm((mph * self.config().erpm_per_mph).round())
    }

    /// Rotor position in degrees.
    pub fn set_position(&self, degrees: f64) -> Result<()> {
        self.set_one(catalog::SET_POS, "pos", degrees)
    }

    /// Servo output position, normally in [0, 1].
    pub fn set_servo(&self, position: f64) -> Result<()> {
        self.set_one(catalog::SET_SERVO_POS, "servo_pos", position)
    }

    pub fn set_rotor_position_mode(&self, mode: RotorPositionMode) -> Result<()> {
        self.set_one(catalog::SET_DETECT, "pos_mode", mode as i8)
    }

    /// Ask the controller for its firmware version.
    pub fn get_firmware_version(&self) -> Result<FirmwareVersion> {
        let response = self.query(catalog::FW_VERSION)?;
        FirmwareVersion::from_message(&response)
    }

    /// Read a measurement snapshot in the layout of the connected firmware.
    pub fn get_measurements(&self) -> Result<Measurements> {
        let message = self.query(self.field_set().get_values())?;
        Ok(Measurements::new(message, self.field_set()))
    }

    pub fn get_rpm(&self) -> Result<f64> {
        self.get_measurements()?.rpm()
    }

    pub fn get_duty_cycle(&self) -> Result<f64> {
        self.get_measurements()?.duty_cycle()
    }

    pub fn get_v_in(&self) -> Result<f64> {
        self.get_measurements()?.v_in()
    }

    pub fn get_motor_current(&self) -> Result<f64> {
        self.get_measurements()?.motor_current()
    }

    pub fn get_incoming_current(&self) -> Result<f64> {
        self.get_measurements()?.input_current()
    }

    /// Switching frequency of the general purpose drive, in Hz.
    pub fn set_gpd_freq(&self, hz: i32) -> Result<()> {
        self.set_one(catalog::GPD_SET_FSW, "frequency", hz)
    }

    pub fn set_gpd_mode(&self, mode: i32) -> Result<()> {
        self.set_one(catalog::GPD_SET_MODE, "mode", mode)
    }

    pub fn set_gpd_output_sample(&self, sample: f64) -> Result<()> {
        self.set_one(catalog::GPD_OUTPUT_SAMPLE, "sample", sample)
    }

    pub fn set_gpd_fill_buffer(&self, sample: f64) -> Result<()> {
        self.set_one(catalog::GPD_FILL_BUFFER, "sample", sample)
    }

    pub fn set_gpd_fill_buffer_int8(&self, sample: i8) -> Result<()> {
        self.set_one(catalog::GPD_FILL_BUFFER_INT8, "sample", sample)
    }

    pub fn set_gpd_fill_buffer_int16(&self, sample: i16) -> Result<()> {
        self.set_one(catalog::GPD_FILL_BUFFER_INT16, "sample", sample)
    }

    /// Scale applied to integer samples in the GPD buffer.
    pub fn set_gpd_int_scale(&self, scale: f64) -> Result<()> {
        self.set_one(catalog::GPD_SET_BUFFER_INT_SCALE, "scale", scale)
    }

    /// Free space in the GPD sample buffer.
    pub fn get_gpd_buffer_size_left(&self) -> Result<i64> {
        let response = self.query(catalog::GPD_BUFFER_SIZE_LEFT)?;
        response.get_i64("size_left").ok_or_else(|| {
            vescwire_schema::SchemaError::FieldMissing("size_left").into()
        })
    }

    /// Ask to be notified when the GPD buffer runs low.
    ///
    /// The notification arrives whenever the device decides, so this only
    /// sends the request.
    pub fn request_gpd_buffer_notify(&self) -> Result<()> {
        self.command(&Message::new(catalog::GPD_BUFFER_NOTIFY))
    }
}
