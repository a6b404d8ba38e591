use serde::ser::{Serialize, Serializer};
use vescwire_schema::{FieldSet, Message, SchemaError};

use crate::error::Result;

/// A decoded GET_VALUES snapshot.
///
/// Older firmware names several quantities differently; the accessors
/// resolve the name for the connection's field set.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurements {
    message: Message,
    field_set: FieldSet,
}

impl Measurements {
    pub(crate) fn new(message: Message, field_set: FieldSet) -> Self {
        Self { message, field_set }
    }

    fn field(&self, current: &'static str, pre_v3: &'static str) -> Result<f64> {
        let name = match self.field_set {
            FieldSet::Current => current,
            FieldSet::PreV3 => pre_v3,
        };
        self.message
            .get_f64(name)
            .ok_or_else(|| SchemaError::FieldMissing(name).into())
    }

    /// Electrical RPM.
    pub fn rpm(&self) -> Result<f64> {
        self.field("rpm", "rpm")
    }

    pub fn duty_cycle(&self) -> Result<f64> {
        self.field("duty_cycle_now", "duty_now")
    }

    /// Input voltage in volts.
    pub fn v_in(&self) -> Result<f64> {
        self.field("v_in", "v_in")
    }

    /// Average motor current in amps.
    pub fn motor_current(&self) -> Result<f64> {
        self.field("avg_motor_current", "current_motor")
    }

    /// Average input current in amps.
    pub fn input_current(&self) -> Result<f64> {
        self.field("avg_input_current", "current_in")
    }

    /// Power stage temperature; older firmware reports the PCB sensor.
    pub fn temp_fet(&self) -> Result<f64> {
        self.field("temp_fet", "temp_pcb")
    }

    pub fn fault_code(&self) -> Result<i64> {
        self.message
            .get_i64("mc_fault_code")
            .ok_or_else(|| SchemaError::FieldMissing("mc_fault_code").into())
    }

    /// Any field by its wire name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.message.get_f64(name)
    }

    pub fn field_set(&self) -> FieldSet {
        self.field_set
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }
}

impl Serialize for Measurements {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.message.serialize(serializer)
    }
}
