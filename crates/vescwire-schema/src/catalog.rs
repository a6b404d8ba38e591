use std::collections::HashMap;

use crate::error::{Result, SchemaError};
use crate::field::{FieldSpec, MessageSchema};
use crate::ids;

pub const FW_VERSION: MessageSchema = MessageSchema::new(
    ids::FW_VERSION,
    "FW_VERSION",
    &[FieldSpec::int8("major"), FieldSpec::int8("minor")],
);

/// Measurement snapshot for firmware 3.0 and later.
pub const GET_VALUES: MessageSchema = MessageSchema::new(
    ids::GET_VALUES,
    "GET_VALUES",
    &[
        FieldSpec::int16("temp_fet").scaled(10),
        FieldSpec::int16("temp_motor").scaled(10),
        FieldSpec::int32("avg_motor_current").scaled(100),
        FieldSpec::int32("avg_input_current").scaled(100),
        FieldSpec::int32("avg_id").scaled(100),
        FieldSpec::int32("avg_iq").scaled(100),
        FieldSpec::int16("duty_cycle_now").scaled(1000),
        FieldSpec::int32("rpm"),
        FieldSpec::int16("v_in").scaled(10),
        FieldSpec::int32("amp_hours").scaled(10_000),
        FieldSpec::int32("amp_hours_charged").scaled(10_000),
        FieldSpec::int32("watt_hours").scaled(10_000),
        FieldSpec::int32("watt_hours_charged").scaled(10_000),
        FieldSpec::int32("tachometer"),
        FieldSpec::int32("tachometer_abs"),
        FieldSpec::int8("mc_fault_code"),
        FieldSpec::int32("pid_pos_now").scaled(1_000_000),
        FieldSpec::int8("app_controller_id"),
        FieldSpec::int32("time_ms"),
    ],
);

/// Measurement snapshot for firmware older than 3.0.
pub const GET_VALUES_PRE_V3: MessageSchema = MessageSchema::new(
    ids::GET_VALUES,
    "GET_VALUES",
    &[
        FieldSpec::int16("temp_mos1").scaled(10),
        FieldSpec::int16("temp_mos2").scaled(10),
        FieldSpec::int16("temp_mos3").scaled(10),
        FieldSpec::int16("temp_mos4").scaled(10),
        FieldSpec::int16("temp_mos5").scaled(10),
        FieldSpec::int16("temp_mos6").scaled(10),
        FieldSpec::int16("temp_pcb").scaled(10),
        FieldSpec::int32("current_motor").scaled(100),
        FieldSpec::int32("current_in").scaled(100),
        FieldSpec::int16("duty_now").scaled(1000),
        FieldSpec::int32("rpm"),
        FieldSpec::int16("v_in").scaled(10),
        FieldSpec::int32("amp_hours").scaled(10_000),
        FieldSpec::int32("amp_hours_charged").scaled(10_000),
        FieldSpec::int32("watt_hours").scaled(10_000),
        FieldSpec::int32("watt_hours_charged").scaled(10_000),
        FieldSpec::int32("tachometer"),
        FieldSpec::int32("tachometer_abs"),
        FieldSpec::int8("mc_fault_code"),
    ],
);

pub const SET_DUTY: MessageSchema = MessageSchema::new(
    ids::SET_DUTY,
    "SET_DUTY",
    &[FieldSpec::int32("duty_cycle").scaled(100_000)],
);

pub const SET_CURRENT: MessageSchema = MessageSchema::new(
    ids::SET_CURRENT,
    "SET_CURRENT",
    &[FieldSpec::int32("current").scaled(1000)],
);

pub const SET_CURRENT_BRAKE: MessageSchema = MessageSchema::new(
    ids::SET_CURRENT_BRAKE,
    "SET_CURRENT_BRAKE",
    &[FieldSpec::int32("current_brake").scaled(1000)],
);

pub const SET_RPM: MessageSchema =
    MessageSchema::new(ids::SET_RPM, "SET_RPM", &[FieldSpec::int32("rpm")]);

pub const SET_POS: MessageSchema = MessageSchema::new(
    ids::SET_POS,
    "SET_POS",
    &[FieldSpec::int32("pos").scaled(1_000_000)],
);

pub const SET_DETECT: MessageSchema = MessageSchema::new(
    ids::SET_DETECT,
    "SET_DETECT",
    &[FieldSpec::int8("pos_mode")],
);

pub const SET_SERVO_POS: MessageSchema = MessageSchema::new(
    ids::SET_SERVO_POS,
    "SET_SERVO_POS",
    &[FieldSpec::int16("servo_pos").scaled(1000)],
);

pub const TERMINAL_CMD: MessageSchema = MessageSchema::new(
    ids::TERMINAL_CMD,
    "TERMINAL_CMD",
    &[FieldSpec::string("cmd")],
);

pub const PRINT: MessageSchema =
    MessageSchema::new(ids::PRINT, "PRINT", &[FieldSpec::string("text")]);

pub const ALIVE: MessageSchema = MessageSchema::new(ids::ALIVE, "ALIVE", &[]);

pub const GPD_SET_FSW: MessageSchema = MessageSchema::new(
    ids::GPD_SET_FSW,
    "GPD_SET_FSW",
    &[FieldSpec::int32("frequency")],
);

pub const GPD_BUFFER_NOTIFY: MessageSchema =
    MessageSchema::new(ids::GPD_BUFFER_NOTIFY, "GPD_BUFFER_NOTIFY", &[]);

pub const GPD_BUFFER_SIZE_LEFT: MessageSchema = MessageSchema::new(
    ids::GPD_BUFFER_SIZE_LEFT,
    "GPD_BUFFER_SIZE_LEFT",
    &[FieldSpec::int32("size_left")],
);

pub const GPD_FILL_BUFFER: MessageSchema = MessageSchema::new(
    ids::GPD_FILL_BUFFER,
    "GPD_FILL_BUFFER",
    &[FieldSpec::float32("sample")],
);

pub const GPD_OUTPUT_SAMPLE: MessageSchema = MessageSchema::new(
    ids::GPD_OUTPUT_SAMPLE,
    "GPD_OUTPUT_SAMPLE",
    &[FieldSpec::float32("sample")],
);

pub const GPD_SET_MODE: MessageSchema = MessageSchema::new(
    ids::GPD_SET_MODE,
    "GPD_SET_MODE",
    &[FieldSpec::int32("mode")],
);

pub const GPD_FILL_BUFFER_INT8: MessageSchema = MessageSchema::new(
    ids::GPD_FILL_BUFFER_INT8,
    "GPD_FILL_BUFFER_INT8",
    &[FieldSpec::int8("sample")],
);

pub const GPD_FILL_BUFFER_INT16: MessageSchema = MessageSchema::new(
    ids::GPD_FILL_BUFFER_INT16,
    "GPD_FILL_BUFFER_INT16",
    &[FieldSpec::int16("sample")],
);

pub const GPD_SET_BUFFER_INT_SCALE: MessageSchema = MessageSchema::new(
    ids::GPD_SET_BUFFER_INT_SCALE,
    "GPD_SET_BUFFER_INT_SCALE",
    &[FieldSpec::float32("scale")],
);

/// Every built-in schema except the measurement snapshot, whose layout
/// depends on the firmware.
pub const FIXED_SCHEMAS: &[MessageSchema] = &[
    FW_VERSION,
    SET_DUTY,
    SET_CURRENT,
    SET_CURRENT_BRAKE,
    SET_RPM,
    SET_POS,
    SET_DETECT,
    SET_SERVO_POS,
    TERMINAL_CMD,
    PRINT,
    ALIVE,
    GPD_SET_FSW,
    GPD_BUFFER_NOTIFY,
    GPD_BUFFER_SIZE_LEFT,
    GPD_FILL_BUFFER,
    GPD_OUTPUT_SAMPLE,
    GPD_SET_MODE,
    GPD_FILL_BUFFER_INT8,
    GPD_FILL_BUFFER_INT16,
    GPD_SET_BUFFER_INT_SCALE,
];

/// Which GET_VALUES layout the connected firmware speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSet {
    /// Firmware major version below 3.
    PreV3,
    /// Firmware 3.0 and later.
    #[default]
    Current,
}

impl FieldSet {
    pub fn for_firmware_major(major: u8) -> Self {
        if major < 3 {
            FieldSet::PreV3
        } else {
            FieldSet::Current
        }
    }

    /// GET_VALUES schema for this field set.
    pub fn get_values(self) -> MessageSchema {
        match self {
            FieldSet::PreV3 => GET_VALUES_PRE_V3,
            FieldSet::Current => GET_VALUES,
        }
    }
}

/// Id-keyed lookup of message schemas.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    schemas: HashMap<u8, MessageSchema>,
    field_set: FieldSet,
}

impl SchemaCatalog {
    /// Create an empty catalog.
    pub fn new(field_set: FieldSet) -> Self {
        Self {
            schemas: HashMap::new(),
            field_set,
        }
    }

    /// Catalog of every built-in message, using the given GET_VALUES layout.
    ///
    /// Every schema goes through [`register`](Self::register), so a layout
    /// error or id clash in the built-in table fails here.
    pub fn standard(field_set: FieldSet) -> Result<Self> {
        Self::with_schemas(field_set, FIXED_SCHEMAS.iter().copied())
    }

    fn with_schemas<I>(field_set: FieldSet, schemas: I) -> Result<Self>
    where
        I: IntoIterator<Item = MessageSchema>,
    {
        let mut catalog = Self::new(field_set);
        for schema in schemas {
            catalog.register(schema)?;
        }
        catalog.register(field_set.get_values())?;
        Ok(catalog)
    }

    /// Register a schema after checking its layout and id.
    pub fn register(&mut self, schema: MessageSchema) -> Result<()> {
        schema.validate()?;
        if let Some(existing) = self.schemas.get(&schema.id) {
            return Err(SchemaError::DuplicateId {
                id: schema.id,
                existing: existing.name,
            });
        }
        self.schemas.insert(schema.id, schema);
        Ok(())
    }

    pub fn get(&self, id: u8) -> Option<&MessageSchema> {
        self.schemas.get(&id)
    }

    pub fn contains(&self, id: u8) -> bool {
        self.schemas.contains_key(&id)
    }

    pub fn field_set(&self) -> FieldSet {
        self.field_set
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.schemas.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
